//! Per-type soft-delete configuration.
//!
//! # Responsibility
//! - Resolve caller options into an immutable configuration record.
//! - Provide copy-on-inherit derivation for specialized record types.
//! - Own the deleted-state predicate and the not-deleted sentinel.
//!
//! # Invariants
//! - Configuration is resolved once at setup time and never mutated.
//! - `inherit` returns an independent copy; the parent stays untouched.
//! - The predicate reads only in-memory attributes, never the database.

use crate::record::Tombstoned;
use serde::{Deserialize, Serialize};

/// How `recover` writes the cleared tombstone back to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoverStrategy {
    /// Mutate the instance and persist through a plain save.
    ViaSave,
    /// Issue a targeted update by primary key, bypassing save.
    DirectUpdate,
}

/// Caller-supplied setup options. Every field is optional; unset fields
/// fall back to the documented defaults. Unknown keys in serialized input
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftDeleteOptions {
    pub deleted_at_column: Option<String>,
    pub deleted_by_column: Option<String>,
    pub track_deleted_by: Option<bool>,
    pub deleted_scope_name: Option<String>,
    pub not_deleted_scope_name: Option<String>,
    pub with_deleted_scope_name: Option<String>,
    pub enable_default_scope: Option<bool>,
    pub soft_destroy: Option<bool>,
    /// Timestamp value meaning "not deleted". `None` keeps the column NULL.
    pub not_deleted_value: Option<i64>,
    pub recover_strategy: Option<RecoverStrategy>,
}

/// Resolved per-type configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftDeleteConfig {
    /// Column holding the tombstone time in epoch milliseconds.
    pub deleted_at_column: String,
    /// Column holding the deletion actor.
    pub deleted_by_column: String,
    /// Whether delete operations populate the actor column.
    pub track_deleted_by: bool,
    /// Caller-visible name of the deleted-only view.
    pub deleted_scope_name: String,
    /// Caller-visible name of the active-only view.
    pub not_deleted_scope_name: String,
    /// Caller-visible name of the unfiltered view.
    pub with_deleted_scope_name: String,
    /// Whether the type's default query is the active-only view.
    pub enable_default_scope: bool,
    /// Whether the standard destroy entry point tombstones instead of
    /// deleting the row.
    pub soft_destroy: bool,
    /// Sentinel meaning "not deleted" in the timestamp column.
    pub not_deleted_value: Option<i64>,
    pub recover_strategy: RecoverStrategy,
}

impl Default for SoftDeleteConfig {
    fn default() -> Self {
        Self::resolve(SoftDeleteOptions::default())
    }
}

impl SoftDeleteConfig {
    /// Resolves caller options into a full configuration.
    pub fn resolve(options: SoftDeleteOptions) -> Self {
        Self {
            deleted_at_column: options
                .deleted_at_column
                .unwrap_or_else(|| "deleted_at".to_string()),
            deleted_by_column: options
                .deleted_by_column
                .unwrap_or_else(|| "deleted_by".to_string()),
            track_deleted_by: options.track_deleted_by.unwrap_or(false),
            deleted_scope_name: options
                .deleted_scope_name
                .unwrap_or_else(|| "deleted".to_string()),
            not_deleted_scope_name: options
                .not_deleted_scope_name
                .unwrap_or_else(|| "not_deleted".to_string()),
            with_deleted_scope_name: options
                .with_deleted_scope_name
                .unwrap_or_else(|| "with_deleted".to_string()),
            enable_default_scope: options.enable_default_scope.unwrap_or(false),
            soft_destroy: options.soft_destroy.unwrap_or(false),
            not_deleted_value: options.not_deleted_value,
            recover_strategy: options.recover_strategy.unwrap_or(RecoverStrategy::ViaSave),
        }
    }

    /// Derives a configuration for a specialized record type.
    ///
    /// Returns an independent copy with `overrides` applied on top of
    /// `self`. Overriding in the derived configuration never mutates the
    /// parent.
    pub fn inherit(&self, overrides: SoftDeleteOptions) -> Self {
        Self {
            deleted_at_column: overrides
                .deleted_at_column
                .unwrap_or_else(|| self.deleted_at_column.clone()),
            deleted_by_column: overrides
                .deleted_by_column
                .unwrap_or_else(|| self.deleted_by_column.clone()),
            track_deleted_by: overrides.track_deleted_by.unwrap_or(self.track_deleted_by),
            deleted_scope_name: overrides
                .deleted_scope_name
                .unwrap_or_else(|| self.deleted_scope_name.clone()),
            not_deleted_scope_name: overrides
                .not_deleted_scope_name
                .unwrap_or_else(|| self.not_deleted_scope_name.clone()),
            with_deleted_scope_name: overrides
                .with_deleted_scope_name
                .unwrap_or_else(|| self.with_deleted_scope_name.clone()),
            enable_default_scope: overrides
                .enable_default_scope
                .unwrap_or(self.enable_default_scope),
            soft_destroy: overrides.soft_destroy.unwrap_or(self.soft_destroy),
            not_deleted_value: overrides.not_deleted_value.or(self.not_deleted_value),
            recover_strategy: overrides.recover_strategy.unwrap_or(self.recover_strategy),
        }
    }

    /// Timestamp value a freshly constructed record must carry.
    pub fn fresh_stamp(&self) -> Option<i64> {
        self.not_deleted_value
    }

    /// Reports whether the instance is currently tombstoned.
    ///
    /// Reads the in-memory attribute only. A record initialized from
    /// `fresh_stamp` reports false under any configured sentinel.
    pub fn is_deleted<T: Tombstoned>(&self, record: &T) -> bool {
        record.deleted_at() != self.not_deleted_value
    }
}
