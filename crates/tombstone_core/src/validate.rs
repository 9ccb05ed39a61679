//! Tombstone-aware uniqueness validation.
//!
//! # Responsibility
//! - Run a pre-save uniqueness check whose comparison set accounts for
//!   tombstoned rows when armed with the paranoid flag.
//!
//! # Invariants
//! - The check only reshapes which rows are compared; a conflict is
//!   always reported as a validation error, never swallowed.
//! - The record under validation never conflicts with its own row.

use crate::hooks::DestroyHooks;
use crate::record::{Entity, Tombstoned};
use crate::repo::tombstone_repo::{RepoError, RepoResult, TombstoneRepository};
use crate::scope::Scope;
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Uniqueness conflict, naming the table and the effective key columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub table: String,
    pub columns: Vec<String>,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "uniqueness violation on `{}` ({})",
            self.table,
            self.columns.join(", ")
        )
    }
}

impl Error for ValidationError {}

/// A configurable uniqueness check over a business key.
///
/// Without the paranoid flag the comparison runs over the type's default
/// query view, matching the host's ordinary check. With it, the
/// comparison branches on the record's deleted state:
///
/// - deleted: the key broadens to include the deletion-timestamp column
///   and the comparison runs over the deleted-only view, so tombstones
///   with different deletion times never conflict;
/// - active: the comparison runs over the active-only view, so
///   tombstones never block a new active row.
#[derive(Debug, Clone)]
pub struct UniquenessCheck {
    columns: Vec<String>,
    paranoid: bool,
    narrows: Vec<(String, Value)>,
}

impl UniquenessCheck {
    /// Builds a check over the given business-key columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            paranoid: false,
            narrows: Vec::new(),
        }
    }

    /// Arms tombstone-aware comparison.
    pub fn paranoid(mut self) -> Self {
        self.paranoid = true;
        self
    }

    /// Narrows the comparison set with an extra equality condition.
    pub fn also_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.narrows.push((column.into(), value.into()));
        self
    }

    /// Runs the check for one record.
    ///
    /// Every named column must be mapped by the entity's column values.
    pub fn check<E, H>(&self, repo: &TombstoneRepository<'_, E, H>, record: &E) -> RepoResult<()>
    where
        E: Entity + Tombstoned,
        H: DestroyHooks<E>,
    {
        let values = record.values();
        let lookup = |column: &str| -> RepoResult<Value> {
            values
                .iter()
                .find(|(mapped, _)| *mapped == column)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| RepoError::UnknownColumn {
                    table: E::TABLE.to_string(),
                    column: column.to_string(),
                })
        };

        let (base, effective): (Scope<'_, E>, Vec<String>) = if self.paranoid {
            if repo.is_deleted(record) {
                let mut columns = self.columns.clone();
                columns.push(repo.config().deleted_at_column.clone());
                (repo.deleted(), columns)
            } else {
                (repo.not_deleted(), self.columns.clone())
            }
        } else {
            (repo.all(), self.columns.clone())
        };

        let mut scope = base;
        for column in &effective {
            let value = lookup(column)?;
            scope = scope.filter_eq(column, value);
        }
        for (column, value) in &self.narrows {
            scope = scope.filter_eq(column, value.clone());
        }
        scope = scope.filter_ne(E::PRIMARY_KEY, record.id().to_string());

        if scope.exists()? {
            return Err(RepoError::Validation(ValidationError {
                table: E::TABLE.to_string(),
                columns: effective,
            }));
        }
        Ok(())
    }
}
