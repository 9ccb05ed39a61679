//! Contracts a mapped record type implements.
//!
//! # Responsibility
//! - Define what the layer needs from a record type: storage name,
//!   identity, row mapping and tombstone attribute access.
//! - Provide the single timestamp source used by every delete path.
//!
//! # Invariants
//! - `RecordId` is stable and never reused for another record.
//! - A record instance fully owns its tombstone fields; nothing else
//!   mutates them directly.

use crate::repo::tombstone_repo::RepoResult;
use rusqlite::types::Value;
use rusqlite::Row;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable per-row identity, stored as TEXT.
pub type RecordId = Uuid;

/// Storage mapping for a record type.
///
/// Implemented by hand per mapped type, the way a hand-written data
/// access layer would. `values` must cover every column in
/// `select_columns`, including the primary key and the tombstone
/// columns, so that a plain save persists the full row.
pub trait Entity: Sized {
    /// Storage table name.
    const TABLE: &'static str;
    /// Primary key column name.
    const PRIMARY_KEY: &'static str = "uuid";

    /// Full column list selected when loading rows.
    fn select_columns() -> &'static [&'static str];

    /// Stable identity of this instance.
    fn id(&self) -> RecordId;

    /// Maps one selected row back into an instance.
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;

    /// Column values persisted on insert and save.
    fn values(&self) -> Vec<(&'static str, Value)>;
}

/// Tombstone attribute access.
///
/// The actor accessors default to no-ops for types without an actor
/// column.
pub trait Tombstoned {
    /// Current deletion timestamp attribute in epoch milliseconds.
    fn deleted_at(&self) -> Option<i64>;

    fn set_deleted_at(&mut self, stamp: Option<i64>);

    /// Current deletion actor attribute.
    fn deleted_by(&self) -> Option<&str> {
        None
    }

    fn set_deleted_by(&mut self, _actor: Option<String>) {}
}

/// Current time in epoch milliseconds.
///
/// Clock readings before the epoch collapse to zero.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
