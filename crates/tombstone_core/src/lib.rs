//! Soft-delete (tombstone) behavior layer for SQLite-backed record types.
//! Deletion marks a row with a timestamp instead of removing it; query
//! views include or exclude tombstoned rows transparently.

pub mod config;
pub mod db;
pub mod hooks;
pub mod logging;
pub mod record;
pub mod repo;
pub mod scope;
pub mod validate;

pub use config::{RecoverStrategy, SoftDeleteConfig, SoftDeleteOptions};
pub use hooks::{DestroyHooks, HookError, NoHooks};
pub use logging::{default_log_level, init_logging, logging_status};
pub use record::{now_epoch_ms, Entity, RecordId, Tombstoned};
pub use repo::tombstone_repo::{DestroyOptions, RepoError, RepoResult, TombstoneRepository};
pub use scope::{DeletionView, Scope};
pub use validate::{UniquenessCheck, ValidationError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
