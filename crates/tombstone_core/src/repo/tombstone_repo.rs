//! Tombstone repository: persistence surface and deletion state machine.
//!
//! # Responsibility
//! - Provide create/save/get plus the three query views per record type.
//! - Implement both delete strategies (direct soft delete and the
//!   transaction-wrapped destroy entry point) and recovery.
//!
//! # Invariants
//! - A record is ACTIVE when its timestamp equals the sentinel, DELETED
//!   otherwise; destroy and recover are the only transitions.
//! - `save` targets rows by primary key only, so saves against
//!   tombstoned instances keep working when the default scope is on.
//! - A failed destroy rolls back and restores the instance's in-memory
//!   tombstone fields to their pre-destroy values.

use crate::config::{RecoverStrategy, SoftDeleteConfig};
use crate::db::DbError;
use crate::hooks::{DestroyHooks, HookError, NoHooks};
use crate::record::{now_epoch_ms, Entity, RecordId, Tombstoned};
use crate::scope::{DeletionView, Scope};
use crate::validate::ValidationError;
use log::{debug, error};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for tombstone persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(RecordId),
    MissingRequiredTable(String),
    MissingRequiredColumn { table: String, column: String },
    UnknownColumn { table: String, column: String },
    Hook(HookError),
    Validation(ValidationError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{column}` is missing on `{table}`")
            }
            Self::UnknownColumn { table, column } => {
                write!(f, "column `{column}` is not mapped on `{table}`")
            }
            Self::Hook(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Hook(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<HookError> for RepoError {
    fn from(value: HookError) -> Self {
        Self::Hook(value)
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Caller-supplied destroy arguments.
///
/// Threaded as a plain call-scoped value from the public entry point to
/// the internal delete step, so concurrent destroys of different
/// instances cannot observe each other's arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestroyOptions {
    /// Actor recorded in the deletion-actor column when tracking is on.
    pub deleted_by: Option<String>,
}

impl DestroyOptions {
    /// Options carrying a deletion actor.
    pub fn deleted_by(actor: impl Into<String>) -> Self {
        Self {
            deleted_by: Some(actor.into()),
        }
    }
}

/// Per-type repository over one connection.
pub struct TombstoneRepository<'conn, E, H = NoHooks>
where
    E: Entity + Tombstoned,
    H: DestroyHooks<E>,
{
    conn: &'conn Connection,
    config: SoftDeleteConfig,
    hooks: H,
    marker: PhantomData<fn() -> E>,
}

impl<'conn, E> TombstoneRepository<'conn, E, NoHooks>
where
    E: Entity + Tombstoned,
{
    /// Constructs a repository without destroy hooks.
    pub fn try_new(conn: &'conn Connection, config: SoftDeleteConfig) -> RepoResult<Self> {
        Self::with_hooks(conn, config, NoHooks)
    }
}

impl<'conn, E, H> TombstoneRepository<'conn, E, H>
where
    E: Entity + Tombstoned,
    H: DestroyHooks<E>,
{
    /// Constructs a repository with the given destroy hooks.
    ///
    /// Fails when the connection's schema cannot support the
    /// configuration: missing table, missing primary key or timestamp
    /// column, or missing actor column while tracking is enabled.
    pub fn with_hooks(
        conn: &'conn Connection,
        config: SoftDeleteConfig,
        hooks: H,
    ) -> RepoResult<Self> {
        ensure_schema_ready::<E>(conn, &config)?;
        Ok(Self {
            conn,
            config,
            hooks,
            marker: PhantomData,
        })
    }

    /// Resolved configuration of this record type.
    pub fn config(&self) -> &SoftDeleteConfig {
        &self.config
    }

    /// Unfiltered view over the table.
    pub fn with_deleted(&self) -> Scope<'_, E> {
        Scope::new(self.conn, &self.config, DeletionView::All)
    }

    /// View of rows that are not tombstoned.
    pub fn not_deleted(&self) -> Scope<'_, E> {
        Scope::new(self.conn, &self.config, DeletionView::Active)
    }

    /// View of tombstoned rows.
    pub fn deleted(&self) -> Scope<'_, E> {
        Scope::new(self.conn, &self.config, DeletionView::Deleted)
    }

    /// The type's default query view.
    ///
    /// The active-only view when the default scope is enabled, otherwise
    /// the unfiltered view. Decided once at configuration time.
    pub fn all(&self) -> Scope<'_, E> {
        if self.config.enable_default_scope {
            self.not_deleted()
        } else {
            self.with_deleted()
        }
    }

    /// Resolves a view by its configured scope name.
    pub fn scope(&self, name: &str) -> Option<Scope<'_, E>> {
        if name == self.config.deleted_scope_name {
            Some(self.deleted())
        } else if name == self.config.not_deleted_scope_name {
            Some(self.not_deleted())
        } else if name == self.config.with_deleted_scope_name {
            Some(self.with_deleted())
        } else {
            None
        }
    }

    /// Inserts the record's full column set.
    pub fn create(&self, record: &E) -> RepoResult<()> {
        let values = record.values();
        let columns = values
            .iter()
            .map(|(column, _)| format!("\"{column}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = format!(
            "INSERT INTO \"{}\" ({columns}) VALUES ({placeholders})",
            E::TABLE
        );
        let binds: Vec<Value> = values.into_iter().map(|(_, value)| value).collect();
        self.conn.execute(&sql, params_from_iter(binds))?;
        Ok(())
    }

    /// Persists every non-key column, targeted by primary key.
    pub fn save(&self, record: &E) -> RepoResult<()> {
        save_on(self.conn, record)
    }

    /// Looks up one record through the default query view.
    pub fn get(&self, id: RecordId) -> RepoResult<Option<E>> {
        self.all().find(id)
    }

    /// Reports whether the instance is currently tombstoned.
    pub fn is_deleted(&self, record: &E) -> bool {
        self.config.is_deleted(record)
    }

    /// Tombstones the instance directly, without lifecycle hooks.
    ///
    /// Sets the timestamp (and the actor, when tracking is enabled and
    /// one was supplied) on the instance and persists via a plain save.
    pub fn soft_delete(&self, record: &mut E, options: &DestroyOptions) -> RepoResult<()> {
        apply_tombstone(record, &self.config, options, now_epoch_ms());
        save_on(self.conn, record)?;
        debug!(
            "event=soft_delete module=repo status=ok table={} id={}",
            E::TABLE,
            record.id()
        );
        Ok(())
    }

    /// The standard destroy entry point, wrapped in an immediate
    /// transaction.
    ///
    /// Runs the before-destroy hook, then either tombstones (when
    /// `soft_destroy` is configured) or physically deletes the row, then
    /// runs the after-destroy hook. Any failure rolls the transaction
    /// back, restores the instance's tombstone fields and propagates.
    pub fn destroy(&self, record: &mut E, options: &DestroyOptions) -> RepoResult<()> {
        let previous_stamp = record.deleted_at();
        let previous_actor = record.deleted_by().map(str::to_string);
        let mode = if self.config.soft_destroy { "soft" } else { "hard" };

        match self.destroy_in_tx(record, options) {
            Ok(()) => {
                debug!(
                    "event=destroy module=repo status=ok mode={mode} table={} id={}",
                    E::TABLE,
                    record.id()
                );
                Ok(())
            }
            Err(err) => {
                if self.config.soft_destroy {
                    record.set_deleted_at(previous_stamp);
                    record.set_deleted_by(previous_actor);
                }
                error!(
                    "event=destroy module=repo status=error mode={mode} table={} id={} error={err}",
                    E::TABLE,
                    record.id()
                );
                Err(err)
            }
        }
    }

    /// Clears the tombstone using the configured strategy.
    ///
    /// Both strategies leave the instance's in-memory state consistent
    /// with the persisted row.
    pub fn recover(&self, record: &mut E) -> RepoResult<()> {
        match self.config.recover_strategy {
            RecoverStrategy::ViaSave => {
                record.set_deleted_at(self.config.fresh_stamp());
                if self.config.track_deleted_by {
                    record.set_deleted_by(None);
                }
                save_on(self.conn, record)?;
            }
            RecoverStrategy::DirectUpdate => {
                self.recover_by_update(record)?;
            }
        }
        debug!(
            "event=recover module=repo status=ok table={} id={}",
            E::TABLE,
            record.id()
        );
        Ok(())
    }

    fn destroy_in_tx(&self, record: &mut E, options: &DestroyOptions) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        self.hooks.before_destroy(record, &tx)?;
        if self.config.soft_destroy {
            apply_tombstone(record, &self.config, options, now_epoch_ms());
            save_on(&tx, record)?;
        } else {
            let sql = format!(
                "DELETE FROM \"{}\" WHERE \"{}\" = ?",
                E::TABLE,
                E::PRIMARY_KEY
            );
            let changed = tx.execute(&sql, [record.id().to_string()])?;
            if changed == 0 {
                return Err(RepoError::NotFound(record.id()));
            }
        }
        self.hooks.after_destroy(record, &tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Targeted update against the unfiltered view, bypassing save.
    fn recover_by_update(&self, record: &mut E) -> RepoResult<()> {
        let mut sql = format!(
            "UPDATE \"{}\" SET \"{}\" = ?",
            E::TABLE,
            self.config.deleted_at_column
        );
        let mut binds: Vec<Value> = vec![Value::from(self.config.fresh_stamp())];
        if self.config.track_deleted_by {
            sql.push_str(&format!(", \"{}\" = ?", self.config.deleted_by_column));
            binds.push(Value::Null);
        }
        sql.push_str(&format!(" WHERE \"{}\" = ?", E::PRIMARY_KEY));
        binds.push(Value::Text(record.id().to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(binds))?;
        if changed == 0 {
            return Err(RepoError::NotFound(record.id()));
        }
        record.set_deleted_at(self.config.fresh_stamp());
        if self.config.track_deleted_by {
            record.set_deleted_by(None);
        }
        Ok(())
    }
}

fn apply_tombstone<E: Tombstoned>(
    record: &mut E,
    config: &SoftDeleteConfig,
    options: &DestroyOptions,
    stamp: i64,
) {
    record.set_deleted_at(Some(stamp));
    if config.track_deleted_by {
        if let Some(actor) = options.deleted_by.clone() {
            record.set_deleted_by(Some(actor));
        }
    }
}

fn save_on<E: Entity>(conn: &Connection, record: &E) -> RepoResult<()> {
    let values: Vec<_> = record
        .values()
        .into_iter()
        .filter(|(column, _)| *column != E::PRIMARY_KEY)
        .collect();
    let set_sql = values
        .iter()
        .map(|(column, _)| format!("\"{column}\" = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE \"{}\" SET {set_sql} WHERE \"{}\" = ?",
        E::TABLE,
        E::PRIMARY_KEY
    );
    let mut binds: Vec<Value> = values.into_iter().map(|(_, value)| value).collect();
    binds.push(Value::Text(record.id().to_string()));

    let changed = conn.execute(&sql, params_from_iter(binds))?;
    if changed == 0 {
        return Err(RepoError::NotFound(record.id()));
    }
    Ok(())
}

fn ensure_schema_ready<E: Entity>(conn: &Connection, config: &SoftDeleteConfig) -> RepoResult<()> {
    if !table_exists(conn, E::TABLE)? {
        return Err(RepoError::MissingRequiredTable(E::TABLE.to_string()));
    }

    let mut required = vec![E::PRIMARY_KEY.to_string(), config.deleted_at_column.clone()];
    if config.track_deleted_by {
        required.push(config.deleted_by_column.clone());
    }
    for column in required {
        if !table_has_column(conn, E::TABLE, &column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: E::TABLE.to_string(),
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\");"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
