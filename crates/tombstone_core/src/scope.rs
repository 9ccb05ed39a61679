//! Query views over a record type's table.
//!
//! # Responsibility
//! - Derive the deleted-only, active-only and unfiltered views from the
//!   base query.
//! - Keep set-based operations (count, fetch, update, delete, bulk
//!   tombstoning) on the view they were derived from.
//!
//! # Invariants
//! - The deleted view is the exact complement of the active view, so the
//!   two always partition the unfiltered view for any sentinel.
//! - Every emitted filter qualifies its column with the table name so
//!   composition inside joins stays correct.

use crate::config::SoftDeleteConfig;
use crate::record::{now_epoch_ms, Entity, RecordId, Tombstoned};
use crate::repo::tombstone_repo::{DestroyOptions, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::marker::PhantomData;

/// Which rows a view exposes relative to the tombstone column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionView {
    /// Rows whose timestamp equals the sentinel.
    Active,
    /// Rows whose timestamp differs from the sentinel.
    Deleted,
    /// No tombstone filtering.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterOp {
    Eq,
    Ne,
}

#[derive(Debug, Clone)]
struct Filter {
    column: String,
    op: FilterOp,
    value: Value,
}

/// A filtered view over one record type's table.
///
/// Filters compose by conjunction. Equality against a NULL value is
/// emitted as `IS NULL`, inequality as `IS NOT NULL`.
pub struct Scope<'a, E: Entity + Tombstoned> {
    conn: &'a Connection,
    config: &'a SoftDeleteConfig,
    view: DeletionView,
    filters: Vec<Filter>,
    marker: PhantomData<fn() -> E>,
}

impl<'a, E: Entity + Tombstoned> Clone for Scope<'a, E> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn,
            config: self.config,
            view: self.view,
            filters: self.filters.clone(),
            marker: PhantomData,
        }
    }
}

impl<'a, E: Entity + Tombstoned> Scope<'a, E> {
    pub(crate) fn new(conn: &'a Connection, config: &'a SoftDeleteConfig, view: DeletionView) -> Self {
        Self {
            conn,
            config,
            view,
            filters: Vec::new(),
            marker: PhantomData,
        }
    }

    /// The view this scope was derived from.
    pub fn view(&self) -> DeletionView {
        self.view
    }

    /// Adds an equality filter on a qualified column.
    pub fn filter_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op: FilterOp::Eq,
            value: value.into(),
        });
        self
    }

    /// Adds an inequality filter on a qualified column.
    pub fn filter_ne(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op: FilterOp::Ne,
            value: value.into(),
        });
        self
    }

    /// Counts rows in the view.
    pub fn count(&self) -> RepoResult<u64> {
        let (where_sql, binds) = self.where_sql();
        let sql = format!("SELECT COUNT(*) FROM \"{}\"{where_sql}", E::TABLE);
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Reports whether the view contains at least one row.
    pub fn exists(&self) -> RepoResult<bool> {
        let (where_sql, binds) = self.where_sql();
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM \"{}\"{where_sql})",
            E::TABLE
        );
        let found: i64 = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(found == 1)
    }

    /// Fetches every row in the view, ordered by primary key.
    pub fn fetch_all(&self) -> RepoResult<Vec<E>> {
        let (where_sql, binds) = self.where_sql();
        let sql = format!(
            "{}{} ORDER BY {} ASC",
            self.select_sql(),
            where_sql,
            self.qualified(E::PRIMARY_KEY)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(E::from_row(row)?);
        }
        Ok(records)
    }

    /// Fetches the first row in the view, ordered by primary key.
    pub fn first(&self) -> RepoResult<Option<E>> {
        let (where_sql, binds) = self.where_sql();
        let sql = format!(
            "{}{} ORDER BY {} ASC LIMIT 1",
            self.select_sql(),
            where_sql,
            self.qualified(E::PRIMARY_KEY)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(E::from_row(row)?));
        }
        Ok(None)
    }

    /// Looks up one row in the view by identity.
    pub fn find(&self, id: RecordId) -> RepoResult<Option<E>> {
        self.clone()
            .filter_eq(E::PRIMARY_KEY, id.to_string())
            .first()
    }

    /// Applies a set-based update to every row in the view.
    ///
    /// Returns the number of rows changed.
    pub fn update_all(&self, assignments: &[(&str, Value)]) -> RepoResult<usize> {
        if assignments.is_empty() {
            return Ok(0);
        }
        let (where_sql, where_binds) = self.where_sql();
        let set_sql = assignments
            .iter()
            .map(|(column, _)| format!("\"{column}\" = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE \"{}\" SET {set_sql}{where_sql}", E::TABLE);
        let mut binds: Vec<Value> = assignments.iter().map(|(_, value)| value.clone()).collect();
        binds.extend(where_binds);
        let changed = self.conn.execute(&sql, params_from_iter(binds))?;
        Ok(changed)
    }

    /// Physically deletes every row in the view.
    ///
    /// Returns the number of rows removed. This is the host engine's
    /// set-based delete primitive, not a tombstone write.
    pub fn delete_all(&self) -> RepoResult<usize> {
        let (where_sql, binds) = self.where_sql();
        let sql = format!("DELETE FROM \"{}\"{where_sql}", E::TABLE);
        let changed = self.conn.execute(&sql, params_from_iter(binds))?;
        Ok(changed)
    }

    /// Tombstones every row in the view without loading instances.
    ///
    /// All matched rows receive the same timestamp. The actor column is
    /// written only when tracking is enabled and an actor was supplied.
    pub fn soft_delete_all(&self, options: &DestroyOptions) -> RepoResult<usize> {
        let stamp = now_epoch_ms();
        let mut assignments: Vec<(&str, Value)> = vec![(
            self.config.deleted_at_column.as_str(),
            Value::Integer(stamp),
        )];
        if self.config.track_deleted_by {
            if let Some(actor) = options.deleted_by.as_deref() {
                assignments.push((
                    self.config.deleted_by_column.as_str(),
                    Value::Text(actor.to_string()),
                ));
            }
        }
        self.update_all(&assignments)
    }

    fn qualified(&self, column: &str) -> String {
        format!("\"{}\".\"{column}\"", E::TABLE)
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM \"{}\"",
            E::select_columns().join(", "),
            E::TABLE
        )
    }

    fn tombstone_clause(&self) -> Option<String> {
        let column = self.qualified(&self.config.deleted_at_column);
        match (self.view, self.config.not_deleted_value) {
            (DeletionView::All, _) => None,
            (DeletionView::Active, None) => Some(format!("{column} IS NULL")),
            (DeletionView::Active, Some(sentinel)) => Some(format!("{column} = {sentinel}")),
            (DeletionView::Deleted, None) => Some(format!("{column} IS NOT NULL")),
            (DeletionView::Deleted, Some(sentinel)) => Some(format!(
                "({column} IS NULL OR {column} <> {sentinel})"
            )),
        }
    }

    fn where_sql(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut binds = Vec::new();
        if let Some(clause) = self.tombstone_clause() {
            clauses.push(clause);
        }
        for filter in &self.filters {
            let column = self.qualified(&filter.column);
            match (filter.op, &filter.value) {
                (FilterOp::Eq, Value::Null) => clauses.push(format!("{column} IS NULL")),
                (FilterOp::Ne, Value::Null) => clauses.push(format!("{column} IS NOT NULL")),
                (FilterOp::Eq, value) => {
                    clauses.push(format!("{column} = ?"));
                    binds.push(value.clone());
                }
                (FilterOp::Ne, value) => {
                    clauses.push(format!("{column} <> ?"));
                    binds.push(value.clone());
                }
            }
        }
        if clauses.is_empty() {
            (String::new(), binds)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), binds)
        }
    }
}
