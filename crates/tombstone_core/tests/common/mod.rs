//! Shared fixtures for tombstone integration tests.
#![allow(dead_code)]

use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use tombstone_core::db::migrations::Migration;
use tombstone_core::db::open_db_in_memory;
use tombstone_core::{Entity, RecordId, RepoError, RepoResult, SoftDeleteConfig, Tombstoned};
use uuid::Uuid;

pub const CONTACT_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: "CREATE TABLE contacts (
        uuid TEXT PRIMARY KEY NOT NULL,
        email TEXT NOT NULL,
        display_name TEXT NOT NULL,
        deleted_at INTEGER,
        deleted_by TEXT
    );",
}];

pub const BOOKMARK_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: "CREATE TABLE bookmarks (
        uuid TEXT PRIMARY KEY NOT NULL,
        url TEXT NOT NULL,
        deleted_at INTEGER
    );",
}];

/// Contact record with actor-capable tombstone columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub uuid: RecordId,
    pub email: String,
    pub display_name: String,
    pub deleted_at: Option<i64>,
    pub deleted_by: Option<String>,
}

impl Contact {
    pub fn new(config: &SoftDeleteConfig, email: &str, display_name: &str) -> Self {
        Self::with_id(Uuid::new_v4(), config, email, display_name)
    }

    pub fn with_id(
        uuid: RecordId,
        config: &SoftDeleteConfig,
        email: &str,
        display_name: &str,
    ) -> Self {
        Self {
            uuid,
            email: email.to_string(),
            display_name: display_name.to_string(),
            deleted_at: config.fresh_stamp(),
            deleted_by: None,
        }
    }
}

impl Entity for Contact {
    const TABLE: &'static str = "contacts";

    fn select_columns() -> &'static [&'static str] {
        &["uuid", "email", "display_name", "deleted_at", "deleted_by"]
    }

    fn id(&self) -> RecordId {
        self.uuid
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let uuid_text: String = row.get("uuid")?;
        let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
            RepoError::InvalidData(format!("invalid uuid `{uuid_text}` in contacts.uuid"))
        })?;
        Ok(Self {
            uuid,
            email: row.get("email")?,
            display_name: row.get("display_name")?,
            deleted_at: row.get("deleted_at")?,
            deleted_by: row.get("deleted_by")?,
        })
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("uuid", Value::Text(self.uuid.to_string())),
            ("email", Value::Text(self.email.clone())),
            ("display_name", Value::Text(self.display_name.clone())),
            ("deleted_at", Value::from(self.deleted_at)),
            ("deleted_by", Value::from(self.deleted_by.clone())),
        ]
    }
}

impl Tombstoned for Contact {
    fn deleted_at(&self) -> Option<i64> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, stamp: Option<i64>) {
        self.deleted_at = stamp;
    }

    fn deleted_by(&self) -> Option<&str> {
        self.deleted_by.as_deref()
    }

    fn set_deleted_by(&mut self, actor: Option<String>) {
        self.deleted_by = actor;
    }
}

/// Bookmark record without an actor column, exercising the defaulted
/// actor accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub uuid: RecordId,
    pub url: String,
    pub deleted_at: Option<i64>,
}

impl Bookmark {
    pub fn new(config: &SoftDeleteConfig, url: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            url: url.to_string(),
            deleted_at: config.fresh_stamp(),
        }
    }
}

impl Entity for Bookmark {
    const TABLE: &'static str = "bookmarks";

    fn select_columns() -> &'static [&'static str] {
        &["uuid", "url", "deleted_at"]
    }

    fn id(&self) -> RecordId {
        self.uuid
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let uuid_text: String = row.get("uuid")?;
        let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
            RepoError::InvalidData(format!("invalid uuid `{uuid_text}` in bookmarks.uuid"))
        })?;
        Ok(Self {
            uuid,
            url: row.get("url")?,
            deleted_at: row.get("deleted_at")?,
        })
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("uuid", Value::Text(self.uuid.to_string())),
            ("url", Value::Text(self.url.clone())),
            ("deleted_at", Value::from(self.deleted_at)),
        ]
    }
}

impl Tombstoned for Bookmark {
    fn deleted_at(&self) -> Option<i64> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, stamp: Option<i64>) {
        self.deleted_at = stamp;
    }
}

pub fn contact_db() -> Connection {
    open_db_in_memory(CONTACT_MIGRATIONS).unwrap()
}

pub fn bookmark_db() -> Connection {
    open_db_in_memory(BOOKMARK_MIGRATIONS).unwrap()
}

pub fn fixed_id(suffix: u32) -> RecordId {
    Uuid::parse_str(&format!("00000000-0000-4000-8000-{suffix:012}")).unwrap()
}
