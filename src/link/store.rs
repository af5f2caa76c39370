use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::link::error::StoreError;
use crate::link::types::LinkRecord;

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: lookup by identifier for installed-package listings
    &["CREATE INDEX IF NOT EXISTS idx_links_identifier ON links(identifier)"],
];

const RECORD_COLUMNS: &str = "owner, anchor_name, identifier, source_file, object_name, backing_path, host_ref, linked_at";

/// Trait over the document's table of external references
#[cfg_attr(test, automock)]
pub trait LinkStore: Send + Sync + 'static {
    /// All records of `owner`, ordered by anchor name
    fn records(&self, owner: &str) -> Result<Vec<LinkRecord>, StoreError>;

    /// Distinct owners starting with `prefix`
    fn owners(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// The record occupying `anchor_name` for `owner`
    fn get(&self, owner: &str, anchor_name: &str) -> Result<Option<LinkRecord>, StoreError>;

    /// Insert a record or replace the one in the same anchor slot
    fn upsert(&self, record: &LinkRecord) -> Result<(), StoreError>;

    /// Remove a record; returns whether a row was deleted
    fn remove(&self, owner: &str, anchor_name: &str) -> Result<bool, StoreError>;
}

/// Link table persisted in SQLite next to the document
pub struct SqliteLinkStore {
    conn: Mutex<Connection>,
}

impl SqliteLinkStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        info!("Opening link table at {:?}", db_path);

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        debug!("Creating link table schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                anchor_name TEXT NOT NULL,
                identifier TEXT NOT NULL,
                source_file TEXT NOT NULL,
                object_name TEXT NOT NULL,
                backing_path TEXT NOT NULL,
                host_ref TEXT NOT NULL,
                linked_at INTEGER NOT NULL,
                UNIQUE(owner, anchor_name)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_links_owner ON links(owner)",
            [],
        )?;

        Self::apply_migrations(&conn)?;

        debug!("Link table schema ready");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    conn.execute(sql, [])?;
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<(LinkRecordRow, i64)> {
        Ok((
            LinkRecordRow {
                owner: row.get(0)?,
                anchor_name: row.get(1)?,
                identifier: row.get(2)?,
                source_file: row.get(3)?,
                object_name: row.get(4)?,
                backing_path: row.get(5)?,
                host_ref: row.get(6)?,
            },
            row.get(7)?,
        ))
    }
}

/// Text columns of a row before the timestamp is validated
struct LinkRecordRow {
    owner: String,
    anchor_name: String,
    identifier: String,
    source_file: String,
    object_name: String,
    backing_path: String,
    host_ref: String,
}

impl LinkRecordRow {
    fn into_record(self, linked_at_ms: i64) -> Result<LinkRecord, StoreError> {
        let linked_at = DateTime::<Utc>::from_timestamp_millis(linked_at_ms)
            .ok_or_else(|| StoreError::InvalidTimestamp(linked_at_ms.to_string()))?;
        Ok(LinkRecord {
            owner: self.owner,
            anchor_name: self.anchor_name,
            identifier: self.identifier,
            source_file: self.source_file,
            object_name: self.object_name,
            backing_path: self.backing_path,
            host_ref: self.host_ref,
            linked_at,
        })
    }
}

impl LinkStore for SqliteLinkStore {
    fn records(&self, owner: &str) -> Result<Vec<LinkRecord>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM links WHERE owner = ?1 ORDER BY anchor_name"
        ))?;

        let rows = stmt
            .query_map([owner], Self::read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(row, linked_at)| row.into_record(linked_at))
            .collect()
    }

    fn owners(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT owner FROM links
            WHERE substr(owner, 1, length(?1)) = ?1
            ORDER BY owner
            "#,
        )?;

        let owners = stmt
            .query_map([prefix], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(owners)
    }

    fn get(&self, owner: &str, anchor_name: &str) -> Result<Option<LinkRecord>, StoreError> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM links WHERE owner = ?1 AND anchor_name = ?2"
                ),
                (owner, anchor_name),
                Self::read_row,
            )
            .optional()?;

        row.map(|(row, linked_at)| row.into_record(linked_at))
            .transpose()
    }

    fn upsert(&self, record: &LinkRecord) -> Result<(), StoreError> {
        debug!(
            "Saving link {}/{} -> {} ({})",
            record.owner, record.anchor_name, record.identifier, record.backing_path
        );

        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO links (owner, anchor_name, identifier, source_file, object_name, backing_path, host_ref, linked_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(owner, anchor_name) DO UPDATE SET
                identifier = excluded.identifier,
                source_file = excluded.source_file,
                object_name = excluded.object_name,
                backing_path = excluded.backing_path,
                host_ref = excluded.host_ref,
                linked_at = excluded.linked_at
            "#,
            (
                &record.owner,
                &record.anchor_name,
                &record.identifier,
                &record.source_file,
                &record.object_name,
                &record.backing_path,
                &record.host_ref,
                record.linked_at.timestamp_millis(),
            ),
        )?;

        Ok(())
    }

    fn remove(&self, owner: &str, anchor_name: &str) -> Result<bool, StoreError> {
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            "DELETE FROM links WHERE owner = ?1 AND anchor_name = ?2",
            (owner, anchor_name),
        )?;
        Ok(rows > 0)
    }
}
