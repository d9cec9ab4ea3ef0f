//! Storage layer.
//!
//! `SQLite`-backed persistence for users, sub-roles, forms, questions,
//! responses and answers. One connection, guarded by a mutex; multi-row
//! mutations run inside a transaction.

pub mod forms;
pub mod migrations;
pub mod responses;
pub mod schema;
pub mod sub_roles;
pub mod users;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::models::{AppError, AppResult};

/// Storage engine.
#[derive(Debug)]
pub struct Store {
    /// Path to the database file.
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories if needed and initializes the schema.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path)?;

        // WAL for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::prepare(&conn)?;

        info!("🗄️ Database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    fn prepare(conn: &Connection) -> AppResult<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::initialize_schema(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::storage("database connection lock poisoned"))
    }

    /// Row count of a table, optionally filtered by one column.
    pub(crate) fn count_where(
        &self,
        table: &str,
        filter: Option<(&str, &str)>,
    ) -> AppResult<i64> {
        let conn = self.conn()?;
        let count = match filter {
            Some((column, value)) => conn.query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?1"),
                [value],
                |row| row.get(0),
            )?,
            None => conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?,
        };
        Ok(count)
    }
}

// ============================================
// Column helpers
// ============================================

pub(crate) fn to_timestamp(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

pub(crate) fn from_timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Wrap a decode failure so it surfaces as a rusqlite row error
pub(crate) fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
