//! Pooled SQLite connections.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Connection tunables, normally taken from the `[database]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a writer waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
    /// Upper bound on pooled connections.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// Shared pool handed to every storage call.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors raised while building the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Applies per-connection pragmas.
///
/// In-memory databases report `memory` for the journal mode, which is
/// accepted alongside `wal`.
fn init_connection(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    if journal_mode != "wal" && journal_mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal mode stayed at '{journal_mode}', expected wal")),
        ));
    }
    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = {busy_timeout_ms};"
    ))
}

/// Opens a pool over the SQLite file at `db_path`, creating it if needed.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if no connection can be established.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let busy_timeout_ms = settings.busy_timeout_ms;

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| init_connection(conn, busy_timeout_ms));

    Ok(Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?)
}
