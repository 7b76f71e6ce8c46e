//! Embedded schema migrations.
//!
//! Each migration is a SQL file compiled into the binary and applied at most
//! once, in order. Applied names are recorded in `_agora_migrations`; a
//! migration and its tracking row commit in the same transaction.

use rusqlite::Connection;
use thiserror::Error;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// Append-only. Never edit a migration that has shipped.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "000_threads",
        sql: include_str!("migrations/000_threads.sql"),
    },
    Migration {
        name: "001_messages",
        sql: include_str!("migrations/001_messages.sql"),
    },
    Migration {
        name: "002_claims",
        sql: include_str!("migrations/002_claims.sql"),
    },
];

/// Errors raised while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        name: String,
        source: rusqlite::Error,
    },

    #[error("failed to check migration state: {0}")]
    StateQuery(rusqlite::Error),
}

/// Applies every pending migration and returns how many ran.
///
/// # Errors
///
/// Returns `MigrationError` if a migration fails (its changes are rolled
/// back) or the tracking table cannot be read.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply(conn, MIGRATIONS)
}

fn apply(conn: &Connection, migrations: &[Migration]) -> Result<usize, MigrationError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _agora_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|source| MigrationError::ExecutionFailed {
        name: "_agora_migrations".to_string(),
        source,
    })?;

    let mut applied = 0;
    for migration in migrations {
        let done: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM _agora_migrations WHERE name = ?1)",
                [migration.name],
                |row| row.get(0),
            )
            .map_err(MigrationError::StateQuery)?;
        if done {
            tracing::debug!(migration = migration.name, "migration already applied");
            continue;
        }

        tracing::info!(migration = migration.name, "applying migration");
        apply_one(conn, migration).map_err(|source| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source,
        })?;
        applied += 1;
    }

    Ok(applied)
}

fn apply_one(conn: &Connection, migration: &Migration) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO _agora_migrations (name) VALUES (?1)",
        [migration.name],
    )?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [name],
            |row| row.get(0),
        )
        .expect("should query sqlite_master")
    }

    #[test]
    fn fresh_database_gets_every_table() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        let applied = run_migrations(&conn).expect("migrations should succeed");
        assert_eq!(applied, MIGRATIONS.len());

        for table in ["threads", "messages", "claims", "_agora_migrations"] {
            assert!(table_exists(&conn, table), "{table} should exist");
        }
    }

    #[test]
    fn second_run_is_a_no_op() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        run_migrations(&conn).expect("first run should succeed");
        let second = run_migrations(&conn).expect("second run should succeed");
        assert_eq!(second, 0);
    }

    #[test]
    fn failed_migration_leaves_no_side_effects() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        let broken = [Migration {
            name: "900_broken",
            sql: "CREATE TABLE half_done (id INTEGER PRIMARY KEY);
                  INSERT INTO missing_table VALUES (1);",
        }];

        let err = apply(&conn, &broken).expect_err("broken migration should fail");
        match err {
            MigrationError::ExecutionFailed { name, .. } => assert_eq!(name, "900_broken"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!table_exists(&conn, "half_done"));
    }

    #[test]
    fn message_kind_is_constrained() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        run_migrations(&conn).expect("migrations should succeed");
        conn.execute(
            "INSERT INTO threads (thread_id, title) VALUES ('t-1', 'Test')",
            [],
        )
        .expect("should insert thread");

        let result = conn.execute(
            "INSERT INTO messages (thread_id, message_id, author_id, author_name, kind, content)
             VALUES ('t-1', 'm-1', 'u-1', 'Ann', 'llm_poem', 'hi')",
            [],
        );
        assert!(result.is_err(), "unknown message kinds must be rejected");
    }
}
