//! SQLite storage foundation for Agora.
//!
//! Provides the pooled connection factory (via `r2d2`) and the embedded,
//! versioned schema migrations. Higher-level persistence for threads,
//! messages and claims lives in `agora-threads`.
//!
//! Connections are opened in WAL mode with foreign keys enforced. Thread and
//! message rows are small and written one at a time, so a single SQLite file
//! with many readers and one writer is enough for a facilitation server.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
