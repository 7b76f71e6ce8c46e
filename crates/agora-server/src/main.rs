//! `agora-server [CONFIG_PATH]`: serves the facilitation API until SIGINT or
//! SIGTERM.

use std::net::SocketAddr;
use std::process::ExitCode;

use agora_db::{DbPool, DbRuntimeSettings, MigrationError, PoolError};
use agora_server::config::{self, ConfigError, DatabaseConfig, LoggingConfig};
use agora_server::{app, AppState, StartupError};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum LaunchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot open database: {0}")]
    Pool(#[from] PoolError),
    #[error("cannot check out a database connection: {0}")]
    Connection(#[from] r2d2::Error),
    #[error("database migration failed: {0}")]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server stopped with an error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The subscriber may not be installed yet.
            eprintln!("agora-server: {e}");
            tracing::error!(error = %e, "agora server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), LaunchError> {
    let path = config::config_path(
        std::env::args().nth(1),
        std::env::var("AGORA_CONFIG_PATH").ok(),
    );
    let config = config::load_config(Some(&path))?;
    init_tracing(&config.logging);
    tracing::info!(path = %path, "configuration loaded");
    tracing::debug!(?config, "effective configuration");

    let pool = open_database(&config.database)?;
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let router = app(AppState::from_config(pool, &config)?);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| LaunchError::Bind { addr, source })?;
    tracing::info!(%addr, "agora server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(LaunchError::Serve)?;
    tracing::info!("agora server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Opens the pool and brings the schema up to date.
fn open_database(database: &DatabaseConfig) -> Result<DbPool, LaunchError> {
    let pool = agora_db::create_pool(
        &database.path,
        DbRuntimeSettings {
            busy_timeout_ms: database.busy_timeout_ms,
            pool_max_size: database.pool_max_size,
        },
    )?;
    let applied = agora_db::run_migrations(&*pool.get()?)?;
    tracing::info!(path = %database.path, migrations_applied = applied, "database ready");
    Ok(pool)
}

/// Resolves on SIGINT or SIGTERM. A signal that cannot be installed is
/// logged and never fires.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "SIGINT handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("SIGINT received, draining connections"),
        () = terminate => tracing::info!("SIGTERM received, draining connections"),
    }
}
