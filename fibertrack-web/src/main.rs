//! fibertrack-web: fiber fault tracking service
//!
//! Startup order: config file, tracing, root folder, database, router.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use fibertrack_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use fibertrack_common::db::init_database;
use fibertrack_web::{build_router, AppState};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fibertrack-web", version, about = "Fiber fault tracking service")]
struct Args {
    /// Folder holding fiberariza.db (beats FIBERTRACK_ROOT_FOLDER and the config file)
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Config file (default: <config dir>/fibertrack/config.toml)
    #[arg(long, env = "FIBERTRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing exists; its outcome is logged below
    let (config, origin) = TomlConfig::load_or_default(args.config.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting Fibertrack (fibertrack-web) v{}",
        env!("CARGO_PKG_VERSION")
    );
    origin.log();

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder)
        .with_toml(&config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState::new(pool, &config.ingest)?;
    let app = build_router(state);

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("fibertrack-web listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("fibertrack-web stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
