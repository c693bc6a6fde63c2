use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use pbl_tracker::{
    build_identity_provider, build_router, init_telemetry, shutdown_telemetry,
    wait_for_shutdown_signal, AppState, EnvironmentReport, PblConfig, ShutdownCoordinator,
    SqliteStore,
};

#[derive(Parser)]
#[command(name = "pbl-tracker")]
#[command(about = "Project-based learning tracker service")]
#[command(long_about = "Tracks learning projects through six fixed stages. Run without a \
                       subcommand (or with 'serve') to start the HTTP API.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (default)
    Serve {
        /// Override the configured bind address
        #[arg(long, help = "Address to listen on, e.g. 127.0.0.1:3000")]
        bind: Option<String>,
    },
    /// Report which required settings are present; fails if any are missing
    CheckEnv,
    /// Create or upgrade the database schema, then exit
    Migrate,
    /// Write the effective configuration as TOML
    WriteConfig {
        /// Destination file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    PblConfig::load_env_file()?;
    let config = PblConfig::load().context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            tokio::runtime::Runtime::new()?.block_on(async { serve(config, bind).await })
        }
        Commands::CheckEnv => check_env(&config),
        Commands::Migrate => {
            tokio::runtime::Runtime::new()?.block_on(async { migrate(config).await })
        }
        Commands::WriteConfig { path } => {
            config.save_to_file(&path)?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
    }
}

async fn serve(mut config: PblConfig, bind: Option<String>) -> Result<()> {
    init_telemetry(&config.observability)?;

    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }

    info!("Starting PBL tracker");
    EnvironmentReport::from_config(&config).log();

    let store = SqliteStore::connect(&config.database)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    let identity = build_identity_provider(&config.identity)?;

    let state = AppState::new(Arc::new(store.clone()), identity)
        .with_metrics_enabled(config.observability.metrics_enabled)
        .with_max_body_bytes(config.server.max_body_bytes);
    let metrics = state.metrics.clone();
    let app = build_router(state);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("pbl-tracker listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("server failed")?;

    ShutdownCoordinator::new(store, metrics)
        .shutdown_all_services()
        .await?;
    shutdown_telemetry();
    Ok(())
}

async fn migrate(mut config: PblConfig) -> Result<()> {
    init_telemetry(&config.observability)?;
    config.database.auto_migrate = true;

    let store = SqliteStore::connect(&config.database).await?;
    info!("Database at {} is up to date", config.database.url);
    store.shutdown().await;
    Ok(())
}

fn check_env(config: &PblConfig) -> Result<()> {
    let report = EnvironmentReport::from_config(config);
    print!("{}", report.render());

    let missing = report.missing_required();
    if missing.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("missing required settings: {}", missing.join(", "))
    }
}
