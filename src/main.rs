use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use votemonitor_stats::{
    AppState, build_app,
    config::AppConfig,
    db::DbPool,
    observability::{self, metrics},
};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "votemonitor-stats.toml";

/// CLI arguments for the statistics service
#[derive(Parser, Debug)]
#[command(version, about = "Vote monitor statistics service", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./votemonitor-stats.toml if it exists,
    /// otherwise built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Run database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(args.config).await,
        Command::Migrate => run_migrate(args.config).await,
    }
}

/// Load the config or exit with a readable message.
fn load_config(explicit: Option<PathBuf>) -> AppConfig {
    let path = explicit.or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    });

    let Some(path) = path else {
        return AppConfig::default();
    };

    match AppConfig::from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn init_observability(config: &AppConfig) {
    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Failed to initialize tracing: {e}");
        std::process::exit(1);
    }
    if let Err(e) = metrics::init_metrics(&config.observability.metrics) {
        tracing::error!(error = %e, "Failed to initialize metrics");
        std::process::exit(1);
    }
}

async fn run_server(config_path: Option<PathBuf>) {
    let config = load_config(config_path);
    init_observability(&config);
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    let state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            std::process::exit(1);
        }
    };

    let shutdown = state.shutdown.clone();
    let app = build_app(&config, state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on http://{}", bind_addr);

    let grace = Duration::from_secs(config.server.shutdown_timeout_secs);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone(), grace))
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    shutdown.cancel();
    tracing::info!("Shutdown complete");
}

/// Resolve on SIGINT/SIGTERM. In-flight statistics queries get `grace` to
/// finish before their tokens are cancelled.
async fn shutdown_signal(shutdown: CancellationToken, grace: Duration) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(
        grace_secs = grace.as_secs(),
        "Shutdown signal received, draining in-flight requests"
    );

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        if !shutdown.is_cancelled() {
            tracing::warn!("Grace period elapsed, cancelling in-flight statistics queries");
            shutdown.cancel();
        }
    });
}

async fn run_migrate(config_path: Option<PathBuf>) {
    let config = load_config(config_path);
    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Failed to initialize tracing: {e}");
    }
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    if config.database.is_none() {
        eprintln!("Error: Database is not configured. Nothing to migrate.");
        std::process::exit(1);
    }

    let pool = match DbPool::from_config(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    match pool.run_migrations().await {
        Ok(()) => tracing::info!("Database migrations completed successfully"),
        Err(e) => {
            tracing::error!(error = %e, "Database migrations failed");
            eprintln!("Error: Database migrations failed: {e}");
            std::process::exit(1);
        }
    }
}
