use apphost::db::services::{DbAppStore, model_app_service::ensure_schema};
use apphost::hosting::HttpHostingWorker;
use apphost::server::config::ServerConfig;
use apphost::version::VERSION;
use apphost::web::{AppState, create_axum_router};

use clap::Parser;
use sea_orm::{ConnectOptions, Database};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // JSON to a daily-rotated file, human-readable to stdout.
    let file_appender = rolling::daily(log_dir, "apphost.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal.");
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let server_config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            // Logging is configured from this config, so report straight to stderr.
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&server_config.log_dir);
    info!(version = VERSION, "Starting app host server.");

    let mut opt = ConnectOptions::new(server_config.database_url.clone());
    opt.max_connections(10).sqlx_logging(false);
    let db_pool = match Database::connect(opt).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to connect to the database.");
            return Err(e.into());
        }
    };
    ensure_schema(&db_pool).await?;

    let worker = HttpHostingWorker::new(
        server_config.hosting_worker_url.clone(),
        server_config.hosting_worker_timeout(),
    )?;
    info!(
        hosting_worker = %server_config.hosting_worker_url,
        timeout_secs = server_config.hosting_worker_timeout_secs,
        "Hosting worker client ready."
    );

    let app_state = Arc::new(AppState::new(
        Arc::new(DbAppStore::new(db_pool)),
        Arc::new(worker),
        server_config.clone(),
    ));
    let app = create_axum_router(app_state);

    let addr: SocketAddr = server_config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}
