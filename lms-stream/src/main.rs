//! lms-stream - text-stream delivery service
//!
//! Serves word-by-word module content and per-student reading progress.

use anyhow::{Context, Result};
use clap::Parser;
use lms_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use lms_common::events::EventBus;
use lms_stream::stream::PresentationHosts;
use lms_stream::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Events buffered per slow SSE subscriber
const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "lms-stream", version, about = "Text-stream module delivery service")]
struct Args {
    /// Root folder holding lms.db and uploads
    #[arg(short, long, env = "LMS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// HTTP port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address (overrides config)
    #[arg(long)]
    bind: Option<String>,
}

fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let startup = lms_common::time::now();
    let args = Args::parse();

    let resolver = RootFolderResolver::new("lms-stream").with_cli_arg(args.root_folder);
    // Logged once tracing is initialized
    let (mut config, config_error) = match resolver.load_config() {
        Ok(config) => (config, None),
        Err(e) => (TomlConfig::default(), Some(e)),
    };
    if args.port.is_some() {
        config.port = args.port;
    }
    if args.bind.is_some() {
        config.bind_address = args.bind;
    }

    init_tracing(&config)?;

    // Log build identification immediately after tracing init
    info!(
        "Starting lms-stream v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if let Some(e) = config_error {
        warn!("{}; using defaults", e);
    }

    let root_folder = resolver.resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    let pool = lms_common::db::init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let uploads_dir = config.uploads_dir_for(initializer.root_folder());
    std::fs::create_dir_all(&uploads_dir)
        .with_context(|| format!("Failed to create uploads directory {}", uploads_dir.display()))?;
    info!("Uploads directory: {}", uploads_dir.display());

    let legacy_root = std::env::current_dir().context("Failed to read working directory")?;
    let hosts = PresentationHosts::new(&config.presentation_hosts);

    let state = AppState::new(
        pool,
        EventBus::new(EVENT_BUS_CAPACITY),
        uploads_dir,
        legacy_root,
        hosts,
    );
    let app = build_router(state);

    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;
    info!("lms-stream listening on http://{}", address);
    info!("Health check: http://{}/health", address);
    info!("Startup took {} ms", lms_common::time::elapsed_ms(startup));

    axum::serve(listener, app).await?;

    Ok(())
}
