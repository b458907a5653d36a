mod config_cmd;
mod scan_cmd;
mod status_cmd;
mod terminal_output;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use sanjeevani_config::{config_file_path, load_and_prepare, ServiceConfig};
use sanjeevani_core::ScanType;
use sanjeevani_gateway::{build_router, spawn_audio_sweeper, start_server, AppState};
use sanjeevani_logging::init_logger;

#[derive(Parser)]
#[command(name = "sanjeevani")]
#[command(about = "Sanjeevani: reads medicine packages and prescriptions aloud")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $SANJEEVANI_CONFIG, then ./sanjeevani.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Query a running server's health endpoint
    Status {
        /// Server base URL (defaults to localhost on the configured port)
        #[arg(long)]
        url: Option<String>,
    },
    /// Run one scan locally and print the result
    Scan {
        /// Photo of a medicine package or prescription
        image: PathBuf,
        /// medicine | prescription
        #[arg(short = 't', long = "type", default_value = "medicine")]
        scan_type: ScanType,
        /// Response language code (en, hi, ta, ...)
        #[arg(short, long, default_value = "en")]
        language: String,
        /// Write the narration audio here
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the effective config with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config_path = config_file_path(cli.config.as_deref());
    let prepared = load_and_prepare(&config_path).await?;
    let config = prepared.config;

    let _log_guard = init_logger(config.logging.dir.as_deref().map(Path::new), &config.logging.level);
    info!(path = %config_path.display(), "Config ready");
    for warning in &prepared.warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }

    match cli.command {
        Commands::Serve { port } => {
            let mut config = config;
            if let Some(port) = port {
                config.server.port = port;
            }
            run_server(config).await?;
        }
        Commands::Status { url } => {
            let base = url.unwrap_or_else(|| format!("http://localhost:{}", config.server.port));
            status_cmd::run(&base).await?;
        }
        Commands::Scan {
            image,
            scan_type,
            language,
            out,
        } => {
            scan_cmd::run(&config, &image, scan_type, &language, out.as_deref()).await?;
        }
        Commands::Config => config_cmd::run(&config)?,
    }

    Ok(())
}

async fn run_server(config: ServiceConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_address))?;

    info!(
        port = config.server.port,
        bind = %config.server.bind_address,
        db = %config.storage.db_path,
        audio_dir = %config.storage.audio_dir,
        "Starting Sanjeevani"
    );

    let state = AppState::from_config(&config).await?;
    let health = state.pipeline.provider_health();
    info!(
        vision = health.vision,
        text = health.text,
        speech = health.speech,
        "Provider wiring"
    );

    let sweeper = spawn_audio_sweeper(
        state.pipeline.clone(),
        Duration::from_secs(config.storage.transient_audio_ttl_secs),
    );

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let served = start_server(addr, app).await;
    sweeper.abort();
    served
}
