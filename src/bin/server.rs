use anyhow::Context;
use clap::Parser;
use service_area_map::adapters::credentials::{EnvCredential, API_KEY_VAR};
use service_area_map::domain::ports::CredentialProvider;
use service_area_map::server::{serve, ServerState};
use service_area_map::utils::{logger, validation::Validate};
use service_area_map::AppConfig;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Serve the map client and hand out the ArcGIS API key")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override server.port from config
    #[arg(long)]
    port: Option<u16>,

    /// Override server.public_dir from config
    #[arg(long)]
    public_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logger::init_server_logger();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match AppConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => AppConfig::default(),
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(public_dir) = args.public_dir {
        config.server.public_dir = public_dir;
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let api_key = match config.api_key() {
        Some(key) => Some(key.trim().to_string()),
        None => match EnvCredential::default().credential().await {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!("⚠️ {} is not set, /api-key will answer 503: {}", API_KEY_VAR, e);
                None
            }
        },
    };

    let state = Arc::new(ServerState::new(api_key, &config.server));
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Server running at http://{}", addr);
    tracing::info!("📁 Serving static files from {}", config.server.public_dir);

    serve(listener, state).await?;
    Ok(())
}
