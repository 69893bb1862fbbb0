//! Streamlens
//!
//! Video watch telemetry service:
//! - Watch event ingestion tied to watch sessions
//! - Time-bucketed aggregate statistics over sliding windows
//! - Per-user dashboard rollups
//! - Username/password accounts with bearer tokens

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, state::HEALTH_PROBE_INTERVAL, AppState, AuthConfig, Credentials};
use clickhouse_client::{ClickHouseClient, ClickHouseConfig, ClickHouseStore};
use memory_store::MemoryStore;
use telemetry::{init_tracing, json_from_env, TracingConfig};
use watch_core::{AccountStore, ServiceConfig, WatchServices, WatchStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    /// Allowed CORS origins; `*` allows any
    #[serde(default = "default_cors_origins")]
    cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StorageBackend {
    #[default]
    Memory,
    Clickhouse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StorageConfig {
    #[serde(default)]
    backend: StorageBackend,
    #[serde(default)]
    clickhouse: ClickHouseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogConfig {
    #[serde(default)]
    json: bool,
    #[serde(default = "default_log_filter")]
    filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: default_log_filter(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AppConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    auth: AuthConfig,
    #[serde(default)]
    service: ServiceConfig,
    #[serde(default)]
    log: LogConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = load_config()?;

    init_tracing(
        TracingConfig::new()
            .with_filter(config.log.filter.clone())
            .with_json(config.log.json),
    );

    info!("Starting Streamlens v{}", env!("CARGO_PKG_VERSION"));

    let (store, accounts) = open_store(&config.storage).await?;
    info!(backend = store.backend(), "Watch store ready");

    let services = WatchServices::new(store, config.service.clone());
    let credentials = Arc::new(
        Credentials::new(accounts, config.auth.clone()).context("Invalid auth configuration")?,
    );
    let state = AppState::new(services, credentials);

    // Check health and update status
    if !state.check_store().await {
        warn!("Store unreachable at startup, serving anyway");
    }
    let _probe = state.start_health_probe(HEALTH_PROBE_INTERVAL);
    info!("Started store health probe (every 30 seconds)");

    let app = router(state, &config.server.cors_origins);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Opens the configured backend. Both traits are served by the same store.
async fn open_store(
    storage: &StorageConfig,
) -> Result<(Arc<dyn WatchStore>, Arc<dyn AccountStore>)> {
    match storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory store, data is lost on restart");
            let store = MemoryStore::new();
            Ok((Arc::new(store.clone()), Arc::new(store)))
        }
        StorageBackend::Clickhouse => {
            let client = ClickHouseClient::new(storage.clickhouse.clone())
                .context("Failed to create ClickHouse client")?;

            if let Err(e) = clickhouse_client::init_schema(&client).await {
                error!("Failed to initialize ClickHouse schema: {}", e);
                // Continue anyway - schema might already exist
            }

            if clickhouse_client::check_connection(&client).await {
                info!("ClickHouse connection: healthy");
            } else {
                error!("ClickHouse connection: unhealthy");
            }

            let store = ClickHouseStore::new(client);
            Ok((Arc::new(store.clone()), Arc::new(store)))
        }
    }
}

/// Load configuration from files and environment.
fn load_config() -> Result<AppConfig> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&AppConfig::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables, e.g. STREAMLENS__SERVER__PORT
        .add_source(
            config::Environment::with_prefix("STREAMLENS")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for common settings
    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(secret) = std::env::var("STREAMLENS_AUTH_SECRET") {
        config.auth.secret = secret;
    }
    if let Ok(backend) = std::env::var("STREAMLENS_STORAGE_BACKEND") {
        config.storage.backend = match backend.to_ascii_lowercase().as_str() {
            "clickhouse" => StorageBackend::Clickhouse,
            _ => StorageBackend::Memory,
        };
    }
    if let Ok(url) = std::env::var("STREAMLENS_CLICKHOUSE_URL") {
        config.storage.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("STREAMLENS_CLICKHOUSE_DATABASE") {
        config.storage.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("STREAMLENS_CLICKHOUSE_USERNAME") {
        config.storage.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("STREAMLENS_CLICKHOUSE_PASSWORD") {
        config.storage.clickhouse.password = Some(password);
    }
    if let Some(json) = json_from_env() {
        config.log.json = json;
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
