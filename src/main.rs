use slack_status_push::config::read_config;
use slack_status_push::logging::{FileLogger, setup_logging};
use slack_status_push::{AppState, StatusPush, api};
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8899";
const DEFAULT_CONFIG_PATH: &str = "notify_config.toml";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("NOTIFY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let (config, warnings) = match read_config(&config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let file_logger = config.server.log_dir.clone().map(FileLogger::new);
    let (log_buffer, _log_guard) = setup_logging(file_logger.as_ref());

    for warning in &warnings {
        warn!("{}", warning);
    }

    let bind_address = std::env::var("BIND_ADDRESS")
        .ok()
        .or_else(|| config.server.bind_address.clone())
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

    let notifier = match StatusPush::from_config(&config) {
        Ok(notifier) => notifier,
        Err(e) => {
            error!("Failed to set up notifier: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(notifier, config, log_buffer));
    let app = api::router(state);

    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}
