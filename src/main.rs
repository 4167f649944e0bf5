use log::{error, info};
use service::{config::Config, logging::Logger, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!("Starting webhook relay [{}]...", config.runtime_env());

    let relay_queue = match service::init_relay_queue(&config) {
        Ok(queue) => Arc::new(queue),
        Err(e) => {
            error!("Failed to create relay queue: {e}");
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(config, &relay_queue);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
