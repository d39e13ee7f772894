mod config;
mod dataset;
mod error;
mod network;
mod protocol;
mod session;

use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use config::{DashboardConfig, ServerSettings};
use session::manager::SessionManager;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!("Failed to read .env file: {}", e);
        }
    }

    let settings = ServerSettings::from_env();
    let config = match DashboardConfig::resolve(&settings) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    match settings.seed {
        Some(seed) => info!("Session tables seeded from base seed {}", seed),
        None => info!("Session tables seeded from entropy"),
    }

    let manager = match SessionManager::new(config.clone(), settings.seed, settings.max_sessions) {
        Ok(manager) => manager,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    let sessions = Arc::new(Mutex::new(manager));

    tokio::spawn(network::http_api::start(settings.http_addr, Arc::new(config)));

    if let Err(e) = network::server::run(settings.ws_addr, sessions).await {
        error!("Dashboard server stopped: {}", e);
        std::process::exit(1);
    }
}
