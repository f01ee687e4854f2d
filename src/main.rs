use std::sync::Arc;

use clan_bot::api::{self, AppState};
use clan_bot::commands::AppContext;
use clan_bot::config::{Config, ConfigError};
use clan_bot::db::Database;
use clan_bot::metrics;
use clan_bot::upstream::UpstreamClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            if e == ConfigError::MissingToken {
                eprintln!("Set it with: export BOT_TOKEN='your-bot-token-here'");
            }
            std::process::exit(1);
        }
    };

    metrics::register_metrics();

    let db = match Database::new(&config.database_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::error!("Failed to initialize database {}: {e}", config.database_url);
            std::process::exit(1);
        }
    };
    tracing::info!("Ledger database ready at {}", config.database_url);

    let upstream = match UpstreamClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let state = AppState::new(AppContext::new(db, upstream), &config.bot_token);
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {addr}: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!("clan-bot listening on {addr}");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}
