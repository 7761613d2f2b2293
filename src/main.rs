mod config;
mod handlers;
mod history;
mod oanda;
mod state;
mod stats;
mod ui;

use crate::handlers::{
    account::get_account,
    credentials::{get_credentials, save_credentials},
    trades::{export_trades, get_trades, refresh},
};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tower_http::trace::{self, TraceLayer};
use tracing::Level;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set the log level based on the first argument
    let args: Vec<String> = std::env::args().collect();
    let mut log_level = Level::INFO;
    if args.len() >= 2 {
        log_level = match args[1].as_str() {
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .with_max_level(log_level)
        .init();

    tracing::info!("Log level set to: {}", log_level);

    // Initalize dotenv so we can read .env file
    dotenv::dotenv().ok();

    // Credentials files live next to the binary unless overridden
    let config_dir =
        PathBuf::from(dotenv::var("FXBOARD_CONFIG_DIR").unwrap_or_else(|_| ".".to_string()));
    let state = AppState::new(config_dir);

    // Build application with routes
    let app = Router::new()
        // Dashboard UI
        .route("/", get(ui::dashboard))
        // Credential routes
        .route("/api/credentials", get(get_credentials).post(save_credentials))
        // Account and trade routes
        .route("/api/account", get(get_account))
        .route("/api/trades", get(get_trades))
        .route("/api/trades/export", get(export_trades))
        .route("/api/refresh", post(refresh))
        // Shared app state
        .with_state(state)
        // CORS and tracing layers
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        );

    // Run server. The dashboard is single-user, so bind the loopback
    // interface only.
    let addr = dotenv::var("FXBOARD_ADDR").unwrap_or_else(|_| "127.0.0.1:3001".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Dashboard ready on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
