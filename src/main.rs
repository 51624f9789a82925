//! ptero-provisioner - Main application entry point
//!
//! Serves the admin, client and guest APIs and the signed billing events
//! endpoint, driving game servers on a Pterodactyl panel.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ptero_provisioner::config::Config;
use ptero_provisioner::db::{create_pool, run_migrations};
use ptero_provisioner::handlers::{configure_routes, AppState};
use ptero_provisioner::middleware::guest_rate_limiter_config;
use ptero_provisioner::services::Provisioner;
use ptero_provisioner::store::PgStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing subscriber for structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ptero_provisioner=info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = Config::from_env().expect("Failed to load configuration");
    let server_addr = config.server_addr();

    tracing::info!("Loading configuration...");

    // Create database connection pool
    let pool = create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database connection pool created");

    // Run database migrations
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // HTTP client for Pterodactyl panel calls
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("ptero-provisioner/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.panel_request_timeout_secs))
        .build()
        .expect("Failed to create HTTP client");

    let store = Arc::new(PgStore::new(pool));
    let provisioner = Provisioner::new(store.clone(), store.clone(), store.clone(), http_client);

    let guest_limiter = guest_rate_limiter_config(config.guest_rate_limit_per_minute)
        .expect("Failed to build rate limiter configuration");

    let events_enabled = config.billing_webhook_secret.is_some();
    if !events_enabled {
        tracing::warn!("BILLING_WEBHOOK_SECRET not set - billing events endpoint disabled");
    }

    // Create shared application state
    let app_state = web::Data::new(AppState {
        provisioner,
        settings: store,
        config,
    });

    tracing::info!("Starting server at http://{}", server_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            // Request logging
            .wrap(Logger::default())
            // Distributed tracing
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(|cfg| configure_routes(cfg, &guest_limiter, events_enabled))
    })
    .bind(&server_addr)?
    .run()
    .await
}
