//! HTTP handlers for the provisioning API.
//!
//! This module contains all the route handlers:
//! - `admin` - Lifecycle actions and global panel settings (admin token)
//! - `client` - Service view, restart and password change (client token, own orders only)
//! - `guest` - Rate-limited server info and status lookups
//! - `events` - Signed billing lifecycle events
//! - `health` - Health check endpoint

pub mod admin;
pub mod client;
pub mod events;
pub mod guest;
pub mod health;

use std::sync::Arc;

use actix_web::web;

use crate::config::Config;
use crate::middleware::rate_limit::{create_guest_rate_limiter, RateLimiterConfig};
use crate::services::Provisioner;
use crate::store::SettingsStore;

// Re-export commonly used types
pub use admin::{
    admin_change_password, get_settings, provision, save_settings, suspend, unprovision,
    unsuspend, update,
};
pub use client::{change_password, get_service, restart, validate_password};
pub use events::{billing_event, BillingEvent, BillingEventData};
pub use guest::{server_info, server_status};
pub use health::{health_check, HealthResponse};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub provisioner: Provisioner,
    /// Global settings store, for the admin settings endpoints
    pub settings: Arc<dyn SettingsStore>,
    pub config: Config,
}

/// Registers every route. Called once per worker.
///
/// The billing events endpoint is only mounted when a webhook secret is
/// configured.
pub fn configure_routes(
    cfg: &mut web::ServiceConfig,
    guest_limiter: &RateLimiterConfig,
    events_enabled: bool,
) {
    cfg.route("/health", web::get().to(health_check))
        .service(
            web::scope("/api/admin/servicepterodactyl")
                .route("/provision", web::post().to(provision))
                .route("/unprovision", web::post().to(unprovision))
                .route("/suspend", web::post().to(suspend))
                .route("/unsuspend", web::post().to(unsuspend))
                .route("/update", web::post().to(update))
                .route(
                    "/change_account_password",
                    web::post().to(admin_change_password),
                )
                .route("/settings", web::get().to(get_settings))
                .route("/settings", web::post().to(save_settings)),
        )
        .service(
            web::scope("/api/client/servicepterodactyl")
                .route("/restart", web::post().to(restart))
                .route("/change_password", web::post().to(change_password))
                .route("/{order_id}", web::get().to(get_service)),
        )
        .service(
            web::scope("/api/guest/servicepterodactyl")
                .wrap(create_guest_rate_limiter(guest_limiter))
                .route("/server_info", web::get().to(server_info))
                .route("/server_status", web::get().to(server_status)),
        );

    if events_enabled {
        cfg.service(web::scope("/webhooks").route("/billing", web::post().to(billing_event)));
    }
}
