//! ptero-provisioner - Pterodactyl game-server provisioning for billing orders
//!
//! Billing lifecycle events (created, activated, suspended, cancelled,
//! deleted, ...) are turned into Pterodactyl panel API calls, and the
//! per-order server state is kept in a `service_pterodactyl` record.
//!
//! # Modules
//!
//! - [`config`] - Application configuration from environment variables
//! - [`db`] - Database connection pool and migrations
//! - [`error`] - Unified error handling
//! - [`models`] - Service records, billing entities and request bodies
//! - [`store`] - Persistence traits with Postgres and in-memory implementations
//! - [`services`] - Panel client, resolvers and the lifecycle orchestrator
//! - [`handlers`] - HTTP route handlers
//! - [`middleware`] - Authentication and rate limiting middleware
//!
//! # Quick Start
//!
//! ```ignore
//! use ptero_provisioner::{Config, create_pool, run_migrations, AppState, Provisioner};
//! use ptero_provisioner::handlers::configure_routes;
//! use ptero_provisioner::store::PgStore;
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

// Re-export commonly used types at the crate root
pub use config::{Config, ConfigError};
pub use db::{create_pool, run_migrations};
pub use error::{AppError, AppResult};
pub use handlers::AppState;
pub use models::{Client, Order, ServiceRecord, ServiceStatus, ServiceView};
pub use services::{
    Claims, ConfigurationError, PanelApiError, PanelConfig, Provisioner, ProvisioningError, Role,
};
pub use store::{MemoryStore, PgStore, StoreError};
