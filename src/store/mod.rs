//! Persistence seams used by the provisioner.
//!
//! The billing framework owns orders, clients and the settings table; the
//! provisioner owns `service_pterodactyl` rows. Each concern is a trait so the
//! orchestrator can run against Postgres in production and [`MemoryStore`] in
//! tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Client, NewServiceRecord, Order, ServiceRecord};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Storage for per-order service records.
#[async_trait]
pub trait ServiceStore: Send + Sync {
    /// Inserts a new `pending` record for the order. If one already exists it
    /// is returned unchanged.
    async fn create_service(&self, new: NewServiceRecord) -> Result<ServiceRecord, StoreError>;

    async fn find_service_by_order(&self, order_id: i64)
        -> Result<Option<ServiceRecord>, StoreError>;

    /// Persists status, remote identifiers, config and `updated_at`.
    async fn save_service(&self, record: &ServiceRecord) -> Result<(), StoreError>;
}

/// Read access to billing orders and clients.
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn find_order(&self, order_id: i64) -> Result<Option<Order>, StoreError>;

    async fn find_client(&self, client_id: i64) -> Result<Option<Client>, StoreError>;
}

/// String key/value settings shared with the billing framework.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_param(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_param(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
