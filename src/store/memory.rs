//! In-memory stores for tests and local runs without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{BillingStore, ServiceStore, SettingsStore, StoreError};
use crate::models::{Client, NewServiceRecord, Order, ServiceRecord, ServiceStatus};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    services: HashMap<i64, ServiceRecord>,
    orders: HashMap<i64, Order>,
    clients: HashMap<i64, Client>,
    settings: HashMap<String, String>,
}

/// Implements every store trait over process-local maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_order(&self, order: Order) {
        self.inner.write().await.orders.insert(order.id, order);
    }

    pub async fn insert_client(&self, client: Client) {
        self.inner.write().await.clients.insert(client.id, client);
    }

    /// Number of service records held, used to assert create-once behaviour.
    pub async fn service_count(&self) -> usize {
        self.inner.read().await.services.len()
    }
}

#[async_trait]
impl ServiceStore for MemoryStore {
    async fn create_service(&self, new: NewServiceRecord) -> Result<ServiceRecord, StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.services.get(&new.order_id) {
            return Ok(existing.clone());
        }

        inner.next_id += 1;
        let now = Utc::now();
        let record = ServiceRecord {
            id: inner.next_id,
            order_id: new.order_id,
            client_id: new.client_id,
            config: new.config,
            status: ServiceStatus::Pending,
            server_id: None,
            server_identifier: None,
            created_at: now,
            updated_at: now,
        };
        inner.services.insert(record.order_id, record.clone());

        Ok(record)
    }

    async fn find_service_by_order(
        &self,
        order_id: i64,
    ) -> Result<Option<ServiceRecord>, StoreError> {
        Ok(self.inner.read().await.services.get(&order_id).cloned())
    }

    async fn save_service(&self, record: &ServiceRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.services.get_mut(&record.order_id) {
            Some(slot) if slot.id == record.id => {
                *slot = record.clone();
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("service {}", record.id))),
        }
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn find_order(&self, order_id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.read().await.orders.get(&order_id).cloned())
    }

    async fn find_client(&self, client_id: i64) -> Result<Option<Client>, StoreError> {
        Ok(self.inner.read().await.clients.get(&client_id).cloned())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_param(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.read().await.settings.get(key).cloned())
    }

    async fn set_param(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
