//! Postgres-backed stores.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{BillingStore, ServiceStore, SettingsStore, StoreError};
use crate::models::{Client, NewServiceRecord, Order, ServiceRecord, ServiceRow};

const SERVICE_COLUMNS: &str = "id, order_id, client_id, config, status, server_id, \
                               server_identifier, created_at, updated_at";

/// Stores backed by the shared billing database.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ServiceStore for PgStore {
    async fn create_service(&self, new: NewServiceRecord) -> Result<ServiceRecord, StoreError> {
        // ON CONFLICT keeps the first record; the follow-up SELECT returns it
        // whether or not this call inserted it.
        sqlx::query(
            r#"
            INSERT INTO service_pterodactyl (order_id, client_id, config, status)
            VALUES ($1, $2, $3, 'pending')
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(new.order_id)
        .bind(new.client_id)
        .bind(serde_json::Value::Object(new.config))
        .execute(&self.pool)
        .await?;

        self.find_service_by_order(new.order_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("service for order {}", new.order_id)))
    }

    async fn find_service_by_order(
        &self,
        order_id: i64,
    ) -> Result<Option<ServiceRecord>, StoreError> {
        let row: Option<ServiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM service_pterodactyl WHERE order_id = $1",
            SERVICE_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ServiceRecord::from))
    }

    async fn save_service(&self, record: &ServiceRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE service_pterodactyl
            SET config = $1,
                status = $2,
                server_id = $3,
                server_identifier = $4,
                updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(serde_json::Value::Object(record.config.clone()))
        .bind(record.status.as_str())
        .bind(record.server_id)
        .bind(&record.server_identifier)
        .bind(record.updated_at)
        .bind(record.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("service {}", record.id)));
        }

        Ok(())
    }
}

#[async_trait]
impl BillingStore for PgStore {
    async fn find_order(&self, order_id: i64) -> Result<Option<Order>, StoreError> {
        let row: Option<(i64, i64, Option<String>)> =
            sqlx::query_as("SELECT id, client_id, config FROM client_order WHERE id = $1")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, client_id, config)| Order {
            id,
            client_id,
            config: Order::parse_config(config.as_deref()),
        }))
    }

    async fn find_client(&self, client_id: i64) -> Result<Option<Client>, StoreError> {
        let client: Option<Client> =
            sqlx::query_as("SELECT id, email, first_name, last_name FROM client WHERE id = $1")
                .bind(client_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(client)
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn get_param(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT value FROM setting WHERE param = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value.flatten())
    }

    async fn set_param(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO setting (param, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (param)
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
