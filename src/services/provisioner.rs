//! Lifecycle orchestration for game-server services.
//!
//! Every billing action maps to one method here. A method loads the service
//! record, resolves the panel configuration from the record's stored order
//! config, runs the remote calls in sequence and only then persists the new
//! state. A failure at any step leaves the stored record as it was.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{NewServiceRecord, PasswordChange, ServiceRecord, ServiceStatus, ServiceView};
use crate::services::panel::{PanelApiError, PanelClient, UserPayload};
use crate::services::panel_config::{ConfigurationError, PanelConfig, PanelConfigResolver};
use crate::services::resolvers::{
    build_server_payload, find_or_create_allocation, find_or_create_user, generate_username,
    get_egg_info, ResolveError, ServerOptions, ServerResources,
};
use crate::store::{BillingStore, ServiceStore, SettingsStore, StoreError};

/// A lifecycle operation failed. Displays as `Failed to <action>: <cause>`.
#[derive(Debug, Error)]
#[error("Failed to {action}: {failure}")]
pub struct ProvisioningError {
    pub action: &'static str,
    #[source]
    pub failure: ProvisioningFailure,
}

#[derive(Debug, Error)]
pub enum ProvisioningFailure {
    #[error(transparent)]
    Config(#[from] ConfigurationError),

    #[error(transparent)]
    Panel(#[from] PanelApiError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Order {0} does not exist")]
    OrderNotFound(i64),

    #[error("No service found for order {0}")]
    ServiceNotFound(i64),

    #[error("Client not found")]
    ClientNotFound,

    #[error("Server not provisioned")]
    NotProvisioned,

    #[error("Password is required")]
    MissingPassword,

    #[error("service has been deleted")]
    Deleted,
}

fn failed(action: &'static str, order_id: i64) -> impl FnOnce(ProvisioningFailure) -> ProvisioningError {
    move |failure| {
        tracing::error!(order_id, "Failed to {}: {}", action, failure);
        ProvisioningError { action, failure }
    }
}

type Step<T> = Result<T, ProvisioningFailure>;

/// Drives service records through `pending -> active <-> suspended -> deleted`.
#[derive(Clone)]
pub struct Provisioner {
    services: Arc<dyn ServiceStore>,
    billing: Arc<dyn BillingStore>,
    resolver: PanelConfigResolver,
    http: reqwest::Client,
}

impl Provisioner {
    pub fn new(
        services: Arc<dyn ServiceStore>,
        billing: Arc<dyn BillingStore>,
        settings: Arc<dyn SettingsStore>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            services,
            billing,
            resolver: PanelConfigResolver::new(settings),
            http,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Dispenses the service record for an order. Calling it again for the
    /// same order returns the existing record.
    pub async fn create(&self, order_id: i64) -> Result<ServiceRecord, ProvisioningError> {
        self.create_record(order_id)
            .await
            .map_err(failed("create service", order_id))
    }

    async fn create_record(&self, order_id: i64) -> Step<ServiceRecord> {
        let order = self
            .billing
            .find_order(order_id)
            .await?
            .ok_or(ProvisioningFailure::OrderNotFound(order_id))?;

        let record = self
            .services
            .create_service(NewServiceRecord {
                order_id: order.id,
                client_id: order.client_id,
                config: order.config,
            })
            .await?;

        tracing::info!(order_id, service_id = record.id, status = %record.status, "Service record ready");
        Ok(record)
    }

    pub async fn activate(&self, order_id: i64) -> Result<ServiceRecord, ProvisioningError> {
        self.provision(order_id).await
    }

    /// Creates the server on the panel. A record that already has a server is
    /// returned unchanged.
    pub async fn provision(&self, order_id: i64) -> Result<ServiceRecord, ProvisioningError> {
        self.provision_record(order_id)
            .await
            .map_err(failed("provision server", order_id))
    }

    async fn provision_record(&self, order_id: i64) -> Step<ServiceRecord> {
        let mut record = self.load_live(order_id).await?;
        if record.is_provisioned() {
            tracing::info!(order_id, server_id = ?record.server_id, "Server already provisioned");
            return Ok(record);
        }

        let (panel_config, panel) = self.panel_for(&record.config).await?;
        let client = self
            .billing
            .find_client(record.client_id)
            .await?
            .ok_or(ProvisioningFailure::ClientNotFound)?;
        let options = ServerOptions::from_config(&record.config);

        let user_id = find_or_create_user(&panel, client.email_or_fallback(), &client).await?;
        let allocation_id = find_or_create_allocation(&panel, options.node_id(&panel_config)).await?;
        let egg = get_egg_info(&panel, options.egg_id(&panel_config)).await?;

        let payload = build_server_payload(
            &options,
            &panel_config,
            &ServerResources {
                user_id,
                allocation_id,
                egg,
            },
        );
        let created = panel.create_server(&payload).await?;

        record.mark_active(created.id, created.identifier);
        self.services.save_service(&record).await?;

        tracing::info!(
            order_id,
            server_id = created.id,
            server_identifier = ?record.server_identifier,
            "Server provisioned"
        );
        Ok(record)
    }

    /// Suspends the server when one exists. Orders suspended before
    /// provisioning still move to `suspended`.
    pub async fn suspend(&self, order_id: i64) -> Result<ServiceRecord, ProvisioningError> {
        self.suspend_record(order_id)
            .await
            .map_err(failed("suspend server", order_id))
    }

    async fn suspend_record(&self, order_id: i64) -> Step<ServiceRecord> {
        let mut record = self.load_live(order_id).await?;

        if let Some(server_id) = record.server_id {
            let (_, panel) = self.panel_for(&record.config).await?;
            panel.suspend_server(server_id).await?;
        }

        record.mark_suspended();
        self.services.save_service(&record).await?;

        tracing::info!(order_id, server_id = ?record.server_id, "Service suspended");
        Ok(record)
    }

    /// Unsuspends the server when one exists. A record without a server goes
    /// back to `pending`.
    pub async fn unsuspend(&self, order_id: i64) -> Result<ServiceRecord, ProvisioningError> {
        self.unsuspend_record(order_id)
            .await
            .map_err(failed("unsuspend server", order_id))
    }

    async fn unsuspend_record(&self, order_id: i64) -> Step<ServiceRecord> {
        let mut record = self.load_live(order_id).await?;

        if let Some(server_id) = record.server_id {
            let (_, panel) = self.panel_for(&record.config).await?;
            panel.unsuspend_server(server_id).await?;
        }

        record.mark_unsuspended();
        self.services.save_service(&record).await?;

        tracing::info!(order_id, server_id = ?record.server_id, "Service unsuspended");
        Ok(record)
    }

    pub async fn cancel(&self, order_id: i64) -> Result<ServiceRecord, ProvisioningError> {
        self.suspend(order_id).await
    }

    pub async fn uncancel(&self, order_id: i64) -> Result<ServiceRecord, ProvisioningError> {
        self.unsuspend(order_id).await
    }

    /// Deletes the server and marks the record `deleted`. Already-deleted
    /// records are returned as they are.
    pub async fn unprovision(&self, order_id: i64) -> Result<ServiceRecord, ProvisioningError> {
        self.unprovision_record(order_id)
            .await
            .map_err(failed("unprovision server", order_id))
    }

    async fn unprovision_record(&self, order_id: i64) -> Step<ServiceRecord> {
        let mut record = self.load(order_id).await?;
        if record.status == ServiceStatus::Deleted {
            tracing::debug!(order_id, "Service already deleted");
            return Ok(record);
        }

        if let Some(server_id) = record.server_id {
            let (_, panel) = self.panel_for(&record.config).await?;
            panel.delete_server(server_id).await?;
        }

        record.mark_deleted();
        self.services.save_service(&record).await?;

        tracing::info!(order_id, "Service deleted");
        Ok(record)
    }

    pub async fn delete(&self, order_id: i64) -> Result<ServiceRecord, ProvisioningError> {
        self.unprovision(order_id).await
    }

    // =========================================================================
    // Server actions
    // =========================================================================

    pub async fn restart(&self, order_id: i64) -> Result<(), ProvisioningError> {
        self.restart_server(order_id)
            .await
            .map_err(failed("restart server", order_id))
    }

    async fn restart_server(&self, order_id: i64) -> Step<()> {
        let record = self.load_live(order_id).await?;
        let server_id = record.server_id.ok_or(ProvisioningFailure::NotProvisioned)?;

        let (_, panel) = self.panel_for(&record.config).await?;
        panel.send_power_signal(server_id, "restart").await?;

        tracing::info!(order_id, server_id, "Server restart requested");
        Ok(())
    }

    /// Sets the password of the panel account that owns the order's server.
    pub async fn change_account_password(
        &self,
        change: PasswordChange,
    ) -> Result<(), ProvisioningError> {
        let order_id = change.order_id;
        self.change_password(change)
            .await
            .map_err(failed("change password", order_id))
    }

    async fn change_password(&self, change: PasswordChange) -> Step<()> {
        if change.password.is_empty() {
            return Err(ProvisioningFailure::MissingPassword);
        }

        let record = self.load_live(change.order_id).await?;
        if !record.is_provisioned() {
            return Err(ProvisioningFailure::NotProvisioned);
        }

        let (_, panel) = self.panel_for(&record.config).await?;
        let client = self
            .billing
            .find_client(record.client_id)
            .await?
            .ok_or(ProvisioningFailure::ClientNotFound)?;

        let email = client.email_or_fallback();
        let user_id = find_or_create_user(&panel, email, &client).await?;

        let payload = UserPayload {
            email: email.to_string(),
            username: generate_username(email),
            first_name: client.first_name_or_default().to_string(),
            last_name: client.last_name_or_default().to_string(),
            password: change.password,
        };
        panel.update_user(user_id, &payload).await?;

        tracing::info!(order_id = change.order_id, user_id, "Panel password changed");
        Ok(())
    }

    // =========================================================================
    // Records & queries
    // =========================================================================

    /// Replaces the stored order configuration when `config` is given.
    pub async fn update(
        &self,
        order_id: i64,
        config: Option<Map<String, Value>>,
    ) -> Result<ServiceRecord, ProvisioningError> {
        self.update_record(order_id, config)
            .await
            .map_err(failed("update service", order_id))
    }

    async fn update_record(
        &self,
        order_id: i64,
        config: Option<Map<String, Value>>,
    ) -> Step<ServiceRecord> {
        let mut record = self.load(order_id).await?;

        if let Some(config) = config {
            record.config = config;
            record.touch();
            self.services.save_service(&record).await?;
            tracing::info!(order_id, "Service configuration updated");
        }

        Ok(record)
    }

    /// Application-API details for a server, using the global panel settings.
    pub async fn get_server_info(&self, server_id: i64) -> Result<Value, ProvisioningError> {
        self.server_info(server_id).await.map_err(|failure| {
            tracing::warn!(server_id, "Failed to get server info: {}", failure);
            ProvisioningError {
                action: "get server info",
                failure,
            }
        })
    }

    async fn server_info(&self, server_id: i64) -> Step<Value> {
        let (_, panel) = self.global_panel().await?;
        Ok(panel.get_server(server_id).await?)
    }

    /// Live resource usage for a server, using the global panel settings.
    pub async fn get_server_status(&self, server_id: i64) -> Result<Value, ProvisioningError> {
        self.server_status(server_id).await.map_err(|failure| {
            tracing::warn!(server_id, "Failed to get server status: {}", failure);
            ProvisioningError {
                action: "get server status",
                failure,
            }
        })
    }

    async fn server_status(&self, server_id: i64) -> Step<Value> {
        let (_, panel) = self.global_panel().await?;
        Ok(panel.server_resources(server_id).await?)
    }

    /// Loads the record for an order, whatever its status.
    pub async fn find(&self, order_id: i64) -> Result<ServiceRecord, ProvisioningError> {
        self.load(order_id)
            .await
            .map_err(|failure| ProvisioningError {
                action: "load service",
                failure,
            })
    }

    pub async fn view(&self, order_id: i64) -> Result<ServiceView, ProvisioningError> {
        let record = self.find(order_id).await?;
        Ok(self.to_api_view(record).await)
    }

    /// Caller-facing view. The panel link is omitted when the record has no
    /// server or the global panel settings cannot be resolved.
    pub async fn to_api_view(&self, record: ServiceRecord) -> ServiceView {
        let panel_url = match record.server_identifier.as_deref() {
            Some(identifier) => match self.resolver.resolve_global().await {
                Ok(config) => Some(config.server_url(identifier)),
                Err(e) => {
                    tracing::warn!(order_id = record.order_id, "Panel URL unavailable: {}", e);
                    None
                }
            },
            None => None,
        };

        ServiceView::new(record, panel_url)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load(&self, order_id: i64) -> Step<ServiceRecord> {
        self.services
            .find_service_by_order(order_id)
            .await?
            .ok_or(ProvisioningFailure::ServiceNotFound(order_id))
    }

    /// Loads a record that has not reached the terminal state.
    async fn load_live(&self, order_id: i64) -> Step<ServiceRecord> {
        let record = self.load(order_id).await?;
        if record.status.is_terminal() {
            return Err(ProvisioningFailure::Deleted);
        }
        Ok(record)
    }

    async fn panel_for(&self, order_config: &Map<String, Value>) -> Step<(PanelConfig, PanelClient)> {
        let config = self.resolver.resolve(order_config).await?;
        let client = PanelClient::new(self.http.clone(), &config);
        Ok((config, client))
    }

    async fn global_panel(&self) -> Step<(PanelConfig, PanelClient)> {
        self.panel_for(&Map::new()).await
    }
}
