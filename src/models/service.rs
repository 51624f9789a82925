//! Service record model - the per-order state of a provisioned game server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

/// Lifecycle status of a game-server service.
///
/// `pending -> active <-> suspended`, and any state `-> deleted`.
/// `deleted` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Record dispensed, no server created yet
    Pending,
    /// Server exists on the panel and is running
    Active,
    /// Server suspended (or the order was suspended before provisioning)
    Suspended,
    /// Server removed from the panel
    Deleted,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Pending => "pending",
            ServiceStatus::Active => "active",
            ServiceStatus::Suspended => "suspended",
            ServiceStatus::Deleted => "deleted",
        }
    }

    /// Parses a stored status. Unknown values map to `Pending`, which is the
    /// column default.
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => ServiceStatus::Active,
            "suspended" => ServiceStatus::Suspended,
            "deleted" => ServiceStatus::Deleted,
            _ => ServiceStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceStatus::Deleted)
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted state of one order's game server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRecord {
    pub id: i64,
    pub order_id: i64,
    pub client_id: i64,
    /// The order configuration copied at creation time (or re-saved by `update`)
    pub config: Map<String, Value>,
    pub status: ServiceStatus,
    /// Panel-internal server ID, used for application API calls
    pub server_id: Option<i64>,
    /// Short public identifier, used for panel URLs
    pub server_identifier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRecord {
    pub fn is_provisioned(&self) -> bool {
        self.server_id.is_some()
    }

    /// Records a successful server creation.
    pub fn mark_active(&mut self, server_id: i64, server_identifier: String) {
        self.server_id = Some(server_id);
        self.server_identifier = Some(server_identifier);
        self.status = ServiceStatus::Active;
        self.touch();
    }

    pub fn mark_suspended(&mut self) {
        self.status = ServiceStatus::Suspended;
        self.touch();
    }

    /// Back to `active`, or to `pending` when no server was ever created.
    pub fn mark_unsuspended(&mut self) {
        self.status = if self.is_provisioned() {
            ServiceStatus::Active
        } else {
            ServiceStatus::Pending
        };
        self.touch();
    }

    /// Clears the remote identifiers and moves to the terminal state.
    pub fn mark_deleted(&mut self) {
        self.server_id = None;
        self.server_identifier = None;
        self.status = ServiceStatus::Deleted;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Values needed to dispense a new service record.
#[derive(Debug, Clone)]
pub struct NewServiceRecord {
    pub order_id: i64,
    pub client_id: i64,
    pub config: Map<String, Value>,
}

/// Row shape of the `service_pterodactyl` table.
#[derive(Debug, Clone, FromRow)]
pub struct ServiceRow {
    pub id: i64,
    pub order_id: i64,
    pub client_id: i64,
    pub config: Value,
    pub status: String,
    pub server_id: Option<i64>,
    pub server_identifier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ServiceRow> for ServiceRecord {
    fn from(row: ServiceRow) -> Self {
        let config = match row.config {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Self {
            id: row.id,
            order_id: row.order_id,
            client_id: row.client_id,
            config,
            status: ServiceStatus::parse(&row.status),
            server_id: row.server_id,
            server_identifier: row.server_identifier,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Caller-facing view of a service record.
#[derive(Debug, Serialize)]
pub struct ServiceView {
    pub id: i64,
    pub order_id: i64,
    pub status: ServiceStatus,
    pub server_id: Option<i64>,
    pub server_identifier: Option<String>,
    pub config: Map<String, Value>,
    /// Link to the server page on the panel; absent when not provisioned
    /// or when the panel URL cannot be resolved
    pub panel_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceView {
    pub fn new(record: ServiceRecord, panel_url: Option<String>) -> Self {
        Self {
            id: record.id,
            order_id: record.order_id,
            status: record.status,
            server_id: record.server_id,
            server_identifier: record.server_identifier,
            config: record.config,
            panel_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
