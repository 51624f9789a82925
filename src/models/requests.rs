//! Typed request bodies accepted at the HTTP boundary.
//!
//! Every operation takes exactly one explicit shape; callers that used to send
//! an order either as an object or a bare ID, or a password either as a string
//! or a map, are expected to send these structures instead.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Body carrying only an order ID.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub order_id: Option<i64>,
}

impl OrderRequest {
    pub fn require_order_id(&self) -> Result<i64, AppError> {
        require_order_id(self.order_id)
    }
}

/// Admin update of a service's stored configuration.
#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub order_id: Option<i64>,
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
}

/// Admin password change (no ownership check, no strength policy).
#[derive(Debug, Deserialize)]
pub struct AdminChangePasswordRequest {
    pub order_id: Option<i64>,
    pub password: Option<String>,
}

/// Client password change.
#[derive(Debug, Deserialize)]
pub struct ClientChangePasswordRequest {
    pub order_id: Option<i64>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Query for guest server lookups.
#[derive(Debug, Deserialize)]
pub struct ServerQuery {
    pub server_id: Option<i64>,
}

/// Password change handed to the provisioner once the boundary has
/// validated the caller.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub order_id: i64,
    pub password: String,
}

/// Global panel settings editable by admins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelSettings {
    #[serde(default)]
    pub panel_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_one")]
    pub default_node: i64,
    #[serde(default = "default_one")]
    pub default_egg: i64,
    #[serde(default = "default_docker_image")]
    pub default_docker_image: String,
    #[serde(default = "default_memory")]
    pub default_memory: i64,
    #[serde(default = "default_disk")]
    pub default_disk: i64,
    #[serde(default = "default_cpu")]
    pub default_cpu: i64,
}

fn default_one() -> i64 {
    1
}

fn default_docker_image() -> String {
    crate::services::panel_config::DEFAULT_DOCKER_IMAGE.to_string()
}

fn default_memory() -> i64 {
    crate::services::panel_config::DEFAULT_MEMORY
}

fn default_disk() -> i64 {
    crate::services::panel_config::DEFAULT_DISK
}

fn default_cpu() -> i64 {
    crate::services::panel_config::DEFAULT_CPU
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

pub fn require_order_id(order_id: Option<i64>) -> Result<i64, AppError> {
    match order_id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(AppError::Validation("Order ID is required".to_string())),
    }
}
