//! Billing-side entities read by the provisioner: orders and clients.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder address used when a client has no email on file.
pub const FALLBACK_EMAIL: &str = "noemail@example.com";

/// A billing order for a game-server product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub client_id: i64,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Order {
    /// Parses the JSON text stored by the billing framework. Anything that is
    /// not a JSON object is treated as an empty configuration.
    pub fn parse_config(raw: Option<&str>) -> Map<String, Value> {
        raw.and_then(|text| serde_json::from_str::<Value>(text).ok())
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// A billing client (the owner of an order).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    pub id: i64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Client {
    pub fn email_or_fallback(&self) -> &str {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(FALLBACK_EMAIL)
    }

    pub fn first_name_or_default(&self) -> &str {
        self.first_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("Client")
    }

    pub fn last_name_or_default(&self) -> &str {
        self.last_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("User")
    }
}
