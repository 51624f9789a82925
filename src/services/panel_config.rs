//! Effective panel configuration.
//!
//! Three layers are merged per key with a fixed precedence:
//!
//! 1. the order's own configuration (per-product panels, overrides)
//! 2. global settings stored by the billing framework
//! 3. hardcoded defaults
//!
//! When the order layer carries both a panel URL and an API key it is used on
//! its own and the global settings are never read. Resolution only fails when
//! no layer supplies the credentials; every tuning value has a default.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::PanelSettings;
use crate::store::{SettingsStore, StoreError};

/// Prefix of the global setting keys in the shared settings table.
pub const SETTINGS_PREFIX: &str = "servicepterodactyl_";

pub const DEFAULT_NODE: i64 = 1;
pub const DEFAULT_EGG: i64 = 1;
pub const DEFAULT_DOCKER_IMAGE: &str = "quay.io/pterodactyl/core:java";
pub const DEFAULT_STARTUP: &str = "java -Xms128M -Xmx{{SERVER_MEMORY}}M -jar {{SERVER_JARFILE}}";
pub const DEFAULT_MEMORY: i64 = 512;
pub const DEFAULT_SWAP: i64 = 0;
pub const DEFAULT_DISK: i64 = 1024;
pub const DEFAULT_IO: i64 = 500;
pub const DEFAULT_CPU: i64 = 100;
pub const DEFAULT_DATABASES: i64 = 1;
pub const DEFAULT_ALLOCATIONS: i64 = 1;
pub const DEFAULT_BACKUPS: i64 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error(
        "Pterodactyl panel URL and API key must be configured. \
         Please configure them in the product settings."
    )]
    MissingCredentials,
}

/// Fully resolved configuration for one panel operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelConfig {
    pub panel_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub default_node: i64,
    pub default_egg: i64,
    pub default_docker_image: String,
    pub default_startup: String,
    pub default_memory: i64,
    pub default_swap: i64,
    pub default_disk: i64,
    pub default_io: i64,
    pub default_cpu: i64,
    pub default_databases: i64,
    pub default_allocations: i64,
    pub default_backups: i64,
}

/// One partially-populated configuration tier.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PanelConfigLayer {
    #[serde(default, deserialize_with = "lenient_string")]
    pub panel_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub api_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub default_node: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub default_egg: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub default_docker_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub default_startup: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub default_memory: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub default_swap: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub default_disk: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub default_io: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub default_cpu: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub default_databases: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub default_allocations: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub default_backups: Option<i64>,
}

const GLOBAL_KEYS: [&str; 14] = [
    "panel_url",
    "api_key",
    "default_node",
    "default_egg",
    "default_docker_image",
    "default_startup",
    "default_memory",
    "default_swap",
    "default_disk",
    "default_io",
    "default_cpu",
    "default_databases",
    "default_allocations",
    "default_backups",
];

impl PanelConfigLayer {
    /// Reads the panel keys out of an order configuration. Unknown keys and
    /// values of the wrong shape are ignored.
    pub fn from_config(config: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(config.clone())).unwrap_or_default()
    }

    pub fn has_credentials(&self) -> bool {
        self.panel_url.is_some() && self.api_key.is_some()
    }

    /// Loads the global tier from the settings store.
    pub async fn load_global(store: &dyn SettingsStore) -> Result<Self, StoreError> {
        let mut map = Map::new();
        for key in GLOBAL_KEYS {
            if let Some(value) = store.get_param(&format!("{}{}", SETTINGS_PREFIX, key)).await? {
                map.insert(key.to_string(), Value::String(value));
            }
        }
        Ok(Self::from_config(&map))
    }
}

impl PanelConfig {
    /// Merges `order` over `global` over the hardcoded defaults.
    pub fn from_layers(
        order: &PanelConfigLayer,
        global: &PanelConfigLayer,
    ) -> Result<Self, ConfigurationError> {
        fn pick<T: Clone>(order: &Option<T>, global: &Option<T>) -> Option<T> {
            order.clone().or_else(|| global.clone())
        }

        let panel_url = pick(&order.panel_url, &global.panel_url);
        let api_key = pick(&order.api_key, &global.api_key);
        let (panel_url, api_key) = match (panel_url, api_key) {
            (Some(url), Some(key)) => (url, key),
            _ => return Err(ConfigurationError::MissingCredentials),
        };

        Ok(Self {
            panel_url,
            api_key,
            default_node: pick(&order.default_node, &global.default_node).unwrap_or(DEFAULT_NODE),
            default_egg: pick(&order.default_egg, &global.default_egg).unwrap_or(DEFAULT_EGG),
            default_docker_image: pick(&order.default_docker_image, &global.default_docker_image)
                .unwrap_or_else(|| DEFAULT_DOCKER_IMAGE.to_string()),
            default_startup: pick(&order.default_startup, &global.default_startup)
                .unwrap_or_else(|| DEFAULT_STARTUP.to_string()),
            default_memory: pick(&order.default_memory, &global.default_memory)
                .unwrap_or(DEFAULT_MEMORY),
            default_swap: pick(&order.default_swap, &global.default_swap).unwrap_or(DEFAULT_SWAP),
            default_disk: pick(&order.default_disk, &global.default_disk).unwrap_or(DEFAULT_DISK),
            default_io: pick(&order.default_io, &global.default_io).unwrap_or(DEFAULT_IO),
            default_cpu: pick(&order.default_cpu, &global.default_cpu).unwrap_or(DEFAULT_CPU),
            default_databases: pick(&order.default_databases, &global.default_databases)
                .unwrap_or(DEFAULT_DATABASES),
            default_allocations: pick(&order.default_allocations, &global.default_allocations)
                .unwrap_or(DEFAULT_ALLOCATIONS),
            default_backups: pick(&order.default_backups, &global.default_backups)
                .unwrap_or(DEFAULT_BACKUPS),
        })
    }

    /// Browser link to a server page on the panel.
    pub fn server_url(&self, server_identifier: &str) -> String {
        format!(
            "{}/server/{}",
            self.panel_url.trim_end_matches('/'),
            server_identifier
        )
    }
}

/// Resolves [`PanelConfig`] for each operation. Holds no per-call state.
#[derive(Clone)]
pub struct PanelConfigResolver {
    settings: Arc<dyn SettingsStore>,
}

impl PanelConfigResolver {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    pub async fn resolve(
        &self,
        order_config: &Map<String, Value>,
    ) -> Result<PanelConfig, ConfigurationError> {
        let order = PanelConfigLayer::from_config(order_config);
        if order.has_credentials() {
            return PanelConfig::from_layers(&order, &PanelConfigLayer::default());
        }

        let global = match PanelConfigLayer::load_global(self.settings.as_ref()).await {
            Ok(layer) => layer,
            Err(e) => {
                tracing::warn!("Failed to load global panel settings: {}", e);
                PanelConfigLayer::default()
            }
        };

        PanelConfig::from_layers(&order, &global)
    }

    /// Configuration from global settings and defaults only.
    pub async fn resolve_global(&self) -> Result<PanelConfig, ConfigurationError> {
        self.resolve(&Map::new()).await
    }
}

/// Reads the admin-editable subset of the global settings.
pub async fn load_panel_settings(store: &dyn SettingsStore) -> Result<PanelSettings, StoreError> {
    let layer = PanelConfigLayer::load_global(store).await?;
    Ok(PanelSettings {
        panel_url: layer.panel_url.unwrap_or_default(),
        api_key: layer.api_key.unwrap_or_default(),
        default_node: layer.default_node.unwrap_or(DEFAULT_NODE),
        default_egg: layer.default_egg.unwrap_or(DEFAULT_EGG),
        default_docker_image: layer
            .default_docker_image
            .unwrap_or_else(|| DEFAULT_DOCKER_IMAGE.to_string()),
        default_memory: layer.default_memory.unwrap_or(DEFAULT_MEMORY),
        default_disk: layer.default_disk.unwrap_or(DEFAULT_DISK),
        default_cpu: layer.default_cpu.unwrap_or(DEFAULT_CPU),
    })
}

/// Persists the admin-editable subset of the global settings.
pub async fn save_panel_settings(
    store: &dyn SettingsStore,
    settings: &PanelSettings,
) -> Result<(), StoreError> {
    let entries = [
        ("panel_url", settings.panel_url.clone()),
        ("api_key", settings.api_key.clone()),
        ("default_node", settings.default_node.to_string()),
        ("default_egg", settings.default_egg.to_string()),
        ("default_docker_image", settings.default_docker_image.clone()),
        ("default_memory", settings.default_memory.to_string()),
        ("default_disk", settings.default_disk.to_string()),
        ("default_cpu", settings.default_cpu.to_string()),
    ];

    for (key, value) in entries {
        store
            .set_param(&format!("{}{}", SETTINGS_PREFIX, key), &value)
            .await?;
    }

    tracing::info!("Global panel settings saved");
    Ok(())
}

// ---------------------------------------------------------------------------
// Lenient value decoding
// ---------------------------------------------------------------------------

/// Integer from a JSON number or a numeric string.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-empty string from a JSON string or number.
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_i64))
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_string))
}
