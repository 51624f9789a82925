//! Find-or-create helpers for the panel resources a server needs, and the
//! assembly of the server creation payload.
//!
//! Lookups and creations are not atomic: two concurrent provisions for the
//! same email or node may both create a resource.

use std::collections::{BTreeMap, HashSet};

use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::Client;
use crate::services::panel::{
    AllocationRef, Egg, FeatureLimits, PanelApiError, PanelClient, ServerLimits, ServerPayload,
    UserPayload,
};
use crate::services::panel_config::{lenient_i64, lenient_string, PanelConfig};

const FIRST_GAME_PORT: u16 = 25565;
const PORT_SCAN_WINDOW: u16 = 1000;
const MAX_USERNAME_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to get or create user: {0}")]
    User(#[source] PanelApiError),

    #[error("Failed to get or create allocation: {0}")]
    Allocation(#[source] PanelApiError),

    #[error("Failed to get egg info: {0}")]
    Egg(#[source] EggLookupError),
}

#[derive(Debug, Error)]
pub enum EggLookupError {
    #[error(transparent)]
    Panel(#[from] PanelApiError),

    #[error("Could not find nest containing egg ID {0}")]
    NestNotFound(i64),
}

// =============================================================================
// Users
// =============================================================================

/// Returns the panel user ID for `email`, creating the user when no match
/// exists. The generated password is not kept.
pub async fn find_or_create_user(
    panel: &PanelClient,
    email: &str,
    client: &Client,
) -> Result<i64, ResolveError> {
    let existing = panel
        .find_users_by_email(email)
        .await
        .map_err(ResolveError::User)?;
    if let Some(user) = existing.first() {
        return Ok(user.id);
    }

    let payload = UserPayload {
        email: email.to_string(),
        username: generate_username(email),
        first_name: client.first_name_or_default().to_string(),
        last_name: client.last_name_or_default().to_string(),
        password: generate_random_password(),
    };

    let user_id = panel
        .create_user(&payload)
        .await
        .map_err(ResolveError::User)?;
    tracing::info!(user_id, username = %payload.username, "Created panel user");

    Ok(user_id)
}

/// Derives a panel username from the local part of an email.
///
/// Keeps ASCII letters and digits, truncates to 20 characters and lowercases.
/// Falls back to `user<unix-timestamp>` when nothing usable remains.
pub fn generate_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let username: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_USERNAME_LEN)
        .collect::<String>()
        .to_ascii_lowercase();

    if username.is_empty() {
        format!("user{}", chrono::Utc::now().timestamp())
    } else {
        username
    }
}

/// 16 random bytes, hex-encoded.
pub fn generate_random_password() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

// =============================================================================
// Allocations
// =============================================================================

/// Returns an unassigned allocation on `node_id`, creating one on a free port
/// when every existing allocation is taken.
pub async fn find_or_create_allocation(
    panel: &PanelClient,
    node_id: i64,
) -> Result<i64, ResolveError> {
    let allocations = panel
        .list_allocations(node_id)
        .await
        .map_err(ResolveError::Allocation)?;

    if let Some(free) = allocations.iter().find(|a| !a.assigned) {
        return Ok(free.id);
    }

    let used: HashSet<u16> = allocations.iter().map(|a| a.port).collect();
    let port = find_available_port(&used);

    let allocation_id = panel
        .create_allocation(node_id, "0.0.0.0", port)
        .await
        .map_err(ResolveError::Allocation)?;
    tracing::info!(node_id, port, allocation_id, "Created allocation");

    Ok(allocation_id)
}

/// First free port in `25565..26565`, or a random high port when that range
/// is exhausted. The random port is not checked against `used`.
pub fn find_available_port(used: &HashSet<u16>) -> u16 {
    (FIRST_GAME_PORT..FIRST_GAME_PORT + PORT_SCAN_WINDOW)
        .find(|port| !used.contains(port))
        .unwrap_or_else(|| rand::thread_rng().gen_range(30000..=65535))
}

// =============================================================================
// Eggs & environment
// =============================================================================

/// Locates the nest owning `egg_id` and fetches the egg with its variables.
pub async fn get_egg_info(panel: &PanelClient, egg_id: i64) -> Result<Egg, ResolveError> {
    lookup_egg(panel, egg_id).await.map_err(ResolveError::Egg)
}

async fn lookup_egg(panel: &PanelClient, egg_id: i64) -> Result<Egg, EggLookupError> {
    let nests = panel.list_nests_with_eggs().await?;
    let nest_id = nests
        .iter()
        .find(|nest| {
            nest.relationships
                .eggs
                .data
                .iter()
                .any(|egg| egg.attributes.id == egg_id)
        })
        .map(|nest| nest.id)
        .ok_or(EggLookupError::NestNotFound(egg_id))?;

    Ok(panel.get_egg(nest_id, egg_id).await?)
}

/// Merges user-supplied variables with the egg's declared defaults.
pub fn prepare_environment(
    egg: &Egg,
    user_env: Option<&Map<String, Value>>,
) -> BTreeMap<String, String> {
    let mut environment: BTreeMap<String, String> = user_env
        .map(|env| {
            env.iter()
                .map(|(key, value)| (key.clone(), env_value(value)))
                .collect()
        })
        .unwrap_or_default();

    for variable in egg.variables() {
        if environment.contains_key(&variable.env_variable) {
            continue;
        }

        let value = match variable.default_value.as_deref() {
            Some(default) if !default.is_empty() => default.to_string(),
            _ => fallback_for(&variable.env_variable).to_string(),
        };
        environment.insert(variable.env_variable.clone(), value);
    }

    environment
}

fn fallback_for(env_variable: &str) -> &'static str {
    match env_variable {
        "SERVER_JARFILE" => "server.jar",
        "VANILLA_VERSION" | "MC_VERSION" | "VERSION" | "BUILD_NUMBER" => "latest",
        "FORGE_VERSION" => "recommended",
        _ => "",
    }
}

fn env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// =============================================================================
// Server payload
// =============================================================================

/// Server-shaping keys read from an order configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerOptions {
    #[serde(default, deserialize_with = "lenient_string")]
    pub server_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub node_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub egg_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub docker_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub startup_command: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub memory: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub swap: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub disk: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub io: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub cpu: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub databases: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub allocations: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub backups: Option<i64>,
    #[serde(default, deserialize_with = "object_or_none")]
    pub environment: Option<Map<String, Value>>,
}

fn object_or_none<'de, D>(deserializer: D) -> Result<Option<Map<String, Value>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => Ok(Some(map)),
        _ => Ok(None),
    }
}

impl ServerOptions {
    pub fn from_config(config: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(config.clone())).unwrap_or_default()
    }

    pub fn node_id(&self, panel: &PanelConfig) -> i64 {
        self.node_id.unwrap_or(panel.default_node)
    }

    pub fn egg_id(&self, panel: &PanelConfig) -> i64 {
        self.egg_id.unwrap_or(panel.default_egg)
    }

    pub fn limits(&self, panel: &PanelConfig) -> ServerLimits {
        ServerLimits {
            memory: self.memory.unwrap_or(panel.default_memory),
            swap: self.swap.unwrap_or(panel.default_swap),
            disk: self.disk.unwrap_or(panel.default_disk),
            io: self.io.unwrap_or(panel.default_io),
            cpu: self.cpu.unwrap_or(panel.default_cpu),
        }
    }

    pub fn feature_limits(&self, panel: &PanelConfig) -> FeatureLimits {
        FeatureLimits {
            databases: self.databases.unwrap_or(panel.default_databases),
            allocations: self.allocations.unwrap_or(panel.default_allocations),
            backups: self.backups.unwrap_or(panel.default_backups),
        }
    }
}

/// Resolved panel resources a new server is attached to.
#[derive(Debug, Clone)]
pub struct ServerResources {
    pub user_id: i64,
    pub allocation_id: i64,
    pub egg: Egg,
}

/// Builds the server creation body. Image and startup fall back from the
/// order to the egg to the panel defaults.
pub fn build_server_payload(
    options: &ServerOptions,
    panel: &PanelConfig,
    resources: &ServerResources,
) -> ServerPayload {
    let name = options
        .server_name
        .clone()
        .unwrap_or_else(|| format!("Server-{}", chrono::Utc::now().timestamp()));

    let docker_image = options
        .docker_image
        .clone()
        .or_else(|| resources.egg.docker_image.clone())
        .unwrap_or_else(|| panel.default_docker_image.clone());

    let startup = options
        .startup_command
        .clone()
        .or_else(|| resources.egg.startup.clone())
        .unwrap_or_else(|| panel.default_startup.clone());

    ServerPayload {
        name,
        user: resources.user_id,
        egg: resources.egg.id,
        docker_image,
        startup,
        environment: prepare_environment(&resources.egg, options.environment.as_ref()),
        limits: options.limits(panel),
        feature_limits: options.feature_limits(panel),
        allocation: AllocationRef {
            default: resources.allocation_id,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::panel::Item;
    use crate::services::panel_config::PanelConfigLayer;
    use serde_json::json;

    fn egg(value: Value) -> Egg {
        serde_json::from_value::<Item<Egg>>(json!({ "attributes": value }))
            .unwrap()
            .attributes
    }

    fn panel_config() -> PanelConfig {
        let order = PanelConfigLayer {
            panel_url: Some("https://panel.example.com".to_string()),
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        PanelConfig::from_layers(&order, &PanelConfigLayer::default()).unwrap()
    }

    // =========================================================================
    // Usernames & passwords
    // =========================================================================

    #[test]
    fn test_username_strips_and_lowercases() {
        let username = generate_username("A.B+c@example.com");
        assert_eq!(username, "abc");
        assert!(username.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(username.len() <= 20);
    }

    #[test]
    fn test_username_truncates_to_twenty() {
        let username = generate_username("abcdefghijklmnopqrstuvwxyz@example.com");
        assert_eq!(username, "abcdefghijklmnopqrst");
    }

    #[test]
    fn test_username_falls_back_to_timestamp() {
        let username = generate_username("...@example.com");
        assert!(username.starts_with("user"));
        assert!(username[4..].chars().all(|c| c.is_ascii_digit()));
        assert!(username.len() > 4);
    }

    #[test]
    fn test_random_password_is_32_hex_chars() {
        let password = generate_random_password();
        assert_eq!(password.len(), 32);
        assert!(password.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(password, generate_random_password());
    }

    // =========================================================================
    // Ports
    // =========================================================================

    #[test]
    fn test_first_free_port_after_used() {
        let used: HashSet<u16> = [25565, 25566].into_iter().collect();
        assert_eq!(find_available_port(&used), 25567);
    }

    #[test]
    fn test_port_with_nothing_used() {
        assert_eq!(find_available_port(&HashSet::new()), 25565);
    }

    #[test]
    fn test_gap_is_reused() {
        let used: HashSet<u16> = [25565, 25567].into_iter().collect();
        assert_eq!(find_available_port(&used), 25566);
    }

    #[test]
    fn test_exhausted_window_picks_high_port() {
        let used: HashSet<u16> = (25565..26565).collect();
        let port = find_available_port(&used);
        assert!(port >= 30000);
    }

    // =========================================================================
    // Environment
    // =========================================================================

    #[test]
    fn test_environment_fallbacks() {
        let egg = egg(json!({
            "id": 3,
            "relationships": {"variables": {"data": [
                {"attributes": {"env_variable": "SERVER_JARFILE", "default_value": ""}},
                {"attributes": {"env_variable": "MC_VERSION", "default_value": null}},
                {"attributes": {"env_variable": "FORGE_VERSION", "default_value": ""}},
                {"attributes": {"env_variable": "BUILD_NUMBER"}},
                {"attributes": {"env_variable": "MOTD", "default_value": ""}},
                {"attributes": {"env_variable": "MAX_PLAYERS", "default_value": "20"}}
            ]}}
        }));

        let env = prepare_environment(&egg, None);
        assert_eq!(env["SERVER_JARFILE"], "server.jar");
        assert_eq!(env["MC_VERSION"], "latest");
        assert_eq!(env["FORGE_VERSION"], "recommended");
        assert_eq!(env["BUILD_NUMBER"], "latest");
        assert_eq!(env["MOTD"], "");
        assert_eq!(env["MAX_PLAYERS"], "20");
    }

    #[test]
    fn test_user_environment_wins_and_is_stringified() {
        let egg = egg(json!({
            "id": 3,
            "relationships": {"variables": {"data": [
                {"attributes": {"env_variable": "SERVER_JARFILE", "default_value": "paper.jar"}}
            ]}}
        }));
        let user = json!({"SERVER_JARFILE": "custom.jar", "MAX_PLAYERS": 50, "ONLINE": true});

        let env = prepare_environment(&egg, user.as_object());
        assert_eq!(env["SERVER_JARFILE"], "custom.jar");
        assert_eq!(env["MAX_PLAYERS"], "50");
        assert_eq!(env["ONLINE"], "true");
    }

    // =========================================================================
    // Payload
    // =========================================================================

    #[test]
    fn test_payload_prefers_order_then_egg_then_defaults() {
        let config = panel_config();
        let resources = ServerResources {
            user_id: 12,
            allocation_id: 40,
            egg: egg(json!({"id": 3, "docker_image": "ghcr.io/yolks:java_17"})),
        };
        let options = ServerOptions::from_config(
            json!({"server_name": "Survival", "memory": "2048", "cpu": 200})
                .as_object()
                .unwrap(),
        );

        let payload = build_server_payload(&options, &config, &resources);
        assert_eq!(payload.name, "Survival");
        assert_eq!(payload.user, 12);
        assert_eq!(payload.egg, 3);
        assert_eq!(payload.docker_image, "ghcr.io/yolks:java_17");
        assert_eq!(payload.startup, config.default_startup);
        assert_eq!(payload.limits.memory, 2048);
        assert_eq!(payload.limits.cpu, 200);
        assert_eq!(payload.limits.disk, config.default_disk);
        assert_eq!(payload.feature_limits.backups, 1);
        assert_eq!(payload.allocation.default, 40);
    }

    #[test]
    fn test_payload_default_name() {
        let resources = ServerResources {
            user_id: 1,
            allocation_id: 1,
            egg: egg(json!({"id": 1})),
        };
        let payload = build_server_payload(&ServerOptions::default(), &panel_config(), &resources);
        assert!(payload.name.starts_with("Server-"));
        assert_eq!(payload.docker_image, panel_config().default_docker_image);
    }

    #[test]
    fn test_options_read_node_and_egg() {
        let options =
            ServerOptions::from_config(json!({"node_id": "5", "egg_id": 3}).as_object().unwrap());
        let config = panel_config();
        assert_eq!(options.node_id(&config), 5);
        assert_eq!(options.egg_id(&config), 3);
        assert_eq!(ServerOptions::default().node_id(&config), config.default_node);
    }

    #[test]
    fn test_resolve_error_messages() {
        let err = ResolveError::Egg(EggLookupError::NestNotFound(9));
        assert_eq!(
            err.to_string(),
            "Failed to get egg info: Could not find nest containing egg ID 9"
        );

        let err = ResolveError::Allocation(PanelApiError::MissingData("allocation data"));
        assert_eq!(
            err.to_string(),
            "Failed to get or create allocation: Pterodactyl response is missing allocation data"
        );
    }
}
