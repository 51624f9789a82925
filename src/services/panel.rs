//! Pterodactyl panel API client.
//!
//! A [`PanelClient`] is built per operation from a resolved [`PanelConfig`], so
//! credentials are never cached across calls. All requests carry bearer auth
//! and JSON headers; any status >= 400 becomes [`PanelApiError::Api`].

use std::collections::BTreeMap;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::services::panel_config::{lenient_string, PanelConfig};

#[derive(Debug, Error)]
pub enum PanelApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Pterodactyl API request failed with HTTP code: {status}{}", details_suffix(.details))]
    Api { status: u16, details: Option<Value> },

    #[error("Invalid JSON from Pterodactyl: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pterodactyl response is missing {0}")]
    MissingData(&'static str),
}

fn details_suffix(details: &Option<Value>) -> String {
    match details {
        Some(errors) => format!(" - {}", errors),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// `{"object": ..., "attributes": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct Item<T> {
    pub attributes: T,
}

/// `{"object": "list", "data": [...], "meta": {"pagination": {...}}}`
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct List<T> {
    #[serde(default)]
    pub data: Vec<Item<T>>,
    #[serde(default)]
    pub meta: Option<ListMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListMeta {
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub total_pages: u32,
}

impl<T> List<T> {
    fn total_pages(&self) -> u32 {
        self.meta
            .as_ref()
            .and_then(|m| m.pagination.as_ref())
            .map(|p| p.total_pages)
            .unwrap_or(1)
    }

    pub fn into_attributes(self) -> Vec<T> {
        self.data.into_iter().map(|item| item.attributes).collect()
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            meta: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PanelUser {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Allocation {
    pub id: i64,
    #[serde(default)]
    pub ip: Option<String>,
    pub port: u16,
    #[serde(default)]
    pub assigned: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Nest {
    pub id: i64,
    #[serde(default)]
    pub relationships: NestRelationships,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NestRelationships {
    #[serde(default)]
    pub eggs: List<EggSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EggSummary {
    pub id: i64,
}

/// Detailed egg attributes, including the declared environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Egg {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub docker_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub startup: Option<String>,
    #[serde(default)]
    pub relationships: EggRelationships,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EggRelationships {
    #[serde(default)]
    pub variables: List<EggVariable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EggVariable {
    pub env_variable: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub default_value: Option<String>,
}

impl Egg {
    pub fn variables(&self) -> impl Iterator<Item = &EggVariable> {
        self.relationships.variables.data.iter().map(|v| &v.attributes)
    }
}

/// User body for create and update calls.
#[derive(Debug, Clone, Serialize)]
pub struct UserPayload {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerPayload {
    pub name: String,
    pub user: i64,
    pub egg: i64,
    pub docker_image: String,
    pub startup: String,
    pub environment: BTreeMap<String, String>,
    pub limits: ServerLimits,
    pub feature_limits: FeatureLimits,
    pub allocation: AllocationRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerLimits {
    pub memory: i64,
    pub swap: i64,
    pub disk: i64,
    pub io: i64,
    pub cpu: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureLimits {
    pub databases: i64,
    pub allocations: i64,
    pub backups: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocationRef {
    pub default: i64,
}

/// Identifiers of a freshly created server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedServer {
    pub id: i64,
    pub identifier: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authenticated JSON client bound to one panel.
#[derive(Clone)]
pub struct PanelClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PanelClient {
    /// Binds a shared HTTP client to the panel described by `config`.
    pub fn new(client: Client, config: &PanelConfig) -> Self {
        Self {
            client,
            base_url: config.panel_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    /// Issues one request and decodes the JSON response.
    ///
    /// An empty or non-JSON success body decodes to `{}`; some actions
    /// (suspend, delete, power) answer with 204 No Content.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, PanelApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(method = %method, path, "Pterodactyl API request");

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.as_u16() >= 400 {
            let details = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("errors").cloned());
            return Err(PanelApiError::Api {
                status: status.as_u16(),
                details,
            });
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Null) | Err(_) => Ok(Value::Object(Map::new())),
            Ok(value) => Ok(value),
        }
    }

    async fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T, PanelApiError> {
        let value = self.request(Method::GET, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetches every page of a list endpoint.
    async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, PanelApiError> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let page_path = if page == 1 {
                path.to_string()
            } else {
                let separator = if path.contains('?') { '&' } else { '?' };
                format!("{}{}page={}", path, separator, page)
            };

            let list: List<T> = self.get_as(&page_path).await?;
            let total_pages = list.total_pages();
            items.extend(list.into_attributes());

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    pub async fn find_users_by_email(&self, email: &str) -> Result<Vec<PanelUser>, PanelApiError> {
        let list: List<PanelUser> = self
            .get_as(&format!(
                "/api/application/users?filter[email]={}",
                urlencoding::encode(email)
            ))
            .await?;
        Ok(list.into_attributes())
    }

    /// Creates a user and returns its panel ID.
    pub async fn create_user(&self, user: &UserPayload) -> Result<i64, PanelApiError> {
        let body = serde_json::to_value(user)?;
        let response = self
            .request(Method::POST, "/api/application/users", Some(&body))
            .await?;

        response
            .pointer("/attributes/id")
            .and_then(Value::as_i64)
            .ok_or(PanelApiError::MissingData("user id"))
    }

    pub async fn update_user(&self, user_id: i64, user: &UserPayload) -> Result<(), PanelApiError> {
        let body = serde_json::to_value(user)?;
        self.request(
            Method::PATCH,
            &format!("/api/application/users/{}", user_id),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Allocations
    // -------------------------------------------------------------------------

    pub async fn list_allocations(&self, node_id: i64) -> Result<Vec<Allocation>, PanelApiError> {
        self.list_all(&format!("/api/application/nodes/{}/allocations", node_id))
            .await
    }

    /// Creates an allocation and returns the ID of the first allocation in
    /// the response.
    pub async fn create_allocation(
        &self,
        node_id: i64,
        ip: &str,
        port: u16,
    ) -> Result<i64, PanelApiError> {
        let body = serde_json::json!({ "ip": ip, "ports": [port.to_string()] });
        let response = self
            .request(
                Method::POST,
                &format!("/api/application/nodes/{}/allocations", node_id),
                Some(&body),
            )
            .await?;

        response
            .pointer("/data/0/attributes/id")
            .and_then(Value::as_i64)
            .ok_or(PanelApiError::MissingData("allocation data"))
    }

    // -------------------------------------------------------------------------
    // Nests & eggs
    // -------------------------------------------------------------------------

    pub async fn list_nests_with_eggs(&self) -> Result<Vec<Nest>, PanelApiError> {
        self.list_all("/api/application/nests?include=eggs").await
    }

    pub async fn get_egg(&self, nest_id: i64, egg_id: i64) -> Result<Egg, PanelApiError> {
        let item: Item<Egg> = self
            .get_as(&format!(
                "/api/application/nests/{}/eggs/{}?include=variables",
                nest_id, egg_id
            ))
            .await?;
        Ok(item.attributes)
    }

    // -------------------------------------------------------------------------
    // Servers
    // -------------------------------------------------------------------------

    pub async fn create_server(
        &self,
        payload: &ServerPayload,
    ) -> Result<CreatedServer, PanelApiError> {
        let body = serde_json::to_value(payload)?;
        let response = self
            .request(Method::POST, "/api/application/servers", Some(&body))
            .await?;

        let id = response
            .pointer("/attributes/id")
            .and_then(Value::as_i64)
            .ok_or(PanelApiError::MissingData("server id"))?;
        let identifier = response
            .pointer("/attributes/identifier")
            .and_then(Value::as_str)
            .ok_or(PanelApiError::MissingData("server identifier"))?
            .to_string();

        Ok(CreatedServer { id, identifier })
    }

    pub async fn suspend_server(&self, server_id: i64) -> Result<(), PanelApiError> {
        self.request(
            Method::POST,
            &format!("/api/application/servers/{}/suspend", server_id),
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn unsuspend_server(&self, server_id: i64) -> Result<(), PanelApiError> {
        self.request(
            Method::POST,
            &format!("/api/application/servers/{}/unsuspend", server_id),
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn delete_server(&self, server_id: i64) -> Result<(), PanelApiError> {
        self.request(
            Method::DELETE,
            &format!("/api/application/servers/{}", server_id),
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn send_power_signal(&self, server_id: i64, signal: &str) -> Result<(), PanelApiError> {
        let body = serde_json::json!({ "signal": signal });
        self.request(
            Method::POST,
            &format!("/api/client/servers/{}/power", server_id),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Application-API attributes of a server.
    pub async fn get_server(&self, server_id: i64) -> Result<Value, PanelApiError> {
        let response = self
            .request(
                Method::GET,
                &format!("/api/application/servers/{}", server_id),
                None,
            )
            .await?;
        Ok(attributes_or_empty(response))
    }

    /// Live resource usage of a server.
    pub async fn server_resources(&self, server_id: i64) -> Result<Value, PanelApiError> {
        let response = self
            .request(
                Method::GET,
                &format!("/api/client/servers/{}/resources", server_id),
                None,
            )
            .await?;
        Ok(attributes_or_empty(response))
    }
}

fn attributes_or_empty(mut response: Value) -> Value {
    response
        .get_mut("attributes")
        .map(Value::take)
        .unwrap_or_else(|| Value::Object(Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> PanelConfig {
        let order = crate::services::panel_config::PanelConfigLayer {
            panel_url: Some(format!("{}/", server.uri())),
            api_key: Some("ptla_test".to_string()),
            ..Default::default()
        };
        PanelConfig::from_layers(&order, &Default::default()).unwrap()
    }

    #[test]
    fn test_lists_decode_without_data() {
        let users: List<PanelUser> = serde_json::from_value(json!({"object": "list"})).unwrap();
        assert!(users.into_attributes().is_empty());

        let nest: Nest = serde_json::from_value(json!({"id": 4})).unwrap();
        assert!(nest.relationships.eggs.data.is_empty());

        let egg: Egg = serde_json::from_value(json!({"id": 3})).unwrap();
        assert_eq!(egg.variables().count(), 0);
    }

    #[tokio::test]
    async fn test_request_sends_auth_and_json_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/application/servers/7"))
            .and(header("Authorization", "Bearer ptla_test"))
            .and(header("Accept", "application/json"))
            .and(header("Content-Type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"attributes": {"id": 7, "name": "mc"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = PanelClient::new(Client::new(), &config_for(&server));
        let attributes = client.get_server(7).await.unwrap();
        assert_eq!(attributes["name"], "mc");
    }

    #[tokio::test]
    async fn test_error_status_carries_details() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/application/servers"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "errors": [{"code": "ValidationException", "detail": "The name field is required."}]
            })))
            .mount(&server)
            .await;

        let client = PanelClient::new(Client::new(), &config_for(&server));
        let err = client
            .request(Method::POST, "/api/application/servers", Some(&json!({})))
            .await
            .unwrap_err();

        match &err {
            PanelApiError::Api { status, details } => {
                assert_eq!(*status, 422);
                assert!(details.is_some());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let message = err.to_string();
        assert!(message.starts_with("Pterodactyl API request failed with HTTP code: 422 - "));
        assert!(message.contains("ValidationException"));
    }

    #[tokio::test]
    async fn test_error_without_body_has_no_suffix() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/application/servers/3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = PanelClient::new(Client::new(), &config_for(&server));
        let err = client.delete_server(3).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Pterodactyl API request failed with HTTP code: 404"
        );
    }

    #[tokio::test]
    async fn test_empty_success_body_is_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/application/servers/3/suspend"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = PanelClient::new(Client::new(), &config_for(&server));
        let value = client
            .request(Method::POST, "/api/application/servers/3/suspend", None)
            .await
            .unwrap();
        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn test_list_follows_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/application/nodes/2/allocations"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"attributes": {"id": 2, "port": 25566, "assigned": false}}],
                "meta": {"pagination": {"current_page": 2, "total_pages": 2}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/application/nodes/2/allocations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"attributes": {"id": 1, "port": 25565, "assigned": true}}],
                "meta": {"pagination": {"current_page": 1, "total_pages": 2}}
            })))
            .mount(&server)
            .await;

        let client = PanelClient::new(Client::new(), &config_for(&server));
        let allocations = client.list_allocations(2).await.unwrap();
        let ids: Vec<i64> = allocations.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_create_allocation_body_and_missing_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/application/nodes/4/allocations"))
            .and(body_json(json!({"ip": "0.0.0.0", "ports": ["25570"]})))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = PanelClient::new(Client::new(), &config_for(&server));
        let err = client
            .create_allocation(4, "0.0.0.0", 25570)
            .await
            .unwrap_err();
        assert!(matches!(err, PanelApiError::MissingData("allocation data")));
    }

    #[tokio::test]
    async fn test_user_filter_is_url_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/application/users"))
            .and(query_param("filter[email]", "a+b@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"attributes": {"id": 11, "email": "a+b@example.com"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PanelClient::new(Client::new(), &config_for(&server));
        let users = client.find_users_by_email("a+b@example.com").await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, 11);
    }

    #[test]
    fn test_egg_variables_decode() {
        let item: Item<Egg> = serde_json::from_value(json!({
            "attributes": {
                "id": 3,
                "docker_image": "ghcr.io/pterodactyl/yolks:java_17",
                "startup": "java -jar {{SERVER_JARFILE}}",
                "relationships": {
                    "variables": {
                        "data": [
                            {"attributes": {"env_variable": "SERVER_JARFILE", "default_value": ""}},
                            {"attributes": {"env_variable": "MAX_PLAYERS", "default_value": 20}}
                        ]
                    }
                }
            }
        }))
        .unwrap();

        let vars: Vec<_> = item.attributes.variables().collect();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].default_value, None);
        assert_eq!(vars[1].default_value.as_deref(), Some("20"));
    }
}
