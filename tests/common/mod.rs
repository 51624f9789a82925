//! Shared fixtures: a seeded in-memory store and a fake Pterodactyl panel.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Map, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ptero_provisioner::models::{Client, Order};
use ptero_provisioner::services::Provisioner;
use ptero_provisioner::store::MemoryStore;

pub const ORDER_ID: i64 = 100;
pub const CLIENT_ID: i64 = 7;
pub const PANEL_USER_ID: i64 = 21;
pub const ALLOCATION_ID: i64 = 77;
pub const NEST_ID: i64 = 2;
pub const EGG_ID: i64 = 3;
pub const NODE_ID: i64 = 5;
pub const SERVER_ID: i64 = 501;
pub const SERVER_IDENTIFIER: &str = "1a2b3c4d";

pub fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("expected a JSON object")
}

/// Order config pointing at the fake panel, with node 5 and egg 3.
pub fn order_config(panel: &MockServer) -> Map<String, Value> {
    object(json!({
        "panel_url": panel.uri(),
        "api_key": "ptla_test",
        "node_id": NODE_ID,
        "egg_id": EGG_ID,
        "server_name": "Survival",
        "memory": "2048"
    }))
}

/// Store holding one order (100) for client 7 with the given config.
pub async fn seeded_store(config: Map<String, Value>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_order(Order {
            id: ORDER_ID,
            client_id: CLIENT_ID,
            config,
        })
        .await;
    store
        .insert_client(Client {
            id: CLIENT_ID,
            email: Some("player@example.com".to_string()),
            first_name: Some("Steve".to_string()),
            last_name: None,
        })
        .await;
    store
}

pub fn provisioner_for(store: &Arc<MemoryStore>) -> Provisioner {
    Provisioner::new(
        store.clone(),
        store.clone(),
        store.clone(),
        reqwest::Client::new(),
    )
}

// -----------------------------------------------------------------------------
// Panel mocks
// -----------------------------------------------------------------------------

pub async fn mock_no_users(panel: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/application/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": []
        })))
        .mount(panel)
        .await;
}

pub async fn mock_existing_user(panel: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/application/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"object": "user", "attributes": {
                "id": PANEL_USER_ID,
                "email": "player@example.com",
                "username": "player"
            }}]
        })))
        .mount(panel)
        .await;
}

pub async fn mock_create_user(panel: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/application/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "object": "user",
            "attributes": {"id": PANEL_USER_ID, "username": "player"}
        })))
        .mount(panel)
        .await;
}

/// Node 5 with every allocation taken.
pub async fn mock_full_node(panel: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/api/application/nodes/{}/allocations", NODE_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"attributes": {"id": 1, "ip": "0.0.0.0", "port": 25565, "assigned": true}},
                {"attributes": {"id": 2, "ip": "0.0.0.0", "port": 25566, "assigned": true}}
            ],
            "meta": {"pagination": {"total": 2, "current_page": 1, "total_pages": 1}}
        })))
        .mount(panel)
        .await;
}

pub async fn mock_create_allocation(panel: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/api/application/nodes/{}/allocations", NODE_ID)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "object": "list",
            "data": [{"attributes": {"id": ALLOCATION_ID, "port": 25567, "assigned": false}}]
        })))
        .mount(panel)
        .await;
}

/// Nest 2 owning egg 3, whose `SERVER_JARFILE` variable has no default.
pub async fn mock_egg(panel: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/application/nests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"attributes": {"id": 1, "relationships": {"eggs": {"data": [
                    {"attributes": {"id": 1}}
                ]}}}},
                {"attributes": {"id": NEST_ID, "relationships": {"eggs": {"data": [
                    {"attributes": {"id": EGG_ID}}
                ]}}}}
            ]
        })))
        .mount(panel)
        .await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/api/application/nests/{}/eggs/{}",
            NEST_ID, EGG_ID
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "egg",
            "attributes": {
                "id": EGG_ID,
                "docker_image": "ghcr.io/pterodactyl/yolks:java_17",
                "startup": "java -Xms128M -Xmx{{SERVER_MEMORY}}M -jar {{SERVER_JARFILE}}",
                "relationships": {"variables": {"object": "list", "data": [
                    {"attributes": {"env_variable": "SERVER_JARFILE", "default_value": ""}},
                    {"attributes": {"env_variable": "BUILD_NUMBER", "default_value": "latest"}}
                ]}}
            }
        })))
        .mount(panel)
        .await;
}

pub fn created_server_response() -> ResponseTemplate {
    ResponseTemplate::new(201).set_body_json(json!({
        "object": "server",
        "attributes": {"id": SERVER_ID, "identifier": SERVER_IDENTIFIER, "name": "Survival"}
    }))
}

/// Everything a provision call needs up to, but not including, server
/// creation.
pub async fn mock_provision_prerequisites(panel: &MockServer) {
    mock_no_users(panel).await;
    mock_create_user(panel).await;
    mock_full_node(panel).await;
    mock_create_allocation(panel).await;
    mock_egg(panel).await;
}
