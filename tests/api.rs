//! HTTP API against live in-process servers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use dynamic_config::store::MemoryStore;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn start(environment: &str) -> (String, Arc<dynamic_config::ConfigService>) {
    let config = test_config(environment);
    let service = build_service(&config, Arc::new(MemoryStore::new(None)), true, environment).await;
    let url = spawn_server(&config, service.clone()).await;
    (url, service)
}

async fn set_value(client: &reqwest::Client, base: &str, section: &str, key: &str, value: Value) -> StatusCode {
    client
        .patch(format!("{}/config/settings/update", base))
        .bearer_auth(ADMIN_KEY)
        .json(&json!({ "name": section, "key": key, "value": value, "comment": "" }))
        .send()
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_settings_read_and_write() {
    let (base, _) = start("dev").await;
    let client = reqwest::Client::new();

    let all: Value = client
        .get(format!("{}/config/settings", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    for name in ["global", "common", "client", "server"] {
        assert!(all.get(name).is_some(), "missing {}", name);
    }

    let unauthorized = client
        .patch(format!("{}/config/settings/update", base))
        .json(&json!({ "name": "global", "key": "motd", "value": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(set_value(&client, &base, "global", "motd", json!("hi")).await, StatusCode::OK);
    assert_eq!(
        set_value(&client, &base, "global", "nested", json!({ "a": 1 })).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        set_value(&client, &base, "missing", "motd", json!("hi")).await,
        StatusCode::NOT_FOUND
    );

    let global: Value = client
        .get(format!("{}/config/settings?name=global&client=launcher-1", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(global["global"]["motd"]["value"], "hi");
    assert!(global["global"].get("nested").is_none());
}

#[tokio::test]
async fn test_remove_value_messages() {
    let (base, _) = start("dev").await;
    let client = reqwest::Client::new();
    set_value(&client, &base, "global", "motd", json!("hi")).await;

    let remove = |key: &'static str| {
        client
            .delete(format!("{}/config/settings/value", base))
            .bearer_auth(ADMIN_KEY)
            .json(&json!({ "name": "global", "key": key }))
            .send()
    };

    let body: Value = remove("motd").await.unwrap().json().await.unwrap();
    assert_eq!(body["message"], "'global.motd' removed.");

    let body: Value = remove("motd").await.unwrap().json().await.unwrap();
    assert_eq!(body["message"], "No records were modified.");
}

#[tokio::test]
async fn test_create_section_is_soft_on_duplicate() {
    let (base, _) = start("dev").await;
    let client = reqwest::Client::new();
    let create = || {
        client
            .post(format!("{}/config/settings/new", base))
            .bearer_auth(ADMIN_KEY)
            .json(&json!({ "name": "billing", "friendlyName": "Billing" }))
            .send()
    };

    assert_eq!(create().await.unwrap().status(), StatusCode::CREATED);
    let again = create().await.unwrap();
    assert_eq!(again.status(), StatusCode::OK);
    let body: Value = again.json().await.unwrap();
    assert_eq!(body["message"], "Section already exists");

    let no_key = client
        .post(format!("{}/config/settings/new", base))
        .json(&json!({ "name": "other", "friendlyName": "Other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(no_key.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_section_token_authorizes_only_its_section() {
    let identity = start_mock_backend(200, r#"{"authorization":{"token":"billing-token"}}"#).await;
    let mut config = test_config("dev");
    config.identity.enabled = true;
    config.identity.base_url = identity.url();
    let service = build_service(&config, Arc::new(MemoryStore::new(None)), true, "dev").await;
    let base = spawn_server(&config, service).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/config/settings/new", base))
        .bearer_auth(ADMIN_KEY)
        .json(&json!({ "name": "billing", "friendlyName": "Billing" }))
        .send()
        .await
        .unwrap();
    let token: Value = client
        .post(format!("{}/config/settings/token", base))
        .bearer_auth(ADMIN_KEY)
        .json(&json!({ "name": "billing" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(token["token"], "billing-token");

    let update = |section: &'static str| {
        client
            .patch(format!("{}/config/settings/update", base))
            .bearer_auth("billing-token")
            .json(&json!({ "name": section, "key": "rate", "value": 5, "comment": "" }))
            .send()
    };
    assert_eq!(update("billing").await.unwrap().status(), StatusCode::OK);
    assert_eq!(update("global").await.unwrap().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_generation_fails_without_identity_service() {
    let (base, _) = start("dev").await;
    let response = reqwest::Client::new()
        .post(format!("{}/config/settings/token", base))
        .bearer_auth(ADMIN_KEY)
        .json(&json!({ "name": "global" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_diff_import_and_export_between_environments() {
    let (dev, _) = start("dev").await;
    let (prod, prod_service) = start("prod").await;
    let client = reqwest::Client::new();

    set_value(&client, &dev, "global", "rate", json!(5)).await;
    set_value(&client, &prod, "global", "rate", json!(9)).await;
    set_value(&client, &prod, "global", "cap", json!(100)).await;

    let wrong_secret = client
        .patch(format!("{}/config/diff", dev))
        .json(&json!({ "sharedSecret": "nope", "environments": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_secret.status(), StatusCode::UNAUTHORIZED);

    let report: Value = client
        .patch(format!("{}/config/diff", dev))
        .json(&json!({
            "sharedSecret": SHARED_SECRET,
            "environments": [prod.clone(), "http://127.0.0.1:1"],
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let diff = report["diff"].as_array().unwrap();
    let keys: Vec<&str> = diff.iter().map(|d| d["key"].as_str().unwrap()).collect();
    assert_eq!(keys, vec!["cap", "rate"]);
    assert_eq!(diff[0]["valuesByEnvironment"]["dev"]["state"], "absent");
    assert_eq!(report["warnings"].as_array().unwrap().len(), 1);

    let outcome: Value = client
        .post(format!("{}/config/export", dev))
        .bearer_auth(ADMIN_KEY)
        .json(&json!({ "envUrl": prod }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(outcome["valuesAdded"], 0);

    // prod → dev adds the missing cap; dev keeps its own rate.
    let outcome: Value = client
        .post(format!("{}/config/import", dev))
        .json(&json!({
            "sharedSecret": SHARED_SECRET,
            "deploymentId": "prod",
            "sections": prod_service.export_sections().await.unwrap(),
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(outcome["sectionsAffected"], 1);
    assert_eq!(outcome["valuesAdded"], 1);

    let global: Value = client
        .get(format!("{}/config/settings?name=global", dev))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(global["global"]["rate"]["value"], 5);
    assert_eq!(global["global"]["cap"]["value"], 100);
    assert!(global["global"]["cap"]["comment"]
        .as_str()
        .unwrap()
        .starts_with("[Imported from prod]"));
}

#[tokio::test]
async fn test_register_and_list_listeners() {
    let (base, _) = start("dev").await;
    let client = reqwest::Client::new();

    let registered: Value = client
        .patch(format!("{}/config/register", base))
        .json(&json!({
            "component": "matchmaking",
            "registrationName": "Matchmaking",
            "service": {
                "callbackBaseUrl": "http://mm:8080",
                "subscriberClientId": "mm-1",
            },
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(registered["settings"]["name"], "matchmaking");

    let listeners: Value = client
        .get(format!("{}/config/listeners", base))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listeners, json!([{ "url": "http://mm:8080", "section": "matchmaking" }]));
}

#[tokio::test]
async fn test_admin_endpoints_and_request_id() {
    let (base, _) = start("dev").await;
    let client = reqwest::Client::new();

    let denied = client.get(format!("{}/admin/status", base)).send().await.unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("{}/admin/status", base))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
    let status: Value = response.json().await.unwrap();
    assert_eq!(status["environment"], "dev");
    assert_eq!(status["role"], "primary");
    assert_eq!(status["sections"], 4);

    let queue: Value = client
        .get(format!("{}/admin/queue", base))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(queue, json!({ "pending": 0, "inFlight": 0, "completed": 0 }));

    let protected = client
        .delete(format!("{}/config/settings", base))
        .bearer_auth(ADMIN_KEY)
        .json(&json!({ "name": "global" }))
        .send()
        .await
        .unwrap();
    assert_eq!(protected.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_hanging_peer_becomes_a_diff_warning() {
    let peer = start_hanging_backend().await;
    let mut config = test_config("dev");
    config.peers.timeout_secs = 1;
    let service = build_service(&config, Arc::new(MemoryStore::new(None)), true, "dev").await;
    service.update_value("global", "rate", json!(5), "").await.unwrap();

    let report = tokio::time::timeout(
        Duration::from_secs(10),
        service.compute_diff(&[peer.url()], None),
    )
    .await
    .expect("diff must not wait past the peer timeout")
    .unwrap();
    assert!(report.diff.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with(&peer.url()));
}

#[tokio::test]
async fn test_diff_against_configured_peers() {
    let (prod, _) = start("prod").await;
    let mut config = test_config("dev");
    config.environment.peers = vec![prod.clone()];
    let service = build_service(&config, Arc::new(MemoryStore::new(None)), true, "dev").await;
    let dev = spawn_server(&config, service).await;
    let client = reqwest::Client::new();

    set_value(&client, &prod, "global", "rate", json!(9)).await;

    let report: Value = client
        .patch(format!("{}/config/diff", dev))
        .json(&json!({ "sharedSecret": SHARED_SECRET, "useConfiguredPeers": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let diff = report["diff"].as_array().unwrap();
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0]["key"], "rate");
    assert_eq!(diff[0]["valuesByEnvironment"][prod.as_str()]["value"], 9);
}
