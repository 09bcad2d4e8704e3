//! ApiFetcher tests against a mock control plane.
//!
//! # Invariants
//! - A topic is fetched over the network at most once per fetcher
//!   lifetime; errors are never cached.
//! - The UID index is built at most once, regardless of call count.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clusterhc_client::error::ClientError;
use clusterhc_client::{ApiFetcher, models::Database};

fn fetcher_for(server: &MockServer) -> ApiFetcher {
    ApiFetcher::builder()
        .host(server.uri())
        .username("admin".to_string())
        .password(SecretString::new("secret".to_string().into()))
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn nodes_body() -> Value {
    json!([
        {"uid": 1, "addr": "10.0.0.1", "software_version": "7.4.2"},
        {"uid": 2, "addr": "10.0.0.2", "software_version": "7.4.2"},
        {"uid": 3, "addr": "10.0.0.3", "software_version": "7.4.6"}
    ])
}

#[tokio::test]
async fn topic_is_fetched_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nodes_body()))
        .expect(1)
        .mount(&server)
        .await;

    let api = fetcher_for(&server);
    let first = api.get("nodes").await.unwrap();
    let second = api.get("nodes").await.unwrap();
    assert_eq!(*first, *second);
}

#[tokio::test]
async fn requests_carry_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cluster"))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "prod-cluster"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = fetcher_for(&server);
    let name = api.get_value("cluster", "name").await.unwrap();
    assert_eq!(name, json!("prod-cluster"));
}

#[tokio::test]
async fn projections_share_one_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nodes_body()))
        .expect(1)
        .mount(&server)
        .await;

    let api = fetcher_for(&server);

    let versions = api.get_values("nodes", "software_version").await.unwrap();
    assert_eq!(versions.len(), 3);

    let matching = api
        .get_with_value("nodes", "software_version", "7.4.2")
        .await
        .unwrap();
    assert_eq!(matching.len(), 2);

    assert_eq!(api.count_of("nodes").await.unwrap(), 3);
    assert_eq!(api.sum_of("nodes", "uid").await.unwrap(), 6.0);
}

#[tokio::test]
async fn uid_index_is_built_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nodes_body()))
        .expect(1)
        .mount(&server)
        .await;

    let api = fetcher_for(&server);
    assert_eq!(api.resolve_uid("10.0.0.2").await.unwrap(), 2);
    assert_eq!(api.resolve_uid("10.0.0.3").await.unwrap(), 3);

    let err = api.resolve_uid("10.9.9.9").await.unwrap_err();
    assert!(matches!(err, ClientError::UnknownNodeAddress(addr) if addr == "10.9.9.9"));
}

#[tokio::test]
async fn api_errors_propagate_and_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/bdbs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/bdbs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"uid": 1, "name": "db"}])))
        .expect(1)
        .mount(&server)
        .await;

    let api = fetcher_for(&server);

    let err = api.get("bdbs").await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 500, .. }));

    // The failed fetch left no cache entry behind.
    assert_eq!(api.count_of("bdbs").await.unwrap(), 1);
}

#[tokio::test]
async fn missing_key_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cluster"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "prod"})))
        .mount(&server)
        .await;

    let api = fetcher_for(&server);
    let err = api.get_value("cluster", "rack_aware").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn get_as_decodes_typed_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/bdbs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"uid": 7, "name": "sessions", "oss_cluster": true, "shard_list": [4, 5]}
        ])))
        .mount(&server)
        .await;

    let api = fetcher_for(&server);
    let bdbs: Vec<Database> = api.get_as("bdbs").await.unwrap();
    assert_eq!(bdbs.len(), 1);
    assert_eq!(bdbs[0].name, "sessions");
    assert!(bdbs[0].oss_cluster);
}

#[tokio::test]
async fn check_connection_is_memoized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cluster"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "prod"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = fetcher_for(&server);
    assert!(api.check_connection().await);
    assert!(api.check_connection().await);
}

#[tokio::test]
async fn check_connection_converts_failure_to_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cluster"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let api = fetcher_for(&server);
    assert!(!api.check_connection().await);
    assert!(!api.check_connection().await);
}
