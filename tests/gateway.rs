//! End-to-end request handling through a running gateway.

mod common;

use std::time::Duration;

use common::*;
use edge_gateway::feed::{ConfigSnapshot, MemorySource};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_empty_feed_answers_404_envelope() {
    let source = MemorySource::with_snapshot(ConfigSnapshot::new(1, "[]"));
    let gateway = start_gateway(&test_config(), &source, 1).await;
    assert!(gateway.registry().current().is_empty());

    let response = reqwest::get(url(&gateway, "/anything/at/all")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers()["content-type"],
        "application/json;charset=UTF-8"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"code": 404, "message": "Service Not Found"}));

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_single_route_is_proxied() {
    let backend = start_echo_backend("svc1").await;
    let source = MemorySource::with_snapshot(snapshot(1, routes(&[route("svc1", "/svc1", backend)])));
    let gateway = start_gateway(&test_config(), &source, 1).await;

    let response = reqwest::get(url(&gateway, "/svc1/x?q=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-backend"], "svc1");
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "svc1 /svc1/x?q=1");

    let other = reqwest::get(url(&gateway, "/other")).await.unwrap();
    assert_eq!(other.status(), StatusCode::NOT_FOUND);
    let body: Value = other.json().await.unwrap();
    assert_eq!(body, json!({"code": 404, "message": "Service Not Found"}));

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_route_filters_rewrite_before_dispatch() {
    let backend = start_echo_backend("orders").await;
    let descriptor = format!(
        r#"[{{"id": "orders", "predicates": ["Path=/orders/**", "Method=GET"],
             "filters": ["StripPrefix=1", "PrefixPath=/api", "AddResponseHeader=X-Route, orders"],
             "uri": "http://{backend}"}}]"#
    );
    let source = MemorySource::with_snapshot(snapshot(1, descriptor));
    let gateway = start_gateway(&test_config(), &source, 1).await;

    let response = reqwest::get(url(&gateway, "/orders/42")).await.unwrap();
    assert_eq!(response.headers()["x-route"], "orders");
    assert_eq!(response.text().await.unwrap(), "orders /api/42");

    let post = reqwest::Client::new()
        .post(url(&gateway, "/orders/42"))
        .send()
        .await
        .unwrap();
    assert_eq!(post.status(), StatusCode::NOT_FOUND);

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_upstream_down_is_bad_gateway() {
    let dead = closed_port().await;
    let source = MemorySource::with_snapshot(snapshot(1, routes(&[route("dead", "/dead", dead)])));
    let gateway = start_gateway(&test_config(), &source, 1).await;

    let response = reqwest::get(url(&gateway, "/dead/x")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"code": 500, "message": "Bad Gateway"}));

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let slow = start_slow_backend(Duration::from_secs(3)).await;
    let source = MemorySource::with_snapshot(snapshot(1, routes(&[route("slow", "/slow", slow)])));
    let gateway = start_gateway(&test_config(), &source, 1).await;

    let response = reqwest::get(url(&gateway, "/slow/x")).await.unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"code": 500, "message": "Gateway Timeout"}));

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_client_disconnect_cancels_upstream_call() {
    let hanging = start_hanging_backend().await;
    let echo = start_echo_backend("echo").await;
    let mut config = test_config();
    config.upstream.request_timeout_secs = 60;
    let source = MemorySource::with_snapshot(snapshot(
        1,
        routes(&[route("hang", "/hang", hanging.addr), route("echo", "/echo", echo)]),
    ));
    let gateway = start_gateway(&config, &source, 1).await;

    let client = reqwest::Client::new();
    let abandoned = tokio::spawn({
        let client = client.clone();
        let target = url(&gateway, "/hang/x");
        async move { client.get(target).send().await }
    });
    wait_until(|| hanging.accepted() == 1).await;
    abandoned.abort();
    let _ = abandoned.await;

    // The upstream connection is dropped long before its 60s deadline.
    wait_until(|| hanging.closed() == 1).await;

    let response = client.get(url(&gateway, "/echo/y")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "echo /echo/y");

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_product_code_filter_rejects_short_paths() {
    let backend = start_echo_backend("gw").await;
    let mut config = test_config();
    config.filters.product_code = true;
    let source = MemorySource::with_snapshot(snapshot(1, routes(&[route("gw", "/gw", backend)])));
    let gateway = start_gateway(&config, &source, 1).await;

    let short = reqwest::get(url(&gateway, "/gw")).await.unwrap();
    assert_eq!(short.status(), StatusCode::BAD_REQUEST);
    let body: Value = short.json().await.unwrap();
    assert_eq!(body, json!({"code": 500, "message": "Invalid request path"}));

    let ok = reqwest::get(url(&gateway, "/gw/p100/items")).await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_inbound_request_id_is_propagated() {
    let backend = start_echo_backend("svc1").await;
    let source = MemorySource::with_snapshot(snapshot(1, routes(&[route("svc1", "/svc1", backend)])));
    let gateway = start_gateway(&test_config(), &source, 1).await;

    let response = reqwest::Client::new()
        .get(url(&gateway, "/svc1/x"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");

    gateway.shutdown();
    gateway.wait().await.unwrap();
}
