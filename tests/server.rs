//! Config-driven server lifecycle.

mod common;

use axum::http::StatusCode;
use std::time::Duration;
use tokio::net::TcpListener;

use common::{json_body, spawn_server, Upstream};
use route_proxy::config::parse_config;
use route_proxy::{HttpServer, Shutdown};

fn config_for(upstream: &Upstream) -> String {
    format!(
        r#"
        [listener]
        bind_address = "127.0.0.1:0"

        [[clients]]
        name = "impatient"
        timeout_ms = 1

        [[routes]]
        name = "posts"
        path = "/api/posts/{{postId}}"
        upstream = "http://{addr}/posts/{{postId}}"

        [[routes]]
        name = "files"
        path = "/files/{{**rest}}"
        upstream = "http://{addr}/static/{{rest}}"
        forwarded_headers = false

        [[routes]]
        name = "slow"
        path = "/slow"
        upstream = "http://{addr}/slow"
        client = "impatient"
        "#,
        addr = upstream.addr
    )
}

#[tokio::test]
async fn serves_routes_from_config() {
    let upstream = Upstream::start().await;
    let config = parse_config(&config_for(&upstream)).unwrap();
    let server = spawn_server(HttpServer::new(config).unwrap()).await;

    let posts = reqwest::get(server.url("/api/posts/5")).await.unwrap();
    assert_eq!(posts.status(), StatusCode::OK);
    let echo = json_body(posts).await;
    assert_eq!(echo["path"], "/posts/5");
    assert_eq!(echo["headers"]["x-forwarded-for"], "127.0.0.1");

    let files = reqwest::get(server.url("/files/css/site.css")).await.unwrap();
    let echo = json_body(files).await;
    assert_eq!(echo["path"], "/static/css/site.css");
    assert!(echo["headers"].get("x-forwarded-for").is_none());

    let slow = reqwest::get(server.url("/slow")).await.unwrap();
    assert_eq!(slow.status(), StatusCode::BAD_GATEWAY);

    let missing = reqwest::get(server.url("/nowhere")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn body_limit_rejects_large_requests() {
    let upstream = Upstream::start().await;
    let mut config = parse_config(&config_for(&upstream)).unwrap();
    config.listener.max_request_body_bytes = Some(16);
    let server = spawn_server(HttpServer::new(config).unwrap()).await;

    let response = reqwest::Client::new()
        .post(server.url("/api/posts/1"))
        .body("x".repeat(1024))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn run_returns_after_shutdown() {
    let upstream = Upstream::start().await;
    let config = parse_config(&config_for(&upstream)).unwrap();
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let shutdown = Shutdown::new();

    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));
    shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
