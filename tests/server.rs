//! End-to-end tests through the HTTP front end.

use std::net::SocketAddr;

use axum::http::StatusCode;
use metrics_zipper::config::{GroupConfig, ZipperConfig};
use metrics_zipper::{HttpServer, Shutdown};

mod common;

async fn start_zipper(groups: Vec<GroupConfig>) -> (SocketAddr, Shutdown) {
    let mut config = ZipperConfig::default();
    config.groups = groups;
    config.limiter.max_concurrent_per_group = 4;
    config.timeouts.request_secs = 2;

    let server = HttpServer::new(config).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    (addr, shutdown)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_query_served_by_replica() {
    let backend = common::start_programmable_backend(|head| async move {
        let path = head.split_whitespace().nth(1).unwrap_or_default().to_string();
        (200, path)
    })
    .await;
    let (addr, shutdown) = start_zipper(vec![GroupConfig {
        name: "cache".into(),
        servers: vec![backend.clone()],
        max_tries: 1,
    }])
    .await;

    let res = client()
        .get(format!("http://{}/cache/render/?target=a.b", addr))
        .header("x-request-id", "abc")
        .send()
        .await
        .expect("zipper unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("x-served-by").unwrap().to_str().unwrap(), backend);
    assert_eq!(res.headers().get("x-request-id").unwrap(), "abc");
    assert_eq!(res.text().await.unwrap(), "/render/?target=a.b");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_group() {
    let (addr, shutdown) = start_zipper(Vec::new()).await;

    let res = client()
        .get(format!("http://{}/nope/render", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
}

#[tokio::test]
async fn test_error_report_lists_every_try() {
    let a = common::start_mock_backend(404, "").await;
    let b = common::start_mock_backend(404, "").await;
    let (addr, shutdown) = start_zipper(vec![GroupConfig {
        name: "cache".into(),
        servers: vec![a, b],
        max_tries: 1,
    }])
    .await;

    let res = client()
        .get(format!("http://{}/cache/metrics/find/?query=x.*", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["group"], "cache");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3);
    assert_eq!(errors[2], "max tries exceeded");

    shutdown.trigger();
}

#[tokio::test]
async fn test_backend_failure_is_bad_gateway() {
    let dead = common::unused_backend().await;
    let (addr, shutdown) = start_zipper(vec![GroupConfig {
        name: "cache".into(),
        servers: vec![dead],
        max_tries: 2,
    }])
    .await;

    let res = client()
        .get(format!("http://{}/cache/render", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    shutdown.trigger();
}

#[tokio::test]
async fn test_encoded_path_forwarded_verbatim() {
    let backend = common::start_programmable_backend(|head| async move {
        let target = head.split_whitespace().nth(1).unwrap_or_default().to_string();
        (200, target)
    })
    .await;
    let (addr, shutdown) = start_zipper(vec![GroupConfig {
        name: "cache".into(),
        servers: vec![backend],
        max_tries: 1,
    }])
    .await;

    let res = client()
        .get(format!("http://{}/cache/render/a%3Fb%2Fc?target=x", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "/render/a%3Fb%2Fc?target=x");

    shutdown.trigger();
}
