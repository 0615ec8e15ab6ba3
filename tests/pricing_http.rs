//! HTTP pricing gateway against a local axum server.

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use plancost::pipeline::pricing::{fetch_all, fetch_prices, HttpPriceSource};
use plancost::{PriceCategory, PriceSource};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;

/// Serve a fixed set of price endpoints on an ephemeral port.
async fn spawn_price_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/materials",
            get(|| async { Json(json!({"concrete": 2.0, "steel": 50, "wood": 1.5})) }),
        )
        .route(
            "/labor",
            get(|| async { Json(json!({"electrician": 85.0, "plumber": 90.0, "carpenter": 65.0})) }),
        )
        .route(
            "/partial",
            get(|| async { Json(json!({"concrete": "call for quote", "wood": 1.5})) }),
        )
        .route("/array", get(|| async { Json(json!([2.0, 50.0, 1.5])) }))
        .route("/not-json", get(|| async { "concrete=2.0" }))
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database offline") }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({}))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap()
}

#[tokio::test]
async fn fetches_flat_price_objects() {
    let addr = spawn_price_server().await;
    let source = HttpPriceSource::new(
        client(),
        format!("http://{addr}/materials"),
        format!("http://{addr}/labor"),
    );

    let materials = source.fetch(PriceCategory::Materials).await.unwrap();
    assert_eq!(materials.len(), 3);
    assert_eq!(materials.get("steel"), Some(50.0));

    let labor = source.fetch(PriceCategory::Labor).await.unwrap();
    assert_eq!(labor.get("plumber"), Some(90.0));
}

#[tokio::test]
async fn server_error_becomes_labelled_pricing_error() {
    let addr = spawn_price_server().await;
    let url = format!("http://{addr}/broken");
    let err = fetch_prices(&client(), &url, PriceCategory::Materials.error_label())
        .await
        .unwrap_err();
    assert_eq!(err.label, "Error fetching material prices");
    assert_eq!(err.url, url);
    assert!(err.detail.contains("500"), "detail: {}", err.detail);
}

#[tokio::test]
async fn non_object_and_non_json_bodies_are_errors() {
    let addr = spawn_price_server().await;
    let label = PriceCategory::Labor.error_label();

    let err = fetch_prices(&client(), &format!("http://{addr}/array"), label)
        .await
        .unwrap_err();
    assert!(err.detail.contains("an array"), "detail: {}", err.detail);

    let err = fetch_prices(&client(), &format!("http://{addr}/not-json"), label)
        .await
        .unwrap_err();
    assert!(err.detail.contains("invalid JSON"), "detail: {}", err.detail);
}

#[tokio::test]
async fn non_numeric_prices_are_skipped() {
    let addr = spawn_price_server().await;
    let table = fetch_prices(&client(), &format!("http://{addr}/partial"), "x")
        .await
        .unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.get("concrete"), None);
    assert_eq!(table.get("wood"), Some(1.5));
}

#[tokio::test]
async fn timeout_is_a_pricing_error() {
    let addr = spawn_price_server().await;
    let err = fetch_prices(&client(), &format!("http://{addr}/slow"), "Error fetching labor costs")
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Error fetching labor costs: "));
}

#[tokio::test]
async fn unreachable_endpoint_degrades_only_its_category() {
    let addr = spawn_price_server().await;
    // Port 1 on loopback refuses connections.
    let source = HttpPriceSource::new(
        client(),
        format!("http://{addr}/materials"),
        "http://127.0.0.1:1/labor",
    );

    let (materials, labor, warnings) = fetch_all(&source).await;
    assert_eq!(materials.get("concrete"), Some(2.0));
    assert!(labor.is_empty());
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].label, "Error fetching labor costs");
    assert_eq!(warnings[0].url, "http://127.0.0.1:1/labor");
}
