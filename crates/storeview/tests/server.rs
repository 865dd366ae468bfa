//! End-to-end tests for the HTTP API against a mock upstream backend.
//!
//! A small Axum app stands in for the storefront REST API so the
//! HTTP record source, bearer auth, and upstream error mapping are all
//! exercised through `POST /views/{name}`.

use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use storeview::config::Config;
use storeview::server::run_server;

const TOKEN_VAR: &str = "STOREVIEW_SERVER_TEST_TOKEN";
const TOKEN: &str = "s3cret";

// ─── Mock upstream ─────────────────────────────────────────────────

async fn upstream_carts() -> Json<Value> {
    Json(json!([
        {"_id": "c1", "productId": "p1", "email": "ann@example.com", "createdAt": "2024-02-01", "quantity": 2},
        {"_id": "c2", "productId": "p2", "email": "ben@example.com", "createdAt": "2024-03-10", "quantity": 1},
        {"_id": "c3", "productId": "p7", "email": "cat@example.com", "createdAt": "2024-03-20", "quantity": 1}
    ]))
}

async fn upstream_products(headers: HeaderMap) -> impl IntoResponse {
    let expected = format!("Bearer {}", TOKEN);
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "unauthorized"})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "data": [
                {"_id": "p1", "name": "Desk Lamp", "newPrice": 40},
                {"_id": "p2", "name": "Chair", "newPrice": 75}
            ]
        })),
    )
}

async fn upstream_broken() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn upstream_scalar() -> Json<Value> {
    Json(json!("not a collection"))
}

// ─── Helpers ───────────────────────────────────────────────────────

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn start_upstream() -> u16 {
    let port = find_free_port();
    let app = Router::new()
        .route("/carts", get(upstream_carts))
        .route("/products", get(upstream_products))
        .route("/broken", get(upstream_broken))
        .route("/scalar", get(upstream_scalar));
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    port
}

fn test_config(upstream_port: u16, port: u16) -> Config {
    let config_content = format!(
        r#"[api]
base_url = "http://127.0.0.1:{upstream_port}"
timeout_secs = 5
token_env = "{TOKEN_VAR}"

[server]
bind = "127.0.0.1:{port}"

[collections.carts]
path = "/carts"

[collections.products]
path = "/products"
records_key = "data"

[collections.broken]
path = "/broken"

[collections.scalar]
path = "/scalar"

[views.carts]
primary = "carts"
secondary = "products"
join_key = "productId"
search_fields = ["email", "joined.name"]
date_field = "createdAt"
amount_field = "joined.newPrice"
quantity_field = "quantity"
page_size = 2

[views.broken]
primary = "broken"

[views.scalar]
primary = "scalar"
"#
    );
    toml::from_str(&config_content).unwrap()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn start_server() -> String {
    std::env::set_var(TOKEN_VAR, TOKEN);

    let upstream_port = start_upstream().await;
    let port = find_free_port();
    let cfg = test_config(upstream_port, port);
    tokio::spawn(async move {
        run_server(&cfg).await.ok();
    });
    wait_for_server(port).await;
    format!("http://127.0.0.1:{}", port)
}

async fn post(base: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
    (status, resp.json().await.unwrap())
}

// ─── Tests ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_and_view_listing() {
    let base = start_server().await;

    let health: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let listing: Value = reqwest::get(format!("{}/views", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = listing["views"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["broken", "carts", "scalar"]);
}

#[tokio::test]
async fn test_view_joins_remote_collections() {
    let base = start_server().await;

    let (status, body) = post(&base, "/views/carts", json!({})).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["total_items"], 3);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["current_page"], 1);
    assert_eq!(body["page_items"][0]["_id"], "c1");
    assert_eq!(body["page_items"][0]["joined"]["name"], "Desk Lamp");
    assert_eq!(body["page_items"][1]["joined"]["newPrice"], 75);
}

#[tokio::test]
async fn test_view_filters_and_clamps() {
    let base = start_server().await;

    let (status, body) = post(
        &base,
        "/views/carts",
        json!({"since": "2024-03-01", "until": "2024-03-31", "page": 7}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 2);
    assert_eq!(body["total_pages"], 1);
    assert_eq!(body["current_page"], 1);

    let (_, body) = post(&base, "/views/carts", json!({"search": "chair"})).await;
    assert_eq!(body["total_items"], 1);
    assert_eq!(body["page_items"][0]["_id"], "c2");
}

#[tokio::test]
async fn test_summary_and_totals() {
    let base = start_server().await;

    let (status, summary) = post(&base, "/views/carts/summary", json!({"by_join": true})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["buckets"]["matched"], 2);
    assert_eq!(summary["buckets"]["unmatched"], 1);
    assert_eq!(summary["total"], 3);

    let (status, totals) = post(&base, "/views/carts/totals", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(totals["total"], 155.0);
    assert_eq!(totals["counted"], 2);
    assert_eq!(totals["missing"], 1);
}

#[tokio::test]
async fn test_client_errors() {
    let base = start_server().await;

    let (status, body) = post(&base, "/views/returns", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, body) = post(&base, "/views/carts", json!({"since": "yesterday"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("since must be YYYY-MM-DD"));

    let (status, body) = post(&base, "/views/carts/summary", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("no status_field"));
}

#[tokio::test]
async fn test_upstream_failures_map_to_bad_gateway() {
    let base = start_server().await;

    let (status, body) = post(&base, "/views/broken", json!({})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "upstream_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("500"));

    let (status, body) = post(&base, "/views/scalar", json!({})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "upstream_error");
}
