//! Client behavior against an in-process stub hub

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use extender_client::{ClientError, ExtenderClient, SendSignal};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

async fn spawn_stub(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr) -> ExtenderClient {
    ExtenderClient::new(&addr.to_string(), None).unwrap()
}

#[tokio::test]
async fn bearer_token_is_attached() {
    let app = Router::new().route(
        "/api/status",
        get(|headers: HeaderMap| async move {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            Json(json!({ "hostname": auth }))
        }),
    );
    let addr = spawn_stub(app).await;

    let client = ExtenderClient::new(&addr.to_string(), Some("secret".into())).unwrap();
    let status = client.status().await.unwrap();
    assert_eq!(status.hostname, "Bearer secret");
}

#[tokio::test]
async fn requests_without_token_carry_no_auth_header() {
    let app = Router::new().route(
        "/api/status",
        get(|headers: HeaderMap| async move {
            let has_auth = headers.contains_key("authorization");
            Json(json!({ "hostname": if has_auth { "auth" } else { "anon" } }))
        }),
    );
    let addr = spawn_stub(app).await;

    let status = client_for(addr).status().await.unwrap();
    assert_eq!(status.hostname, "anon");
}

#[tokio::test]
async fn unauthorized_maps_to_distinct_error() {
    let app = Router::new().route("/api/status", get(|| async { StatusCode::UNAUTHORIZED }));
    let addr = spawn_stub(app).await;

    let err = client_for(addr).status().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
}

#[tokio::test]
async fn firmware_error_maps_to_unexpected_status() {
    let app = Router::new().route(
        "/api/ir/rxinfo",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let addr = spawn_stub(app).await;

    let err = client_for(addr).rx_info().await.unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedStatus(s) if s.as_u16() == 500));
}

#[tokio::test]
async fn transmit_payload_uses_hz_on_the_wire() {
    let sent: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/api/ir/send",
            post(
                |State(sent): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                    sent.lock().unwrap().push(body);
                    Json(json!({ "status": "ok" }))
                },
            ),
        )
        .with_state(sent.clone());
    let addr = spawn_stub(app).await;

    let signal = SendSignal::from_khz(40, 50, 2, vec![9000, 4500, 560]);
    client_for(addr).send_signal(&signal).await.unwrap();

    let recorded = sent.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0]["freq"], 40_000);
    assert_eq!(recorded[0]["duty"], 50);
    assert_eq!(recorded[0]["repeat"], 2);
    assert_eq!(recorded[0]["raw"], json!([9000, 4500, 560]));
}

#[tokio::test]
async fn slot_acks_compare_status_strings() {
    let app = Router::new()
        .route(
            "/api/ir/save",
            post(|| async { Json(json!({ "status": "saved" })) }),
        )
        .route(
            "/api/ir/clear",
            post(|| async { Json(json!({ "status": "busy" })) }),
        );
    let addr = spawn_stub(app).await;

    let client = client_for(addr);
    assert!(client.save_last("tv power").await.unwrap());
    assert!(!client.clear_saved().await.unwrap());
}

#[tokio::test]
async fn slot_listing_fills_missing_counters() {
    let app = Router::new().route(
        "/api/ir/saved",
        get(|| async { Json(json!({ "count": 2, "names": ["tv power", "tv mute"] })) }),
    );
    let addr = spawn_stub(app).await;

    let slots = client_for(addr).saved_slots().await.unwrap();
    assert_eq!(slots.count, 2);
    assert_eq!(slots.max, 50);
    assert_eq!(slots.names, vec!["tv power", "tv mute"]);
}
