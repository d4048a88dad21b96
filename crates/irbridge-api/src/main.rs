//! IR Bridge - Extender Hub Control API Server

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use extender_client::{ExtenderClient, DEFAULT_DUTY, DEFAULT_FREQ_KHZ, DEFAULT_REPEAT};
use ir_core::{CommandLibrary, CoordinatorConfig, CoreError, HubCoordinator, NameValue};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod websocket;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<HubCoordinator>,
    pub library: Arc<CommandLibrary>,
    pub client: ExtenderClient,
}

/// API response wrapper using serde_json::Value for flexibility
#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiResponse {
    fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: Some(serde_json::to_value(data).unwrap_or(serde_json::Value::Null)),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

fn error_status(e: &CoreError) -> StatusCode {
    match e {
        CoreError::InvalidName(_) => StatusCode::BAD_REQUEST,
        CoreError::Client(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// System info response
#[derive(Serialize)]
struct SystemInfo {
    name: String,
    version: String,
    hub_hostname: Option<String>,
    hub_firmware: Option<String>,
    hub_mac: Option<String>,
    hub_online: bool,
}

/// Learn request
#[derive(Deserialize)]
struct LearnRequest {
    device_name: NameValue,
    command_name: NameValue,
    timeout_secs: Option<u64>,
}

/// Manual capture request
#[derive(Deserialize)]
struct CaptureRequest {
    timeout_secs: Option<u64>,
}

/// Raw transmit request
#[derive(Deserialize)]
struct SendSignalRequest {
    #[serde(default = "default_freq_khz")]
    freq_khz: u32,
    #[serde(default = "default_duty")]
    duty: u8,
    #[serde(default = "default_repeat")]
    repeat: u32,
    raw: Vec<u32>,
}

fn default_freq_khz() -> u32 {
    DEFAULT_FREQ_KHZ
}

fn default_duty() -> u8 {
    DEFAULT_DUTY
}

fn default_repeat() -> u32 {
    DEFAULT_REPEAT
}

/// Device creation request
#[derive(Deserialize)]
struct DeviceRequest {
    name: NameValue,
}

/// Firmware slot request
#[derive(Deserialize)]
struct SlotRequest {
    name: String,
}

/// Get system info
async fn system_info(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.coordinator.snapshot().await;
    let status = snapshot.status;

    Json(ApiResponse::success(SystemInfo {
        name: "IR Bridge".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        hub_hostname: status.as_ref().map(|s| s.hostname.clone()),
        hub_firmware: status.as_ref().map(|s| s.fw_ver.clone()),
        hub_mac: status.map(|s| s.mac),
        hub_online: snapshot.online,
    }))
}

/// Get the consolidated hub snapshot
async fn hub_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.coordinator.snapshot().await;

    Json(ApiResponse::success(json!({
        "online": snapshot.online,
        "status": snapshot.status,
        "wifi": snapshot.wifi,
        "rx_info": snapshot.rx_info,
        "storage": {
            "used": snapshot.storage.used,
            "max": snapshot.storage.max,
            "available": snapshot.storage.available,
            "percent_used": snapshot.storage.percent_used(),
        },
        "last_capture": snapshot.last_capture,
        "last_capture_at": snapshot.last_capture_at,
        "learning_mode": snapshot.learning_mode,
        "updated_at": snapshot.updated_at,
    })))
}

/// Force an immediate refresh
async fn refresh_hub(State(state): State<AppState>) -> impl IntoResponse {
    match state.coordinator.refresh().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "refreshed": true }))),
        ),
        Err(e) => (StatusCode::BAD_GATEWAY, Json(ApiResponse::error(e.to_string()))),
    }
}

/// Transmit a raw signal
async fn send_signal(
    State(state): State<AppState>,
    Json(req): Json<SendSignalRequest>,
) -> impl IntoResponse {
    match state
        .coordinator
        .send_raw(req.freq_khz, req.duty, req.repeat, req.raw)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({
                "sent": true,
                "freq_khz": req.freq_khz
            }))),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Start learning a command
async fn learn(State(state): State<AppState>, Json(req): Json<LearnRequest>) -> impl IntoResponse {
    let device_name = req.device_name.into_string();
    let command_name = req.command_name.into_string();
    let timeout = req.timeout_secs.map(Duration::from_secs);

    match state
        .coordinator
        .learn_command(&device_name, &command_name, timeout)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({
                "learning": true,
                "device_name": device_name,
                "command_name": command_name
            }))),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Start a manual capture (no filing context)
async fn capture(
    State(state): State<AppState>,
    Json(req): Json<CaptureRequest>,
) -> impl IntoResponse {
    let timeout = req.timeout_secs.map(Duration::from_secs);
    state.coordinator.capture_signal(timeout).await;

    Json(ApiResponse::success(json!({ "learning": true })))
}

/// Cancel learning
async fn learn_stop(State(state): State<AppState>) -> impl IntoResponse {
    state.coordinator.stop_learning().await;
    Json(ApiResponse::success(json!({ "learning": false })))
}

/// List all devices
async fn list_devices(State(state): State<AppState>) -> impl IntoResponse {
    let devices = state.library.list_devices();
    Json(ApiResponse::success(devices))
}

/// Create a device
async fn add_device(
    State(state): State<AppState>,
    Json(req): Json<DeviceRequest>,
) -> impl IntoResponse {
    let name = req.name.into_string();
    match state.library.add_device(&name).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "name": name }))),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Delete a device and its commands
async fn delete_device(
    State(state): State<AppState>,
    Path(device): Path<String>,
) -> impl IntoResponse {
    match state.coordinator.delete_device(&device).await {
        Ok(true) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "deleted": device }))),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Device not found")),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// List a device's commands
async fn list_commands(
    State(state): State<AppState>,
    Path(device): Path<String>,
) -> impl IntoResponse {
    let commands = state.coordinator.list_commands(&device);

    Json(ApiResponse::success(json!({
        "device_name": device,
        "command_count": commands.len(),
        "commands": commands
    })))
}

/// Transmit a stored command
async fn send_command(
    State(state): State<AppState>,
    Path((device, command)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.coordinator.send_command(&device, &command).await {
        Ok(true) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({
                "sent": true,
                "device_name": device,
                "command_name": command
            }))),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Command not found")),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Delete a stored command
async fn delete_command(
    State(state): State<AppState>,
    Path((device, command)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.coordinator.delete_command(&device, &command).await {
        Ok(true) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "deleted": command }))),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Command not found")),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// List the hub's firmware slots
async fn list_slots(State(state): State<AppState>) -> impl IntoResponse {
    match state.client.saved_slots().await {
        Ok(slots) => (StatusCode::OK, Json(ApiResponse::success(slots))),
        Err(e) => (StatusCode::BAD_GATEWAY, Json(ApiResponse::error(e.to_string()))),
    }
}

/// Save the hub's last capture into a named firmware slot
async fn save_slot(
    State(state): State<AppState>,
    Json(req): Json<SlotRequest>,
) -> impl IntoResponse {
    match state.client.save_last(&req.name).await {
        Ok(true) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "saved": req.name }))),
        ),
        Ok(false) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::error("Hub refused to save the capture")),
        ),
        Err(e) => (StatusCode::BAD_GATEWAY, Json(ApiResponse::error(e.to_string()))),
    }
}

/// Transmit the signal in a named firmware slot
async fn send_slot(State(state): State<AppState>, Path(name): Path<String>) -> impl IntoResponse {
    match state.client.send_saved(&name).await {
        Ok(true) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "sent": name }))),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Slot not found")),
        ),
        Err(e) => (StatusCode::BAD_GATEWAY, Json(ApiResponse::error(e.to_string()))),
    }
}

/// Delete a named firmware slot
async fn delete_slot(State(state): State<AppState>, Path(name): Path<String>) -> impl IntoResponse {
    match state.client.delete_saved(&name).await {
        Ok(true) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "deleted": name }))),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Slot not found")),
        ),
        Err(e) => (StatusCode::BAD_GATEWAY, Json(ApiResponse::error(e.to_string()))),
    }
}

/// Clear every firmware slot
async fn clear_slots(State(state): State<AppState>) -> impl IntoResponse {
    match state.client.clear_saved().await {
        Ok(true) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "cleared": true }))),
        ),
        Ok(false) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::error("Hub refused to clear its slots")),
        ),
        Err(e) => (StatusCode::BAD_GATEWAY, Json(ApiResponse::error(e.to_string()))),
    }
}

/// Health check
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket::handle_socket(socket, state))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "irbridge_api=debug,ir_core=debug,extender_client=debug,info".into()
            }),
        )
        .init();

    tracing::info!("Starting IR bridge API server");

    let hub_host = std::env::var("HUB_HOST")
        .map_err(|_| anyhow::anyhow!("HUB_HOST must be set to the hub's hostname or IP"))?;
    let hub_token = std::env::var("HUB_TOKEN").ok();
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
    let http_port: u16 = std::env::var("HTTP_PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()?;

    tracing::info!("Connecting to hub at {}", hub_host);
    let client = ExtenderClient::new(&hub_host, hub_token)?;

    let library_path = std::path::Path::new(&data_dir).join("commands.json");
    let library = Arc::new(CommandLibrary::load(library_path).await);
    tracing::info!(
        "Command library loaded: {} devices, {} commands",
        library.device_count(),
        library.command_count()
    );

    let coordinator = Arc::new(HubCoordinator::new(
        client.clone(),
        library.clone(),
        CoordinatorConfig::default(),
    ));

    // First refresh is best-effort; the hub may still be booting
    match coordinator.refresh().await {
        Ok(()) => {
            let snapshot = coordinator.snapshot().await;
            if let Some(status) = &snapshot.status {
                tracing::info!("Hub {} online, firmware {}", status.hostname, status.fw_ver);
            }
        }
        Err(e) => tracing::warn!("Hub unreachable at startup: {}", e),
    }

    coordinator.start();

    let state = AppState {
        coordinator,
        library,
        client,
    };

    // Build the router
    let app = Router::new()
        .route("/health", get(health))
        .route("/api/v1/system/info", get(system_info))
        .route("/api/v1/hub/snapshot", get(hub_snapshot))
        .route("/api/v1/hub/refresh", post(refresh_hub))
        .route("/api/v1/signal/send", post(send_signal))
        .route("/api/v1/capture", post(capture))
        .route("/api/v1/learn", post(learn))
        .route("/api/v1/learn/stop", post(learn_stop))
        .route("/api/v1/devices", get(list_devices).post(add_device))
        .route("/api/v1/devices/:device", delete(delete_device))
        .route("/api/v1/devices/:device/commands", get(list_commands))
        .route(
            "/api/v1/devices/:device/commands/:command/send",
            post(send_command),
        )
        .route(
            "/api/v1/devices/:device/commands/:command",
            delete(delete_command),
        )
        .route("/api/v1/hub/slots", get(list_slots))
        .route("/api/v1/hub/slots/save", post(save_slot))
        .route("/api/v1/hub/slots/clear", post(clear_slots))
        .route("/api/v1/hub/slots/:name/send", post(send_slot))
        .route("/api/v1/hub/slots/:name", delete(delete_slot))
        // WebSocket
        .route("/ws", get(ws_handler))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], http_port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_fills_transmit_defaults() {
        let req: SendSignalRequest = serde_json::from_str(r#"{"raw":[100,200]}"#).unwrap();
        assert_eq!(req.freq_khz, 38);
        assert_eq!(req.duty, 33);
        assert_eq!(req.repeat, 1);
        assert_eq!(req.raw, vec![100, 200]);
    }

    #[test]
    fn learn_request_accepts_numeric_names() {
        let req: LearnRequest =
            serde_json::from_str(r#"{"device_name":"tv","command_name":123}"#).unwrap();
        assert_eq!(req.device_name.into_string(), "tv");
        assert_eq!(req.command_name.into_string(), "123");
        assert!(req.timeout_secs.is_none());
    }

    #[test]
    fn error_statuses_map_by_kind() {
        let invalid = CoreError::InvalidName("bad".into());
        assert_eq!(error_status(&invalid), StatusCode::BAD_REQUEST);

        let io = CoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(error_status(&io), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
