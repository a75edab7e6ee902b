use crate::types::{
    ErrorBody, ImpulseRequest, ImpulseResponse, ManualRequest, PresetSummary, SelectRequest,
};
use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use visage_core::PushOutcome;
use visage_expression::{FaceHandle, RenderFrame};

/// Shared state for the gateway routes.
#[derive(Clone)]
struct AppState {
    face: FaceHandle,
    /// Number of active WebSocket connections.
    active_ws: Arc<AtomicUsize>,
}

/// The gateway HTTP + WebSocket server.
///
/// Exposes the manual control API and the renderer feed:
/// - `GET /health`, `GET /frame`, `GET /presets`
/// - `POST /impulse`, `POST /preset`, `POST /manual`
/// - `GET /ws`: one JSON frame per publish
pub struct GatewayServer {
    face: FaceHandle,
    active_ws: Arc<AtomicUsize>,
    host: String,
    port: u16,
}

impl GatewayServer {
    pub fn new(face: FaceHandle, host: &str, port: u16) -> Self {
        Self {
            face,
            active_ws: Arc::new(AtomicUsize::new(0)),
            host: host.to_string(),
            port,
        }
    }

    /// Number of active WebSocket connections.
    pub fn active_connections(&self) -> Arc<AtomicUsize> {
        self.active_ws.clone()
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            face: self.face.clone(),
            active_ws: self.active_ws.clone(),
        };

        Router::new()
            .route("/health", get(health))
            .route("/frame", get(current_frame))
            .route("/presets", get(list_presets))
            .route("/impulse", post(push_impulse))
            .route("/preset", post(select_preset))
            .route("/manual", post(set_manual))
            .route("/ws", get(ws_upgrade))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind and serve until the task is dropped or the listener fails.
    pub async fn serve(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Gateway failed to bind {}", addr))?;
        tracing::info!("Gateway listening on {}", addr);
        axum::serve(listener, self.router())
            .await
            .context("Gateway server error")
    }
}

// ============================================================================
// Route handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

async fn current_frame(State(state): State<AppState>) -> Json<RenderFrame> {
    Json(RenderFrame::clone(&state.face.current_frame()))
}

async fn list_presets(State(state): State<AppState>) -> Json<Vec<PresetSummary>> {
    Json(state.face.catalog().iter().map(PresetSummary::from).collect())
}

/// POST /impulse: 200 with the outcome, 404 for an unknown preset.
async fn push_impulse(
    State(state): State<AppState>,
    Json(req): Json<ImpulseRequest>,
) -> (StatusCode, Json<ImpulseResponse>) {
    let outcome = state.face.push_impulse(&req.preset, req.weight, req.duration);
    let status = match outcome {
        PushOutcome::Created | PushOutcome::Merged => StatusCode::OK,
        PushOutcome::UnknownPreset => StatusCode::NOT_FOUND,
        PushOutcome::Rejected => StatusCode::BAD_REQUEST,
    };
    (status, Json(ImpulseResponse { outcome }))
}

/// POST /preset: 204, or 404 for an unknown preset.
async fn select_preset(
    State(state): State<AppState>,
    Json(req): Json<SelectRequest>,
) -> Response {
    if state.face.select_preset(&req.id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error(StatusCode::NOT_FOUND, format!("unknown preset '{}'", req.id))
    }
}

/// POST /manual: 204, or 400 when the path or value is unusable.
async fn set_manual(State(state): State<AppState>, Json(req): Json<ManualRequest>) -> Response {
    match state.face.set_manual_parameter(&req.path, req.value) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

fn error(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

/// GET /ws: WebSocket upgrade.
async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Push every published frame to the client until either side goes away.
/// Inbound messages are ignored apart from close.
async fn handle_ws(socket: WebSocket, state: AppState) {
    state.active_ws.fetch_add(1, Ordering::Relaxed);
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut frames = state.face.subscribe();

    loop {
        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = frames.borrow_and_update().clone();
                let json = match serde_json::to_string(&*frame) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!("Failed to encode frame {}: {}", frame.sequence, e);
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    state.active_ws.fetch_sub(1, Ordering::Relaxed);
}
