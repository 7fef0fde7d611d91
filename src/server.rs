//! HTTP / WebSocket 라우터

use crate::config::Config;
use crate::handlers;
use crate::protocol::{ClientMessage, PlaybackState, ServerMessage, Video};
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// 라우터 설정
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route(
            "/rooms/:room_id",
            get(room_snapshot_handler)
                .post(open_room_handler)
                .delete(delete_room_handler),
        )
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

async fn index_handler() -> Html<&'static str> {
    Html("<h1>Watchroom Sync Server</h1><p>WebSocket endpoint: /ws</p>")
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server": "watchroom-sync",
        "rooms": state.engine.store().len(),
        "bound_connections": state.engine.membership().connection_count(),
        "timestamp": std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }))
}

/// 방 상태 조회 응답
#[derive(Debug, Serialize)]
struct RoomView {
    room: String,
    users: Vec<String>,
    queue: Vec<Video>,
    current_video_index: i64,
    state: PlaybackState,
    time: f64,
}

/// 경로의 방 ID. 앞뒤 공백은 무시하고 비어 있으면 None
fn room_key(raw: &str) -> Option<&str> {
    let room_id = raw.trim();
    (!room_id.is_empty()).then_some(room_id)
}

async fn room_snapshot_handler(
    Path(room_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(room_id) = room_key(&room_id) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match state.engine.snapshot(room_id).await {
        Some(room) => Json(RoomView {
            room: room_id.to_string(),
            users: room.members(),
            queue: room.queue().to_vec(),
            current_video_index: room.current_video_index(),
            state: room.playback(),
            time: room.position(),
        })
        .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// 영속 사본을 시드로 방 초기화
async fn open_room_handler(
    Path(room_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    let Some(room_id) = room_key(&room_id) else {
        return StatusCode::BAD_REQUEST;
    };
    if state.engine.open_room(room_id).await {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

async fn delete_room_handler(
    Path(room_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    let Some(room_id) = room_key(&room_id) else {
        return StatusCode::BAD_REQUEST;
    };
    if state.engine.delete_room(room_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// 상위 인증 계층이 넣어 준 사용자 식별자
fn user_identity(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user_id = user_identity(&headers, &state.config.auth.user_header);
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: Option<String>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // 연결 처리
    let connection_id =
        handlers::handle_connection(state.clone(), tx.clone(), user_id.as_deref()).await;

    // 송신 태스크
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to serialize outbound message"),
            }
        }
    });

    // 수신 처리
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match ClientMessage::parse(&text) {
                Ok(msg) => {
                    handlers::handle_client_message(
                        &state,
                        &connection_id,
                        user_id.as_deref(),
                        &tx,
                        msg,
                    )
                    .await;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Malformed message dropped");
                }
            },
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    // 연결 해제
    handlers::handle_disconnect(state, &connection_id).await;
    send_task.abort();
}
