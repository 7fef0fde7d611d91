//! 연결 핸들러

use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// 새 연결 처리
pub async fn handle_connection(
    state: Arc<AppState>,
    sender: UnboundedSender<ServerMessage>,
    user_id: Option<&str>,
) -> String {
    let connection_id = Uuid::new_v4().to_string();

    state.engine.gateway().register(&connection_id, sender.clone());

    let _ = sender.send(ServerMessage::Connected {
        socket_id: connection_id.clone(),
    });

    tracing::info!(
        connection_id = %connection_id,
        user_id = ?user_id,
        "New connection established"
    );
    connection_id
}

/// 연결 해제 처리
pub async fn handle_disconnect(state: Arc<AppState>, connection_id: &str) {
    state.engine.leave(connection_id).await;
    state.engine.gateway().unregister(connection_id);
    tracing::info!(connection_id = %connection_id, "Connection closed");
}

/// Heartbeat 처리
pub fn handle_heartbeat(sender: &UnboundedSender<ServerMessage>) {
    let _ = sender.send(ServerMessage::HeartbeatAck);
}
