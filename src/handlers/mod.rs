//! 핸들러 모듈
//!
//! 이벤트 종류별 디스패치 테이블. 모든 실패는 여기서 로그로 끝나고 클라이언트에는
//! 아무것도 돌려보내지 않는다.

pub mod connection;
pub mod playback;
pub mod room;

pub use connection::*;
pub use playback::*;
pub use room::*;

use crate::error::SyncError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// 클라이언트 메시지 디스패치
pub async fn handle_client_message(
    state: &Arc<AppState>,
    connection_id: &str,
    user_id: Option<&str>,
    sender: &UnboundedSender<ServerMessage>,
    msg: ClientMessage,
) {
    let event = msg.name();

    if let ClientMessage::Heartbeat = msg {
        handle_heartbeat(sender);
        return;
    }

    let Some(user_id) = user_id else {
        log_outcome(
            connection_id,
            event,
            Err(SyncError::Unauthenticated(connection_id.to_string())),
        );
        return;
    };

    let outcome = match msg {
        ClientMessage::Heartbeat => Ok(()),
        ClientMessage::Join { room } => {
            handle_join(state.clone(), connection_id, user_id, &room).await
        }
        ClientMessage::AddToQueue {
            room,
            video_id,
            video_title,
        } => handle_add_to_queue(state.clone(), &room, &video_id, video_title).await,
        ClientMessage::PlaySpecificVideo { room, index } => {
            handle_play_specific_video(state.clone(), &room, index).await
        }
        ClientMessage::PlayerEvent { room, event, time } => {
            handle_player_event(state.clone(), connection_id, &room, event, time).await
        }
    };

    log_outcome(connection_id, event, outcome);
}

fn log_outcome(connection_id: &str, event: &str, outcome: Result<(), SyncError>) {
    match outcome {
        Ok(()) => {}
        Err(SyncError::RoomNotFound(room_id)) => {
            tracing::warn!(
                connection_id = %connection_id,
                event = event,
                room_id = %room_id,
                "Event for unknown room dropped"
            );
        }
        Err(e) => {
            tracing::debug!(
                connection_id = %connection_id,
                event = event,
                error = %e,
                "Event dropped"
            );
        }
    }
}
