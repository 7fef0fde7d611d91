//! 큐 / 재생 제어 핸들러

use crate::error::SyncError;
use crate::protocol::{PlayerEventKind, Video};
use crate::room::ControlKind;
use crate::state::AppState;
use std::sync::Arc;

/// 큐 추가 처리
pub async fn handle_add_to_queue(
    state: Arc<AppState>,
    room_id: &str,
    video_id: &str,
    video_title: Option<String>,
) -> Result<(), SyncError> {
    let video = Video::new(video_id, video_title);
    state.engine.add_to_queue(room_id, video).await
}

/// 특정 영상 재생 처리
pub async fn handle_play_specific_video(
    state: Arc<AppState>,
    room_id: &str,
    index: i64,
) -> Result<(), SyncError> {
    state.engine.play_at(room_id, index).await
}

/// 플레이어 이벤트 처리
pub async fn handle_player_event(
    state: Arc<AppState>,
    connection_id: &str,
    room_id: &str,
    event: PlayerEventKind,
    time: Option<f64>,
) -> Result<(), SyncError> {
    let kind = match event {
        PlayerEventKind::VideoEnded => return state.engine.video_ended(room_id).await,
        PlayerEventKind::Play => ControlKind::Play,
        PlayerEventKind::Pause => ControlKind::Pause,
        PlayerEventKind::Seek => ControlKind::Seek,
    };
    state
        .engine
        .apply_control(connection_id, room_id, kind, time)
        .await
}
