//! 방 참여 핸들러

use crate::error::SyncError;
use crate::state::AppState;
use std::sync::Arc;

/// 방 참여 처리
pub async fn handle_join(
    state: Arc<AppState>,
    connection_id: &str,
    user_id: &str,
    room_id: &str,
) -> Result<(), SyncError> {
    tracing::debug!(connection_id = %connection_id, room_id = %room_id, "handle_join started");
    state.engine.join(connection_id, room_id, user_id).await
}
