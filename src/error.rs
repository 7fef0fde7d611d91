//! 에러 타입 정의

use thiserror::Error;

/// 방 상태 머신 연산 실패
///
/// 전송 계층으로는 절대 전달되지 않는다. 디스패처가 로그만 남기고 버린다.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("index {index} out of range for room {room_id} (queue length {len})")]
    InvalidIndex {
        room_id: String,
        index: i64,
        len: usize,
    },

    #[error("room {0} has no video selected")]
    NothingSelected(String),

    #[error("connection {0} is not authenticated")]
    Unauthenticated(String),
}

/// 클라이언트 메시지 파싱/검증 실패
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("field `{0}` must not be blank")]
    BlankField(&'static str),

    #[error("invalid playback time: {0}")]
    InvalidTime(f64),
}

/// 큐 영속화 실패 (항상 비치명적)
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
