//! 애플리케이션 상태 관리

use crate::config::Config;
use crate::engine::SyncEngine;
use crate::persistence::QueueMirror;
use std::sync::Arc;

/// 전역 애플리케이션 상태
pub struct AppState {
    /// 방 동기화 엔진 (방 저장소, 멤버십, 브로드캐스트)
    pub engine: SyncEngine,
    /// 설정
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, mirror: Arc<dyn QueueMirror>) -> Self {
        Self {
            engine: SyncEngine::new(mirror),
            config: Arc::new(config),
        }
    }
}
