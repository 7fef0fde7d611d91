//! 방 저장소
//!
//! room_id -> 방 상태. 방마다 별도의 잠금을 두어 같은 방의 연산은 직렬화하고
//! 서로 다른 방은 경합하지 않는다.

use super::state::RoomState;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

/// 방 하나의 칸
///
/// 상태 잠금과 별도로, 영속 사본에 마지막으로 기록한 revision을 둔다. 칸은 방이
/// 살아 있는 동안만 존재하므로 삭제 후 재생성된 방은 0부터 다시 센다.
pub struct RoomSlot {
    state: Arc<Mutex<RoomState>>,
    persisted: Mutex<u64>,
}

/// 방 하나에 대한 잠금 핸들
pub type RoomHandle = Arc<RoomSlot>;

impl RoomSlot {
    fn new(state: RoomState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            persisted: Mutex::new(0),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().await
    }

    pub async fn lock_owned(&self) -> OwnedMutexGuard<RoomState> {
        self.state.clone().lock_owned().await
    }

    /// 사본 기록 순서 잠금. 방 상태 잠금과는 독립적이다
    pub async fn persisted(&self) -> MutexGuard<'_, u64> {
        self.persisted.lock().await
    }
}

#[derive(Default)]
pub struct RoomStore {
    rooms: DashMap<String, RoomHandle>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 방 핸들 조회. 없으면 None
    pub fn get(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms.get(room_id).map(|entry| entry.value().clone())
    }

    /// 무조건 덮어쓰기
    ///
    /// 이미 있는 방이면 같은 잠금 아래에서 내용을 교체하므로 진행 중인 연산과 직렬화된다.
    pub async fn put(&self, room_id: &str, state: RoomState) {
        let existing = self.get(room_id);
        match existing {
            Some(handle) => {
                let mut guard = handle.lock().await;
                let previous = guard.revision();
                *guard = state;
                guard.continue_from(previous);
            }
            None => {
                self.rooms
                    .insert(room_id.to_string(), Arc::new(RoomSlot::new(state)));
            }
        }
    }

    /// 없을 때만 생성. 이 호출이 생성했으면 true
    pub fn create_if_absent(&self, room_id: &str, initial: RoomState) -> bool {
        let mut created = false;
        self.rooms.entry(room_id.to_string()).or_insert_with(|| {
            created = true;
            Arc::new(RoomSlot::new(initial))
        });
        created
    }

    /// 방 제거. 제거된 경우 true
    pub fn delete(&self, room_id: &str) -> bool {
        self.rooms.remove(room_id).is_some()
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// 잠금 아래에서 복사한 상태
    pub async fn snapshot(&self, room_id: &str) -> Option<RoomState> {
        let handle = self.get(room_id)?;
        let state = handle.lock().await.clone();
        Some(state)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
