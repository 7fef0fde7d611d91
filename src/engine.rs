//! 방 동기화 엔진
//!
//! 모든 방 연산의 단일 진입점. 연산마다 해당 방의 잠금을 잡고 상태 전이와
//! 브로드캐스트를 같은 잠금 아래에서 수행하므로, 구독자가 받는 이벤트 순서는
//! 상태 변경 순서와 같다. 큐 영속화는 잠금을 놓은 뒤에 수행하고, 방마다 기록한
//! revision보다 오래된 큐는 사본에 쓰지 않는다.

use crate::error::SyncError;
use crate::gateway::BroadcastGateway;
use crate::membership::MembershipTracker;
use crate::persistence::QueueMirror;
use crate::protocol::{ServerMessage, StateChange, Video};
use crate::room::{ControlKind, RoomHandle, RoomSlot, RoomState, RoomStore};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

pub struct SyncEngine {
    store: RoomStore,
    membership: MembershipTracker,
    gateway: BroadcastGateway,
    mirror: Arc<dyn QueueMirror>,
}

impl SyncEngine {
    pub fn new(mirror: Arc<dyn QueueMirror>) -> Self {
        Self {
            store: RoomStore::new(),
            membership: MembershipTracker::new(),
            gateway: BroadcastGateway::new(),
            mirror,
        }
    }

    pub fn store(&self) -> &RoomStore {
        &self.store
    }

    pub fn membership(&self) -> &MembershipTracker {
        &self.membership
    }

    pub fn gateway(&self) -> &BroadcastGateway {
        &self.gateway
    }

    /// 방 잠금 획득
    ///
    /// 잠금을 기다리는 동안 방이 삭제(또는 삭제 후 재생성)되었다면 NotFound.
    async fn lock_room(&self, room_id: &str) -> Result<OwnedMutexGuard<RoomState>, SyncError> {
        self.lock_slot(room_id).await.map(|(_, guard)| guard)
    }

    /// 잠금과 함께 방 칸도 돌려준다
    async fn lock_slot(
        &self,
        room_id: &str,
    ) -> Result<(RoomHandle, OwnedMutexGuard<RoomState>), SyncError> {
        let not_found = || SyncError::RoomNotFound(room_id.to_string());
        let handle = self.store.get(room_id).ok_or_else(not_found)?;
        let guard = handle.lock_owned().await;

        match self.store.get(room_id) {
            Some(current) if Arc::ptr_eq(&current, &handle) => Ok((handle, guard)),
            _ => Err(not_found()),
        }
    }

    /// 방이 없을 때만 초기 큐로 생성. 생성했으면 true
    pub fn initialize(&self, room_id: &str, seed_queue: Vec<Video>) -> bool {
        let seeded = seed_queue.len();
        let created = self.store.create_if_absent(room_id, RoomState::new(seed_queue));
        if created {
            tracing::info!(room_id = %room_id, seeded_videos = seeded, "Room initialized");
        }
        created
    }

    /// 영속 사본에서 큐를 읽어 방을 연다
    ///
    /// 사본을 읽지 못하면 빈 큐로 연다.
    pub async fn open_room(&self, room_id: &str) -> bool {
        if self.store.contains(room_id) {
            return false;
        }

        let seed = match self.mirror.load_queue(room_id).await {
            Ok(queue) => queue.unwrap_or_default(),
            Err(e) => {
                tracing::error!(room_id = %room_id, error = %e, "Failed to load persisted queue");
                Vec::new()
            }
        };

        self.initialize(room_id, seed)
    }

    /// 관리용 삭제. 진행 중인 연산이 끝난 뒤 제거된다
    pub async fn delete_room(&self, room_id: &str) -> bool {
        let Ok(_room) = self.lock_room(room_id).await else {
            return false;
        };

        self.store.delete(room_id);
        let subscribers = self.gateway.close_channel(room_id);
        let unbound = self.membership.clear_room(room_id);

        tracing::info!(
            room_id = %room_id,
            subscribers = subscribers.len(),
            unbound = unbound.len(),
            "Room deleted"
        );
        true
    }

    pub async fn snapshot(&self, room_id: &str) -> Option<RoomState> {
        self.store.snapshot(room_id).await
    }

    /// 방 참여
    ///
    /// 멤버 추가, 구독, 멤버 목록 브로드캐스트, 스냅샷 전송이 모두 같은 잠금 아래에서
    /// 일어나므로 스냅샷 이후의 모든 변경은 이 연결에도 브로드캐스트로 도착한다.
    pub async fn join(
        &self,
        connection_id: &str,
        room_id: &str,
        user_id: &str,
    ) -> Result<(), SyncError> {
        if !self.store.contains(room_id) {
            return Err(SyncError::RoomNotFound(room_id.to_string()));
        }

        if let Some(previous) = self.membership.binding(connection_id) {
            if previous.room_id != room_id {
                tracing::info!(
                    connection_id = %connection_id,
                    from = %previous.room_id,
                    to = %room_id,
                    "Switching rooms"
                );
                self.leave(connection_id).await;
            }
        }

        let mut room = self.lock_room(room_id).await?;

        let new_member = room.add_member(user_id);
        self.membership.bind(connection_id, room_id, user_id);
        self.gateway.subscribe(room_id, connection_id);

        self.gateway.broadcast(room_id, &room.user_list(), None);
        self.gateway.unicast(connection_id, room.snapshot());

        tracing::info!(
            connection_id = %connection_id,
            room_id = %room_id,
            user_id = %user_id,
            new_member = new_member,
            "User joined room"
        );
        Ok(())
    }

    /// 연결 해제
    ///
    /// 사용자의 마지막 연결일 때만 멤버에서 빠지고 목록이 브로드캐스트된다.
    pub async fn leave(&self, connection_id: &str) {
        let Some(binding) = self.membership.binding(connection_id) else {
            return;
        };
        let room_id = binding.room_id;

        let room = self.lock_room(&room_id).await;
        let departure = self.membership.unbind(connection_id);
        self.gateway.unsubscribe(&room_id, connection_id);

        let (Ok(mut room), Some(departure)) = (room, departure) else {
            tracing::debug!(connection_id = %connection_id, room_id = %room_id, "Left a room that no longer exists");
            return;
        };

        let user_id = &departure.binding.user_id;
        if departure.last_connection && room.remove_member(user_id) {
            self.gateway.broadcast(&room_id, &room.user_list(), None);
            tracing::info!(
                connection_id = %connection_id,
                room_id = %room_id,
                user_id = %user_id,
                remaining = room.members().len(),
                "User left room"
            );
        } else {
            tracing::debug!(
                connection_id = %connection_id,
                room_id = %room_id,
                user_id = %user_id,
                "Connection closed, user still present"
            );
        }
    }

    /// 큐에 영상 추가 (첫 영상이면 자동 재생) 후 영속 사본 갱신
    pub async fn add_to_queue(&self, room_id: &str, video: Video) -> Result<(), SyncError> {
        let (slot, revision, queue) = {
            let (slot, mut room) = self.lock_slot(room_id).await?;
            let video_id = video.id.clone();
            let enqueued = room.enqueue(video);

            if let Some(change) = enqueued.autoplay {
                self.broadcast_change(room_id, change, None);
            }
            self.gateway.broadcast(
                room_id,
                &ServerMessage::QueueUpdate {
                    queue: enqueued.queue.clone(),
                },
                None,
            );
            tracing::info!(
                room_id = %room_id,
                video_id = %video_id,
                queue_len = enqueued.queue.len(),
                "Video added to queue"
            );
            (slot, enqueued.revision, enqueued.queue)
        };

        self.persist(&slot, room_id, revision, &queue).await;
        Ok(())
    }

    /// 방 칸의 기록 순서 잠금 아래에서 사본 갱신
    ///
    /// 이미 더 새로운 revision이 기록되었으면 건너뛴다. 실패한 기록은 revision을
    /// 올리지 않는다.
    async fn persist(&self, slot: &RoomSlot, room_id: &str, revision: u64, queue: &[Video]) {
        let mut persisted = slot.persisted().await;
        if *persisted >= revision {
            tracing::debug!(
                room_id = %room_id,
                revision = revision,
                persisted = *persisted,
                "Skipped stale queue write"
            );
            return;
        }

        match self.mirror.write_queue(room_id, queue).await {
            Ok(()) => {
                *persisted = revision;
                tracing::debug!(room_id = %room_id, revision = revision, queue_len = queue.len(), "Persisted queue");
            }
            Err(e) => {
                tracing::error!(room_id = %room_id, revision = revision, error = %e, "Failed to persist queue");
            }
        }
    }

    /// 지정 인덱스 재생. 범위를 벗어나면 아무 변화 없음
    pub async fn play_at(&self, room_id: &str, index: i64) -> Result<(), SyncError> {
        let mut room = self.lock_room(room_id).await?;
        let change = room.play_at(room_id, index)?;
        self.broadcast_change(room_id, change, None);
        Ok(())
    }

    /// play / pause / seek. 보낸 연결은 이미 그 상태이므로 제외하고 브로드캐스트
    pub async fn apply_control(
        &self,
        connection_id: &str,
        room_id: &str,
        kind: ControlKind,
        time: Option<f64>,
    ) -> Result<(), SyncError> {
        let mut room = self.lock_room(room_id).await?;
        let change = room.apply_control(room_id, kind, time)?;
        self.broadcast_change(room_id, change, Some(connection_id));
        Ok(())
    }

    /// 현재 영상 종료: 다음 영상 또는 큐 종료
    pub async fn video_ended(&self, room_id: &str) -> Result<(), SyncError> {
        let mut room = self.lock_room(room_id).await?;
        let change = room.video_ended();
        self.broadcast_change(room_id, change, None);
        Ok(())
    }

    fn broadcast_change(&self, room_id: &str, change: StateChange, exclude: Option<&str>) {
        match &change {
            StateChange::LoadVideo {
                video_id,
                current_video_index,
                ..
            } => {
                tracing::info!(
                    room_id = %room_id,
                    index = current_video_index,
                    video_id = %video_id,
                    "Now playing"
                );
            }
            StateChange::QueueEnded => {
                tracing::info!(room_id = %room_id, "Queue ended");
            }
            other => {
                tracing::debug!(room_id = %room_id, change = ?other, "Playback control applied");
            }
        }
        self.gateway
            .broadcast(room_id, &ServerMessage::StateChange(change), exclude);
    }
}
