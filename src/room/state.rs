//! 방 상태 머신
//!
//! 큐, 현재 인덱스, 재생 상태, 위치, 멤버 집합을 보관하고 각 이벤트에 대한
//! 전이를 수행한다. I/O는 없다. 잠금과 브로드캐스트는 엔진이 담당한다.

use crate::error::SyncError;
use crate::protocol::{PlaybackState, ServerMessage, StateChange, Video};
use std::collections::BTreeSet;

/// 재생 제어 종류 (`video_ended` 제외)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Play,
    Pause,
    Seek,
}

/// 큐 추가 결과
#[derive(Debug, Clone, PartialEq)]
pub struct Enqueued {
    /// 추가 후 전체 큐
    pub queue: Vec<Video>,
    /// 첫 영상이 추가되어 자동 재생이 시작된 경우의 `load_video`
    pub autoplay: Option<StateChange>,
    /// 이 큐 버전의 revision. 같은 방 안에서 단조 증가
    pub revision: u64,
}

/// 방 하나의 권위 있는 상태
#[derive(Debug, Clone, PartialEq)]
pub struct RoomState {
    queue: Vec<Video>,
    current_index: Option<usize>,
    playback: PlaybackState,
    position: f64,
    members: BTreeSet<String>,
    revision: u64,
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RoomState {
    /// 초기 큐로 방 상태 생성 (큐가 있으면 0번을 일시정지 상태로 선택)
    pub fn new(seed_queue: Vec<Video>) -> Self {
        let current_index = if seed_queue.is_empty() { None } else { Some(0) };
        Self {
            queue: seed_queue,
            current_index,
            playback: PlaybackState::Paused,
            position: 0.0,
            members: BTreeSet::new(),
            revision: 0,
        }
    }

    pub fn queue(&self) -> &[Video] {
        &self.queue
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// 와이어 표현 (-1 = 선택 없음)
    pub fn current_video_index(&self) -> i64 {
        self.current_index.map(|i| i as i64).unwrap_or(-1)
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn members(&self) -> Vec<String> {
        self.members.iter().cloned().collect()
    }

    /// 큐가 바뀔 때마다 1씩 증가
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// 같은 방 핸들 안에서 상태를 교체할 때 revision이 뒤로 가지 않도록 이어받는다
    pub(crate) fn continue_from(&mut self, previous_revision: u64) {
        self.revision = self.revision.max(previous_revision + 1);
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.contains(user_id)
    }

    /// 멤버 추가. 새로 추가된 경우 true
    pub fn add_member(&mut self, user_id: &str) -> bool {
        self.members.insert(user_id.to_string())
    }

    /// 멤버 제거. 실제로 제거된 경우 true
    pub fn remove_member(&mut self, user_id: &str) -> bool {
        self.members.remove(user_id)
    }

    pub fn user_list(&self) -> ServerMessage {
        ServerMessage::UserListUpdate {
            users: self.members(),
        }
    }

    /// 새로 들어온 연결에 보낼 스냅샷
    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::SyncState {
            queue: self.queue.clone(),
            current_video_index: self.current_video_index(),
            state: self.playback,
            time: self.position,
        }
    }

    /// 큐 끝에 영상 추가. 선택된 영상이 없었다면 0번을 바로 재생
    pub fn enqueue(&mut self, video: Video) -> Enqueued {
        self.queue.push(video);
        self.revision += 1;
        let autoplay = if self.current_index.is_none() {
            self.load(0)
        } else {
            None
        };
        Enqueued {
            queue: self.queue.clone(),
            autoplay,
            revision: self.revision,
        }
    }

    /// 지정 인덱스의 영상을 처음부터 재생
    pub fn play_at(&mut self, room_id: &str, index: i64) -> Result<StateChange, SyncError> {
        let len = self.queue.len();
        let invalid = || SyncError::InvalidIndex {
            room_id: room_id.to_string(),
            index,
            len,
        };
        let index = usize::try_from(index).map_err(|_| invalid())?;
        self.load(index).ok_or_else(invalid)
    }

    fn load(&mut self, index: usize) -> Option<StateChange> {
        let video = self.queue.get(index)?;
        let change = StateChange::LoadVideo {
            video_id: video.id.clone(),
            current_video_index: index,
            time: 0.0,
            state: PlaybackState::Playing,
        };
        self.current_index = Some(index);
        self.playback = PlaybackState::Playing;
        self.position = 0.0;
        Some(change)
    }

    /// play / pause / seek 적용
    ///
    /// 시간이 생략되면 play와 seek는 마지막 위치를 유지하고 pause는 0으로 돌아간다.
    pub fn apply_control(
        &mut self,
        room_id: &str,
        kind: ControlKind,
        time: Option<f64>,
    ) -> Result<StateChange, SyncError> {
        match kind {
            ControlKind::Play => {
                if self.current_index.is_none() {
                    return Err(SyncError::NothingSelected(room_id.to_string()));
                }
                self.playback = PlaybackState::Playing;
                self.position = time.unwrap_or(self.position);
                Ok(StateChange::Play {
                    time: self.position,
                })
            }
            ControlKind::Pause => {
                self.playback = PlaybackState::Paused;
                self.position = time.unwrap_or(0.0);
                Ok(StateChange::Pause {
                    time: self.position,
                })
            }
            ControlKind::Seek => {
                self.position = time.unwrap_or(self.position);
                Ok(StateChange::Seek {
                    time: self.position,
                })
            }
        }
    }

    /// 현재 영상 종료: 다음 영상으로 넘어가거나 큐 종료
    pub fn video_ended(&mut self) -> StateChange {
        let next = self.current_index.map(|i| i + 1).unwrap_or(0);
        match self.load(next) {
            Some(change) => change,
            None => {
                self.playback = PlaybackState::Paused;
                StateChange::QueueEnded
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str) -> Video {
        Video::new(id, None)
    }

    #[test]
    fn test_new_room_selection() {
        let empty = RoomState::new(vec![]);
        assert_eq!(empty.current_video_index(), -1);
        assert_eq!(empty.playback(), PlaybackState::Paused);

        let seeded = RoomState::new(vec![video("a"), video("b")]);
        assert_eq!(seeded.current_index(), Some(0));
        assert_eq!(seeded.playback(), PlaybackState::Paused);
        assert_eq!(seeded.position(), 0.0);
    }

    #[test]
    fn test_first_enqueue_autoplays_once() {
        let mut room = RoomState::default();

        let first = room.enqueue(video("v1"));
        assert_eq!(
            first.autoplay,
            Some(StateChange::LoadVideo {
                video_id: "v1".into(),
                current_video_index: 0,
                time: 0.0,
                state: PlaybackState::Playing,
            })
        );
        assert_eq!(room.current_index(), Some(0));
        assert_eq!(room.playback(), PlaybackState::Playing);

        room.apply_control("r", ControlKind::Seek, Some(42.0)).unwrap();
        let second = room.enqueue(video("v2"));
        assert!(second.autoplay.is_none());
        assert_eq!(second.queue.len(), 2);
        assert_eq!((first.revision, second.revision), (1, 2));
        assert_eq!(room.current_index(), Some(0));
        assert_eq!(room.position(), 42.0);
    }

    #[test]
    fn test_play_at_out_of_range_is_untouched() {
        let mut room = RoomState::new(vec![video("a")]);
        let before = room.clone();

        assert!(matches!(
            room.play_at("r", 1),
            Err(SyncError::InvalidIndex { index: 1, len: 1, .. })
        ));
        assert!(room.play_at("r", -1).is_err());
        assert_eq!(room, before);

        assert!(room.play_at("r", 0).is_ok());
        assert_eq!(room.playback(), PlaybackState::Playing);
    }

    #[test]
    fn test_control_default_positions() {
        let mut room = RoomState::new(vec![video("a")]);
        room.apply_control("r", ControlKind::Play, Some(10.0)).unwrap();

        // play: 마지막 위치 유지
        assert_eq!(
            room.apply_control("r", ControlKind::Play, None).unwrap(),
            StateChange::Play { time: 10.0 }
        );
        // seek: 상태는 그대로
        room.apply_control("r", ControlKind::Seek, Some(25.5)).unwrap();
        assert_eq!(room.playback(), PlaybackState::Playing);
        assert_eq!(
            room.apply_control("r", ControlKind::Seek, None).unwrap(),
            StateChange::Seek { time: 25.5 }
        );
        // pause: 생략 시 0
        assert_eq!(
            room.apply_control("r", ControlKind::Pause, None).unwrap(),
            StateChange::Pause { time: 0.0 }
        );
        assert_eq!(room.playback(), PlaybackState::Paused);
    }

    #[test]
    fn test_play_requires_selection() {
        let mut room = RoomState::default();
        assert!(matches!(
            room.apply_control("r", ControlKind::Play, Some(3.0)),
            Err(SyncError::NothingSelected(_))
        ));
        assert_eq!(room.playback(), PlaybackState::Paused);
    }

    #[test]
    fn test_video_ended_advances_then_stops() {
        let mut room = RoomState::new(vec![video("a"), video("b")]);
        room.play_at("r", 0).unwrap();

        let mut expected = room.clone();
        let via_play_at = expected.play_at("r", 1).unwrap();
        assert_eq!(room.video_ended(), via_play_at);
        assert_eq!(room, expected);

        assert_eq!(room.video_ended(), StateChange::QueueEnded);
        assert_eq!(room.playback(), PlaybackState::Paused);
        assert_eq!(room.current_index(), Some(1));
    }

    #[test]
    fn test_members_are_a_set() {
        let mut room = RoomState::default();
        assert!(room.add_member("bob"));
        assert!(!room.add_member("bob"));
        assert!(room.add_member("alice"));
        assert_eq!(room.members(), vec!["alice".to_string(), "bob".to_string()]);
        assert!(room.remove_member("bob"));
        assert!(!room.remove_member("bob"));
    }
}
