//! 클라이언트-서버 메시지 프로토콜 정의

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};

/// 제목이 없는 영상에 붙는 기본 제목
pub const DEFAULT_VIDEO_TITLE: &str = "Untitled";

/// 큐에 들어가는 영상 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_title() -> String {
    DEFAULT_VIDEO_TITLE.to_string()
}

impl Video {
    /// 제목이 비어 있으면 기본 제목을 사용
    pub fn new(id: impl Into<String>, title: Option<String>) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(default_title);
        Self { id: id.into(), title }
    }
}

/// 재생 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackState {
    Playing,
    Paused,
}

/// 플레이어가 보고하는 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerEventKind {
    Play,
    Pause,
    Seek,
    VideoEnded,
}

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    // Connection
    Heartbeat,

    // Room
    Join {
        room: String,
    },

    // Queue
    AddToQueue {
        room: String,
        video_id: String,
        video_title: Option<String>,
    },
    PlaySpecificVideo {
        room: String,
        index: i64,
    },

    // Playback
    PlayerEvent {
        room: String,
        event: PlayerEventKind,
        time: Option<f64>,
    },
}

impl ClientMessage {
    /// 텍스트 프레임을 파싱하고 검증
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str::<ClientMessage>(text)?.validated()
    }

    fn validated(self) -> Result<Self, ProtocolError> {
        match self {
            ClientMessage::Heartbeat => Ok(ClientMessage::Heartbeat),
            ClientMessage::Join { room } => Ok(ClientMessage::Join {
                room: non_blank("room", room)?,
            }),
            ClientMessage::AddToQueue {
                room,
                video_id,
                video_title,
            } => Ok(ClientMessage::AddToQueue {
                room: non_blank("room", room)?,
                video_id: non_blank("video_id", video_id)?,
                video_title,
            }),
            ClientMessage::PlaySpecificVideo { room, index } => {
                Ok(ClientMessage::PlaySpecificVideo {
                    room: non_blank("room", room)?,
                    index,
                })
            }
            ClientMessage::PlayerEvent { room, event, time } => {
                if let Some(t) = time {
                    if !t.is_finite() || t < 0.0 {
                        return Err(ProtocolError::InvalidTime(t));
                    }
                }
                Ok(ClientMessage::PlayerEvent {
                    room: non_blank("room", room)?,
                    event,
                    time,
                })
            }
        }
    }

    /// 로그용 이벤트 이름
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::Heartbeat => "heartbeat",
            ClientMessage::Join { .. } => "join",
            ClientMessage::AddToQueue { .. } => "add_to_queue",
            ClientMessage::PlaySpecificVideo { .. } => "play_specific_video",
            ClientMessage::PlayerEvent { .. } => "player_event",
        }
    }
}

fn non_blank(field: &'static str, value: String) -> Result<String, ProtocolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    // Connection
    Connected {
        socket_id: String,
    },
    HeartbeatAck,

    // Room Events
    UserListUpdate {
        users: Vec<String>,
    },
    SyncState {
        queue: Vec<Video>,
        current_video_index: i64,
        state: PlaybackState,
        time: f64,
    },
    QueueUpdate {
        queue: Vec<Video>,
    },
    StateChange(StateChange),
}

/// `state_change` 페이로드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StateChange {
    Play {
        time: f64,
    },
    Pause {
        time: f64,
    },
    Seek {
        time: f64,
    },
    LoadVideo {
        video_id: String,
        current_video_index: usize,
        time: f64,
        state: PlaybackState,
    },
    QueueEnded,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_add_to_queue_without_title() {
        let msg = ClientMessage::parse(
            r#"{"event":"add_to_queue","data":{"room":" lobby ","video_id":"dQw4w9WgXcQ"}}"#,
        )
        .unwrap();

        match msg {
            ClientMessage::AddToQueue {
                room,
                video_id,
                video_title,
            } => {
                assert_eq!(room, "lobby");
                assert_eq!(video_id, "dQw4w9WgXcQ");
                assert!(video_title.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_player_event() {
        let msg = ClientMessage::parse(
            r#"{"event":"player_event","data":{"room":"r","event":"video_ended"}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::PlayerEvent {
                event: PlayerEventKind::VideoEnded,
                time: None,
                ..
            }
        ));

        let msg = ClientMessage::parse(r#"{"event":"heartbeat"}"#).unwrap();
        assert_eq!(msg.name(), "heartbeat");
    }

    #[test]
    fn test_rejects_malformed_payloads() {
        // video_id 누락
        assert!(matches!(
            ClientMessage::parse(r#"{"event":"add_to_queue","data":{"room":"r"}}"#),
            Err(ProtocolError::Malformed(_))
        ));
        // 알 수 없는 이벤트
        assert!(ClientMessage::parse(r#"{"event":"kick","data":{"room":"r"}}"#).is_err());
        // 빈 방 이름
        assert!(matches!(
            ClientMessage::parse(r#"{"event":"join","data":{"room":"   "}}"#),
            Err(ProtocolError::BlankField("room"))
        ));
        // 음수 시간
        assert!(matches!(
            ClientMessage::parse(
                r#"{"event":"player_event","data":{"room":"r","event":"seek","time":-3.0}}"#
            ),
            Err(ProtocolError::InvalidTime(_))
        ));
    }

    #[test]
    fn test_video_title_placeholder() {
        assert_eq!(Video::new("a", None).title, "Untitled");
        assert_eq!(Video::new("a", Some("  ".into())).title, "Untitled");
        assert_eq!(Video::new("a", Some("Intro".into())).title, "Intro");

        let stored: Video = serde_json::from_value(json!({ "id": "x" })).unwrap();
        assert_eq!(stored.title, "Untitled");
    }

    #[test]
    fn test_outbound_wire_shapes() {
        let load = ServerMessage::StateChange(StateChange::LoadVideo {
            video_id: "v1".into(),
            current_video_index: 0,
            time: 0.0,
            state: PlaybackState::Playing,
        });
        assert_eq!(
            serde_json::to_value(&load).unwrap(),
            json!({
                "event": "state_change",
                "data": {
                    "event": "load_video",
                    "video_id": "v1",
                    "current_video_index": 0,
                    "time": 0.0,
                    "state": "PLAYING"
                }
            })
        );

        let ended = ServerMessage::StateChange(StateChange::QueueEnded);
        assert_eq!(
            serde_json::to_value(&ended).unwrap(),
            json!({ "event": "state_change", "data": { "event": "queue_ended" } })
        );

        let sync = ServerMessage::SyncState {
            queue: vec![],
            current_video_index: -1,
            state: PlaybackState::Paused,
            time: 0.0,
        };
        assert_eq!(
            serde_json::to_value(&sync).unwrap(),
            json!({
                "event": "sync_state",
                "data": { "queue": [], "current_video_index": -1, "state": "PAUSED", "time": 0.0 }
            })
        );
    }
}
