//! 브로드캐스트 게이트웨이
//!
//! 연결별 송신 채널과 방별 구독자 목록을 관리한다. 전송은 fire-and-forget이며
//! 연결마다 `UnboundedSender` 하나를 쓰므로 연결 단위 FIFO가 보장된다.

use crate::protocol::ServerMessage;
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Default)]
pub struct BroadcastGateway {
    /// connection_id -> 송신 채널
    connections: DashMap<String, UnboundedSender<ServerMessage>>,
    /// room_id -> 구독 중인 connection_id
    channels: DashMap<String, HashSet<String>>,
}

impl BroadcastGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: &str, sender: UnboundedSender<ServerMessage>) {
        self.connections.insert(connection_id.to_string(), sender);
    }

    pub fn unregister(&self, connection_id: &str) {
        self.connections.remove(connection_id);
    }

    pub fn subscribe(&self, room_id: &str, connection_id: &str) {
        self.channels
            .entry(room_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    pub fn unsubscribe(&self, room_id: &str, connection_id: &str) {
        self.channels.remove_if_mut(room_id, |_, subscribers| {
            subscribers.remove(connection_id);
            subscribers.is_empty()
        });
    }

    /// 방 채널 제거. 구독 중이던 연결 목록 반환
    pub fn close_channel(&self, room_id: &str) -> Vec<String> {
        self.channels
            .remove(room_id)
            .map(|(_, subscribers)| subscribers.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn subscribers(&self, room_id: &str) -> Vec<String> {
        self.channels
            .get(room_id)
            .map(|subscribers| subscribers.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 방에 메시지 브로드캐스트 (`exclude` 연결 제외). 전달한 연결 수 반환
    pub fn broadcast(&self, room_id: &str, message: &ServerMessage, exclude: Option<&str>) -> usize {
        let mut delivered = 0;
        for connection_id in self.subscribers(room_id) {
            if Some(connection_id.as_str()) == exclude {
                continue;
            }
            if self.unicast(&connection_id, message.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// 특정 연결에게만 전송
    pub fn unicast(&self, connection_id: &str, message: ServerMessage) -> bool {
        match self.connections.get(connection_id) {
            Some(sender) => match sender.send(message) {
                Ok(()) => true,
                Err(_) => {
                    tracing::debug!(connection_id = %connection_id, "Channel closed, dropping message");
                    false
                }
            },
            None => false,
        }
    }
}
