//! 연결 -> (방, 사용자) 바인딩 관리
//!
//! 한 사용자가 여러 연결(탭)을 가질 수 있으므로 (방, 사용자)별 활성 연결 수를 함께
//! 세어 두고, 마지막 연결이 끊길 때만 퇴장으로 본다.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// 연결 하나의 바인딩
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub room_id: String,
    pub user_id: String,
}

/// 바인딩 해제 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub binding: Binding,
    /// 이 사용자의 이 방 마지막 연결이었는지
    pub last_connection: bool,
}

#[derive(Default)]
pub struct MembershipTracker {
    bindings: DashMap<String, Binding>,
    live: DashMap<(String, String), usize>,
}

impl MembershipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 연결을 방/사용자에 묶는다. 새 바인딩이면 true
    ///
    /// 다른 방에 묶여 있던 연결이면 이전 바인딩의 카운트를 먼저 내린다.
    pub fn bind(&self, connection_id: &str, room_id: &str, user_id: &str) -> bool {
        let binding = Binding {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
        };

        let previous = self
            .bindings
            .insert(connection_id.to_string(), binding.clone());
        if previous.as_ref() == Some(&binding) {
            return false;
        }
        if let Some(previous) = previous {
            self.release(&previous);
        }

        *self
            .live
            .entry((binding.room_id, binding.user_id))
            .or_insert(0) += 1;
        true
    }

    pub fn binding(&self, connection_id: &str) -> Option<Binding> {
        self.bindings.get(connection_id).map(|b| b.value().clone())
    }

    /// 바인딩 해제
    pub fn unbind(&self, connection_id: &str) -> Option<Departure> {
        let (_, binding) = self.bindings.remove(connection_id)?;
        let last_connection = self.release(&binding);
        Some(Departure {
            binding,
            last_connection,
        })
    }

    /// 카운트 감소. 0이 되면 true
    fn release(&self, binding: &Binding) -> bool {
        let key = (binding.room_id.clone(), binding.user_id.clone());
        match self.live.entry(key) {
            Entry::Occupied(mut entry) => {
                if *entry.get() <= 1 {
                    entry.remove();
                    true
                } else {
                    *entry.get_mut() -= 1;
                    false
                }
            }
            Entry::Vacant(_) => true,
        }
    }

    /// 방에 묶인 모든 바인딩 제거 (방 삭제 시). 해제된 connection_id 반환
    pub fn clear_room(&self, room_id: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.bindings.retain(|connection_id, binding| {
            if binding.room_id == room_id {
                removed.push(connection_id.clone());
                false
            } else {
                true
            }
        });
        self.live.retain(|(room, _), _| room != room_id);
        removed
    }

    /// (방, 사용자)의 활성 연결 수
    pub fn live_connections(&self, room_id: &str, user_id: &str) -> usize {
        self.live
            .get(&(room_id.to_string(), user_id.to_string()))
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        self.bindings.len()
    }
}
