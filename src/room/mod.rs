//! 방 모듈: 상태 머신과 저장소

pub mod state;
pub mod store;

pub use state::{ControlKind, Enqueued, RoomState};
pub use store::{RoomHandle, RoomSlot, RoomStore};
