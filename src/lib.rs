//! Watchroom 동기화 서버
//!
//! 방마다 하나의 영상 큐와 재생 상태를 두고, 참여한 모든 연결이 같은 위치를 보도록
//! 동기화한다.

pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod membership;
pub mod persistence;
pub mod protocol;
pub mod room;
pub mod server;
pub mod state;

pub use config::Config;
pub use engine::SyncEngine;
pub use error::{PersistenceError, ProtocolError, SyncError};
pub use state::AppState;
