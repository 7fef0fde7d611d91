//! 큐 영속화 브리지
//!
//! 메모리의 방 상태가 권위 있는 원본이고, 여기는 재시작 후 방을 다시 열 때 쓰는
//! best-effort 사본이다. 쓰기 실패는 호출자가 로그만 남긴다.
//!
//! 기록은 항상 덮어쓰기다. 같은 방의 기록 순서는 엔진이 방 revision으로 정한다.

use crate::error::PersistenceError;
use crate::protocol::Video;
use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// 영속 저장소 경계
pub trait QueueMirror: Send + Sync {
    /// 방의 전체 큐 기록
    fn write_queue<'a>(
        &'a self,
        room_id: &'a str,
        queue: &'a [Video],
    ) -> BoxFuture<'a, Result<(), PersistenceError>>;

    /// 기록된 큐 조회. 기록이 없으면 None
    fn load_queue<'a>(
        &'a self,
        room_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<Video>>, PersistenceError>>;
}

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS room_queues (
    room_id TEXT PRIMARY KEY NOT NULL,
    videos  TEXT NOT NULL DEFAULT '[]'
)";

const UPSERT_QUEUE: &str = "INSERT INTO room_queues (room_id, videos)
VALUES (?1, ?2)
ON CONFLICT(room_id) DO UPDATE SET videos = excluded.videos";

/// SQLite 기반 큐 사본
pub struct SqliteQueueMirror {
    pool: SqlitePool,
}

impl SqliteQueueMirror {
    /// 연결 후 테이블 생성
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;

        tracing::info!(url = %url, "Queue mirror database ready");
        Ok(Self { pool })
    }

    async fn write(&self, room_id: &str, queue: &[Video]) -> Result<(), PersistenceError> {
        let videos = serde_json::to_string(queue)?;
        sqlx::query(UPSERT_QUEUE)
            .bind(room_id)
            .bind(videos)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn load(&self, room_id: &str) -> Result<Option<Vec<Video>>, PersistenceError> {
        let videos: Option<String> =
            sqlx::query_scalar("SELECT videos FROM room_queues WHERE room_id = ?1")
                .bind(room_id)
                .fetch_optional(&self.pool)
                .await?;

        match videos {
            Some(json) => {
                let queue: Vec<Video> = serde_json::from_str(&json)?;
                Ok(Some(queue))
            }
            None => Ok(None),
        }
    }
}

impl QueueMirror for SqliteQueueMirror {
    fn write_queue<'a>(
        &'a self,
        room_id: &'a str,
        queue: &'a [Video],
    ) -> BoxFuture<'a, Result<(), PersistenceError>> {
        self.write(room_id, queue).boxed()
    }

    fn load_queue<'a>(
        &'a self,
        room_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<Video>>, PersistenceError>> {
        self.load(room_id).boxed()
    }
}

/// 메모리 사본 (DATABASE_URL 미설정 시, 테스트)
#[derive(Default)]
pub struct MemoryQueueMirror {
    queues: DashMap<String, Vec<Video>>,
}

impl MemoryQueueMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// 미리 기록된 큐로 시작
    pub fn seeded(room_id: &str, queue: Vec<Video>) -> Self {
        let mirror = Self::new();
        mirror.queues.insert(room_id.to_string(), queue);
        mirror
    }

    pub fn stored(&self, room_id: &str) -> Option<Vec<Video>> {
        self.queues.get(room_id).map(|q| q.value().clone())
    }
}

impl QueueMirror for MemoryQueueMirror {
    fn write_queue<'a>(
        &'a self,
        room_id: &'a str,
        queue: &'a [Video],
    ) -> BoxFuture<'a, Result<(), PersistenceError>> {
        self.queues.insert(room_id.to_string(), queue.to_vec());
        future::ready(Ok(())).boxed()
    }

    fn load_queue<'a>(
        &'a self,
        room_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<Video>>, PersistenceError>> {
        future::ready(Ok(self.stored(room_id))).boxed()
    }
}
