// ── Roost Atoms: Traits ────────────────────────────────────────────────────
// Seams between the pure logic and the outside world.
//
//   ChatApi      — the REST operations the reconciler, aggregator and
//                  dashboards consume. Implemented by `RocketChat`; tests
//                  plug in an in-process fake.
//   Notifier     — desktop/terminal notification sink.
//   PrefsBackend — durable key/value storage behind `PrefsStore`.

use crate::atoms::error::ChatResult;
use crate::atoms::types::{Message, Presence, Room, User, UserInfo, UserStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Window and page size for a history fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryQuery {
    pub count: u32,
    pub oldest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

impl HistoryQuery {
    pub fn latest(count: u32) -> Self {
        HistoryQuery { count, oldest: None, latest: None }
    }

    pub fn between(count: u32, oldest: DateTime<Utc>, latest: DateTime<Utc>) -> Self {
        HistoryQuery { count, oldest: Some(oldest), latest: Some(latest) }
    }
}

/// Read-side chat operations. Every message list returned here has already
/// had system messages removed and is ordered as the server sends it
/// (newest first for history).
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn rooms(&self) -> ChatResult<Vec<Room>>;

    async fn history(&self, room: &Room, query: &HistoryQuery) -> ChatResult<Vec<Message>>;

    async fn pinned_messages(&self, room_id: &str, count: u32, offset: u32) -> ChatResult<Vec<Message>>;

    async fn threads(&self, room_id: &str, count: u32, offset: u32) -> ChatResult<Vec<Message>>;

    async fn thread_messages(&self, tmid: &str, count: u32, offset: u32) -> ChatResult<Vec<Message>>;

    async fn search(&self, room_id: &str, text: &str, count: u32, offset: u32) -> ChatResult<Vec<Message>>;

    async fn members(&self, room: &Room) -> ChatResult<Vec<User>>;

    async fn users(&self) -> ChatResult<Vec<User>>;

    async fn presence(&self, user_id: &str) -> ChatResult<Presence>;

    async fn user_info(&self, user_id: &str) -> ChatResult<UserInfo>;

    async fn set_status(&self, status: UserStatus, message: &str) -> ChatResult<()>;
}

/// A notification request for one newly arrived message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Deduplication tag; the message id.
    pub tag: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Durable string key/value storage.
pub trait PrefsBackend: Send + Sync {
    fn get(&self, key: &str) -> ChatResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ChatResult<()>;
    fn remove(&self, key: &str) -> ChatResult<()>;
}
