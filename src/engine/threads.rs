// Roost Engine — Threads Dashboard
// Thread roots across rooms, newest first by `ts` (falling back to the
// update time); a thread's replies are shown oldest first.

use crate::atoms::constants::DASHBOARD_PAGE;
use crate::atoms::error::ChatResult;
use crate::atoms::traits::ChatApi;
use crate::atoms::types::{Message, Room, RoomMessage};
use crate::engine::search::tag;
use log::warn;
use std::cmp::Reverse;

pub async fn load_threads(api: &dyn ChatApi, rooms: &[Room], room_id: Option<&str>) -> Vec<RoomMessage> {
    let mut threads = Vec::new();
    for room in rooms.iter().filter(|r| room_id.map_or(true, |id| r.id == id)) {
        match api.threads(&room.id, DASHBOARD_PAGE, 0).await {
            Ok(messages) => threads.extend(messages.into_iter().map(|m| tag(room, m))),
            Err(e) => warn!("[threads] Could not load threads for #{}: {}", room.label(), e),
        }
    }
    threads.sort_by_key(|t| Reverse(t.message.ts.or(t.message.updated_at)));
    threads
}

/// Replies under `tmid`, oldest first.
pub async fn thread_messages(api: &dyn ChatApi, tmid: &str) -> ChatResult<Vec<Message>> {
    let mut messages = api.thread_messages(tmid, DASHBOARD_PAGE, 0).await?;
    messages.sort_by_key(|m| m.ts);
    Ok(messages)
}

/// Reply count shown next to a thread root.
pub fn reply_count(root: &Message) -> u32 {
    root.tcount.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_count_defaults_to_zero() {
        assert_eq!(reply_count(&Message::default()), 0);
        assert_eq!(reply_count(&Message { tcount: Some(3), ..Default::default() }), 3);
    }
}
