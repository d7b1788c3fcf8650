// Roost Engine — Pinned Messages Dashboard
// Pins gathered across rooms (sequentially), newest first, with the
// "pinned by me" toggle and free-text filter.

use crate::atoms::constants::DASHBOARD_PAGE;
use crate::atoms::traits::ChatApi;
use crate::atoms::types::{Room, RoomMessage};
use crate::engine::search::{sort_newest_first, tag};
use log::warn;

/// Case-insensitive match on message text, author (name or username) and
/// room label. A blank query matches everything.
pub fn matches_query(hit: &RoomMessage, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    let author = hit
        .message
        .author
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or(hit.message.author.username.as_deref())
        .unwrap_or("");
    hit.message.text.to_lowercase().contains(&q)
        || author.to_lowercase().contains(&q)
        || hit.room_name.to_lowercase().contains(&q)
}

/// Pinned messages from `rooms`, or only from `room_id` when given. Rooms
/// that fail are skipped.
pub async fn load_pins(api: &dyn ChatApi, rooms: &[Room], room_id: Option<&str>) -> Vec<RoomMessage> {
    let mut pins = Vec::new();
    for room in rooms.iter().filter(|r| room_id.map_or(true, |id| r.id == id)) {
        match api.pinned_messages(&room.id, DASHBOARD_PAGE, 0).await {
            Ok(messages) => pins.extend(messages.into_iter().map(|m| tag(room, m))),
            Err(e) => warn!("[pins] Could not load pins for #{}: {}", room.label(), e),
        }
    }
    sort_newest_first(&mut pins);
    pins
}

#[derive(Debug, Clone, Default)]
pub struct PinFilter {
    pub query: String,
    /// Keep only pins made by this user id.
    pub pinned_by: Option<String>,
}

pub fn filter_pins<'a>(pins: &'a [RoomMessage], filter: &PinFilter) -> Vec<&'a RoomMessage> {
    pins.iter()
        .filter(|p| match &filter.pinned_by {
            Some(me) => p.message.pinned_by.as_ref().and_then(|u| u.id.as_deref()) == Some(me.as_str()),
            None => true,
        })
        .filter(|p| matches_query(p, &filter.query))
        .collect()
}
