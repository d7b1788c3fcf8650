// Roost Engine — Search
//
// Global search fans `chat.search` out across the first N rooms at once,
// tags every hit with its room and merges the results newest first. A room
// that fails to answer is dropped from the result set.

use crate::atoms::constants::{GLOBAL_SEARCH_PER_ROOM, ROOM_SEARCH_COUNT};
use crate::atoms::error::ChatResult;
use crate::atoms::traits::ChatApi;
use crate::atoms::types::{Message, Room, RoomMessage};
use futures::future::join_all;
use log::{debug, info};
use std::cmp::Reverse;

pub fn tag(room: &Room, message: Message) -> RoomMessage {
    RoomMessage {
        room_id: room.id.clone(),
        room_name: room.label().to_string(),
        message,
    }
}

/// Newest first; undated messages sink to the end.
pub fn sort_newest_first(hits: &mut [RoomMessage]) {
    hits.sort_by_key(|h| Reverse(h.message.ts));
}

pub async fn global_search(api: &dyn ChatApi, rooms: &[Room], text: &str, room_cap: usize) -> Vec<RoomMessage> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    let targets: Vec<&Room> = rooms.iter().take(room_cap).collect();
    info!("[search] '{}' across {} rooms", text, targets.len());

    let requests = targets.iter().map(|room| async move {
        let result = api.search(&room.id, text, GLOBAL_SEARCH_PER_ROOM, 0).await;
        (*room, result)
    });

    let mut hits = Vec::new();
    for (room, result) in join_all(requests).await {
        match result {
            Ok(messages) => hits.extend(messages.into_iter().filter(|m| !m.is_system()).map(|m| tag(room, m))),
            Err(e) => debug!("[search] #{} skipped: {}", room.label(), e),
        }
    }
    sort_newest_first(&mut hits);
    hits
}

/// Search within one room, paged by `offset`.
pub async fn room_search(api: &dyn ChatApi, room: &Room, text: &str, offset: u32) -> ChatResult<Vec<RoomMessage>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let messages = api.search(&room.id, text, ROOM_SEARCH_COUNT, offset).await?;
    let mut hits: Vec<RoomMessage> = messages.into_iter().map(|m| tag(room, m)).collect();
    sort_newest_first(&mut hits);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn sort_puts_newest_first_and_undated_last() {
        let room = Room { id: "r".into(), name: Some("general".into()), ..Default::default() };
        let at = |id: &str, h: Option<u32>| Message {
            id: id.into(),
            ts: h.map(|h| Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()),
            ..Default::default()
        };
        let mut hits = vec![tag(&room, at("a", Some(8))), tag(&room, at("b", None)), tag(&room, at("c", Some(9)))];
        sort_newest_first(&mut hits);
        let ids: Vec<&str> = hits.iter().map(|h| h.message.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(hits[0].room_name, "general");
    }
}
