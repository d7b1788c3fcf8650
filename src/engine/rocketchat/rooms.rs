// Rooms: subscriptions list, per-kind history and members, channel creation.

use super::{page, take, take_messages, take_required, RocketChat};
use crate::atoms::constants::MEMBERS_PAGE;
use crate::atoms::error::{ChatError, ChatResult};
use crate::atoms::traits::HistoryQuery;
use crate::atoms::types::{Message, Room, RoomKind, User};
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use serde_json::{json, Map, Value};

/// Parameters for `create_channel`.
#[derive(Debug, Clone, Default)]
pub struct NewChannel {
    pub name: String,
    pub private: bool,
    pub read_only: bool,
    /// Usernames invited at creation.
    pub members: Vec<String>,
}

fn iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl RocketChat {
    /// Every room the user is subscribed to.
    pub async fn rooms(&self) -> ChatResult<Vec<Room>> {
        let mut resp = self.get("rooms.get", &[], "Failed to get rooms").await?;
        take(&mut resp, "update")
    }

    pub async fn room_info(&self, room_id: &str) -> ChatResult<Room> {
        let mut resp = self
            .get("rooms.info", &[("roomId", room_id.to_string())], "Failed to get room info")
            .await?;
        take_required(&mut resp, "room", "rooms.info")
    }

    /// Recent history, newest first. The endpoint family follows the room
    /// kind; an unreported kind probes channels → groups → im and returns
    /// the first success.
    pub async fn history(&self, room: &Room, query: &HistoryQuery) -> ChatResult<Vec<Message>> {
        if let Some(ns) = room.kind.namespace() {
            return self.history_in(ns, &room.id, query).await;
        }
        let mut last_err = ChatError::NotFound(format!("room {}", room.id));
        for kind in RoomKind::PROBE_ORDER {
            let Some(ns) = kind.namespace() else { continue };
            match self.history_in(ns, &room.id, query).await {
                Ok(messages) => return Ok(messages),
                Err(e @ ChatError::Auth(_)) => return Err(e),
                Err(e) => {
                    debug!("[rocketchat] {}.history probe for {} failed: {}", ns, room.id, e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    async fn history_in(&self, namespace: &str, room_id: &str, query: &HistoryQuery) -> ChatResult<Vec<Message>> {
        let mut params = vec![("roomId", room_id.to_string()), ("count", query.count.to_string())];
        if let Some(oldest) = &query.oldest {
            params.push(("oldest", iso(oldest)));
        }
        if let Some(latest) = &query.latest {
            params.push(("latest", iso(latest)));
        }
        let endpoint = format!("{}.history", namespace);
        let mut resp = self.get(&endpoint, &params, "Failed to get messages").await?;
        take_messages(&mut resp, "messages")
    }

    /// Room roster. Unknown kinds probe like `history`.
    pub async fn members(&self, room: &Room) -> ChatResult<Vec<User>> {
        let namespaces: Vec<&str> = match room.kind.namespace() {
            Some(ns) => vec![ns],
            None => RoomKind::PROBE_ORDER.iter().filter_map(RoomKind::namespace).collect(),
        };
        let mut last_err = ChatError::NotFound(format!("room {}", room.id));
        for ns in namespaces {
            let endpoint = format!("{}.members", ns);
            let mut params = vec![("roomId", room.id.clone())];
            params.extend(page(MEMBERS_PAGE, 0));
            match self.get(&endpoint, &params, "Failed to get members").await {
                Ok(mut resp) => return take(&mut resp, "members"),
                Err(e @ ChatError::Auth(_)) => return Err(e),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    /// Create a public channel or private group.
    pub async fn create_channel(&self, channel: &NewChannel) -> ChatResult<Room> {
        let name = channel.name.trim().trim_start_matches('#');
        if name.is_empty() {
            return Err(ChatError::Other("Channel name is required.".into()));
        }
        let mut body = Map::new();
        body.insert("name".into(), json!(name));
        if !channel.members.is_empty() {
            body.insert("members".into(), json!(channel.members));
        }
        if channel.read_only {
            body.insert("readOnly".into(), json!(true));
        }
        let (endpoint, key) = if channel.private {
            ("groups.create", "group")
        } else {
            ("channels.create", "channel")
        };
        let mut resp = self
            .post(endpoint, &Value::Object(body), true, "Failed to create channel")
            .await?;
        take_required(&mut resp, key, endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn iso_uses_millis_and_z() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap();
        assert_eq!(iso(&ts), "2024-03-01T10:15:00.000Z");
    }
}
