// ── Roost Atoms: Pure Data Types ─────────────────────────────────────────────
// Plain struct/enum definitions for the Rocket.Chat REST shapes the client
// consumes. Atoms layer rule: no I/O, no side effects, no imports from engine/.
//
// Field names follow the wire format through `#[serde(rename)]` so that
// responses deserialize directly; unknown fields are ignored.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ── Timestamps ─────────────────────────────────────────────────────────

/// Rocket.Chat sends timestamps either as ISO-8601 strings (REST) or as
/// `{"$date": <epoch millis>}` objects (EJSON). Accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Iso(DateTime<Utc>),
    Ejson {
        #[serde(rename = "$date")]
        date: i64,
    },
    Millis(i64),
}

impl WireTimestamp {
    fn into_utc(self) -> Option<DateTime<Utc>> {
        match self {
            WireTimestamp::Iso(dt) => Some(dt),
            WireTimestamp::Ejson { date } | WireTimestamp::Millis(date) => {
                Utc.timestamp_millis_opt(date).single()
            }
        }
    }
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<WireTimestamp> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(WireTimestamp::into_utc))
}

// ── Users ──────────────────────────────────────────────────────────────

/// Author reference embedded in messages (`u`, `pinnedBy`, `editedBy`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserRef {
    /// Display name, then username, then "Someone".
    pub fn display(&self) -> &str {
        self.name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.username.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("Someone")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Away,
    Busy,
    Offline,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Online => "online",
            UserStatus::Away => "away",
            UserStatus::Busy => "busy",
            UserStatus::Offline => "offline",
        }
    }

    /// Lenient parse; anything unrecognised is treated as offline.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => UserStatus::Online,
            "away" => UserStatus::Away,
            "busy" => UserStatus::Busy,
            _ => UserStatus::Offline,
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry from `users.list` or `*.members`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(rename = "type", default)]
    pub user_type: Option<String>,
}

impl User {
    pub fn display(&self) -> &str {
        self.name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.username.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Detailed record from `users.info` / `me`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "statusText", default)]
    pub status_text: Option<String>,
    #[serde(rename = "lastLogin", default, deserialize_with = "de_timestamp")]
    pub last_login: Option<DateTime<Utc>>,
}

/// Response body of `users.getPresence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presence {
    #[serde(default = "offline_str")]
    pub presence: String,
    #[serde(rename = "statusText", default)]
    pub status_text: Option<String>,
    #[serde(rename = "connectionStatus", default)]
    pub connection_status: Option<String>,
    #[serde(rename = "lastLogin", default, deserialize_with = "de_timestamp")]
    pub last_login: Option<DateTime<Utc>>,
}

fn offline_str() -> String {
    "offline".into()
}

impl Presence {
    pub fn status(&self) -> UserStatus {
        UserStatus::parse(&self.presence)
    }
}

// ── Rooms ──────────────────────────────────────────────────────────────

/// Room visibility, read once from the `t` field of `rooms.get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RoomKind {
    #[serde(rename = "c")]
    Public,
    #[serde(rename = "p")]
    Private,
    #[serde(rename = "d")]
    Direct,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RoomKind {
    /// REST namespace for history/members calls (`channels`, `groups`, `im`).
    pub fn namespace(&self) -> Option<&'static str> {
        match self {
            RoomKind::Public => Some("channels"),
            RoomKind::Private => Some("groups"),
            RoomKind::Direct => Some("im"),
            RoomKind::Unknown => None,
        }
    }

    /// Probe order when the kind was not reported.
    pub const PROBE_ORDER: [RoomKind; 3] = [RoomKind::Public, RoomKind::Private, RoomKind::Direct];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fname: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(rename = "t", default)]
    pub kind: RoomKind,
    #[serde(rename = "ro", default)]
    pub read_only: bool,
    /// Participant usernames of direct rooms.
    #[serde(default)]
    pub usernames: Vec<String>,
}

impl Room {
    /// `name`, else `fname`, else "Unknown".
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.fname.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("Unknown")
    }
}

// ── Messages ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub title_link: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "rid", default)]
    pub room_id: String,
    #[serde(rename = "msg", default)]
    pub text: String,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub ts: Option<DateTime<Utc>>,
    #[serde(rename = "u", default)]
    pub author: UserRef,
    /// System message type marker (user joined, message pinned…).
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub system_type: Option<String>,
    /// Thread parent id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmid: Option<String>,
    /// Thread reply count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcount: Option<u32>,
    /// Timestamp of the latest thread reply.
    #[serde(default, deserialize_with = "de_timestamp", skip_serializing_if = "Option::is_none")]
    pub tlm: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(rename = "pinnedBy", default, skip_serializing_if = "Option::is_none")]
    pub pinned_by: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
    /// Emoji → reacting usernames. Presence alone classifies the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<serde_json::Value>,
    #[serde(rename = "editedAt", default, deserialize_with = "de_timestamp", skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(rename = "_updatedAt", default, deserialize_with = "de_timestamp", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Message {
    /// System-generated messages carry a type marker.
    pub fn is_system(&self) -> bool {
        self.system_type.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn author_id(&self) -> Option<&str> {
        self.author.id.as_deref().filter(|s| !s.is_empty())
    }
}

/// Drop system messages, keeping regular chat content only.
pub fn without_system(messages: Vec<Message>) -> Vec<Message> {
    messages.into_iter().filter(|m| !m.is_system()).collect()
}

/// A message annotated with the room it was collected from (search, pins,
/// threads gather across rooms).
#[derive(Debug, Clone, Serialize)]
pub struct RoomMessage {
    pub room_id: String,
    pub room_name: String,
    #[serde(flatten)]
    pub message: Message,
}

// ── Auth ───────────────────────────────────────────────────────────────

/// The two header values every authenticated call needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub auth_token: String,
    pub user_id: String,
}

/// Result of a successful `login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub credentials: Credentials,
    pub me: UserInfo,
}

// ── Preferences ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefs {
    pub dnd: bool,
    /// Newest first.
    pub command_history: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_parses_iso_and_ejson_timestamps() {
        let iso: Message = serde_json::from_value(json!({
            "_id": "m1", "rid": "r1", "msg": "hi",
            "ts": "2024-03-01T10:15:00.000Z",
            "u": { "_id": "u1", "username": "ana", "name": "Ana" }
        }))
        .unwrap();
        assert_eq!(iso.ts.unwrap().to_rfc3339(), "2024-03-01T10:15:00+00:00");

        let ejson: Message = serde_json::from_value(json!({
            "_id": "m2", "rid": "r1", "msg": "hi",
            "ts": { "$date": 1_709_288_100_000i64 }
        }))
        .unwrap();
        assert_eq!(ejson.ts, iso.ts);
        assert_eq!(ejson.author, UserRef::default());
    }

    #[test]
    fn system_messages_are_detected_and_filtered() {
        let msgs: Vec<Message> = serde_json::from_value(json!([
            { "_id": "a", "msg": "hello" },
            { "_id": "b", "msg": "", "t": "uj" },
            { "_id": "c", "msg": "pinned", "t": "message_pinned" }
        ]))
        .unwrap();
        let kept = without_system(msgs);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "a");
    }

    #[test]
    fn room_kind_reads_type_marker() {
        let rooms: Vec<Room> = serde_json::from_value(json!([
            { "_id": "1", "name": "general", "t": "c" },
            { "_id": "2", "name": "staff", "t": "p" },
            { "_id": "3", "t": "d", "usernames": ["ana", "ben"] },
            { "_id": "4", "fname": "Livechat", "t": "l" }
        ]))
        .unwrap();
        assert_eq!(rooms[0].kind, RoomKind::Public);
        assert_eq!(rooms[1].kind, RoomKind::Private);
        assert_eq!(rooms[2].kind, RoomKind::Direct);
        assert_eq!(rooms[3].kind, RoomKind::Unknown);
        assert_eq!(rooms[2].label(), "Unknown");
        assert_eq!(rooms[3].label(), "Livechat");
        assert_eq!(RoomKind::Private.namespace(), Some("groups"));
    }

    #[test]
    fn author_display_falls_back() {
        let named = UserRef { id: Some("u".into()), username: Some("ana".into()), name: Some("Ana".into()) };
        let bare = UserRef { id: Some("u".into()), username: Some("ana".into()), name: None };
        assert_eq!(named.display(), "Ana");
        assert_eq!(bare.display(), "ana");
        assert_eq!(UserRef::default().display(), "Someone");
    }

    #[test]
    fn presence_maps_unknown_to_offline() {
        let p: Presence = serde_json::from_value(json!({ "presence": "away" })).unwrap();
        assert_eq!(p.status(), UserStatus::Away);
        let missing: Presence = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.status(), UserStatus::Offline);
    }
}
