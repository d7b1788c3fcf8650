// Roost Engine — Command Interpreter
//
// Slash commands typed into the command palette:
//   /search <text>                    open search with <text>
//   /status <dnd|online|away|busy>    set presence (dnd → busy + DND flag)
//   /join <room>                      switch to a room by name
//
// The first literal prefix that matches wins; anything else is a no-op.
// Every non-blank input is recorded in the command history.

use crate::atoms::constants::DND_STATUS_MESSAGE;
use crate::atoms::error::ChatResult;
use crate::atoms::traits::ChatApi;
use crate::atoms::types::{Room, UserStatus};
use crate::engine::prefs::PrefsStore;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    /// Raw argument; see `StatusChange::from_arg`.
    Status(String),
    Join(String),
}

impl Command {
    /// `None` for input that matches no command.
    pub fn parse(input: &str) -> Option<Command> {
        let input = input.trim_start();
        if let Some(query) = input.strip_prefix("/search ") {
            return Some(Command::Search(query.to_string()));
        }
        if let Some(arg) = input.strip_prefix("/status ") {
            return Some(Command::Status(arg.trim().to_string()));
        }
        if let Some(name) = input.strip_prefix("/join ") {
            let name = name.strip_prefix('#').unwrap_or(name).trim();
            return Some(Command::Join(name.to_string()));
        }
        None
    }
}

/// What `/status <arg>` resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: UserStatus,
    /// New DND flag, or `None` to leave it as is.
    pub dnd: Option<bool>,
    pub message: &'static str,
}

impl StatusChange {
    pub fn from_arg(arg: &str) -> Self {
        match arg {
            "dnd" => StatusChange { status: UserStatus::Busy, dnd: Some(true), message: DND_STATUS_MESSAGE },
            "busy" => StatusChange { status: UserStatus::Busy, dnd: None, message: "" },
            "away" => StatusChange { status: UserStatus::Away, dnd: None, message: "" },
            "online" => StatusChange { status: UserStatus::Online, dnd: Some(false), message: "" },
            _ => StatusChange { status: UserStatus::Online, dnd: None, message: "" },
        }
    }
}

/// Outcome of running one command, for the caller to act on.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    OpenSearch { query: String },
    StatusChanged { status: UserStatus, dnd: bool },
    SwitchRoom { room_id: String, name: String },
    Nothing,
}

pub struct CommandInterpreter {
    api: Arc<dyn ChatApi>,
    prefs: Arc<PrefsStore>,
}

impl CommandInterpreter {
    pub fn new(api: Arc<dyn ChatApi>, prefs: Arc<PrefsStore>) -> Self {
        CommandInterpreter { api, prefs }
    }

    /// Record `input` in the history, then execute it against `rooms`.
    pub async fn run(&self, input: &str, rooms: &[Room]) -> ChatResult<Effect> {
        if let Err(e) = self.prefs.add_command(input) {
            warn!("[commands] Could not record history: {}", e);
        }
        let Some(command) = Command::parse(input) else {
            return Ok(Effect::Nothing);
        };
        info!("[commands] {:?}", command);

        match command {
            Command::Search(query) => Ok(Effect::OpenSearch { query }),
            Command::Status(arg) => {
                let change = StatusChange::from_arg(&arg);
                // The local flag flips even if the server call then fails.
                if let Some(on) = change.dnd {
                    self.prefs.set_dnd(on)?;
                }
                self.api.set_status(change.status, change.message).await?;
                Ok(Effect::StatusChanged { status: change.status, dnd: self.prefs.dnd() })
            }
            Command::Join(name) => Ok(match find_room(rooms, &name) {
                Some(room) => Effect::SwitchRoom { room_id: room.id.clone(), name: room.label().to_string() },
                None => Effect::Nothing,
            }),
        }
    }
}

/// Room whose `name` (or `fname` when unnamed) equals `name` exactly.
pub fn find_room<'a>(rooms: &'a [Room], name: &str) -> Option<&'a Room> {
    if name.is_empty() {
        return None;
    }
    rooms.iter().find(|r| {
        let label = r.name.as_deref().filter(|n| !n.is_empty()).or(r.fname.as_deref());
        label == Some(name)
    })
}

/// Flip do-not-disturb: on → `busy` / "DND", off → `online` / "".
pub async fn toggle_dnd(api: &dyn ChatApi, prefs: &PrefsStore) -> ChatResult<bool> {
    let next = !prefs.dnd();
    prefs.set_dnd(next)?;
    if next {
        api.set_status(UserStatus::Busy, DND_STATUS_MESSAGE).await?;
    } else {
        api.set_status(UserStatus::Online, "").await?;
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_matches_prefixes() {
        assert_eq!(Command::parse("/search release notes"), Some(Command::Search("release notes".into())));
        assert_eq!(Command::parse("/status  away "), Some(Command::Status("away".into())));
        assert_eq!(Command::parse("/join #general "), Some(Command::Join("general".into())));
        assert_eq!(Command::parse("/join ##ops"), Some(Command::Join("#ops".into())));
        assert_eq!(Command::parse("/search"), None);
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("/unknown x"), None);
    }

    #[test]
    fn status_mapping() {
        let dnd = StatusChange::from_arg("dnd");
        assert_eq!((dnd.status, dnd.dnd, dnd.message), (UserStatus::Busy, Some(true), "DND"));
        let online = StatusChange::from_arg("online");
        assert_eq!((online.status, online.dnd), (UserStatus::Online, Some(false)));
        assert_eq!(StatusChange::from_arg("away").dnd, None);
        assert_eq!(StatusChange::from_arg("busy").status, UserStatus::Busy);
        let other = StatusChange::from_arg("sleeping");
        assert_eq!((other.status, other.dnd, other.message), (UserStatus::Online, None, ""));
    }

    #[test]
    fn find_room_uses_name_then_fname() {
        let rooms = vec![
            Room { id: "1".into(), name: Some("general".into()), ..Default::default() },
            Room { id: "2".into(), fname: Some("Design Team".into()), ..Default::default() },
        ];
        assert_eq!(find_room(&rooms, "general").map(|r| r.id.as_str()), Some("1"));
        assert_eq!(find_room(&rooms, "Design Team").map(|r| r.id.as_str()), Some("2"));
        assert!(find_room(&rooms, "random").is_none());
        assert!(find_room(&rooms, "").is_none());
    }
}
