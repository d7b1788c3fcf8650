// Roost Engine — Team Roster
//
// Members of one room (or every user), with presence and last login
// resolved per member concurrently. Inactive accounts, non-`user` types
// (bots, apps) and the local user are left out.

use crate::atoms::error::ChatResult;
use crate::atoms::traits::ChatApi;
use crate::atoms::types::{Room, User, UserStatus};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TeamMember {
    pub user_id: String,
    pub name: String,
    pub username: Option<String>,
    pub status: UserStatus,
    pub status_text: String,
    pub connection: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub online: usize,
    pub away: usize,
    pub busy: usize,
    pub offline: usize,
}

impl StatusCounts {
    pub fn of(members: &[TeamMember]) -> Self {
        let mut counts = StatusCounts::default();
        for m in members {
            match m.status {
                UserStatus::Online => counts.online += 1,
                UserStatus::Away => counts.away += 1,
                UserStatus::Busy => counts.busy += 1,
                UserStatus::Offline => counts.offline += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.online + self.away + self.busy + self.offline
    }
}

pub fn is_listed(user: &User, local_user_id: &str) -> bool {
    user.active != Some(false)
        && user.user_type.as_deref().map_or(true, |t| t == "user")
        && user.id != local_user_id
}

/// Roster for `room`, or for the whole directory when `room` is `None`.
pub async fn load_roster(api: &dyn ChatApi, room: Option<&Room>, local_user_id: &str) -> ChatResult<Vec<TeamMember>> {
    let source = match room {
        Some(r) => api.members(r).await?,
        None => api.users().await?,
    };
    let listed: Vec<User> = source.into_iter().filter(|u| is_listed(u, local_user_id)).collect();
    info!("[team] Resolving presence for {} members", listed.len());

    let lookups = listed.iter().map(|user| async move {
        let (presence, info) = futures::join!(api.presence(&user.id), api.user_info(&user.id));
        let presence = presence.ok();
        TeamMember {
            user_id: user.id.clone(),
            name: user.display().to_string(),
            username: user.username.clone(),
            status: presence.as_ref().map_or(UserStatus::Offline, |p| p.status()),
            status_text: presence.as_ref().and_then(|p| p.status_text.clone()).unwrap_or_default(),
            connection: presence.as_ref().and_then(|p| p.connection_status.clone()),
            last_login: info.ok().and_then(|i| i.last_login),
        }
    });
    Ok(join_all(lookups).await)
}

pub fn filter_by_status(members: &[TeamMember], status: Option<UserStatus>) -> Vec<&TeamMember> {
    members
        .iter()
        .filter(|m| status.map_or(true, |s| m.status == s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, active: Option<bool>, kind: Option<&str>) -> User {
        User {
            id: id.into(),
            username: Some(id.into()),
            active,
            user_type: kind.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn roster_excludes_inactive_bots_and_self() {
        assert!(is_listed(&user("ana", Some(true), Some("user")), "me"));
        assert!(is_listed(&user("ben", None, None), "me"));
        assert!(!is_listed(&user("old", Some(false), Some("user")), "me"));
        assert!(!is_listed(&user("bot", Some(true), Some("bot")), "me"));
        assert!(!is_listed(&user("me", Some(true), Some("user")), "me"));
    }

    #[test]
    fn counts_and_filter() {
        let member = |id: &str, status| TeamMember {
            user_id: id.into(),
            name: id.into(),
            username: None,
            status,
            status_text: String::new(),
            connection: None,
            last_login: None,
        };
        let roster = vec![
            member("a", UserStatus::Online),
            member("b", UserStatus::Offline),
            member("c", UserStatus::Online),
        ];
        let counts = StatusCounts::of(&roster);
        assert_eq!(counts, StatusCounts { online: 2, away: 0, busy: 0, offline: 1 });
        assert_eq!(counts.total(), 3);
        assert_eq!(filter_by_status(&roster, Some(UserStatus::Online)).len(), 2);
        assert_eq!(filter_by_status(&roster, None).len(), 3);
    }
}
