// Workspace-wide report over the first N rooms.

use super::{average_per_day, hour_buckets, hour_of, peak_hour, username_of, HourBucket, InsightsOptions, Tally, TimeRange};
use crate::atoms::constants::{HOURS_PER_DAY, TOP_CHANNELS, TOP_CONTRIBUTORS};
use crate::atoms::error::ChatResult;
use crate::atoms::traits::ChatApi;
use crate::atoms::types::{Message, Room};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopContributor {
    pub user_id: String,
    pub username: String,
    pub message_count: usize,
    /// Distinct rooms the user posted in.
    pub channel_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub room_id: String,
    pub name: String,
    pub message_count: usize,
    pub unique_users: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

/// A room whose history could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRoom {
    pub room_id: String,
    pub room_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceInsights {
    pub time_range: TimeRange,
    pub total_messages: usize,
    pub average_per_day: u64,
    pub peak_hour: usize,
    pub top_contributors: Vec<TopContributor>,
    pub popular_channels: Vec<ChannelStats>,
    pub active_hours: Vec<HourBucket>,
    pub channel_activity: Vec<ChannelStats>,
    pub skipped: Vec<SkippedRoom>,
}

struct UserAcc {
    user_id: String,
    username: String,
    messages: usize,
    rooms: HashSet<String>,
}

/// Walk the first `room_cap` rooms sequentially and fold their in-range
/// history into one report. Only a room-list failure is fatal; a room whose
/// history fails lands in `skipped` and contributes nothing.
pub async fn aggregate(api: &dyn ChatApi, range: TimeRange, opts: &InsightsOptions) -> ChatResult<WorkspaceInsights> {
    let rooms = api.rooms().await?;
    let query = range.query(opts.history_count, opts.now());
    info!("[insights] Analyzing {} of {} rooms over {}", rooms.len().min(opts.room_cap), rooms.len(), range);

    let mut acc = Accumulator::default();
    for room in rooms.iter().take(opts.room_cap) {
        match api.history(room, &query).await {
            Ok(messages) => acc.add_room(room, &messages, opts),
            Err(e) => {
                warn!("[insights] Could not analyze #{}: {}", room.label(), e);
                acc.skipped.push(SkippedRoom {
                    room_id: room.id.clone(),
                    room_name: room.label().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(acc.finish(range))
}

struct Accumulator {
    total: usize,
    hours: [usize; HOURS_PER_DAY],
    users: Tally<String, UserAcc>,
    channels: Vec<ChannelStats>,
    skipped: Vec<SkippedRoom>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Accumulator {
            total: 0,
            hours: [0; HOURS_PER_DAY],
            users: Tally::new(),
            channels: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl Accumulator {
    fn add_room(&mut self, room: &Room, messages: &[Message], opts: &InsightsOptions) {
        self.total += messages.len();

        let mut room_users: HashSet<&str> = HashSet::new();
        let mut last_activity: Option<DateTime<Utc>> = None;
        for message in messages {
            if let Some(ts) = message.ts {
                self.hours[hour_of(&ts, &opts.offset)] += 1;
                last_activity = Some(last_activity.map_or(ts, |cur| cur.max(ts)));
            }
            let Some(user_id) = message.author_id() else { continue };
            room_users.insert(user_id);
            let user = self.users.entry(user_id.to_string(), || UserAcc {
                user_id: user_id.to_string(),
                username: username_of(message),
                messages: 0,
                rooms: HashSet::new(),
            });
            user.messages += 1;
            user.rooms.insert(room.id.clone());
        }

        self.channels.push(ChannelStats {
            room_id: room.id.clone(),
            name: room.label().to_string(),
            message_count: messages.len(),
            unique_users: room_users.len(),
            last_activity,
        });
    }

    fn finish(self, range: TimeRange) -> WorkspaceInsights {
        let mut contributors: Vec<TopContributor> = self
            .users
            .into_values()
            .into_iter()
            .map(|u| TopContributor {
                user_id: u.user_id,
                username: u.username,
                message_count: u.messages,
                channel_count: u.rooms.len(),
            })
            .collect();
        contributors.sort_by(|a, b| b.message_count.cmp(&a.message_count));
        contributors.truncate(TOP_CONTRIBUTORS);

        let mut popular = self.channels.clone();
        popular.sort_by(|a, b| b.message_count.cmp(&a.message_count));
        popular.truncate(TOP_CHANNELS);

        WorkspaceInsights {
            time_range: range,
            total_messages: self.total,
            average_per_day: average_per_day(self.total, range),
            peak_hour: peak_hour(&self.hours),
            top_contributors: contributors,
            popular_channels: popular,
            active_hours: hour_buckets(&self.hours),
            channel_activity: self.channels,
            skipped: self.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::UserRef;
    use chrono::TimeZone;

    fn msg(id: &str, author: &str, hour: u32) -> Message {
        Message {
            id: id.into(),
            ts: Some(Utc.with_ymd_and_hms(2024, 3, 5, hour, 0, 0).unwrap()),
            author: UserRef { id: Some(author.into()), username: Some(author.into()), name: None },
            ..Default::default()
        }
    }

    fn room(id: &str, name: &str) -> Room {
        Room { id: id.into(), name: Some(name.into()), ..Default::default() }
    }

    #[test]
    fn accumulator_tracks_users_rooms_and_hours() {
        let opts = InsightsOptions::utc();
        let mut acc = Accumulator::default();
        acc.add_room(&room("r1", "general"), &[msg("1", "ana", 9), msg("2", "ben", 9), msg("3", "ana", 14)], &opts);
        acc.add_room(&room("r2", "dev"), &[msg("4", "ana", 14), msg("5", "ana", 14)], &opts);
        let report = acc.finish(TimeRange::Week);

        assert_eq!(report.total_messages, 5);
        assert_eq!(report.average_per_day, 1);
        assert_eq!(report.peak_hour, 14);
        assert_eq!(report.active_hours[9].count, 2);
        assert_eq!(report.top_contributors[0].username, "ana");
        assert_eq!(report.top_contributors[0].message_count, 4);
        assert_eq!(report.top_contributors[0].channel_count, 2);
        assert_eq!(report.popular_channels[0].name, "general");
        assert_eq!(report.popular_channels[0].unique_users, 2);
        assert_eq!(
            report.popular_channels[0].last_activity,
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 14, 0, 0).unwrap())
        );
        assert_eq!(report.channel_activity.len(), 2);
    }

    #[test]
    fn anonymous_messages_count_toward_totals_only() {
        let opts = InsightsOptions::utc();
        let mut acc = Accumulator::default();
        let anon = Message { author: UserRef::default(), ..msg("x", "", 7) };
        acc.add_room(&room("r1", "general"), &[anon], &opts);
        let report = acc.finish(TimeRange::Day);
        assert_eq!(report.total_messages, 1);
        assert_eq!(report.active_hours[7].count, 1);
        assert!(report.top_contributors.is_empty());
        assert_eq!(report.channel_activity[0].unique_users, 0);
    }

    #[test]
    fn empty_workspace_reports_zeroes() {
        let report = Accumulator::default().finish(TimeRange::Month);
        assert_eq!(report.total_messages, 0);
        assert_eq!(report.peak_hour, 0);
        assert_eq!(report.active_hours.len(), 24);
        assert!(report.popular_channels.is_empty());
    }
}
