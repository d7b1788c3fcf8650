// Single-room report.

use super::{average_per_day, hour_buckets, hour_of, peak_hour, top_users, HourBucket, InsightsOptions, MessageTypes, TimeRange, UserCount};
use crate::atoms::constants::{CHANNEL_TOP_USERS, HOURS_PER_DAY};
use crate::atoms::error::ChatResult;
use crate::atoms::traits::ChatApi;
use crate::atoms::types::{Message, Room};
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelInsights {
    pub room_id: String,
    pub room_name: String,
    pub time_range: TimeRange,
    pub total_messages: usize,
    pub unique_users: usize,
    pub average_per_day: u64,
    pub top_users: Vec<UserCount>,
    pub message_types: MessageTypes,
    pub active_hours: Vec<HourBucket>,
    pub peak_hour: usize,
    /// Calendar days in ascending order.
    pub timeline: Vec<DayCount>,
}

pub async fn channel_insights(
    api: &dyn ChatApi,
    room: &Room,
    range: TimeRange,
    opts: &InsightsOptions,
) -> ChatResult<ChannelInsights> {
    let query = range.query(opts.channel_history_count, opts.now());
    let messages = api.history(room, &query).await?;
    debug!("[insights] #{}: {} messages over {}", room.label(), messages.len(), range);
    Ok(summarize(room, &messages, range, opts))
}

fn summarize(room: &Room, messages: &[Message], range: TimeRange, opts: &InsightsOptions) -> ChannelInsights {
    let mut hours = [0usize; HOURS_PER_DAY];
    let mut days: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut types = MessageTypes::default();
    let mut users: HashSet<&str> = HashSet::new();

    for message in messages {
        types.record(message);
        if let Some(id) = message.author_id() {
            users.insert(id);
        }
        if let Some(ts) = message.ts {
            hours[hour_of(&ts, &opts.offset)] += 1;
            *days.entry(ts.with_timezone(&opts.offset).date_naive()).or_default() += 1;
        }
    }

    ChannelInsights {
        room_id: room.id.clone(),
        room_name: room.label().to_string(),
        time_range: range,
        total_messages: messages.len(),
        unique_users: users.len(),
        average_per_day: average_per_day(messages.len(), range),
        top_users: top_users(messages, CHANNEL_TOP_USERS),
        message_types: types,
        active_hours: hour_buckets(&hours),
        peak_hour: peak_hour(&hours),
        timeline: days.into_iter().map(|(date, count)| DayCount { date, count }).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{FileRef, UserRef};
    use chrono::{TimeZone, Utc};

    fn msg(author: &str, day: u32, hour: u32) -> Message {
        Message {
            ts: Some(Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()),
            author: UserRef { id: Some(author.into()), username: Some(author.into()), name: None },
            ..Default::default()
        }
    }

    #[test]
    fn summary_counts_types_days_and_users() {
        let room = Room { id: "r1".into(), name: Some("dev".into()), ..Default::default() };
        let mut with_file = msg("ana", 4, 10);
        with_file.file = Some(FileRef::default());
        let messages = vec![msg("ben", 5, 10), with_file, msg("ana", 4, 11), msg("ana", 3, 10)];

        let report = summarize(&room, &messages, TimeRange::Week, &InsightsOptions::utc());
        assert_eq!(report.total_messages, 4);
        assert_eq!(report.unique_users, 2);
        assert_eq!(report.average_per_day, 1);
        assert_eq!(report.top_users[0].username, "ana");
        assert_eq!(report.top_users[0].count, 3);
        assert_eq!(report.message_types, MessageTypes { text: 3, files: 1, reactions: 0 });
        assert_eq!(report.peak_hour, 10);
        let dates: Vec<u32> = report.timeline.iter().map(|d| chrono::Datelike::day(&d.date)).collect();
        assert_eq!(dates, vec![3, 4, 5]);
        assert_eq!(report.timeline[1].count, 2);
    }

    #[test]
    fn top_users_capped_at_five() {
        let room = Room { id: "r1".into(), ..Default::default() };
        let messages: Vec<Message> = (0..8).map(|i| msg(&format!("u{}", i), 1, 9)).collect();
        let report = summarize(&room, &messages, TimeRange::Day, &InsightsOptions::utc());
        assert_eq!(report.top_users.len(), CHANNEL_TOP_USERS);
        assert_eq!(report.top_users[0].username, "u0");
        assert_eq!(report.room_name, "Unknown");
    }
}
