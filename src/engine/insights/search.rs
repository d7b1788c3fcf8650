// Statistics over a set of search hits.

use super::{hour_buckets, hour_of, peak_hour, top_users, HourBucket, MessageTypes, Tally, UserCount};
use crate::atoms::constants::{HOURS_PER_DAY, SEARCH_TOP_N};
use crate::atoms::types::RoomMessage;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelCount {
    pub room_id: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchInsights {
    pub total_results: usize,
    pub top_contributors: Vec<UserCount>,
    pub active_channels: Vec<ChannelCount>,
    pub message_types: MessageTypes,
    pub active_hours: Vec<HourBucket>,
    pub peak_hour: usize,
    pub unique_users: usize,
    pub unique_channels: usize,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

/// `None` for an empty result set.
pub fn search_insights(results: &[RoomMessage], offset: &FixedOffset) -> Option<SearchInsights> {
    if results.is_empty() {
        return None;
    }

    let mut hours = [0usize; HOURS_PER_DAY];
    let mut types = MessageTypes::default();
    let mut users: HashSet<&str> = HashSet::new();
    let mut channels: Tally<&str, ChannelCount> = Tally::new();
    let mut earliest: Option<DateTime<Utc>> = None;
    let mut latest: Option<DateTime<Utc>> = None;

    for hit in results {
        let message = &hit.message;
        types.record(message);
        if let Some(id) = message.author_id() {
            users.insert(id);
        }
        if !hit.room_id.is_empty() {
            channels
                .entry(hit.room_id.as_str(), || ChannelCount {
                    room_id: hit.room_id.clone(),
                    name: if hit.room_name.is_empty() { "Unknown".into() } else { hit.room_name.clone() },
                    count: 0,
                })
                .count += 1;
        }
        if let Some(ts) = message.ts {
            hours[hour_of(&ts, offset)] += 1;
            earliest = Some(earliest.map_or(ts, |e| e.min(ts)));
            latest = Some(latest.map_or(ts, |l| l.max(ts)));
        }
    }

    let mut active_channels = channels.into_values();
    let unique_channels = active_channels.len();
    active_channels.sort_by(|a, b| b.count.cmp(&a.count));
    active_channels.truncate(SEARCH_TOP_N);

    Some(SearchInsights {
        total_results: results.len(),
        top_contributors: top_users(results.iter().map(|h| &h.message), SEARCH_TOP_N),
        active_channels,
        message_types: types,
        active_hours: hour_buckets(&hours),
        peak_hour: peak_hour(&hours),
        unique_users: users.len(),
        unique_channels,
        earliest,
        latest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{Message, UserRef};
    use chrono::{Offset, TimeZone};

    fn hit(room: &str, author: &str, hour: u32) -> RoomMessage {
        RoomMessage {
            room_id: room.into(),
            room_name: format!("#{}", room),
            message: Message {
                ts: Some(Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()),
                author: UserRef { id: Some(author.into()), username: Some(author.into()), name: None },
                ..Default::default()
            },
        }
    }

    #[test]
    fn empty_results_yield_none() {
        assert!(search_insights(&[], &Utc.fix()).is_none());
    }

    #[test]
    fn summarizes_hits() {
        let hits = vec![hit("r1", "ana", 8), hit("r2", "ana", 12), hit("r2", "ben", 12)];
        let report = search_insights(&hits, &Utc.fix()).unwrap();
        assert_eq!(report.total_results, 3);
        assert_eq!(report.unique_users, 2);
        assert_eq!(report.unique_channels, 2);
        assert_eq!(report.active_channels[0].room_id, "r2");
        assert_eq!(report.active_channels[0].count, 2);
        assert_eq!(report.top_contributors[0].username, "ana");
        assert_eq!(report.peak_hour, 12);
        assert_eq!(report.earliest, Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()));
        assert_eq!(report.latest, Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));
    }
}
