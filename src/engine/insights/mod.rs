// Roost Engine — Insights
//
// Read-only activity statistics computed client-side from message history.
//
// Module layout:
//   workspace — cross-room report (contributors, channels, hours)
//   channel   — single-room report (top users, types, daily timeline)
//   search    — statistics over a search result set
//
// Shared rules:
//   - hour buckets use the configured UTC offset
//   - rankings sort by count descending and keep first-seen order on ties
//   - each message has exactly one type: file > reactions > text

mod channel;
mod search;
mod workspace;

pub use channel::{channel_insights, ChannelInsights, DayCount};
pub use search::{search_insights, ChannelCount, SearchInsights};
pub use workspace::{aggregate, ChannelStats, SkippedRoom, TopContributor, WorkspaceInsights};

use crate::atoms::constants::*;
use crate::atoms::error::{ChatError, ChatResult};
use crate::atoms::traits::HistoryQuery;
use crate::atoms::types::Message;
use crate::engine::config::ClientConfig;
use chrono::{DateTime, Duration, FixedOffset, Local, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::str::FromStr;

// ── Time range ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1d")]
    Day,
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl TimeRange {
    pub fn days(&self) -> u32 {
        match self {
            TimeRange::Day => 1,
            TimeRange::Week => 7,
            TimeRange::Month => 30,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Day => "1d",
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
        }
    }

    /// History query covering `[now - days, now]`.
    pub fn query(&self, count: u32, now: DateTime<Utc>) -> HistoryQuery {
        let oldest = now - Duration::days(i64::from(self.days()));
        HistoryQuery::between(count, oldest, now)
    }
}

impl FromStr for TimeRange {
    type Err = ChatError;

    fn from_str(s: &str) -> ChatResult<Self> {
        match s.trim() {
            "1d" => Ok(TimeRange::Day),
            "7d" => Ok(TimeRange::Week),
            "30d" => Ok(TimeRange::Month),
            other => Err(ChatError::Other(format!(
                "Unknown time range '{}' (expected 1d, 7d or 30d)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Options ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct InsightsOptions {
    /// Offset used for hour-of-day and calendar-day buckets.
    pub offset: FixedOffset,
    pub room_cap: usize,
    pub history_count: u32,
    pub channel_history_count: u32,
    /// Fixed "now" for reproducible reports; wall clock when unset.
    pub now: Option<DateTime<Utc>>,
}

impl Default for InsightsOptions {
    fn default() -> Self {
        InsightsOptions {
            offset: Local::now().offset().fix(),
            room_cap: INSIGHTS_ROOM_CAP,
            history_count: INSIGHTS_HISTORY_COUNT,
            channel_history_count: CHANNEL_INSIGHTS_HISTORY_COUNT,
            now: None,
        }
    }
}

impl InsightsOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        InsightsOptions {
            room_cap: config.insights_room_cap,
            history_count: config.insights_history_count,
            channel_history_count: config.channel_history_count,
            ..Default::default()
        }
    }

    /// UTC buckets; handy for tests and server-side use.
    pub fn utc() -> Self {
        InsightsOptions { offset: Utc.fix(), ..Default::default() }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

// ── Shared shapes ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourBucket {
    pub hour: usize,
    pub count: usize,
    /// "H:00"
    pub label: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MessageTypes {
    pub text: usize,
    pub files: usize,
    pub reactions: usize,
}

impl MessageTypes {
    pub fn record(&mut self, message: &Message) {
        if message.file.is_some() {
            self.files += 1;
        } else if message.reactions.is_some() {
            self.reactions += 1;
        } else {
            self.text += 1;
        }
    }
}

/// Per-user message count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCount {
    pub user_id: String,
    pub username: String,
    pub count: usize,
}

// ── Helpers ────────────────────────────────────────────────────────────

/// Index of the busiest hour; the lowest index wins ties, and an all-zero
/// histogram yields 0.
pub fn peak_hour(hours: &[usize]) -> usize {
    let mut best = 0;
    for (hour, &count) in hours.iter().enumerate() {
        if count > hours[best] {
            best = hour;
        }
    }
    best
}

/// `round(total / days)`.
pub fn average_per_day(total: usize, range: TimeRange) -> u64 {
    (total as f64 / f64::from(range.days())).round() as u64
}

pub fn hour_of(ts: &DateTime<Utc>, offset: &FixedOffset) -> usize {
    ts.with_timezone(offset).hour() as usize
}

pub fn hour_buckets(hours: &[usize; HOURS_PER_DAY]) -> Vec<HourBucket> {
    hours
        .iter()
        .enumerate()
        .map(|(hour, &count)| HourBucket { hour, count, label: format!("{}:00", hour) })
        .collect()
}

fn username_of(message: &Message) -> String {
    message
        .author
        .username
        .clone()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "Unknown".into())
}

/// Insertion-ordered accumulator keyed by id. `into_values` preserves
/// first-seen order, so a following stable sort keeps ties in that order.
struct Tally<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<V>,
}

impl<K: Hash + Eq, V> Tally<K, V> {
    fn new() -> Self {
        Tally { index: HashMap::new(), entries: Vec::new() }
    }

    fn entry(&mut self, key: K, init: impl FnOnce() -> V) -> &mut V {
        let idx = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                self.entries.push(init());
                let i = self.entries.len() - 1;
                self.index.insert(key, i);
                i
            }
        };
        &mut self.entries[idx]
    }

    fn into_values(self) -> Vec<V> {
        self.entries
    }
}

/// Top-`n` users by message count.
fn top_users<'a>(messages: impl IntoIterator<Item = &'a Message>, n: usize) -> Vec<UserCount> {
    let mut users: Tally<String, UserCount> = Tally::new();
    for message in messages {
        if let Some(id) = message.author_id() {
            users
                .entry(id.to_string(), || UserCount {
                    user_id: id.to_string(),
                    username: username_of(message),
                    count: 0,
                })
                .count += 1;
        }
    }
    let mut ranked = users.into_values();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{FileRef, UserRef};
    use chrono::TimeZone;

    #[test]
    fn peak_hour_picks_first_maximum() {
        let mut hours = [0usize; 24];
        hours[3] = 5;
        assert_eq!(peak_hour(&hours), 3);
        hours[10] = 5;
        assert_eq!(peak_hour(&hours), 3);
        assert_eq!(peak_hour(&[0; 24]), 0);
    }

    #[test]
    fn average_rounds_half_up() {
        assert_eq!(average_per_day(21, TimeRange::Week), 3);
        assert_eq!(average_per_day(10, TimeRange::Week), 1);
        assert_eq!(average_per_day(45, TimeRange::Month), 2);
        assert_eq!(average_per_day(0, TimeRange::Day), 0);
    }

    #[test]
    fn time_range_parses_and_spans_days() {
        assert_eq!("30d".parse::<TimeRange>().unwrap(), TimeRange::Month);
        assert!("2w".parse::<TimeRange>().is_err());
        let now = Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap();
        let q = TimeRange::Week.query(100, now);
        assert_eq!(q.oldest, Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));
        assert_eq!(q.latest, Some(now));
        assert_eq!(q.count, 100);
    }

    #[test]
    fn hours_follow_offset() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(hour_of(&ts, &Utc.fix()), 23);
        assert_eq!(hour_of(&ts, &plus_two), 1);
    }

    #[test]
    fn message_type_precedence() {
        let mut types = MessageTypes::default();
        let file = Message {
            file: Some(FileRef::default()),
            reactions: Some(serde_json::json!({":+1:": {"usernames": ["a"]}})),
            ..Default::default()
        };
        let reacted = Message { reactions: Some(serde_json::json!({})), ..Default::default() };
        types.record(&file);
        types.record(&reacted);
        types.record(&Message::default());
        assert_eq!(types, MessageTypes { text: 1, files: 1, reactions: 1 });
    }

    #[test]
    fn top_users_is_stable_on_ties() {
        let by = |id: &str| Message {
            author: UserRef { id: Some(id.into()), username: Some(id.into()), name: None },
            ..Default::default()
        };
        let msgs = vec![by("b"), by("a"), by("a"), by("b"), by("c"), Message::default()];
        let top = top_users(&msgs, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].user_id, "b");
        assert_eq!(top[1].user_id, "a");
    }

    #[test]
    fn hour_labels() {
        let buckets = hour_buckets(&[0; 24]);
        assert_eq!(buckets.len(), 24);
        assert_eq!(buckets[9].label, "9:00");
    }
}
