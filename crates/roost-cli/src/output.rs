// Plain-text and JSON rendering for the CLI.

use chrono::{DateTime, Local, Utc};
use roost::atoms::types::{Message, Room, RoomMessage};
use roost::engine::commands::Effect;
use roost::engine::insights::{ChannelInsights, HourBucket, SearchInsights, WorkspaceInsights};
use roost::engine::team::{StatusCounts, TeamMember};
use roost::engine::threads::reply_count;

pub fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("error: could not encode output: {}", e),
    }
}

fn when(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into())
}

pub fn print_rooms(rooms: &[Room]) {
    for room in rooms {
        let ro = if room.read_only { " (read-only)" } else { "" };
        println!("{:<24} {:<8} {}{}", room.id, room.kind.namespace().unwrap_or("?"), room.label(), ro);
    }
}

pub fn print_messages(messages: &[Message]) {
    for m in messages {
        let text = if m.text.is_empty() { "(attachment)" } else { m.text.as_str() };
        println!("[{}] {}: {}", when(m.ts), m.author.display(), text);
    }
}

pub fn print_hits(hits: &[RoomMessage]) {
    if hits.is_empty() {
        println!("No results.");
        return;
    }
    for h in hits {
        println!("[{}] #{} {}: {}", when(h.message.ts), h.room_name, h.message.author.display(), h.message.text);
    }
}

pub fn print_threads(threads: &[RoomMessage]) {
    for t in threads {
        let n = reply_count(&t.message);
        println!(
            "{}  #{} {}: {}  ({} {})",
            t.message.id,
            t.room_name,
            t.message.author.display(),
            t.message.text,
            n,
            if n == 1 { "reply" } else { "replies" }
        );
    }
}

fn print_hours(hours: &[HourBucket]) {
    let max = hours.iter().map(|h| h.count).max().unwrap_or(0).max(1);
    for h in hours {
        let bar = "#".repeat(h.count * 40 / max);
        println!("  {:>5} {:>5} {}", h.label, h.count, bar);
    }
}

pub fn print_workspace_insights(r: &WorkspaceInsights) {
    println!("Range {}: {} messages, {}/day, peak {}:00", r.time_range, r.total_messages, r.average_per_day, r.peak_hour);
    println!("\nTop contributors:");
    for c in &r.top_contributors {
        println!("  {:<20} {:>5} msgs in {} rooms", c.username, c.message_count, c.channel_count);
    }
    println!("\nPopular channels:");
    for c in &r.popular_channels {
        println!("  #{:<20} {:>5} msgs, {} users, last {}", c.name, c.message_count, c.unique_users, when(c.last_activity));
    }
    println!("\nActive hours:");
    print_hours(&r.active_hours);
    if !r.skipped.is_empty() {
        println!("\nSkipped:");
        for s in &r.skipped {
            println!("  #{}: {}", s.room_name, s.reason);
        }
    }
}

pub fn print_channel_insights(r: &ChannelInsights) {
    println!(
        "#{} over {}: {} messages from {} users, {}/day, peak {}:00",
        r.room_name, r.time_range, r.total_messages, r.unique_users, r.average_per_day, r.peak_hour
    );
    println!("Types: {} text, {} files, {} with reactions", r.message_types.text, r.message_types.files, r.message_types.reactions);
    println!("\nTop users:");
    for u in &r.top_users {
        println!("  {:<20} {:>5}", u.username, u.count);
    }
    println!("\nTimeline:");
    for d in &r.timeline {
        println!("  {} {:>5}", d.date, d.count);
    }
}

pub fn print_search_insights(r: &SearchInsights) {
    println!(
        "{} results from {} users in {} channels ({} → {})",
        r.total_results, r.unique_users, r.unique_channels, when(r.earliest), when(r.latest)
    );
    println!("\nTop contributors:");
    for u in &r.top_contributors {
        println!("  {:<20} {:>5}", u.username, u.count);
    }
    println!("\nChannels:");
    for c in &r.active_channels {
        println!("  {:<20} {:>5}", c.name, c.count);
    }
    println!("\nHours:");
    print_hours(&r.active_hours);
}

pub fn print_team(members: &[TeamMember], counts: &StatusCounts) {
    println!(
        "{} members: {} online, {} away, {} busy, {} offline",
        counts.total(), counts.online, counts.away, counts.busy, counts.offline
    );
    for m in members {
        let text = if m.status_text.is_empty() { String::new() } else { format!(" \"{}\"", m.status_text) };
        println!("  {:<24} {:<8}{}  last login {}", m.name, m.status.as_str(), text, when(m.last_login));
    }
}

pub fn print_effect(effect: &Effect) {
    match effect {
        Effect::OpenSearch { query } => println!("search: {}", query),
        Effect::StatusChanged { status, dnd } => {
            println!("Status set to {}{}", status, if *dnd { " (do-not-disturb)" } else { "" })
        }
        Effect::SwitchRoom { name, .. } => println!("Switched to #{}", name),
        Effect::Nothing => println!("Nothing to do."),
    }
}
