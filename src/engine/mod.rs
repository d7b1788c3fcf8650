// Roost Engine — Rocket.Chat client runtime
// REST transport, active-room polling with snapshot reconciliation,
// client-side insights, slash commands and the multi-room dashboards.

pub mod commands;
pub mod config;
pub mod http;
pub mod insights;
pub mod notify;
pub mod pins;
pub mod poller;
pub mod prefs;
pub mod reconcile;
pub mod rocketchat;
pub mod search;
pub mod team;
pub mod threads;
