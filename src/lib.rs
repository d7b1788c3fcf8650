// Roost — Rocket.Chat client engine.
//
//   atoms/   pure types, constants, traits and the error enum (no I/O)
//   engine/  REST client, poller, reconciler, insights, commands, prefs

pub mod atoms;
pub mod engine;

pub use atoms::error::{ChatError, ChatResult, ErrorKind, Outcome};
pub use atoms::traits::{ChatApi, HistoryQuery, Notification, Notifier, PrefsBackend};
pub use engine::config::ClientConfig;
pub use engine::rocketchat::RocketChat;
