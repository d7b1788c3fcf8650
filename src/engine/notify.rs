// Roost Engine — Notifications
// Builds the notification for an incoming message and provides the
// default log-backed sink.

use crate::atoms::traits::{Notification, Notifier};
use crate::atoms::types::Message;
use log::info;

/// `"<author> in #<room>"`, body = message text or "(New message)"
/// (attachments and files arrive with an empty `msg`), tag = message id.
pub fn build_notification(message: &Message, room_label: &str) -> Notification {
    let body = if message.text.trim().is_empty() {
        "(New message)".to_string()
    } else {
        message.text.clone()
    };
    Notification {
        title: format!("{} in #{}", message.author.display(), room_label),
        body,
        tag: message.id.clone(),
    }
}

/// Writes notifications to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        info!("[notify] {}: {}", notification.title, notification.body);
    }
}
