// Roost Engine — Snapshot Reconciliation
//
// Each poll returns a full snapshot of a room's recent history. `reconcile`
// decides what changed against the list on screen; `Reconciler` owns that
// list and turns newly appended messages into notifications.
//
// Change detection compares lengths only: a longer snapshot appends its
// tail, a shorter one replaces the list, an equal one keeps the current
// list untouched (edits at constant length are not picked up).

use crate::atoms::traits::Notifier;
use crate::atoms::types::{Message, Room};
use crate::engine::notify::build_notification;
use crate::engine::prefs::PrefsStore;
use log::debug;
use std::sync::Arc;

/// Result of comparing two snapshots. Borrows from the inputs.
#[derive(Debug, PartialEq)]
pub struct Reconciliation<'a> {
    /// The list to display next. Points at `previous` when nothing changed.
    pub next: &'a [Message],
    /// Messages appended since `previous`, oldest first.
    pub added: &'a [Message],
}

impl Reconciliation<'_> {
    /// Whether `next` is a different list than `previous`.
    pub fn changed(&self, previous: &[Message]) -> bool {
        !std::ptr::eq(self.next, previous)
    }
}

/// Pure comparison; both inputs oldest first.
pub fn reconcile<'a>(previous: &'a [Message], fetched: &'a [Message]) -> Reconciliation<'a> {
    if fetched.len() > previous.len() {
        Reconciliation { next: fetched, added: &fetched[previous.len()..] }
    } else if fetched.len() < previous.len() {
        Reconciliation { next: fetched, added: &[] }
    } else {
        Reconciliation { next: previous, added: &[] }
    }
}

// ── Reconciler ─────────────────────────────────────────────────────────

/// What one `apply` did.
#[derive(Debug, Default, Clone)]
pub struct Update {
    pub changed: bool,
    pub added: Vec<Message>,
    pub notified: usize,
}

pub struct Reconciler {
    room_label: String,
    local_user_id: Option<String>,
    notifier: Arc<dyn Notifier>,
    prefs: Arc<PrefsStore>,
    messages: Vec<Message>,
    seeded: bool,
}

impl Reconciler {
    pub fn new(
        room: &Room,
        local_user_id: Option<String>,
        notifier: Arc<dyn Notifier>,
        prefs: Arc<PrefsStore>,
    ) -> Self {
        Reconciler {
            room_label: room.label().to_string(),
            local_user_id,
            notifier,
            prefs,
            messages: Vec::new(),
            seeded: false,
        }
    }

    /// The displayed list, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Fold in a snapshot as returned by the history endpoint (newest
    /// first). The first snapshot seeds the list without notifying.
    pub fn apply(&mut self, mut snapshot: Vec<Message>) -> Update {
        snapshot.reverse();

        if !self.seeded {
            self.seeded = true;
            self.messages = snapshot;
            debug!("[reconcile] Seeded #{} with {} messages", self.room_label, self.messages.len());
            return Update { changed: true, ..Default::default() };
        }

        let (changed, added) = {
            let r = reconcile(&self.messages, &snapshot);
            (r.changed(&self.messages), r.added.to_vec())
        };
        if changed {
            self.messages = snapshot;
        }
        let notified = self.notify(&added);
        Update { changed, added, notified }
    }

    fn notify(&self, added: &[Message]) -> usize {
        if added.is_empty() || self.prefs.dnd() {
            return 0;
        }
        let mut sent = 0;
        for message in added {
            let own = self.local_user_id.is_some() && message.author_id() == self.local_user_id.as_deref();
            if own {
                continue;
            }
            self.notifier.notify(&build_notification(message, &self.room_label));
            sent += 1;
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::traits::Notification;
    use crate::atoms::types::UserRef;
    use parking_lot::Mutex;

    fn msg(id: &str, author: &str) -> Message {
        Message {
            id: id.into(),
            text: format!("text {}", id),
            author: UserRef { id: Some(author.into()), username: Some(author.into()), name: None },
            ..Default::default()
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    impl Notifier for Recorder {
        fn notify(&self, n: &Notification) {
            self.0.lock().push(n.clone());
        }
    }

    #[test]
    fn longer_snapshot_appends_tail() {
        let prev = vec![msg("1", "a"), msg("2", "a")];
        let fetched = vec![msg("1", "a"), msg("2", "a"), msg("3", "b"), msg("4", "b")];
        let r = reconcile(&prev, &fetched);
        assert_eq!(r.added.len(), 2);
        assert_eq!(r.added[0].id, "3");
        assert!(std::ptr::eq(r.next, fetched.as_slice()));
        assert!(r.changed(&prev));
    }

    #[test]
    fn equal_length_keeps_previous_list() {
        let prev = vec![msg("1", "a")];
        let fetched = vec![msg("1", "a")];
        let r = reconcile(&prev, &fetched);
        assert!(std::ptr::eq(r.next, prev.as_slice()));
        assert!(r.added.is_empty());
        assert!(!r.changed(&prev));
    }

    #[test]
    fn shorter_snapshot_replaces_without_additions() {
        let prev = vec![msg("1", "a"), msg("2", "a")];
        let fetched = vec![msg("2", "a")];
        let r = reconcile(&prev, &fetched);
        assert!(std::ptr::eq(r.next, fetched.as_slice()));
        assert!(r.added.is_empty());
    }

    fn reconciler(recorder: Arc<Recorder>, prefs: Arc<PrefsStore>) -> Reconciler {
        let room = Room { id: "r1".into(), name: Some("general".into()), ..Default::default() };
        Reconciler::new(&room, Some("me".into()), recorder, prefs)
    }

    #[test]
    fn first_snapshot_seeds_silently_and_orders_oldest_first() {
        let recorder = Arc::new(Recorder::default());
        let mut rec = reconciler(recorder.clone(), Arc::new(PrefsStore::in_memory()));
        let update = rec.apply(vec![msg("2", "b"), msg("1", "b")]);
        assert!(update.changed);
        assert_eq!(update.notified, 0);
        assert_eq!(rec.messages()[0].id, "1");
        assert!(recorder.0.lock().is_empty());
    }

    #[test]
    fn notifies_only_for_other_authors() {
        let recorder = Arc::new(Recorder::default());
        let mut rec = reconciler(recorder.clone(), Arc::new(PrefsStore::in_memory()));
        rec.apply(vec![msg("1", "b")]);
        let update = rec.apply(vec![msg("3", "me"), msg("2", "b"), msg("1", "b")]);
        assert_eq!(update.added.len(), 2);
        assert_eq!(update.notified, 1);
        let sent = recorder.0.lock();
        assert_eq!(sent[0].title, "b in #general");
        assert_eq!(sent[0].tag, "2");
    }

    #[test]
    fn dnd_suppresses_notifications() {
        let recorder = Arc::new(Recorder::default());
        let prefs = Arc::new(PrefsStore::in_memory());
        prefs.set_dnd(true).unwrap();
        let mut rec = reconciler(recorder.clone(), prefs);
        rec.apply(vec![msg("1", "b")]);
        let update = rec.apply(vec![msg("2", "b"), msg("1", "b")]);
        assert!(update.changed);
        assert_eq!(update.notified, 0);
        assert!(recorder.0.lock().is_empty());
    }

    #[test]
    fn unchanged_snapshot_is_a_no_op() {
        let recorder = Arc::new(Recorder::default());
        let mut rec = reconciler(recorder, Arc::new(PrefsStore::in_memory()));
        rec.apply(vec![msg("1", "b")]);
        let update = rec.apply(vec![msg("1", "b")]);
        assert!(!update.changed);
        assert!(update.added.is_empty());
    }
}
