// Roost Engine — Active Room Poller
//
// One tokio task per room subscription polls the history endpoint on a
// fixed interval and feeds snapshots through a `Reconciler`. Switching
// rooms stops the previous task before the next one starts, so at most one
// subscription is live and at most one fetch is in flight for it.
//
// Events go out on an unbounded mpsc channel and always carry the room id;
// consumers drop events for rooms they are no longer showing.

use crate::atoms::traits::{ChatApi, HistoryQuery, Notifier};
use crate::atoms::types::{Message, Room};
use crate::engine::prefs::PrefsStore;
use crate::engine::reconcile::Reconciler;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone)]
pub enum PollEvent {
    /// The displayed list was replaced. `added` is empty on the first
    /// snapshot and when the list shrank.
    Messages {
        room_id: String,
        messages: Vec<Message>,
        added: Vec<Message>,
    },
    /// A fetch failed; polling continues on the next tick.
    Failed { room_id: String, error: String },
}

impl PollEvent {
    pub fn room_id(&self) -> &str {
        match self {
            PollEvent::Messages { room_id, .. } | PollEvent::Failed { room_id, .. } => room_id,
        }
    }
}

struct Subscription {
    room_id: String,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Subscription {
    fn cancel(self) {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.abort();
        debug!("[poller] Cancelled subscription for {}", self.room_id);
    }
}

pub struct Poller {
    api: Arc<dyn ChatApi>,
    prefs: Arc<PrefsStore>,
    notifier: Arc<dyn Notifier>,
    local_user_id: Option<String>,
    interval: Duration,
    history_count: u32,
    events: mpsc::UnboundedSender<PollEvent>,
    active: Option<Subscription>,
}

impl Poller {
    pub fn new(
        api: Arc<dyn ChatApi>,
        prefs: Arc<PrefsStore>,
        notifier: Arc<dyn Notifier>,
        local_user_id: Option<String>,
        interval: Duration,
        history_count: u32,
    ) -> (Self, mpsc::UnboundedReceiver<PollEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let poller = Poller {
            api,
            prefs,
            notifier,
            local_user_id,
            interval,
            history_count,
            events,
            active: None,
        };
        (poller, rx)
    }

    /// Make `room` the active room. Any previous subscription is cancelled
    /// first. Must be called inside a tokio runtime.
    pub fn subscribe(&mut self, room: Room) {
        self.unsubscribe();

        let stop = Arc::new(AtomicBool::new(false));
        let reconciler = Reconciler::new(
            &room,
            self.local_user_id.clone(),
            self.notifier.clone(),
            self.prefs.clone(),
        );
        let task = PollTask {
            api: self.api.clone(),
            room: room.clone(),
            reconciler,
            query: HistoryQuery::latest(self.history_count),
            interval: self.interval,
            stop: stop.clone(),
            events: self.events.clone(),
        };
        info!("[poller] Watching #{} every {:?}", room.label(), self.interval);
        let handle = tokio::spawn(task.run());
        self.active = Some(Subscription { room_id: room.id, stop, handle });
    }

    pub fn unsubscribe(&mut self) {
        if let Some(sub) = self.active.take() {
            sub.cancel();
        }
    }

    pub fn active_room(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.room_id.as_str())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ── Poll task ──────────────────────────────────────────────────────────

struct PollTask {
    api: Arc<dyn ChatApi>,
    room: Room,
    reconciler: Reconciler,
    query: HistoryQuery,
    interval: Duration,
    stop: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<PollEvent>,
}

impl PollTask {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            let result = self.api.history(&self.room, &self.query).await;
            // A switch may have happened while the fetch was in flight.
            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            let event = match result {
                Ok(snapshot) => {
                    let update = self.reconciler.apply(snapshot);
                    if !update.changed {
                        continue;
                    }
                    PollEvent::Messages {
                        room_id: self.room.id.clone(),
                        messages: self.reconciler.messages().to_vec(),
                        added: update.added,
                    }
                }
                Err(e) => {
                    warn!("[poller] History fetch for #{} failed: {}", self.room.label(), e);
                    PollEvent::Failed { room_id: self.room.id.clone(), error: e.to_string() }
                }
            };
            if self.events.send(event).is_err() {
                debug!("[poller] Receiver dropped, stopping #{}", self.room.label());
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_exposes_room_id() {
        let e = PollEvent::Failed { room_id: "r1".into(), error: "boom".into() };
        assert_eq!(e.room_id(), "r1");
    }
}
