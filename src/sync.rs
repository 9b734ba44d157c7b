use crate::api::events::SyncEvent;
use crate::store::MessageStore;
use crate::utils::TaskGuard;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;

/// Polls the backend every `every` and reports differences to the receiver.
///
/// The first tick fires after one full interval; the caller is expected to
/// have loaded the store already. The loop ends when the receiver is dropped
/// or the guard is.
pub fn spawn_poller(
    store: Arc<MessageStore>,
    every: Duration,
) -> (TaskGuard, UnboundedReceiver<SyncEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let guard = TaskGuard::spawn(poll_loop(store, every, tx));
    (guard, rx)
}

async fn poll_loop(store: Arc<MessageStore>, every: Duration, tx: UnboundedSender<SyncEvent>) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    log::debug!("polling every {every:?}");

    loop {
        ticker.tick().await;
        if tx.is_closed() {
            break;
        }
        for event in poll_once(&store).await {
            if tx.send(event).is_err() {
                log::debug!("poller receiver gone");
                return;
            }
        }
    }
}

/// One reload round, translated into events.
pub async fn poll_once(store: &MessageStore) -> Vec<SyncEvent> {
    match store.refresh().await {
        Ok(Some(diff)) => {
            let mut events = Vec::new();
            if !diff.added.is_empty() {
                log::debug!("{} new messages", diff.added.len());
                events.push(SyncEvent::Arrived(diff.added));
            }
            if !diff.removed.is_empty() {
                log::debug!("{} messages removed remotely", diff.removed.len());
                events.push(SyncEvent::Removed(diff.removed));
            }
            events
        }
        Ok(None) => Vec::new(),
        Err(e) => vec![SyncEvent::Failed(e.to_string())],
    }
}
