use crate::api::ChatBackend;
use crate::api::models::{Message, MessageId, MessageKind, NewMessage, UserId};
use crate::error::{ChatError, Result};
use chrono::{SecondsFormat, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Messages added and removed on the backend since the store last looked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncDiff {
    pub added: Vec<Message>,
    pub removed: Vec<MessageId>,
}

impl SyncDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Default)]
struct State {
    messages: Vec<Message>,
    // bumped on every local mutation so a slow poll cannot overwrite it
    revision: u64,
    // backend writes whose outcome is not applied yet
    in_flight: usize,
}

/// Held across a backend write. While any is alive, and whenever one ends,
/// overlapping refreshes are discarded.
struct PendingWrite<'a>(&'a MessageStore);

impl<'a> PendingWrite<'a> {
    fn begin(store: &'a MessageStore) -> Self {
        store.state().in_flight += 1;
        Self(store)
    }
}

impl Drop for PendingWrite<'_> {
    fn drop(&mut self) {
        let mut state = self.0.state();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.revision += 1;
    }
}

/// Every message the signed-in user sent or received, in backend order.
///
/// The store is the only writer of the collection. The lock is never held
/// across a request, so a `send` racing a `clear` only ever appends, and a
/// `clear` only removes the ids it snapshotted and saw deleted.
pub struct MessageStore {
    backend: Arc<dyn ChatBackend>,
    self_id: UserId,
    state: Mutex<State>,
}

impl MessageStore {
    pub fn new(backend: Arc<dyn ChatBackend>, self_id: UserId) -> Self {
        Self {
            backend,
            self_id,
            state: Mutex::new(State::default()),
        }
    }

    pub fn self_id(&self) -> &UserId {
        &self.self_id
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mine(&self, all: Vec<Message>) -> Vec<Message> {
        all.into_iter().filter(|m| m.touches(&self.self_id)).collect()
    }

    async fn fetch_mine(&self) -> Result<Vec<Message>> {
        match self.backend.messages().await {
            Ok(all) => Ok(self.mine(all)),
            Err(e) => {
                log::warn!("Error fetching chats: {e}");
                Err(ChatError::Fetch(e))
            }
        }
    }

    /// Full reload: `GET /chats`, keep what involves self, replace everything.
    pub async fn load_conversations(&self) -> Result<usize> {
        let mine = self.fetch_mine().await?;
        Ok(self.hydrate(mine))
    }

    /// Replaces the collection with `messages`, dropping rows that do not involve self.
    pub fn hydrate(&self, messages: Vec<Message>) -> usize {
        let mine = self.mine(messages);
        let mut state = self.state();
        state.messages = mine;
        state.revision += 1;
        log::debug!("store holds {} messages", state.messages.len());
        state.messages.len()
    }

    /// Posts a message and appends the backend's echo. Nothing is appended
    /// before the backend confirms.
    pub async fn send(
        &self,
        receiver: &UserId,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> Result<Message> {
        if receiver == &self.self_id {
            return Err(ChatError::SelfMessage {
                user: receiver.clone(),
            });
        }
        let draft = NewMessage {
            sender_id: self.self_id.clone(),
            receiver_id: receiver.clone(),
            content: content.into(),
            kind,
            timestamp: now_timestamp(),
        };
        let _pending = PendingWrite::begin(self);
        match self.backend.create_message(&draft).await {
            Ok(stored) => {
                let mut state = self.state();
                if state.messages.iter().any(|m| m.id == stored.id) {
                    log::debug!("message {} already synced", stored.id);
                } else {
                    state.messages.push(stored.clone());
                }
                state.revision += 1;
                Ok(stored)
            }
            Err(e) => {
                log::error!("Error sending message: {e}");
                Err(ChatError::Mutation(e))
            }
        }
    }

    /// Deletes the whole conversation with `partner`, one request per message.
    ///
    /// Only messages the backend confirmed as deleted leave the local
    /// collection; if any delete failed the rest is reported back in
    /// [`ChatError::ClearIncomplete`].
    pub async fn clear(&self, partner: &UserId) -> Result<usize> {
        let targets: Vec<MessageId> = self
            .conversation(partner)
            .into_iter()
            .map(|m| m.id)
            .collect();

        let pending = PendingWrite::begin(self);
        let mut deleted = HashSet::with_capacity(targets.len());
        let mut remaining = Vec::new();
        let mut first_error = None;
        for id in targets {
            match self.backend.delete_message(&id).await {
                Ok(()) => {
                    deleted.insert(id);
                }
                Err(e) if e.is_not_found() => {
                    log::debug!("message {id} was already gone");
                    deleted.insert(id);
                }
                Err(e) => {
                    log::error!("Error clearing chat: could not delete {id}: {e}");
                    remaining.push(id);
                    first_error.get_or_insert(e);
                }
            }
        }

        {
            let mut state = self.state();
            state.messages.retain(|m| !deleted.contains(&m.id));
            state.revision += 1;
        }
        drop(pending);
        log::info!("cleared {} messages with {partner}", deleted.len());

        match first_error {
            None => Ok(deleted.len()),
            Some(source) => Err(ChatError::ClearIncomplete {
                removed: deleted.len(),
                remaining,
                source,
            }),
        }
    }

    /// Full reload that reports what changed. Returns `Ok(None)` when a local
    /// mutation started or finished while the fetch was in flight; the next
    /// round catches up.
    pub async fn refresh(&self) -> Result<Option<SyncDiff>> {
        let seen_revision = self.state().revision;
        let fetched = self.fetch_mine().await?;

        let mut state = self.state();
        if state.revision != seen_revision || state.in_flight > 0 {
            log::debug!("skipping stale refresh");
            return Ok(None);
        }

        let known: HashSet<&MessageId> = state.messages.iter().map(|m| &m.id).collect();
        let current: HashSet<&MessageId> = fetched.iter().map(|m| &m.id).collect();
        let diff = SyncDiff {
            added: fetched
                .iter()
                .filter(|m| !known.contains(&m.id))
                .cloned()
                .collect(),
            removed: state
                .messages
                .iter()
                .filter(|m| !current.contains(&m.id))
                .map(|m| m.id.clone())
                .collect(),
        };
        drop(known);
        drop(current);

        if !diff.is_empty() {
            state.messages = fetched;
            state.revision += 1;
        }
        Ok(Some(diff))
    }

    /// The (self, partner) conversation in store order.
    pub fn conversation(&self, partner: &UserId) -> Vec<Message> {
        self.state()
            .messages
            .iter()
            .filter(|m| m.involves(&self.self_id, partner))
            .cloned()
            .collect()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn len(&self) -> usize {
        self.state().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Client-side send time in the same shape as JavaScript's `toISOString`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn timestamp_is_iso_utc_millis() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-05-01T09:30:00.000Z".len());
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
