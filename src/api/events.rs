use crate::api::models::{Message, MessageId};

/// What the background poller observed on the backend since the last round.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Messages the local store had not seen, in backend order.
    Arrived(Vec<Message>),
    /// Messages deleted elsewhere (e.g. the partner cleared the chat).
    Removed(Vec<MessageId>),
    /// A poll round failed; the store kept its last-known state.
    Failed(String),
}

impl SyncEvent {
    pub fn changes_transcript(&self) -> bool {
        !matches!(self, SyncEvent::Failed(_))
    }
}
