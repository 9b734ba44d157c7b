use crate::api::models::{MessageId, UserId};
use thiserror::Error;

/// Failures talking to the chat backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid backend URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{method} {url} failed: {source}")]
    Transport {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned HTTP {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("{method} {url} returned an unreadable body: {source}")]
    Decode {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport { source, .. } | ApiError::Decode { source, .. } => {
                source.status().map(|s| s.as_u16())
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Errors surfaced by the chat services.
///
/// Fetch failures leave the last-known state in place and are safe to ignore;
/// mutation failures mean the local view and the backend may have diverged.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no user is signed in")]
    NotSignedIn,

    #[error("no user with phone number {phone}")]
    UnknownUser { phone: String },

    #[error("cannot send a message to yourself ({user})")]
    SelfMessage { user: UserId },

    #[error("fetch failed, keeping last-known state: {0}")]
    Fetch(#[source] ApiError),

    #[error("update failed: {0}")]
    Mutation(#[source] ApiError),

    #[error("cleared {removed} messages but {} could not be deleted: {source}", .remaining.len())]
    ClearIncomplete {
        removed: usize,
        remaining: Vec<MessageId>,
        #[source]
        source: ApiError,
    },

    #[error("file size should not exceed 20MB ({size} bytes > {limit} bytes)")]
    MediaTooLarge { size: u64, limit: u64 },

    #[error("unsupported media file: {name}")]
    UnsupportedMedia { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("cache error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("invalid settings: {0}")]
    Config(#[from] toml::de::Error),
}

impl ChatError {
    pub fn is_fetch(&self) -> bool {
        matches!(self, ChatError::Fetch(_))
    }

    /// Local state may no longer match the backend.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ChatError::Mutation(_) | ChatError::ClearIncomplete { .. }
        )
    }

    /// Input rejected before any request was made.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ChatError::SelfMessage { .. }
                | ChatError::MediaTooLarge { .. }
                | ChatError::UnsupportedMedia { .. }
        )
    }
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http_500() -> ApiError {
        ApiError::Status {
            method: "DELETE",
            url: "http://localhost:3001/chats/7".into(),
            status: 500,
        }
    }

    #[test]
    fn classifies_failures() {
        assert!(ChatError::Fetch(http_500()).is_fetch());
        assert!(ChatError::Mutation(http_500()).is_mutation());
        let partial = ChatError::ClearIncomplete {
            removed: 2,
            remaining: vec![MessageId::new("7")],
            source: http_500(),
        };
        assert!(partial.is_mutation());
        assert!(!partial.is_fetch());
        assert_eq!(
            partial.to_string(),
            "cleared 2 messages but 1 could not be deleted: DELETE http://localhost:3001/chats/7 returned HTTP 500"
        );
        assert!(ChatError::MediaTooLarge { size: 2, limit: 1 }.is_rejection());
    }
}
