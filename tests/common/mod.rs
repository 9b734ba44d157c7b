#![allow(dead_code)]

use async_trait::async_trait;
use duochat::ApiError;
use duochat::api::ChatBackend;
use duochat::api::models::{Message, MessageId, MessageKind, NewMessage, User, UserId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// json-server stand-in: two collections, server-assigned ids, switchable failures.
#[derive(Default)]
pub struct MemoryBackend {
    users: Mutex<Vec<User>>,
    messages: Mutex<Vec<Message>>,
    next_id: AtomicU64,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    failing_deletes: Mutex<HashSet<MessageId>>,
    pub posted: Mutex<Vec<NewMessage>>,
}

fn down(method: &'static str, path: &str) -> ApiError {
    ApiError::Status {
        method,
        url: format!("http://backend.test/{path}"),
        status: 503,
    }
}

impl MemoryBackend {
    pub fn new(users: Vec<User>, messages: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            users: Mutex::new(users),
            messages: Mutex::new(messages),
            next_id: AtomicU64::new(1000),
            ..Self::default()
        })
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete_of(&self, id: &str) {
        self.failing_deletes.lock().unwrap().insert(MessageId::new(id));
    }

    /// Simulates another client writing directly to the backend.
    pub fn insert_remote(&self, message: Message) {
        self.messages.lock().unwrap().push(message);
    }

    pub fn remove_remote(&self, id: &str) {
        self.messages.lock().unwrap().retain(|m| m.id.as_str() != id);
    }

    pub fn stored(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MemoryBackend {
    async fn users(&self) -> Result<Vec<User>, ApiError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(down("GET", "users"));
        }
        Ok(self.users.lock().unwrap().clone())
    }

    async fn messages(&self) -> Result<Vec<Message>, ApiError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(down("GET", "chats"));
        }
        Ok(self.messages.lock().unwrap().clone())
    }

    async fn create_message(&self, draft: &NewMessage) -> Result<Message, ApiError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(down("POST", "chats"));
        }
        self.posted.lock().unwrap().push(draft.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = Message {
            id: MessageId::new(format!("srv-{id}")),
            sender_id: draft.sender_id.clone(),
            receiver_id: draft.receiver_id.clone(),
            content: draft.content.clone(),
            kind: draft.kind,
            timestamp: draft.timestamp.clone(),
        };
        self.messages.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn delete_message(&self, id: &MessageId) -> Result<(), ApiError> {
        if self.failing_deletes.lock().unwrap().contains(id) {
            return Err(down("DELETE", &format!("chats/{id}")));
        }
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| &m.id != id);
        if messages.len() == before {
            return Err(ApiError::Status {
                method: "DELETE",
                url: format!("http://backend.test/chats/{id}"),
                status: 404,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Post,
    Read,
}

/// Parks one armed call after the inner backend has done its work, so a
/// test can run other store operations in that window.
pub struct GatedBackend {
    pub inner: Arc<MemoryBackend>,
    gate: Gate,
    armed: AtomicBool,
    /// Notified once the parked call has reached the backend.
    pub reached: Notify,
    /// Lets the parked call return.
    pub release: Notify,
}

impl GatedBackend {
    pub fn new(inner: Arc<MemoryBackend>, gate: Gate) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gate,
            armed: AtomicBool::new(false),
            reached: Notify::new(),
            release: Notify::new(),
        })
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    async fn hold(&self, at: Gate) {
        if at == self.gate && self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl ChatBackend for GatedBackend {
    async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.inner.users().await
    }

    async fn messages(&self) -> Result<Vec<Message>, ApiError> {
        let result = self.inner.messages().await;
        self.hold(Gate::Read).await;
        result
    }

    async fn create_message(&self, draft: &NewMessage) -> Result<Message, ApiError> {
        let result = self.inner.create_message(draft).await;
        self.hold(Gate::Post).await;
        result
    }

    async fn delete_message(&self, id: &MessageId) -> Result<(), ApiError> {
        self.inner.delete_message(id).await
    }
}

pub fn user(id: &str, name: &str, phone: &str) -> User {
    User {
        id: UserId::new(id),
        name: name.into(),
        phone: phone.into(),
        profile_image: None,
    }
}

pub fn msg(id: &str, from: &str, to: &str, content: &str) -> Message {
    Message {
        id: MessageId::new(id),
        sender_id: UserId::new(from),
        receiver_id: UserId::new(to),
        content: content.into(),
        kind: MessageKind::Text,
        timestamp: "2024-05-01T09:30:00.000Z".into(),
    }
}

pub fn roster() -> Vec<User> {
    vec![
        user("a", "Ada", "555-0100"),
        user("b", "Bob", "555-0101"),
        user("c", "Cy", "555-0102"),
    ]
}

/// Ada's view: two messages with Bob, one with Cy, one between Bob and Cy.
pub fn history() -> Vec<Message> {
    vec![
        msg("1", "a", "b", "hi bob"),
        msg("2", "b", "a", "hi ada"),
        msg("3", "a", "c", "hey cy"),
        msg("4", "b", "c", "psst"),
    ]
}

pub fn ids(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.id.as_str()).collect()
}
