//! Client library for one-to-one chat against a json-server style backend
//! exposing `users` and `chats` resources.

pub mod api;
pub mod app;
pub mod composer;
pub mod directory;
pub mod error;
pub mod media;
pub mod render;
pub mod selector;
pub mod session;
pub mod storage;
pub mod store;
pub mod sync;
pub mod typing;
pub mod utils;

#[cfg(feature = "gui")]
pub mod ui;

pub use app::{ChatApp, Settings, Startup};
pub use error::{ApiError, ChatError, Result};
pub use session::Session;
