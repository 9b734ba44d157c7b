use crate::api::ChatBackend;
use crate::api::models::{User, UserId};
use crate::error::{ChatError, Result};
use std::sync::{Arc, Mutex, PoisonError};

/// The roster of possible chat partners, i.e. every backend user except self.
pub struct DirectoryService {
    backend: Arc<dyn ChatBackend>,
    self_id: UserId,
    roster: Mutex<Vec<User>>,
}

impl DirectoryService {
    pub fn new(backend: Arc<dyn ChatBackend>, self_id: UserId) -> Self {
        Self {
            backend,
            self_id,
            roster: Mutex::new(Vec::new()),
        }
    }

    /// Replaces the roster with a fresh `GET /users`. On failure the previous
    /// roster stays in place.
    pub async fn load_users(&self) -> Result<Vec<User>> {
        let fetched = match self.backend.users().await {
            Ok(users) => users,
            Err(e) => {
                log::warn!("Error fetching users: {e}");
                return Err(ChatError::Fetch(e));
            }
        };
        Ok(self.hydrate(fetched))
    }

    /// Seeds the roster from an already known user list.
    pub fn hydrate(&self, users: Vec<User>) -> Vec<User> {
        let others: Vec<User> = users.into_iter().filter(|u| u.id != self.self_id).collect();
        log::debug!("roster holds {} users", others.len());
        let mut roster = self.roster.lock().unwrap_or_else(PoisonError::into_inner);
        *roster = others;
        roster.clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.roster
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn find(&self, id: &UserId) -> Option<User> {
        self.roster
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|u| &u.id == id)
            .cloned()
    }
}
