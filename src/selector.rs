use crate::api::models::{User, UserId};

/// Which roster entry the transcript is showing. Selecting never fetches.
#[derive(Debug, Clone, Default)]
pub struct ConversationSelector {
    selected: Option<User>,
}

impl ConversationSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, partner: User) {
        log::debug!("selected conversation with {}", partner.id);
        self.selected = Some(partner);
    }

    pub fn deselect(&mut self) -> Option<User> {
        self.selected.take()
    }

    pub fn selected(&self) -> Option<&User> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, id: &UserId) -> bool {
        self.selected.as_ref().is_some_and(|u| &u.id == id)
    }

    /// Drops the selection if the partner is no longer in `roster`, and
    /// otherwise picks up their latest profile.
    pub fn retain(&mut self, roster: &[User]) {
        if let Some(current) = &self.selected {
            self.selected = roster.iter().find(|u| u.id == current.id).cloned();
        }
    }
}
