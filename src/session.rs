use crate::api::ChatBackend;
use crate::api::models::User;
use crate::error::{ChatError, Result};

/// Who is signed in. Every chat service is built from a signed-in session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in_as(user: User) -> Self {
        log::info!("signed in as {} ({})", user.name, user.id);
        Self { user: Some(user) }
    }

    /// Looks the phone number up in the backend roster.
    ///
    /// Password checks belong to the backend; this only resolves an identity.
    pub async fn sign_in(backend: &dyn ChatBackend, phone: &str) -> Result<Self> {
        let wanted = normalize_phone(phone);
        let users = backend.users().await.map_err(ChatError::Fetch)?;
        users
            .into_iter()
            .find(|u| !wanted.is_empty() && normalize_phone(&u.phone) == wanted)
            .map(Self::sign_in_as)
            .ok_or_else(|| ChatError::UnknownUser {
                phone: phone.trim().to_string(),
            })
    }

    pub fn current(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn require(&self) -> Result<&User> {
        self.user.as_ref().ok_or(ChatError::NotSignedIn)
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn logout(&mut self) -> Option<User> {
        let user = self.user.take();
        if let Some(u) = &user {
            log::info!("signed out {}", u.id);
        }
        user
    }
}

fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}
