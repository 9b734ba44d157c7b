use crate::api::ChatBackend;
use crate::api::client::ApiClient;
use crate::api::events::SyncEvent;
use crate::api::models::{User, UserId};
use crate::directory::DirectoryService;
use crate::error::{ChatError, Result};
use crate::media::MediaLoader;
use crate::session::Session;
use crate::storage::Cache;
use crate::store::MessageStore;
use crate::sync;
use crate::utils::TaskGuard;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

pub const BASE_URL_ENV: &str = "DUOCHAT_BASE_URL";

const MEDIA_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    /// Seconds between background reloads; 0 only loads at sign-in.
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub cache_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".into(),
            poll_interval_secs: 5,
            request_timeout_secs: 10,
            cache_enabled: true,
        }
    }
}

impl Settings {
    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("duochat.toml"))
    }

    /// Reads the settings file, falling back to defaults, then applies `DUOCHAT_BASE_URL`.
    pub fn load() -> Self {
        let settings = match Self::toml_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                log::warn!("ignoring {}: {e}", path.display());
                Self::default()
            }),
            None => Self::default(),
        };
        settings.with_env_override(std::env::var(BASE_URL_ENV).ok())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let mut settings: Settings = toml::from_str(&text)?;
        settings.base_url = crate::utils::normalize_url(&settings.base_url);
        if settings.base_url.is_empty() {
            settings.base_url = Self::default().base_url;
        }
        Ok(settings)
    }

    pub fn with_env_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.map(|u| crate::utils::normalize_url(&u)) {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        self
    }

    pub fn save(&self) -> std::io::Result<()> {
        match Self::toml_path() {
            Some(path) => self.save_to(&path),
            None => Err(std::io::Error::new(std::io::ErrorKind::NotFound, "No config dir")),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        fs::write(path, toml)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_secs > 0).then(|| Duration::from_secs(self.poll_interval_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Outcome of the initial parallel load.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Startup {
    pub users: usize,
    pub messages: usize,
    /// At least one collection came from the local cache instead of the backend.
    pub offline: bool,
}

/// Everything a signed-in window needs, shared by `Arc`.
pub struct ChatApp {
    user: User,
    directory: DirectoryService,
    store: Arc<MessageStore>,
    media: MediaLoader,
    cache: Option<Mutex<Cache>>,
}

impl ChatApp {
    pub fn new(session: &Session, backend: Arc<dyn ChatBackend>, cache: Option<Cache>) -> Result<Self> {
        let user = session.require()?.clone();
        Ok(Self {
            directory: DirectoryService::new(backend.clone(), user.id.clone()),
            store: Arc::new(MessageStore::new(backend, user.id.clone())),
            media: MediaLoader::new(MEDIA_TIMEOUT).map_err(ChatError::Fetch)?,
            cache: cache.map(Mutex::new),
            user,
        })
    }

    /// Builds the HTTP backend and opens the cache the way `settings` ask.
    pub fn connect(settings: &Settings, session: &Session) -> Result<Self> {
        let client = ApiClient::new(&settings.base_url, settings.request_timeout())
            .map_err(ChatError::Fetch)?;
        let cache = if settings.cache_enabled {
            Cache::open_default()
                .map_err(|e| log::warn!("running without cache: {e}"))
                .ok()
        } else {
            None
        };
        Self::new(session, Arc::new(client), cache)
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn self_id(&self) -> &UserId {
        &self.user.id
    }

    pub fn directory(&self) -> &DirectoryService {
        &self.directory
    }

    pub fn store(&self) -> &Arc<MessageStore> {
        &self.store
    }

    pub fn media(&self) -> &MediaLoader {
        &self.media
    }

    /// Loads roster and messages in parallel. Whatever fails is filled from
    /// the cache, if there is one.
    pub async fn start(&self) -> Startup {
        let (users, messages) =
            tokio::join!(self.directory.load_users(), self.store.load_conversations());
        let mut startup = Startup::default();

        match users {
            Ok(roster) => {
                startup.users = roster.len();
                self.with_cache(|c| c.store_roster(self.self_id(), &roster));
            }
            Err(e) => {
                log::warn!("roster unavailable: {e}");
                if let Some(cached) = self.with_cache(|c| c.roster(self.self_id())) {
                    startup.users = self.directory.hydrate(cached).len();
                    startup.offline = true;
                }
            }
        }

        match messages {
            Ok(count) => {
                startup.messages = count;
                self.remember_transcript();
            }
            Err(e) => {
                log::warn!("messages unavailable: {e}");
                if let Some(cached) = self.with_cache(|c| c.transcript(self.self_id())) {
                    startup.messages = self.store.hydrate(cached);
                    startup.offline = true;
                }
            }
        }

        log::info!(
            "loaded {} users and {} messages{}",
            startup.users,
            startup.messages,
            if startup.offline { " (partly cached)" } else { "" }
        );
        startup
    }

    /// Snapshots the current transcript into the cache.
    pub fn remember_transcript(&self) {
        // read under the cache lock so overlapping snapshots land in order
        self.with_cache(|c| c.store_transcript(self.self_id(), &self.store.messages()));
    }

    /// [`remember_transcript`](Self::remember_transcript) on the blocking
    /// pool. Must be called from within a tokio runtime.
    pub fn spawn_snapshot(self: &Arc<Self>) -> JoinHandle<()> {
        let app = self.clone();
        tokio::task::spawn_blocking(move || app.remember_transcript())
    }

    fn with_cache<T>(&self, f: impl FnOnce(&mut Cache) -> Result<T>) -> Option<T> {
        let cache = self.cache.as_ref()?;
        let mut guard = cache.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
            .map_err(|e| log::warn!("cache: {e}"))
            .ok()
    }

    /// Starts background polling if `interval` is set. Dropping the guard stops it.
    pub fn start_sync(
        &self,
        interval: Option<Duration>,
    ) -> Option<(TaskGuard, UnboundedReceiver<SyncEvent>)> {
        interval.map(|every| sync::spawn_poller(self.store.clone(), every))
    }
}
