use crate::api::models::{Message, MessageKind, UserId};
use crate::error::{ChatError, Result};
use crate::store::MessageStore;
use crate::typing::TypingIndicator;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

/// Largest accepted attachment: 20 MiB.
pub const MAX_MEDIA_BYTES: u64 = 20 * 1024 * 1024;

/// A media file read into memory and embedded as a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub name: String,
    pub mime: String,
    pub kind: MessageKind,
    pub size: u64,
    /// `data:<mime>;base64,<payload>`, sent verbatim as the message content.
    pub data_url: String,
}

impl MediaAttachment {
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        check_size(bytes.len() as u64)?;
        let (mime, kind) = media_type(name)?;
        Ok(Self {
            name: name.to_string(),
            mime: mime.to_string(),
            kind,
            size: bytes.len() as u64,
            data_url: format!("data:{mime};base64,{}", STANDARD.encode(bytes)),
        })
    }

    /// Size is checked from metadata before the file is read.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        media_type(&name)?;
        let meta = tokio::fs::metadata(path).await?;
        check_size(meta.len())?;
        let bytes = tokio::fs::read(path).await?;
        Self::from_bytes(&name, &bytes)
    }
}

/// Splits a `data:<mime>;base64,<payload>` URL back into its type and bytes.
pub fn decode_data_url(url: &str) -> Option<(&str, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime, bytes))
}

pub fn check_size(size: u64) -> Result<()> {
    if size > MAX_MEDIA_BYTES {
        return Err(ChatError::MediaTooLarge {
            size,
            limit: MAX_MEDIA_BYTES,
        });
    }
    Ok(())
}

const MEDIA_TYPES: &[(&str, &str, MessageKind)] = &[
    ("png", "image/png", MessageKind::Image),
    ("jpg", "image/jpeg", MessageKind::Image),
    ("jpeg", "image/jpeg", MessageKind::Image),
    ("gif", "image/gif", MessageKind::Image),
    ("webp", "image/webp", MessageKind::Image),
    ("bmp", "image/bmp", MessageKind::Image),
    ("svg", "image/svg+xml", MessageKind::Image),
    ("heic", "image/heic", MessageKind::Image),
    ("mp4", "video/mp4", MessageKind::Video),
    ("m4v", "video/mp4", MessageKind::Video),
    ("webm", "video/webm", MessageKind::Video),
    ("mov", "video/quicktime", MessageKind::Video),
    ("mkv", "video/x-matroska", MessageKind::Video),
    ("avi", "video/x-msvideo", MessageKind::Video),
    ("ogv", "video/ogg", MessageKind::Video),
];

fn media_type(name: &str) -> Result<(&'static str, MessageKind)> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    MEDIA_TYPES
        .iter()
        .find(|(e, _, _)| *e == ext)
        .map(|(_, mime, kind)| (*mime, *kind))
        .ok_or_else(|| ChatError::UnsupportedMedia {
            name: name.to_string(),
        })
}

/// The input area: free text, at most one pending attachment, and the local
/// typing flag.
#[derive(Debug, Default)]
pub struct Composer {
    text: String,
    pending: Option<MediaAttachment>,
    typing: TypingIndicator,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Records a keystroke for the typing flag.
    pub fn keystroke(&mut self) {
        self.typing.keystroke();
    }

    pub fn typing(&self) -> &TypingIndicator {
        &self.typing
    }

    /// Replaces any pending attachment.
    pub fn attach(&mut self, media: MediaAttachment) {
        if let Some(old) = self.pending.replace(media) {
            log::debug!("replaced pending attachment {}", old.name);
        }
    }

    pub async fn attach_file(&mut self, path: &Path) -> Result<&MediaAttachment> {
        let media = MediaAttachment::from_path(path).await?;
        if let Some(old) = self.pending.take() {
            log::debug!("replaced pending attachment {}", old.name);
        }
        Ok(&*self.pending.insert(media))
    }

    pub fn pending(&self) -> Option<&MediaAttachment> {
        self.pending.as_ref()
    }

    pub fn cancel_media(&mut self) -> Option<MediaAttachment> {
        self.pending.take()
    }

    pub fn has_content(&self) -> bool {
        self.pending.is_some() || !self.text.trim().is_empty()
    }

    /// Sends the pending attachment, then the text, as two separate messages.
    ///
    /// Each part leaves the composer only once its send succeeded; the first
    /// failure stops the sequence.
    pub async fn send(&mut self, store: &MessageStore, partner: &UserId) -> Result<Vec<Message>> {
        let mut sent = Vec::new();

        if let Some(media) = &self.pending {
            let msg = store
                .send(partner, media.data_url.clone(), media.kind)
                .await?;
            self.pending = None;
            sent.push(msg);
        }

        if !self.text.trim().is_empty() {
            let msg = store
                .send(partner, self.text.clone(), MessageKind::Text)
                .await?;
            self.text.clear();
            sent.push(msg);
        }

        Ok(sent)
    }
}
