use crate::api::client::ApiClient;
use crate::composer::{check_size, decode_data_url};
use crate::error::{ApiError, ChatError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use url::Url;

/// Where a media message or profile image keeps its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// A `data:<mime>;base64,` URL, as the composer sends.
    Inline { mime: String, bytes: Vec<u8> },
    /// An http(s) URL stored by another client or seeded into the backend.
    Remote(Url),
}

impl MediaSource {
    pub fn parse(content: &str) -> Option<Self> {
        let content = content.trim();
        if let Some((mime, bytes)) = decode_data_url(content) {
            return Some(Self::Inline {
                mime: mime.to_string(),
                bytes,
            });
        }
        let url = Url::parse(content).ok()?;
        matches!(url.scheme(), "http" | "https").then_some(Self::Remote(url))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBytes {
    pub mime: Option<String>,
    pub bytes: Arc<[u8]>,
}

/// Resolves media content to bytes. Remote files are downloaded once per URL.
pub struct MediaLoader {
    http: reqwest::Client,
    remote: Mutex<HashMap<Url, MediaBytes>>,
}

impl MediaLoader {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            http,
            remote: Mutex::default(),
        })
    }

    pub async fn load(&self, content: &str) -> Result<MediaBytes> {
        match MediaSource::parse(content) {
            Some(MediaSource::Inline { mime, bytes }) => Ok(MediaBytes {
                mime: Some(mime),
                bytes: bytes.into(),
            }),
            Some(MediaSource::Remote(url)) => self.fetch(url).await,
            None => Err(ChatError::UnsupportedMedia {
                name: content.chars().take(40).collect(),
            }),
        }
    }

    async fn fetch(&self, url: Url) -> Result<MediaBytes> {
        if let Some(hit) = self.cached(&url) {
            return Ok(hit);
        }
        log::debug!("GET {url}");
        let resp = ApiClient::checked("GET", &url, self.http.get(url.clone()))
            .await
            .map_err(ChatError::Fetch)?;
        if let Some(len) = resp.content_length() {
            check_size(len)?;
        }
        let mime = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp.bytes().await.map_err(|source| {
            ChatError::Fetch(ApiError::Decode {
                method: "GET",
                url: url.to_string(),
                source,
            })
        })?;
        check_size(body.len() as u64)?;

        let media = MediaBytes {
            mime,
            bytes: Arc::from(&body[..]),
        };
        self.remote
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url, media.clone());
        Ok(media)
    }

    fn cached(&self, url: &Url) -> Option<MediaBytes> {
        self.remote
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_data_and_web_urls() {
        assert_eq!(
            MediaSource::parse("data:image/png;base64,AQID"),
            Some(MediaSource::Inline {
                mime: "image/png".into(),
                bytes: vec![1, 2, 3],
            })
        );
        assert!(matches!(
            MediaSource::parse(" https://cdn.example.com/a.mp4 "),
            Some(MediaSource::Remote(url)) if url.path() == "/a.mp4"
        ));
        assert_eq!(MediaSource::parse("file:///etc/passwd"), None);
        assert_eq!(MediaSource::parse("[image]"), None);
    }

    #[tokio::test]
    async fn inline_media_needs_no_request() {
        let loader = MediaLoader::new(Duration::from_secs(1)).unwrap();
        let media = loader.load("data:video/mp4;base64,AAAA").await.unwrap();
        assert_eq!(media.mime.as_deref(), Some("video/mp4"));
        assert_eq!(media.bytes.len(), 3);
        assert!(matches!(
            loader.load("not media").await,
            Err(ChatError::UnsupportedMedia { .. })
        ));
    }
}
