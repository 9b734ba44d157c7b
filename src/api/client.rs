use crate::api::ChatBackend;
use crate::api::models::{Message, MessageId, NewMessage, User};
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::{ParseError, Url};

pub struct ApiClient {
    pub http: HttpClient,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            http,
            base: Self::base(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    // Url::join drops the last path segment unless the base ends with a slash.
    fn base(base_url: &str) -> Result<Url, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/", trimmed))?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    pub(crate) async fn checked(
        method: &'static str,
        url: &Url,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let resp = req.send().await.map_err(|source| ApiError::Transport {
            method,
            url: url.to_string(),
            source,
        })?;
        if !resp.status().is_success() {
            return Err(ApiError::Status {
                method,
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(
        method: &'static str,
        url: &Url,
        resp: reqwest::Response,
    ) -> Result<T, ApiError> {
        resp.json::<T>().await.map_err(|source| ApiError::Decode {
            method,
            url: url.to_string(),
            source,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        log::debug!("GET {url}");
        let resp = Self::checked("GET", &url, self.http.get(url.clone())).await?;
        Self::decode("GET", &url, resp).await
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.get_json("users").await
    }

    async fn messages(&self) -> Result<Vec<Message>, ApiError> {
        self.get_json("chats").await
    }

    async fn create_message(&self, draft: &NewMessage) -> Result<Message, ApiError> {
        let url = self.endpoint("chats")?;
        log::debug!("POST {url} ({} to {})", draft.kind.as_str(), draft.receiver_id);
        let resp = Self::checked("POST", &url, self.http.post(url.clone()).json(draft)).await?;
        Self::decode("POST", &url, resp).await
    }

    async fn delete_message(&self, id: &MessageId) -> Result<(), ApiError> {
        let mut url = self.endpoint("chats")?;
        // push keeps opaque ids percent-encoded as a single segment
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(id.as_str());
        log::debug!("DELETE {url}");
        Self::checked("DELETE", &url, self.http.delete(url.clone())).await?;
        Ok(())
    }
}
