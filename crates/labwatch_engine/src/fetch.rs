use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use url::Url;

use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Accepted `Content-Type` essences. Empty accepts anything.
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
        }
    }
}

/// Source of raw page bytes for a target locator.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchOutput, FetchError>;
}

/// HTTP fetcher sharing one connection pool across every target.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    max_bytes: u64,
    allowed_content_types: Vec<String>,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            max_bytes: settings.max_bytes,
            allowed_content_types: settings.allowed_content_types,
        })
    }

    fn accepts(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim();
        self.allowed_content_types.is_empty()
            || self
                .allowed_content_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(essence))
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }

    /// Collect the body, giving up as soon as it passes `max_bytes`.
    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        if let Some(declared) = response.content_length() {
            if declared > self.max_bytes {
                return Err(self.too_large(declared));
            }
        }
        let mut body = Vec::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(classify)?;
            let total = (body.len() + chunk.len()) as u64;
            if total > self.max_bytes {
                return Err(self.too_large(total));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchOutput, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::new(
                FailureKind::InvalidUrl,
                format!("unsupported scheme {}", url.scheme()),
            ));
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(ct) = content_type.as_deref().filter(|ct| !self.accepts(ct)) {
            return Err(FetchError::new(
                FailureKind::UnsupportedContentType {
                    content_type: ct.to_string(),
                },
                "unsupported content type",
            ));
        }

        let bytes = self.read_body(response).await?;
        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url,
                content_type,
                byte_len: bytes.len() as u64,
            },
            bytes,
        })
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_redirect() {
        FailureKind::RedirectLimitExceeded
    } else {
        FailureKind::Network
    };
    FetchError::new(kind, err.to_string())
}
