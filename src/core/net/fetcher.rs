use async_trait::async_trait;
use reqwest::header::ETAG;
use reqwest::Client;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// A successfully downloaded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBytes {
    pub bytes: Vec<u8>,
    pub etag: Option<String>,
}

/// The network job used by meta entities. Dropping the future cancels it.
#[async_trait]
pub trait MetaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> LauncherResult<FetchedBytes>;
}

/// `MetaFetcher` over a shared reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> LauncherResult<Self> {
        Ok(Self {
            client: super::build_http_client()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> LauncherResult<FetchedBytes> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_string());
        let bytes = response.bytes().await?.to_vec();

        debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(FetchedBytes { bytes, etag })
    }
}
