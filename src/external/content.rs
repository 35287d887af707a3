use async_trait::async_trait;

use crate::models::errors::FetchError;

/// HTTP fetch of token metadata documents and image payloads.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch and parse a metadata document as structured key-value data.
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError>;

    /// Fetch a binary payload. Returns the bytes and the response's declared
    /// content type, if any.
    async fn fetch_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>), FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let response = self.get(url).await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>), FetchError> {
        let response = self.get(url).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if bytes.is_empty() {
            return Err(FetchError::Empty);
        }

        Ok((bytes.to_vec(), content_type))
    }
}
