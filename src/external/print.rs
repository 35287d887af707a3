use async_trait::async_trait;
use reqwest::multipart;

use crate::models::errors::PrintError;

/// Submission of a stored image to the physical print service.
#[async_trait]
pub trait PrintClient: Send + Sync {
    /// POST the image as a multipart form with field `image` carrying the
    /// binary content under its original filename.
    async fn submit(&self, filename: &str, bytes: Vec<u8>) -> Result<(), PrintError>;
}

pub struct HttpPrintClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPrintClient {
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl PrintClient for HttpPrintClient {
    async fn submit(&self, filename: &str, bytes: Vec<u8>) -> Result<(), PrintError> {
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PrintError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PrintError::Status(status.as_u16()));
        }
        Ok(())
    }
}
