use std::path::PathBuf;

use alloy_primitives::{Address, U256};
use opentelemetry::KeyValue;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::models::common::{IdentityKey, NftAsset, ProcessingState};
use crate::models::errors::{ImageError, PrintError, WorkflowError};
use crate::monitor::Monitor;
use crate::monitor::burn::burn_token;
use crate::utils::uri::resolve_uri;

impl Monitor {
    /// Drive one token through metadata -> image -> print -> optional burn.
    ///
    /// Invoked once per admitted key; a direct re-invocation after a stage
    /// failure resumes from the last checkpoint instead of repeating finished
    /// work. A key already at `Printed` or beyond is a no-op.
    pub async fn process(
        &self,
        contract_address: Address,
        token_id: U256,
    ) -> Result<(), WorkflowError> {
        let key = IdentityKey {
            contract_address,
            token_id,
        };
        let record = self.gate.begin_attempt(key);
        if record.state.is_terminal() {
            debug!("Token {key} already processed ({:?}), nothing to do", record.state);
            return Ok(());
        }

        info!(
            "Processing token {key} (attempt {}, resuming from {:?})",
            record.attempts, record.state
        );

        let start = Instant::now();
        let mut asset = record.asset.clone();
        let result = self.run_stages(key, &mut asset).await;

        match &result {
            Ok(()) => {
                if let Some(metrics) = &self.metrics {
                    metrics.workflows_completed.add(1, &[]);
                    metrics
                        .workflow_duration
                        .record(start.elapsed().as_secs_f64(), &[]);
                }
            }
            Err(e) => {
                self.gate.record_failure(key, e.stage(), e.to_string());
                if let Some(metrics) = &self.metrics {
                    metrics
                        .workflow_failures
                        .add(1, &[KeyValue::new("stage", e.stage().to_string())]);
                }
            }
        }
        result
    }

    async fn run_stages(
        &self,
        key: IdentityKey,
        asset: &mut NftAsset,
    ) -> Result<(), WorkflowError> {
        // Stages 1 and 2 are skipped entirely when a prior attempt already
        // stored the image.
        let image_path = match asset.local_image_path.clone() {
            Some(path) => path,
            None => {
                let image_locator = match asset.image_locator.clone() {
                    Some(locator) => locator,
                    None => self.fetch_metadata(key, asset).await?,
                };
                self.fetch_image(key, asset, &image_locator).await?
            }
        };

        self.print_image(key, &image_path, asset).await?;

        // Burning is best-effort: a failure here is surfaced but the Printed
        // checkpoint stands.
        if self.chain.has_signer() && self.burn_after_print {
            let receipt = burn_token(
                self.chain.as_ref(),
                self.wallet,
                key.contract_address,
                key.token_id,
            )
            .await
            .map_err(|source| WorkflowError::Burn {
                token_id: key.token_id.to_string(),
                source,
            })?;

            self.gate.advance(key, ProcessingState::Burned, asset);
            if let Some(metrics) = &self.metrics {
                metrics
                    .burns_completed
                    .add(1, &[KeyValue::new("method", receipt.method.as_str())]);
            }
        } else {
            if self.burn_after_print {
                debug!("burn_after_print is set but no signing credential is configured, skipping burn for {key}");
            }
            self.gate.advance(key, ProcessingState::BurnSkipped, asset);
        }

        Ok(())
    }

    /// Stage 1: read the token URI from the contract, fetch and parse the
    /// metadata document, and extract the image locator.
    async fn fetch_metadata(
        &self,
        key: IdentityKey,
        asset: &mut NftAsset,
    ) -> Result<String, WorkflowError> {
        let token_label = key.token_id.to_string();

        let token_uri = match asset.token_uri.clone() {
            Some(uri) => uri,
            None => {
                let uri = self
                    .chain
                    .token_uri(key.contract_address, key.token_id)
                    .await
                    .map_err(|e| WorkflowError::Metadata {
                        token_id: token_label.clone(),
                        source: e.into(),
                    })?;
                asset.token_uri = Some(uri.clone());
                uri
            }
        };

        let resolved = resolve_uri(&token_uri);
        let metadata = self
            .fetcher
            .fetch_json(&resolved)
            .await
            .map_err(|e| WorkflowError::Metadata {
                token_id: token_label.clone(),
                source: e.into(),
            })?;

        let image_locator = metadata
            .get("image")
            .and_then(|v| v.as_str())
            .ok_or(WorkflowError::Image {
                token_id: token_label,
                source: ImageError::MissingLocator,
            })?
            .to_string();

        asset.image_locator = Some(image_locator.clone());
        self.gate.advance(key, ProcessingState::MetadataFetched, asset);

        Ok(image_locator)
    }

    /// Stage 2: fetch the image payload and persist it under a filename keyed
    /// by token id.
    async fn fetch_image(
        &self,
        key: IdentityKey,
        asset: &mut NftAsset,
        image_locator: &str,
    ) -> Result<PathBuf, WorkflowError> {
        let token_label = key.token_id.to_string();
        let resolved = resolve_uri(image_locator);

        let (bytes, content_type) =
            self.fetcher
                .fetch_bytes(&resolved)
                .await
                .map_err(|e| WorkflowError::Image {
                    token_id: token_label.clone(),
                    source: e.into(),
                })?;

        let extension = extension_from_content_type(content_type.as_deref());
        let path = self
            .images_dir
            .join(format!("nft-{}.{}", key.token_id, extension));

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| WorkflowError::Image {
                token_id: token_label,
                source: e.into(),
            })?;
        info!("Image for token {key} downloaded to {}", path.display());

        asset.local_image_path = Some(path.clone());
        self.gate.advance(key, ProcessingState::ImageFetched, asset);

        Ok(path)
    }

    /// Stage 3: submit the stored image to the print endpoint.
    async fn print_image(
        &self,
        key: IdentityKey,
        image_path: &std::path::Path,
        asset: &NftAsset,
    ) -> Result<(), WorkflowError> {
        let token_label = key.token_id.to_string();

        let stage_err = |source: PrintError| WorkflowError::Print {
            token_id: token_label.clone(),
            source,
        };

        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|e| stage_err(PrintError::Io(e)))?;
        let filename = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("nft-{}", key.token_id));

        self.printer
            .submit(&filename, bytes)
            .await
            .map_err(stage_err)?;

        info!("Token {key} sent to printer as {filename}");
        self.gate.advance(key, ProcessingState::Printed, asset);
        if let Some(metrics) = &self.metrics {
            metrics.prints_submitted.add(1, &[]);
        }
        Ok(())
    }
}

/// Derive a file extension from a Content-Type header value, defaulting to a
/// generic raster extension when absent or unparseable.
pub(crate) fn extension_from_content_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|ct| ct.split('/').nth(1))
        .map(|sub| sub.split(';').next().unwrap_or(sub).trim())
        .filter(|sub| !sub.is_empty())
        .map(|sub| sub.to_string())
        .unwrap_or_else(|| "png".to_string())
}
