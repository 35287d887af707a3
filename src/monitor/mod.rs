pub mod burn;
pub mod gate;
pub mod workflow;

use std::path::PathBuf;
use std::sync::Arc;

use alloy_primitives::Address;
use opentelemetry::KeyValue;
use tracing::{debug, error, info};

use crate::external::chain::TokenContract;
use crate::external::content::ContentFetcher;
use crate::external::print::PrintClient;
use crate::metrics::Metrics;
use crate::models::common::{IdentityKey, ProcessingRecord, TransferEvent};
use crate::monitor::gate::DedupGate;

/// Owns the dedup gate and the workflow collaborators. Both ingress adapters
/// hand their normalized events to `handle_event`; everything downstream of
/// admission runs in a spawned task so a stuck external call never blocks
/// ingress.
pub struct Monitor {
    pub(crate) gate: DedupGate,
    pub(crate) chain: Arc<dyn TokenContract>,
    pub(crate) fetcher: Arc<dyn ContentFetcher>,
    pub(crate) printer: Arc<dyn PrintClient>,
    pub(crate) wallet: Address,
    pub(crate) images_dir: PathBuf,
    pub(crate) burn_after_print: bool,
    pub(crate) metrics: Option<Arc<Metrics>>,
}

impl Monitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: Arc<dyn TokenContract>,
        fetcher: Arc<dyn ContentFetcher>,
        printer: Arc<dyn PrintClient>,
        wallet: Address,
        images_dir: PathBuf,
        burn_after_print: bool,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            gate: DedupGate::new(),
            chain,
            fetcher,
            printer,
            wallet,
            images_dir,
            burn_after_print,
            metrics,
        }
    }

    /// Admit an event and, on first admission, spawn its workflow. Returns
    /// whether the event was admitted.
    pub fn handle_event(self: &Arc<Self>, event: TransferEvent) -> bool {
        if let Some(metrics) = &self.metrics {
            metrics
                .events_received
                .add(1, &[KeyValue::new("source", event.source.as_str())]);
        }

        if !self.gate.admit(&event) {
            debug!(
                "Transfer {} reported by {} already admitted, skipping",
                event.key(),
                event.source.as_str()
            );
            if let Some(metrics) = &self.metrics {
                metrics.duplicates_suppressed.add(1, &[]);
            }
            return false;
        }

        info!(
            "NFT transfer detected via {}: {}",
            event.source.as_str(),
            event.key()
        );

        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = monitor
                .process(event.contract_address, event.token_id)
                .await
            {
                error!("Workflow for {} failed: {e}", event.key());
            }
        });
        true
    }

    /// Query the lifecycle record for a key, if one exists.
    pub fn record(&self, key: &IdentityKey) -> Option<ProcessingRecord> {
        self.gate.snapshot(key)
    }
}
