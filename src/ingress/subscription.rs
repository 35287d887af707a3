use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use alloy_provider::{DynProvider, Provider};
use alloy_rpc_types_eth::Filter;
use alloy_sol_types::SolEvent;
use futures::StreamExt;
use tracing::{error, info, warn};

use crate::external::chain::IERC721;
use crate::ingress::normalize_log;
use crate::monitor::Monitor;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Transfer events with any sender and the monitored wallet as destination,
/// left-padded to 32 bytes.
pub fn transfer_filter(wallet: Address) -> Filter {
    Filter::new()
        .event_signature(IERC721::Transfer::SIGNATURE_HASH)
        .topic2(wallet.into_word())
}

/// Long-lived chain-log subscription. Runs until process shutdown,
/// resubscribing after stream drops or subscription failures. Processing
/// failures are logged only; there is no caller to respond to.
pub async fn run(provider: DynProvider, wallet: Address, monitor: Arc<Monitor>) {
    let filter = transfer_filter(wallet);
    info!("Starting to monitor NFT transfers to wallet: {wallet}");

    loop {
        match provider.subscribe_logs(&filter).await {
            Ok(subscription) => {
                let mut stream = subscription.into_stream();
                while let Some(log) = stream.next().await {
                    match normalize_log(&log, wallet) {
                        Ok(event) => {
                            monitor.handle_event(event);
                        }
                        Err(e) => warn!("Dropping malformed transfer log: {e}"),
                    }
                }
                warn!(
                    "Chain subscription stream ended, resubscribing in {}s",
                    RECONNECT_DELAY.as_secs()
                );
            }
            Err(e) => {
                error!(
                    "Failed to subscribe to transfer logs: {e}. Retrying in {}s",
                    RECONNECT_DELAY.as_secs()
                );
            }
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
