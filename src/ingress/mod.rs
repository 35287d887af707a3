pub mod subscription;
pub mod webhook;

use alloy_primitives::{Address, U256};
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use serde::Deserialize;

use crate::external::chain::IERC721;
use crate::models::common::{EventSource, TransferEvent};
use crate::models::errors::IngressParseError;

/// Webhook request body: `{event: {activity: [...]}}`.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub event: Option<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub activity: Vec<ActivityItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub to_address: Option<String>,
    pub category: Option<String>,
    pub contract_address: Option<String>,
    pub token_id: Option<String>,
}

/// Parse an address case-insensitively. Lowercasing first sidesteps EIP-55
/// checksum validation, which would reject provider payloads that use
/// arbitrary casing.
fn parse_address(value: &str) -> Option<Address> {
    value.to_lowercase().parse::<Address>().ok()
}

/// Emit a `TransferEvent` for a webhook activity record only if it denotes a
/// single-unit ERC-721 transfer into the monitored wallet. Non-matching
/// records produce `Ok(None)`; matching records with missing or invalid
/// identity fields produce an error for the caller to drop with a warning.
pub fn normalize_activity(
    item: &ActivityItem,
    wallet: Address,
) -> Result<Option<TransferEvent>, IngressParseError> {
    let matches_wallet = item
        .to_address
        .as_deref()
        .and_then(parse_address)
        .is_some_and(|to| to == wallet);
    let is_erc721 = item.category.as_deref() == Some("erc721");
    if !matches_wallet || !is_erc721 {
        return Ok(None);
    }

    let contract = item
        .contract_address
        .as_deref()
        .ok_or(IngressParseError::MissingField {
            field: "contractAddress",
        })?;
    let contract_address =
        parse_address(contract).ok_or_else(|| IngressParseError::InvalidAddress {
            value: contract.to_string(),
            reason: "not a 20-byte hex address".to_string(),
        })?;

    let token = item
        .token_id
        .as_deref()
        .ok_or(IngressParseError::MissingField { field: "tokenId" })?;
    let token_id = token
        .parse::<U256>()
        .map_err(|_| IngressParseError::InvalidTokenId {
            value: token.to_string(),
        })?;

    Ok(Some(TransferEvent {
        contract_address,
        token_id,
        source: EventSource::Webhook,
    }))
}

/// Emit a `TransferEvent` for a raw chain log carrying an ERC-721 `Transfer`
/// into the monitored wallet. The subscription filter already narrows the
/// stream, but each log is re-validated so a misbehaving provider cannot slip
/// foreign events into the pipeline.
pub fn normalize_log(log: &Log, wallet: Address) -> Result<TransferEvent, IngressParseError> {
    let topics = log.inner.data.topics();
    if topics.len() != 4 {
        return Err(IngressParseError::TopicCount { got: topics.len() });
    }
    if topics[0] != IERC721::Transfer::SIGNATURE_HASH {
        return Err(IngressParseError::SignatureMismatch);
    }
    if topics[2] != wallet.into_word() {
        return Err(IngressParseError::DestinationMismatch);
    }

    Ok(TransferEvent {
        contract_address: log.inner.address,
        token_id: U256::from_be_bytes(topics[3].0),
        source: EventSource::ChainLog,
    })
}
