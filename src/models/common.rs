use std::path::PathBuf;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::models::errors::Stage;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
}

fn default_images_dir() -> String {
    "images".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub rpc_url: String,
    pub wallet_address: String,
    pub print_endpoint: String,
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
    /// Optional signing credential. Absence disables all burn attempts
    /// regardless of `burn_after_print`.
    pub private_key: Option<String>,
    #[serde(default)]
    pub burn_after_print: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    pub metrics: MetricsConfig,
}

/// Which ingress adapter reported a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    Webhook,
    ChainLog,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Webhook => "webhook",
            EventSource::ChainLog => "chain_log",
        }
    }
}

/// A notification that a specific token moved to the monitored wallet.
/// Emitted by the event normalizer, consumed once by the dedup gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub contract_address: Address,
    pub token_id: U256,
    pub source: EventSource,
}

impl TransferEvent {
    pub fn key(&self) -> IdentityKey {
        IdentityKey {
            contract_address: self.contract_address,
            token_id: self.token_id,
        }
    }
}

/// The (contract address, token id) pair uniquely identifying a token.
/// Addresses compare as bytes, so case differences in the source input are
/// already normalized away at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub contract_address: Address,
    pub token_id: U256,
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.contract_address, self.token_id)
    }
}

/// Furthest successful checkpoint of a token's workflow. A key at `Printed`
/// or beyond never re-enters `Pending`; `Burned` is reachable only after
/// `Printed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProcessingState {
    Pending,
    MetadataFetched,
    ImageFetched,
    Printed,
    Burned,
    BurnSkipped,
}

impl ProcessingState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessingState::Printed | ProcessingState::Burned | ProcessingState::BurnSkipped
        )
    }
}

/// Resolved token metadata, populated incrementally as stages complete so a
/// retried workflow can resume without repeating finished work.
#[derive(Debug, Clone, Default)]
pub struct NftAsset {
    pub token_uri: Option<String>,
    pub image_locator: Option<String>,
    pub local_image_path: Option<PathBuf>,
}

/// The failing stage and message of the most recent attempt.
#[derive(Debug, Clone)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

/// Lifecycle of one identity key. One record per key for the life of the
/// process, owned exclusively by the dedup gate.
#[derive(Debug, Clone)]
pub struct ProcessingRecord {
    pub key: IdentityKey,
    pub state: ProcessingState,
    pub attempts: u32,
    pub asset: NftAsset,
    pub last_error: Option<StageFailure>,
}

impl ProcessingRecord {
    pub fn new(key: IdentityKey) -> Self {
        Self {
            key,
            state: ProcessingState::Pending,
            attempts: 0,
            asset: NftAsset::default(),
            last_error: None,
        }
    }
}
