//! Mock collaborators for exercising the pipeline without a chain, an HTTP
//! origin, or a printer.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::external::chain::TokenContract;
use crate::external::content::ContentFetcher;
use crate::external::print::PrintClient;
use crate::models::errors::{ChainError, FetchError, PrintError};

#[derive(Default)]
pub struct MockChain {
    pub uris: Mutex<HashMap<(Address, U256), String>>,
    pub signer: bool,
    pub fail_native_burn: bool,
    pub fail_transfer: bool,
    pub uri_calls: AtomicU32,
    pub burn_calls: AtomicU32,
    /// (contract, from, to, token_id) for every transfer attempt.
    pub transfers: Mutex<Vec<(Address, Address, Address, U256)>>,
}

impl MockChain {
    pub fn with_signer() -> Self {
        Self {
            signer: true,
            ..Self::default()
        }
    }

    pub fn set_uri(&self, contract: Address, token_id: U256, uri: &str) {
        self.uris
            .lock()
            .unwrap()
            .insert((contract, token_id), uri.to_string());
    }
}

#[async_trait]
impl TokenContract for MockChain {
    async fn token_uri(&self, contract: Address, token_id: U256) -> Result<String, ChainError> {
        self.uri_calls.fetch_add(1, Ordering::SeqCst);
        self.uris
            .lock()
            .unwrap()
            .get(&(contract, token_id))
            .cloned()
            .ok_or_else(|| ChainError::Rpc("unknown token".to_string()))
    }

    async fn burn(&self, _contract: Address, _token_id: U256) -> Result<TxHash, ChainError> {
        if !self.signer {
            return Err(ChainError::NoSigner);
        }
        self.burn_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_native_burn {
            return Err(ChainError::Rpc("execution reverted".to_string()));
        }
        Ok(TxHash::repeat_byte(0xbb))
    }

    async fn transfer(
        &self,
        contract: Address,
        from: Address,
        to: Address,
        token_id: U256,
    ) -> Result<TxHash, ChainError> {
        if !self.signer {
            return Err(ChainError::NoSigner);
        }
        self.transfers
            .lock()
            .unwrap()
            .push((contract, from, to, token_id));
        if self.fail_transfer {
            return Err(ChainError::Rpc("execution reverted".to_string()));
        }
        Ok(TxHash::repeat_byte(0xcc))
    }

    fn has_signer(&self) -> bool {
        self.signer
    }
}

#[derive(Default)]
pub struct MockFetcher {
    pub documents: Mutex<HashMap<String, serde_json::Value>>,
    pub payloads: Mutex<HashMap<String, (Vec<u8>, Option<String>)>>,
    pub json_calls: AtomicU32,
    pub bytes_calls: AtomicU32,
}

impl MockFetcher {
    pub fn set_document(&self, url: &str, doc: serde_json::Value) {
        self.documents.lock().unwrap().insert(url.to_string(), doc);
    }

    pub fn set_payload(&self, url: &str, bytes: Vec<u8>, content_type: Option<&str>) {
        self.payloads.lock().unwrap().insert(
            url.to_string(),
            (bytes, content_type.map(|s| s.to_string())),
        );
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        self.json_calls.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>), FetchError> {
        self.bytes_calls.fetch_add(1, Ordering::SeqCst);
        let payload = self
            .payloads
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))?;
        if payload.0.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(payload)
    }
}

#[derive(Default)]
pub struct MockPrinter {
    /// Number of upcoming submissions to reject before succeeding.
    pub fail_remaining: AtomicU32,
    pub submissions: Mutex<Vec<String>>,
}

impl MockPrinter {
    pub fn failing_first(n: u32) -> Self {
        Self {
            fail_remaining: AtomicU32::new(n),
            submissions: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PrintClient for MockPrinter {
    async fn submit(&self, filename: &str, _bytes: Vec<u8>) -> Result<(), PrintError> {
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(PrintError::Status(503));
        }
        self.submissions.lock().unwrap().push(filename.to_string());
        Ok(())
    }
}
