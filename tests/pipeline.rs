use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use tempfile::TempDir;

use nft_print_monitor::external::chain::TokenContract;
use nft_print_monitor::external::content::ContentFetcher;
use nft_print_monitor::external::mock::{MockChain, MockFetcher, MockPrinter};
use nft_print_monitor::external::print::PrintClient;
use nft_print_monitor::models::common::{
    EventSource, IdentityKey, ProcessingState, TransferEvent,
};
use nft_print_monitor::models::errors::{Stage, WorkflowError};
use nft_print_monitor::monitor::Monitor;

const WALLET: Address = Address::repeat_byte(0x11);
const CONTRACT: Address = Address::repeat_byte(0xab);

const TOKEN_URI: &str = "ipfs://QmMetaHash/42.json";
const RESOLVED_TOKEN_URI: &str = "https://ipfs.io/ipfs/QmMetaHash/42.json";
const IMAGE_URI: &str = "ipfs://QmImageHash/42.png";
const RESOLVED_IMAGE_URI: &str = "https://ipfs.io/ipfs/QmImageHash/42.png";

struct Harness {
    monitor: Arc<Monitor>,
    chain: Arc<MockChain>,
    fetcher: Arc<MockFetcher>,
    printer: Arc<MockPrinter>,
    _images: TempDir,
}

fn harness(chain: MockChain, printer: MockPrinter, burn_after_print: bool) -> Harness {
    let chain = Arc::new(chain);
    let fetcher = Arc::new(MockFetcher::default());
    let printer = Arc::new(printer);
    let images = TempDir::new().unwrap();

    let monitor = Arc::new(Monitor::new(
        Arc::clone(&chain) as Arc<dyn TokenContract>,
        Arc::clone(&fetcher) as Arc<dyn ContentFetcher>,
        Arc::clone(&printer) as Arc<dyn PrintClient>,
        WALLET,
        images.path().to_path_buf(),
        burn_after_print,
        None,
    ));

    Harness {
        monitor,
        chain,
        fetcher,
        printer,
        _images: images,
    }
}

/// Wire up a token that can be processed end to end.
fn seed_token(h: &Harness, token_id: u64) {
    h.chain.set_uri(CONTRACT, U256::from(token_id), TOKEN_URI);
    h.fetcher.set_document(
        RESOLVED_TOKEN_URI,
        serde_json::json!({ "name": "Test Token", "image": IMAGE_URI }),
    );
    h.fetcher
        .set_payload(RESOLVED_IMAGE_URI, vec![0xde, 0xad, 0xbe, 0xef], Some("image/png"));
}

fn event(token_id: u64, source: EventSource) -> TransferEvent {
    TransferEvent {
        contract_address: CONTRACT,
        token_id: U256::from(token_id),
        source,
    }
}

fn key(token_id: u64) -> IdentityKey {
    IdentityKey {
        contract_address: CONTRACT,
        token_id: U256::from(token_id),
    }
}

/// Poll the record until it reaches a terminal state.
async fn wait_terminal(monitor: &Monitor, token_id: u64) {
    for _ in 0..200 {
        if let Some(record) = monitor.record(&key(token_id)) {
            if record.state.is_terminal() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("workflow for token {token_id} did not reach a terminal state");
}

#[tokio::test]
async fn duplicate_reports_run_exactly_one_workflow() {
    let h = harness(MockChain::default(), MockPrinter::default(), false);
    seed_token(&h, 42);

    // Webhook first, the chain log echoes the same transfer shortly after
    assert!(h.monitor.handle_event(event(42, EventSource::Webhook)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!h.monitor.handle_event(event(42, EventSource::ChainLog)));

    wait_terminal(&h.monitor, 42).await;

    assert_eq!(h.printer.submissions.lock().unwrap().len(), 1);
    assert_eq!(h.fetcher.json_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.fetcher.bytes_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_reports_in_reverse_order_also_run_once() {
    let h = harness(MockChain::default(), MockPrinter::default(), false);
    seed_token(&h, 42);

    assert!(h.monitor.handle_event(event(42, EventSource::ChainLog)));
    assert!(!h.monitor.handle_event(event(42, EventSource::Webhook)));
    // Retried webhook delivery is also a no-op
    assert!(!h.monitor.handle_event(event(42, EventSource::Webhook)));

    wait_terminal(&h.monitor, 42).await;
    assert_eq!(h.printer.submissions.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn completed_workflow_ends_at_burn_skipped_without_credential() {
    let h = harness(MockChain::default(), MockPrinter::default(), true);
    seed_token(&h, 42);

    h.monitor.process(CONTRACT, U256::from(42)).await.unwrap();

    let record = h.monitor.record(&key(42)).unwrap();
    assert_eq!(record.state, ProcessingState::BurnSkipped);
    // Burn was never attempted: flag is on, credential is absent
    assert_eq!(h.chain.burn_calls.load(Ordering::SeqCst), 0);
    assert!(h.chain.transfers.lock().unwrap().is_empty());
    // Image landed in the print queue with the content-type-derived name
    assert_eq!(
        h.printer.submissions.lock().unwrap().as_slice(),
        &["nft-42.png".to_string()]
    );
}

#[tokio::test]
async fn print_retry_resumes_without_refetching() {
    let h = harness(MockChain::default(), MockPrinter::failing_first(1), false);
    seed_token(&h, 42);

    let err = h.monitor.process(CONTRACT, U256::from(42)).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Print { .. }));

    let record = h.monitor.record(&key(42)).unwrap();
    assert_eq!(record.state, ProcessingState::ImageFetched);
    assert_eq!(record.last_error.as_ref().unwrap().stage, Stage::Print);

    // Direct re-invocation: print succeeds, stages 1-2 are not repeated
    h.monitor.process(CONTRACT, U256::from(42)).await.unwrap();

    assert_eq!(h.chain.uri_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.fetcher.json_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.fetcher.bytes_calls.load(Ordering::SeqCst), 1);

    let record = h.monitor.record(&key(42)).unwrap();
    assert_eq!(record.state, ProcessingState::BurnSkipped);
    assert_eq!(record.attempts, 2);
    assert!(record.last_error.is_none());
}

#[tokio::test]
async fn metadata_404_short_circuits_the_workflow() {
    let h = harness(MockChain::default(), MockPrinter::default(), false);
    // Token URI resolves but no metadata document is served
    h.chain.set_uri(CONTRACT, U256::from(42), TOKEN_URI);

    let err = h.monitor.process(CONTRACT, U256::from(42)).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Metadata { .. }));

    // No image fetch, no print call
    assert_eq!(h.fetcher.bytes_calls.load(Ordering::SeqCst), 0);
    assert!(h.printer.submissions.lock().unwrap().is_empty());

    // Record queryable as failed-at-metadata
    let record = h.monitor.record(&key(42)).unwrap();
    assert_eq!(record.state, ProcessingState::Pending);
    assert_eq!(record.last_error.as_ref().unwrap().stage, Stage::Metadata);
}

#[tokio::test]
async fn empty_image_payload_fails_the_image_stage() {
    let h = harness(MockChain::default(), MockPrinter::default(), false);
    h.chain.set_uri(CONTRACT, U256::from(42), TOKEN_URI);
    h.fetcher.set_document(
        RESOLVED_TOKEN_URI,
        serde_json::json!({ "name": "Test Token", "image": IMAGE_URI }),
    );
    // The image locator resolves but serves zero bytes
    h.fetcher.set_payload(RESOLVED_IMAGE_URI, vec![], Some("image/png"));

    let err = h.monitor.process(CONTRACT, U256::from(42)).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Image { .. }));

    let record = h.monitor.record(&key(42)).unwrap();
    assert_eq!(record.state, ProcessingState::MetadataFetched);
    assert_eq!(record.last_error.as_ref().unwrap().stage, Stage::Image);
    assert!(h.printer.submissions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn metadata_without_image_field_fails_the_image_stage() {
    let h = harness(MockChain::default(), MockPrinter::default(), false);
    h.chain.set_uri(CONTRACT, U256::from(42), TOKEN_URI);
    h.fetcher.set_document(
        RESOLVED_TOKEN_URI,
        serde_json::json!({ "name": "No Artwork Here" }),
    );

    let err = h.monitor.process(CONTRACT, U256::from(42)).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Image { .. }));

    // The image payload was never requested, nothing was printed
    assert_eq!(h.fetcher.bytes_calls.load(Ordering::SeqCst), 0);
    assert!(h.printer.submissions.lock().unwrap().is_empty());

    let record = h.monitor.record(&key(42)).unwrap();
    assert_eq!(record.last_error.as_ref().unwrap().stage, Stage::Image);
}

#[tokio::test]
async fn burn_runs_after_print_when_credential_and_flag_present() {
    let h = harness(MockChain::with_signer(), MockPrinter::default(), true);
    seed_token(&h, 42);

    h.monitor.process(CONTRACT, U256::from(42)).await.unwrap();

    let record = h.monitor.record(&key(42)).unwrap();
    assert_eq!(record.state, ProcessingState::Burned);
    assert_eq!(h.chain.burn_calls.load(Ordering::SeqCst), 1);
    // Native call succeeded, no fallback transfer
    assert!(h.chain.transfers.lock().unwrap().is_empty());
}

#[tokio::test]
async fn reverted_native_burn_falls_back_to_null_transfer() {
    let chain = MockChain {
        fail_native_burn: true,
        ..MockChain::with_signer()
    };
    let h = harness(chain, MockPrinter::default(), true);
    seed_token(&h, 42);

    h.monitor.process(CONTRACT, U256::from(42)).await.unwrap();

    let record = h.monitor.record(&key(42)).unwrap();
    assert_eq!(record.state, ProcessingState::Burned);
    assert_eq!(
        h.chain.transfers.lock().unwrap().as_slice(),
        &[(CONTRACT, WALLET, Address::ZERO, U256::from(42))]
    );
}

#[tokio::test]
async fn burn_failure_does_not_roll_back_printed() {
    let chain = MockChain {
        fail_native_burn: true,
        fail_transfer: true,
        ..MockChain::with_signer()
    };
    let h = harness(chain, MockPrinter::default(), true);
    seed_token(&h, 42);

    let err = h.monitor.process(CONTRACT, U256::from(42)).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Burn { .. }));

    let record = h.monitor.record(&key(42)).unwrap();
    assert_eq!(record.state, ProcessingState::Printed);
    assert_eq!(record.last_error.as_ref().unwrap().stage, Stage::Burn);
    assert_eq!(h.printer.submissions.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn terminal_keys_are_not_reprocessed() {
    let h = harness(MockChain::default(), MockPrinter::default(), false);
    seed_token(&h, 42);

    h.monitor.process(CONTRACT, U256::from(42)).await.unwrap();
    // Erroneous re-invocation after completion is a no-op
    h.monitor.process(CONTRACT, U256::from(42)).await.unwrap();

    assert_eq!(h.printer.submissions.lock().unwrap().len(), 1);
    assert_eq!(h.chain.uri_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn distinct_tokens_process_independently() {
    let h = harness(MockChain::default(), MockPrinter::default(), false);
    seed_token(&h, 42);
    // Token 43 points at a missing document and fails at metadata
    h.chain.set_uri(CONTRACT, U256::from(43), "ipfs://QmOtherHash/43.json");

    assert!(h.monitor.handle_event(event(42, EventSource::Webhook)));
    assert!(h.monitor.handle_event(event(43, EventSource::ChainLog)));

    wait_terminal(&h.monitor, 42).await;
    assert_eq!(h.printer.submissions.lock().unwrap().len(), 1);
}
