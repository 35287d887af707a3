use std::net::SocketAddr;
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::Result;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::ingress::{WebhookPayload, normalize_activity};
use crate::monitor::Monitor;

pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub wallet: Address,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .with_state(state)
}

/// Bind the webhook listener and serve until ctrl-c.
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Webhook listener binding to {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down webhook listener...");
        })
        .await?;
    Ok(())
}

/// Intake for pushed transfer notifications. Individual activity items are
/// handled in isolation: malformed ones are dropped with a warning, admitted
/// ones are processed in spawned tasks. The caller sees 200 whenever the
/// request itself was readable, even if zero items matched.
async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            error!("Error processing webhook: {rejection}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": rejection.to_string() })),
            );
        }
    };

    debug!("Received webhook: {payload:?}");

    if let Some(event) = &payload.event {
        for activity in &event.activity {
            match normalize_activity(activity, state.wallet) {
                Ok(Some(transfer)) => {
                    state.monitor.handle_event(transfer);
                }
                Ok(None) => {}
                Err(e) => warn!("Dropping malformed activity record: {e}"),
            }
        }
    }

    (StatusCode::OK, Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mock::{MockChain, MockFetcher, MockPrinter};
    use crate::models::common::{IdentityKey, ProcessingState};
    use alloy_primitives::U256;
    use std::path::PathBuf;

    const WALLET: Address = Address::repeat_byte(0x11);
    const CONTRACT: Address = Address::repeat_byte(0xab);

    fn state() -> Arc<AppState> {
        let monitor = Arc::new(Monitor::new(
            Arc::new(MockChain::default()),
            Arc::new(MockFetcher::default()),
            Arc::new(MockPrinter::default()),
            WALLET,
            PathBuf::from("images"),
            false,
            None,
        ));
        Arc::new(AppState {
            monitor,
            wallet: WALLET,
        })
    }

    fn payload(to: &str, category: &str, token: &str) -> WebhookPayload {
        serde_json::from_value(json!({
            "event": {
                "activity": [{
                    "toAddress": to,
                    "category": category,
                    "contractAddress": CONTRACT.to_string(),
                    "tokenId": token,
                }]
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn matching_activity_is_admitted_and_acknowledged() {
        let state = state();
        let body = payload(&WALLET.to_string(), "erc721", "42");

        let (status, Json(response)) =
            handle_webhook(State(Arc::clone(&state)), Ok(Json(body))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response, json!({ "success": true }));

        let key = IdentityKey {
            contract_address: CONTRACT,
            token_id: U256::from(42),
        };
        let record = state.monitor.record(&key).expect("record created");
        assert!(record.state >= ProcessingState::Pending);
    }

    #[tokio::test]
    async fn non_matching_batch_still_returns_success() {
        let state = state();
        let body = payload(&Address::repeat_byte(0x22).to_string(), "erc721", "42");

        let (status, Json(response)) =
            handle_webhook(State(Arc::clone(&state)), Ok(Json(body))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response, json!({ "success": true }));
        let key = IdentityKey {
            contract_address: CONTRACT,
            token_id: U256::from(42),
        };
        assert!(state.monitor.record(&key).is_none());
    }

    #[tokio::test]
    async fn empty_body_event_is_acknowledged() {
        let state = state();
        let body: WebhookPayload = serde_json::from_value(json!({})).unwrap();

        let (status, _) = handle_webhook(State(state), Ok(Json(body))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unreadable_body_returns_internal_error() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let app = router(state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from("{not valid json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body.get("error").is_some());
    }
}
