use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result, anyhow};
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};
use url::Url;

use nft_print_monitor::external::chain::RpcTokenClient;
use nft_print_monitor::external::content::HttpFetcher;
use nft_print_monitor::external::print::HttpPrintClient;
use nft_print_monitor::ingress::{subscription, webhook};
use nft_print_monitor::metrics::Metrics;
use nft_print_monitor::monitor::Monitor;
use nft_print_monitor::utils::load_config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    println!();
    info!("=========================== INITIALIZING ===========================");

    // Load config
    let config = match load_config("config.yml") {
        Ok(config) => {
            info!("Config loaded successfully");
            config
        }
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Err(anyhow!(e));
        }
    };

    let wallet_address: Address = config
        .wallet_address
        .to_lowercase()
        .parse()
        .context("invalid wallet_address in config")?;
    let print_endpoint: Url = config
        .print_endpoint
        .parse()
        .context("invalid print_endpoint in config")?;

    // Ensure the image storage area exists before any workflow runs
    let images_dir = PathBuf::from(&config.images_dir);
    std::fs::create_dir_all(&images_dir).context("failed to create images directory")?;
    info!("Storing images under {}", images_dir.display());

    // Initialize optional metrics
    let metrics = if config.metrics.enabled {
        let metrics = Arc::new(Metrics::new()?);
        metrics
            .start_metrics_server(&config.metrics.address, config.metrics.port)
            .await;
        Some(metrics)
    } else {
        info!("Metrics are disabled");
        None
    };

    // Shared HTTP client; every external call is bounded by the configured deadline
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    // Create RPC provider, with a signing credential only when burning is possible
    let has_signer = config.private_key.is_some();
    let provider: DynProvider = match &config.private_key {
        Some(key) => {
            let signer: PrivateKeySigner =
                key.parse().context("invalid private_key in config")?;
            ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect(&config.rpc_url)
                .await
                .context("failed to connect to RPC endpoint")?
                .erased()
        }
        None => ProviderBuilder::new()
            .connect(&config.rpc_url)
            .await
            .context("failed to connect to RPC endpoint")?
            .erased(),
    };
    info!("RPC endpoint: {}", config.rpc_url);
    if !has_signer {
        info!("No signing credential configured, burning is disabled");
    }

    let monitor = Arc::new(Monitor::new(
        Arc::new(RpcTokenClient::new(
            provider.clone(),
            has_signer,
            metrics.clone(),
        )),
        Arc::new(HttpFetcher::new(http_client.clone())),
        Arc::new(HttpPrintClient::new(http_client, print_endpoint.to_string())),
        wallet_address,
        images_dir,
        config.burn_after_print,
        metrics,
    ));

    println!();
    info!("========================= STARTING MONITOR =========================");
    info!("Monitoring wallet: {wallet_address}");
    info!("Print endpoint: {print_endpoint}");

    // The chain subscription needs a pubsub transport; with a plain HTTP RPC
    // URL the monitor runs webhook-only.
    if config.rpc_url.starts_with("ws") {
        let subscription_monitor = Arc::clone(&monitor);
        tokio::spawn(subscription::run(
            provider,
            wallet_address,
            subscription_monitor,
        ));
    } else {
        warn!("RPC URL is not a websocket endpoint, chain subscription disabled");
    }

    let state = Arc::new(webhook::AppState {
        monitor,
        wallet: wallet_address,
    });
    webhook::serve(state, config.port).await
}
