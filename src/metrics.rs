use std::sync::Arc;
use tracing::info;

use axum::{Router, routing::get};
use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
use opentelemetry_sdk::metrics::{MetricError, SdkMeterProvider};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;

pub struct Metrics {
    registry: Arc<prometheus::Registry>,
    _provider: SdkMeterProvider,

    // Ingress metrics
    pub events_received: Counter<u64>,
    pub duplicates_suppressed: Counter<u64>,

    // Workflow metrics
    pub workflows_completed: Counter<u64>,
    pub workflow_failures: Counter<u64>,
    pub workflow_duration: Histogram<f64>,
    pub prints_submitted: Counter<u64>,
    pub burns_completed: Counter<u64>,

    // RPC metrics
    pub rpc_requests: Counter<u64>,
    pub rpc_errors: Counter<u64>,
}

impl Metrics {
    pub fn new() -> Result<Self, MetricError> {
        // Create a new prometheus registry
        let registry = prometheus::Registry::new();

        // Configure OpenTelemetry to use this registry
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        // Set up a meter to create instruments
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("monitor_metrics");

        let events_received = meter
            .u64_counter("monitor_events_received")
            .with_description("Transfer events received, by ingress source")
            .build();

        let duplicates_suppressed = meter
            .u64_counter("monitor_duplicates_suppressed")
            .with_description("Transfer events dropped as duplicates by the dedup gate")
            .build();

        let workflows_completed = meter
            .u64_counter("monitor_workflows_completed")
            .with_description("Token workflows that reached a terminal state")
            .build();

        let workflow_failures = meter
            .u64_counter("monitor_workflow_failures")
            .with_description("Workflow stage failures, by stage")
            .build();

        let workflow_duration = meter
            .f64_histogram("monitor_workflow_duration")
            .with_description("End-to-end workflow duration")
            .with_boundaries(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0])
            .with_unit("s")
            .build();

        let prints_submitted = meter
            .u64_counter("monitor_prints_submitted")
            .with_description("Images successfully submitted to the print endpoint")
            .build();

        let burns_completed = meter
            .u64_counter("monitor_burns_completed")
            .with_description("Tokens destroyed after printing, by burn method")
            .build();

        let rpc_requests = meter
            .u64_counter("monitor_rpc_requests")
            .with_description("Number of RPC requests made")
            .build();

        let rpc_errors = meter
            .u64_counter("monitor_rpc_errors")
            .with_description("Number of RPC errors encountered")
            .build();

        Ok(Self {
            registry: Arc::new(registry),
            _provider: provider,
            events_received,
            duplicates_suppressed,
            workflows_completed,
            workflow_failures,
            workflow_duration,
            prints_submitted,
            burns_completed,
            rpc_requests,
            rpc_errors,
        })
    }

    pub async fn start_metrics_server(&self, addr: &str, port: u16) {
        let addr = format!("{addr}:{port}").parse::<SocketAddr>().unwrap();
        let registry = self.registry.clone();

        let app = Router::new().route("/metrics", get(move || metrics_handler(registry.clone())));

        // Determine the access URL based on the binding address. Only used for logging.
        let access_url = if addr.ip().to_string() == "0.0.0.0" {
            format!("http://localhost:{port}/metrics")
        } else {
            format!("http://{}:{port}/metrics", addr.ip())
        };

        info!(
            "Starting metrics server - binding to {} (accessible at {})",
            addr, access_url
        );

        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

        // Spawn the server in a separate task
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
    }
}

async fn metrics_handler(registry: Arc<prometheus::Registry>) -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
