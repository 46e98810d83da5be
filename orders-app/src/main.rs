//! # Orders Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the ledger store adapter
//! - Build the ID source and payment gateway
//! - Create the order and voucher services
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orders_hex::{
    JsapiPayGateway, OrderService, SnowflakeGenerator, VoucherService,
    inbound::{AppState, HttpServer},
};
use orders_repo::build_repo;

fn init_tracer(endpoint: &str) -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("orders-service"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::from_env()?;

    // OpenTelemetry export only when a collector is configured
    let otel = config
        .otlp_endpoint
        .as_deref()
        .map(init_tracer)
        .transpose()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,orders_app=debug,orders_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            otel.as_ref()
                .map(|(tracer, _)| tracing_opentelemetry::layer().with_tracer(tracer.clone())),
        )
        .init();

    tracing::info!("Starting orders server on port {}", config.port);
    tracing::info!(
        node_id = config.node_id,
        timeout_ms = config.store_timeout.as_millis() as u64,
        otlp = config.otlp_endpoint.is_some(),
        "Configuration loaded"
    );

    // Build repository (handles connection and migration)
    let repo = Arc::new(build_repo(&config.database_url).await?);

    let ids = SnowflakeGenerator::new(config.node_id)
        .map_err(|e| anyhow::anyhow!("Invalid NODE_ID: {}", e))?;
    let gateway = JsapiPayGateway::new(config.pay_app_id, config.pay_merchant_key);

    let state = AppState {
        orders: OrderService::new(repo.clone(), Arc::new(ids)).with_deadline(config.store_timeout),
        vouchers: VoucherService::new(repo).with_deadline(config.store_timeout),
        gateway: Arc::new(gateway),
        notify_secret: config.pay_notify_secret,
    };

    // Create and run the HTTP server
    let server = HttpServer::with_rate_limit(state, config.rate_limit_per_minute);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces are flushed before exit
    if let Some((_, provider)) = otel {
        let _ = provider.shutdown();
    }
    Ok(())
}
