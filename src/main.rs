//! UrbanValuate - Main Entry Point
//!
//! Loads the valuation models, then answers evaluate and forecast requests
//! arriving on NATS. Requests are handled concurrently up to the configured
//! worker count.

use anyhow::{Context, Result};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use urbanvaluate::{
    config::{AppConfig, LoggingConfig},
    consumer::RequestConsumer,
    metrics::{MetricsReporter, ServiceMetrics},
    models::inference::InferenceEngine,
    responder::Responder,
    service::ValuationService,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting UrbanValuate");
    info!(
        "Verdict thresholds: moderate>={:.2}, high>={:.2}; rule-based growth {:.1}% over {} years",
        config.verdict.moderate,
        config.verdict.high,
        config.forecast.annual_growth_rate * 100.0,
        config.forecast.horizon_years
    );

    let metrics = Arc::new(ServiceMetrics::new());

    // Missing models are logged and reported per request, not fatal
    let engine = InferenceEngine::new(&config.models);
    info!("Loaded models: {:?}", engine.model_names());
    if !engine.has_classifier() {
        warn!("Classifier unavailable: evaluate requests will be answered with model_unavailable");
    }
    if !engine.has_regressor() {
        warn!("Regressor unavailable: forecasts will be rule-based only");
    }

    let service = Arc::new(ValuationService::new(engine, &config, metrics.clone()));

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(
        client.clone(),
        &config.nats.request_subject,
        config.nats.queue_group.as_deref(),
    );
    let responder = Responder::new(client.clone());

    let num_workers = config.service.workers.max(1);
    info!(
        subject = %consumer.subject(),
        workers = num_workers,
        "Listening for valuation requests"
    );

    let semaphore = Arc::new(Semaphore::new(num_workers));

    let reporter = MetricsReporter::new(metrics.clone(), config.service.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore.clone().acquire_owned().await?;

        let service = service.clone();
        let responder = responder.clone();

        tokio::spawn(async move {
            let response = service.handle_payload(&message.payload);

            if let Err(e) = responder.reply(&message, &response).await {
                error!(error = %e, "Failed to publish valuation response");
            }

            drop(permit);
        });
    }

    info!("Subscription closed, shutting down");
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(format!("urbanvaluate={}", logging.level))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}
