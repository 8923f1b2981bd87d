//! Request and model statistics for the valuation service.

use crate::types::verdict::InvestmentPotential;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the service
pub struct ServiceMetrics {
    /// Total requests answered
    pub requests_handled: AtomicU64,
    /// Verdicts issued
    pub verdicts_issued: AtomicU64,
    /// Forecasts issued
    pub forecasts_issued: AtomicU64,
    verdicts_by_potential: RwLock<HashMap<&'static str, u64>>,
    errors_by_kind: RwLock<HashMap<&'static str, u64>>,
    /// Handling times (in microseconds)
    handling_times: RwLock<Vec<u64>>,
    /// Model inference times (in microseconds)
    model_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Classifier probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_handled: AtomicU64::new(0),
            verdicts_issued: AtomicU64::new(0),
            forecasts_issued: AtomicU64::new(0),
            verdicts_by_potential: RwLock::new(HashMap::new()),
            errors_by_kind: RwLock::new(HashMap::new()),
            handling_times: RwLock::new(Vec::with_capacity(1000)),
            model_times: RwLock::new(HashMap::new()),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record an answered request
    pub fn record_request(&self, handling_time: Duration) {
        self.requests_handled.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.handling_times.write() {
            times.push(handling_time.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Record an issued verdict
    pub fn record_verdict(&self, potential: InvestmentPotential, probability: f64) {
        self.verdicts_issued.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_potential) = self.verdicts_by_potential.write() {
            *by_potential.entry(potential.label()).or_insert(0) += 1;
        }

        let bucket = (probability.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_forecast(&self) {
        self.forecasts_issued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request answered with an error
    pub fn record_error(&self, kind: &'static str) {
        if let Ok(mut by_kind) = self.errors_by_kind.write() {
            *by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    /// Record model inference time
    pub fn record_model_time(&self, model_name: &str, duration: Duration) {
        if let Ok(mut times) = self.model_times.write() {
            let model_times = times.entry(model_name.to_string()).or_default();
            model_times.push(duration.as_micros() as u64);
            if model_times.len() > 1000 {
                model_times.drain(0..500);
            }
        }
    }

    /// Get handling time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        match self.handling_times.read() {
            Ok(times) => ProcessingStats::from_samples(&times),
            Err(_) => ProcessingStats::default(),
        }
    }

    /// Get per-model inference stats
    pub fn get_model_stats(&self) -> HashMap<String, ProcessingStats> {
        let Ok(times) = self.model_times.read() else {
            return HashMap::new();
        };

        times
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(model, samples)| (model.clone(), ProcessingStats::from_samples(samples)))
            .collect()
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_handled.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    pub fn get_verdicts_by_potential(&self) -> HashMap<&'static str, u64> {
        self.verdicts_by_potential
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn get_errors_by_kind(&self) -> HashMap<&'static str, u64> {
        self.errors_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let requests = self.requests_handled.load(Ordering::Relaxed);
        let verdicts = self.verdicts_issued.load(Ordering::Relaxed);
        let forecasts = self.forecasts_issued.load(Ordering::Relaxed);
        let handling = self.get_processing_stats();

        info!(
            requests = requests,
            verdicts = verdicts,
            forecasts = forecasts,
            throughput = format!("{:.2} req/s", self.get_throughput()),
            mean_us = handling.mean_us,
            p50_us = handling.p50_us,
            p99_us = handling.p99_us,
            "Valuation service summary"
        );

        for (potential, count) in self.get_verdicts_by_potential() {
            info!(potential = potential, count = count, "Verdicts by potential");
        }

        for (kind, count) in self.get_errors_by_kind() {
            info!(kind = kind, count = count, "Errors by kind");
        }

        let distribution = self.get_probability_distribution();
        let total: u64 = distribution.iter().sum();
        if total > 0 {
            for (i, &count) in distribution.iter().enumerate() {
                let pct = count as f64 / total as f64 * 100.0;
                info!(
                    "  {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                    i as f64 / 10.0,
                    (i + 1) as f64 / 10.0,
                    count,
                    pct,
                    "█".repeat(((pct / 2.0) as usize).min(20))
                );
            }
        }

        for (model, stats) in self.get_model_stats() {
            info!(
                model = %model,
                calls = stats.count,
                mean_us = stats.mean_us,
                p50_us = stats.p50_us,
                p99_us = stats.p99_us,
                "Model inference times"
            );
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing statistics over a window of samples
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl ProcessingStats {
    fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        Self {
            count: count as u64,
            mean_us: sorted.iter().sum::<u64>() / count as u64,
            p50_us: sorted[count / 2],
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }
}

/// Periodic metrics summary printer
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
