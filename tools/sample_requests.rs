//! Sample Request Generator
//!
//! Sends random evaluate and forecast requests to the valuation service
//! and logs the replies. Falls back to printing the requests when NATS is
//! not reachable.
//!
//! Usage: sample_requests [nats_url] [subject] [count] [forecast_rate] [delay_ms]

use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};
use urbanvaluate::service::{ForecastRequest, ValuationRequest, ValuationResponse};
use urbanvaluate::types::property::{
    FurnishedStatus, OwnerType, ParkingChoice, PropertyForm, PropertyType, TransportAccess,
};

const CITIES: &[(&str, &str)] = &[
    ("Mumbai", "Maharashtra"),
    ("Pune", "Maharashtra"),
    ("Bengaluru", "Karnataka"),
    ("Chennai", "Tamil Nadu"),
    ("Hyderabad", "Telangana"),
    ("Kolkata", "West Bengal"),
    ("Delhi", "Delhi"),
    ("Ahmedabad", "Gujarat"),
];

/// Random property generator
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a random but valid property form
    fn generate_property(&mut self) -> PropertyForm {
        let (city, state) = CITIES[self.rng.gen_range(0..CITIES.len())];
        let bhk = self.rng.gen_range(1..=5) as f64;

        PropertyForm {
            city: city.to_string(),
            state: state.to_string(),
            property_type: self.pick(PropertyType::ALL).to_string(),
            bhk,
            size_in_sqft: (bhk * self.rng.gen_range(350.0..650.0_f64)).round(),
            price_per_sqft: self.rng.gen_range(1500.0..25000.0_f64).round(),
            age_of_property: self.rng.gen_range(0..40) as f64,
            amenities_count: self.rng.gen_range(0..=20),
            parking: self.pick(ParkingChoice::ALL).to_string(),
            public_transport: self.pick(TransportAccess::ALL).to_string(),
            furnished_status: self.pick(FurnishedStatus::ALL).to_string(),
            owner_type: self.pick(OwnerType::ALL).to_string(),
        }
    }

    fn generate_forecast(&mut self) -> ForecastRequest {
        let (city, _) = CITIES[self.rng.gen_range(0..CITIES.len())];

        ForecastRequest {
            city: city.to_string(),
            size_in_sqft: self.rng.gen_range(400.0..3000.0_f64).round(),
            current_price: self.rng.gen_range(30.0..900.0_f64).round(),
            property: None,
        }
    }

    fn generate(&mut self, forecast_rate: f64) -> ValuationRequest {
        if self.rng.gen_bool(forecast_rate) {
            ValuationRequest::Forecast(self.generate_forecast())
        } else {
            ValuationRequest::Evaluate {
                property: self.generate_property(),
            }
        }
    }

    fn pick<T: Copy>(&mut self, choices: &[T]) -> T {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_requests=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("valuate.requests");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let forecast_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.3_f64)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(200);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        forecast_rate = forecast_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, forecast_rate, delay_ms).await;
        }
    };

    let mut generator = RequestGenerator::new();
    let mut verdicts = 0;
    let mut forecasts = 0;
    let mut errors = 0;

    for i in 0..count {
        let request = generator.generate(forecast_rate);
        let payload = serde_json::to_vec(&request)?;

        let reply = match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Request failed");
                errors += 1;
                continue;
            }
        };

        match serde_json::from_slice::<ValuationResponse>(&reply.payload)? {
            ValuationResponse::Verdict(verdict) => {
                verdicts += 1;
                info!(request = i + 1, "{}", verdict.message);
            }
            ValuationResponse::Forecast(report) => {
                forecasts += 1;
                info!(
                    request = i + 1,
                    current = report.current_price,
                    rule_based = %report.rule_based_display,
                    model_driven = %report.model_driven_display,
                    "Forecast"
                );
            }
            ValuationResponse::Error { kind, message } => {
                errors += 1;
                warn!(request = i + 1, kind = %kind, "{}", message);
            }
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! {} verdicts, {} forecasts, {} errors",
        verdicts, forecasts, errors
    );

    Ok(())
}

async fn run_dry_mode(count: u64, forecast_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new();

    for i in 0..count {
        let request = generator.generate(forecast_rate);
        let json = serde_json::to_string_pretty(&request)?;

        info!("Sample request {}:\n{}", i + 1, json);

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
