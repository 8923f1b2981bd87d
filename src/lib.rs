//! UrbanValuate Library
//!
//! Property investment verdicts and 5-year price forecasts from a
//! pre-trained classifier and regressor, served over NATS.

pub mod bulk;
pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_assembler;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod responder;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::{InferenceError, LoadError, ValidationError, ValuationError};
pub use feature_assembler::FeatureAssembler;
pub use forecast::{rule_based_forecast, GrowthProjection};
pub use models::inference::InferenceEngine;
pub use responder::Responder;
pub use service::{ForecastReport, ForecastRequest, ValuationRequest, ValuationResponse, ValuationService};
pub use types::{property::PropertyForm, property::PropertyRecord, verdict::InvestmentVerdict};
