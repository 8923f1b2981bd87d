//! Valuation operations exposed to callers.
//!
//! [`ValuationService::handle`] is the outer boundary: every request gets a
//! response, and validation or model failures become a readable message
//! instead of an error that escapes to the transport.

use crate::bulk;
use crate::config::AppConfig;
use crate::error::{InferenceError, ValidationError, ValuationError};
use crate::feature_assembler::FeatureAssembler;
use crate::forecast::GrowthProjection;
use crate::metrics::ServiceMetrics;
use crate::models::inference::InferenceEngine;
use crate::types::property::{PropertyForm, PropertyRecord};
use crate::types::verdict::{InvestmentVerdict, VerdictThresholds};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Quick forecast input: city, size and today's price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastRequest {
    pub city: String,
    pub size_in_sqft: f64,
    /// Current price in Lakhs
    pub current_price: f64,
    /// Full property details; replaces the typical-apartment template
    pub property: Option<PropertyForm>,
}

impl Default for ForecastRequest {
    fn default() -> Self {
        Self {
            city: "Mumbai".to_string(),
            size_in_sqft: 900.0,
            current_price: 150.0,
            property: None,
        }
    }
}

/// Rule-based and model-driven projections side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub current_price: f64,
    pub horizon_years: u32,
    pub rule_based: f64,
    /// `None` when the regressor could not be used
    pub model_driven: Option<f64>,
    pub rule_based_display: String,
    pub model_driven_display: String,
}

/// Request accepted by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ValuationRequest {
    Evaluate {
        #[serde(default)]
        property: PropertyForm,
    },
    Forecast(ForecastRequest),
    /// Single-property CSV upload
    EvaluateCsv { csv: String },
}

/// Reply sent for every request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValuationResponse {
    Verdict(InvestmentVerdict),
    Forecast(ForecastReport),
    Error { kind: String, message: String },
}

impl ValuationResponse {
    fn from_error(err: &ValuationError) -> Self {
        ValuationResponse::Error {
            kind: err.kind().to_string(),
            message: err.user_message(),
        }
    }
}

/// Stateless valuation operations over the loaded models
pub struct ValuationService {
    assembler: FeatureAssembler,
    engine: InferenceEngine,
    thresholds: VerdictThresholds,
    projection: GrowthProjection,
    metrics: Arc<ServiceMetrics>,
}

impl ValuationService {
    pub fn new(engine: InferenceEngine, config: &AppConfig, metrics: Arc<ServiceMetrics>) -> Self {
        Self::from_parts(
            engine,
            config.verdict.clone(),
            config.forecast,
            metrics,
        )
    }

    pub fn from_parts(
        engine: InferenceEngine,
        thresholds: VerdictThresholds,
        projection: GrowthProjection,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            assembler: FeatureAssembler::new(),
            engine,
            thresholds,
            projection,
            metrics,
        }
    }

    /// Investment verdict for one submitted property
    pub fn evaluate(&self, form: &PropertyForm) -> Result<InvestmentVerdict, ValuationError> {
        let record = self.assembler.assemble(form)?;
        let probability = self.timed("classifier", || self.engine.classify(&record))?;

        let verdict = InvestmentVerdict::new(probability, &self.thresholds);
        self.metrics.record_verdict(verdict.potential, probability);

        info!(
            request_id = %verdict.request_id,
            city = %record.city(),
            probability = probability,
            potential = ?verdict.potential,
            "Property evaluated"
        );
        Ok(verdict)
    }

    /// Investment verdict for a single-property CSV upload
    pub fn evaluate_csv(&self, csv_text: &str) -> Result<InvestmentVerdict, ValuationError> {
        let form = bulk::parse_single_property(csv_text)?;
        self.evaluate(&form)
    }

    /// Rule-based projection plus the regressor's estimate when available.
    ///
    /// Only an invalid current price fails. Invalid property details or a
    /// missing or failing regressor leave `model_driven` empty.
    pub fn forecast(&self, request: &ForecastRequest) -> Result<ForecastReport, ValidationError> {
        if !request.current_price.is_finite() || request.current_price < 1.0 {
            return Err(ValidationError::OutOfRange {
                field: "current_price",
                bound: ">= 1",
                value: request.current_price,
            });
        }

        let rule_based = self.projection.project(request.current_price);

        let model_driven = match self.forecast_record(request) {
            Ok(record) => self
                .model_forecast(&record)
                .ok_or_else(|| "Model unavailable.".to_string()),
            Err(e) => {
                info!(error = %e, "Model-driven forecast skipped: invalid property details");
                Err(format!("Invalid input: {}", e))
            }
        };
        self.metrics.record_forecast();

        debug!(
            city = %request.city,
            rule_based = rule_based,
            model_driven = ?model_driven,
            "Forecast generated"
        );

        Ok(ForecastReport {
            current_price: request.current_price,
            horizon_years: self.projection.horizon_years,
            rule_based,
            model_driven: model_driven.as_ref().ok().copied(),
            rule_based_display: format!("{:.2} Lakhs", rule_based),
            model_driven_display: match model_driven {
                Ok(v) => format!("{:.2} Lakhs", v),
                Err(reason) => reason,
            },
        })
    }

    fn forecast_record(&self, request: &ForecastRequest) -> Result<PropertyRecord, ValidationError> {
        match &request.property {
            Some(form) => self.assembler.assemble(form),
            None => self
                .assembler
                .forecast_template(&request.city, request.size_in_sqft),
        }
    }

    /// Answer one request, converting every failure into an error reply
    pub fn handle(&self, request: ValuationRequest) -> ValuationResponse {
        let start = Instant::now();

        let result = match request {
            ValuationRequest::Evaluate { property } => {
                self.evaluate(&property).map(ValuationResponse::Verdict)
            }
            ValuationRequest::EvaluateCsv { csv } => {
                self.evaluate_csv(&csv).map(ValuationResponse::Verdict)
            }
            ValuationRequest::Forecast(request) => self
                .forecast(&request)
                .map(ValuationResponse::Forecast)
                .map_err(ValuationError::from),
        };

        self.metrics.record_request(start.elapsed());

        result.unwrap_or_else(|e| {
            self.metrics.record_error(e.kind());
            match &e {
                ValuationError::Validation(_) => info!(error = %e, "Request rejected"),
                ValuationError::Inference(_) => warn!(error = %e, "Request could not be evaluated"),
            }
            ValuationResponse::from_error(&e)
        })
    }

    /// Answer a raw JSON request
    pub fn handle_payload(&self, payload: &[u8]) -> ValuationResponse {
        let start = Instant::now();

        match serde_json::from_slice::<ValuationRequest>(payload) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!(error = %e, "Failed to deserialize request");
                self.metrics.record_request(start.elapsed());
                self.metrics.record_error("validation_error");
                ValuationResponse::Error {
                    kind: "validation_error".to_string(),
                    message: format!("Invalid input: malformed request: {}", e),
                }
            }
        }
    }

    fn model_forecast(&self, record: &PropertyRecord) -> Option<f64> {
        match self.timed("regressor", || self.engine.regress(record)) {
            Ok(estimate) => Some(estimate),
            Err(InferenceError::ModelUnavailable(model)) => {
                debug!(model = model, "Model-driven forecast skipped");
                None
            }
            Err(e) => {
                warn!(error = %e, "Model-driven forecast failed");
                None
            }
        }
    }

    fn timed<T>(
        &self,
        model: &str,
        f: impl FnOnce() -> Result<T, InferenceError>,
    ) -> Result<T, InferenceError> {
        let start = Instant::now();
        let result = f();
        if result.is_ok() {
            self.metrics.record_model_time(model, start.elapsed());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::tests::fixed;
    use crate::types::verdict::InvestmentPotential;
    use std::sync::atomic::Ordering;

    fn service(classifier: Option<f64>, regressor: Option<f64>) -> ValuationService {
        let engine = InferenceEngine::with_models(
            classifier.and_then(|p| fixed("classifier", p)),
            regressor.and_then(|v| fixed("regressor", v)),
        );
        ValuationService::from_parts(
            engine,
            VerdictThresholds::default(),
            GrowthProjection::default(),
            Arc::new(ServiceMetrics::new()),
        )
    }

    #[test]
    fn test_evaluate_levels() {
        for (probability, expected) in [
            (0.80, InvestmentPotential::High),
            (0.75, InvestmentPotential::High),
            (0.60, InvestmentPotential::Moderate),
            (0.50, InvestmentPotential::Moderate),
            (0.30, InvestmentPotential::Low),
        ] {
            let verdict = service(Some(probability), None)
                .evaluate(&PropertyForm::default())
                .unwrap();
            assert_eq!(verdict.potential, expected, "probability {}", probability);
            assert_eq!(verdict.probability, probability);
        }
    }

    #[test]
    fn test_evaluate_without_classifier() {
        let svc = service(None, Some(100.0));

        assert_eq!(
            svc.evaluate(&PropertyForm::default()).unwrap_err(),
            ValuationError::Inference(InferenceError::ModelUnavailable("classifier"))
        );
    }

    #[test]
    fn test_validation_happens_before_inference() {
        let svc = service(None, None);
        let form = PropertyForm {
            bhk: 0.0,
            ..PropertyForm::default()
        };

        // Rejected as invalid even though the model is also missing
        assert!(matches!(
            svc.evaluate(&form),
            Err(ValuationError::Validation(ValidationError::OutOfRange { field: "BHK", .. }))
        ));
    }

    #[test]
    fn test_forecast_with_regressor() {
        let svc = service(None, Some(250.0));
        let report = svc.forecast(&ForecastRequest::default()).unwrap();

        assert!((report.rule_based - 220.399).abs() < 0.001);
        assert_eq!(report.rule_based_display, "220.40 Lakhs");
        // Stub scales by size: 250 * 900 / 1000
        assert_eq!(report.model_driven, Some(225.0));
        assert_eq!(report.model_driven_display, "225.00 Lakhs");
        assert_eq!(report.horizon_years, 5);
    }

    #[test]
    fn test_forecast_without_regressor_keeps_rule_based() {
        let with_model = service(None, Some(250.0))
            .forecast(&ForecastRequest::default())
            .unwrap();
        let without_model = service(None, None)
            .forecast(&ForecastRequest::default())
            .unwrap();

        assert_eq!(without_model.model_driven, None);
        assert_eq!(without_model.model_driven_display, "Model unavailable.");
        assert_eq!(without_model.rule_based, with_model.rule_based);
    }

    #[test]
    fn test_forecast_uses_full_property_when_given() {
        let svc = service(None, Some(100.0));
        let request = ForecastRequest {
            property: Some(PropertyForm {
                size_in_sqft: 2000.0,
                ..PropertyForm::default()
            }),
            ..ForecastRequest::default()
        };

        assert_eq!(svc.forecast(&request).unwrap().model_driven, Some(200.0));
    }

    #[test]
    fn test_forecast_keeps_rule_based_for_invalid_property() {
        let svc = service(None, Some(250.0));

        let report = svc
            .forecast(&ForecastRequest {
                size_in_sqft: 20.0,
                ..ForecastRequest::default()
            })
            .unwrap();
        assert!((report.rule_based - 220.399).abs() < 0.001);
        assert_eq!(report.model_driven, None);
        assert!(report.model_driven_display.contains("Size_in_SqFt"));

        let report = svc
            .forecast(&ForecastRequest {
                property: Some(PropertyForm {
                    owner_type: "Agent".to_string(),
                    ..PropertyForm::default()
                }),
                ..ForecastRequest::default()
            })
            .unwrap();
        assert_eq!(report.rule_based_display, "220.40 Lakhs");
        assert_eq!(report.model_driven, None);
        assert!(report.model_driven_display.starts_with("Invalid input"));
    }

    #[test]
    fn test_forecast_rejects_bad_price() {
        let svc = service(None, None);
        let request = ForecastRequest {
            current_price: 0.5,
            ..ForecastRequest::default()
        };

        assert!(matches!(
            svc.forecast(&request),
            Err(ValidationError::OutOfRange { field: "current_price", .. })
        ));
    }

    #[test]
    fn test_handle_converts_errors() {
        let svc = service(None, None);

        match svc.handle(ValuationRequest::Evaluate {
            property: PropertyForm::default(),
        }) {
            ValuationResponse::Error { kind, message } => {
                assert_eq!(kind, "model_unavailable");
                assert!(message.contains("Model not found"));
            }
            other => panic!("expected error reply, got {:?}", other),
        }

        match svc.handle(ValuationRequest::EvaluateCsv {
            csv: "City\nPune\nDelhi\n".to_string(),
        }) {
            ValuationResponse::Error { kind, .. } => assert_eq!(kind, "validation_error"),
            other => panic!("expected error reply, got {:?}", other),
        }

        assert_eq!(svc.metrics.requests_handled.load(Ordering::Relaxed), 2);
        assert_eq!(svc.metrics.get_errors_by_kind().get("validation_error"), Some(&1));
    }

    #[test]
    fn test_handle_payload() {
        let svc = service(Some(0.9), Some(120.0));

        let reply = svc.handle_payload(
            br#"{"op": "evaluate", "property": {"City": "Hyderabad", "parking": "Yes", "public_transport": "High"}}"#,
        );
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["status"], "verdict");
        assert_eq!(json["potential"], "high");

        let reply = svc.handle_payload(br#"{"op": "forecast", "current_price": 100.0}"#);
        match reply {
            ValuationResponse::Forecast(report) => {
                assert_eq!(report.current_price, 100.0);
                assert!(report.model_driven.is_some());
            }
            other => panic!("expected forecast, got {:?}", other),
        }

        let csv = "City,BHK,Amenities_Count\\nKolkata,3,5\\n";
        let payload = format!(r#"{{"op": "evaluate_csv", "csv": "{}"}}"#, csv);
        assert!(matches!(
            svc.handle_payload(payload.as_bytes()),
            ValuationResponse::Verdict(_)
        ));

        assert!(matches!(
            svc.handle_payload(b"{not json"),
            ValuationResponse::Error { .. }
        ));
    }

    #[test]
    fn test_malformed_payload_is_counted() {
        let svc = service(Some(0.9), None);

        svc.handle_payload(b"{not json");
        svc.handle_payload(br#"{"op": "appraise"}"#);

        assert_eq!(svc.metrics.requests_handled.load(Ordering::Relaxed), 2);
        assert_eq!(svc.metrics.get_errors_by_kind().get("validation_error"), Some(&2));
    }
}
