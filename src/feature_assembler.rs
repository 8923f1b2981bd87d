//! Feature assembly for property model inference.
//!
//! This module turns raw form submissions into the fixed-schema records
//! the classifier and regressor were trained on.

use crate::error::ValidationError;
use crate::types::property::{
    FurnishedStatus, OwnerType, ParkingChoice, PropertyForm, PropertyRecord, PropertyType,
    TransportAccess, FEATURE_NAMES,
};

/// Feature assembler that validates and encodes form submissions.
///
/// Selections are parsed strictly, numeric fields are bounds-checked and
/// passed through unchanged, and free-text fields are copied as-is. Any
/// failure rejects the whole submission.
pub struct FeatureAssembler;

impl FeatureAssembler {
    /// Create a new feature assembler.
    pub fn new() -> Self {
        Self
    }

    /// Assemble a validated record from a form submission.
    pub fn assemble(&self, form: &PropertyForm) -> Result<PropertyRecord, ValidationError> {
        let property_type: PropertyType = form.property_type.parse()?;
        let parking: ParkingChoice = form.parking.parse()?;
        let transport: TransportAccess = form.public_transport.parse()?;
        let furnished_status: FurnishedStatus = form.furnished_status.parse()?;
        let owner_type: OwnerType = form.owner_type.parse()?;

        let bhk = at_least("BHK", form.bhk, 1.0, ">= 1")?;
        let size_in_sqft = at_least("Size_in_SqFt", form.size_in_sqft, 50.0, ">= 50")?;
        let price_per_sqft = at_least("Price_per_SqFt", form.price_per_sqft, 50.0, ">= 50")?;
        let age_of_property = at_least("Age_of_Property", form.age_of_property, 0.0, ">= 0")?;

        if !(0..=20).contains(&form.amenities_count) {
            return Err(ValidationError::OutOfRange {
                field: "Amenities_Count",
                bound: "between 0 and 20",
                value: form.amenities_count as f64,
            });
        }

        Ok(PropertyRecord {
            city: form.city.clone(),
            state: form.state.clone(),
            property_type,
            bhk,
            size_in_sqft,
            price_per_sqft,
            age_of_property,
            amenities_count: form.amenities_count,
            parking_available: parking.flag(),
            public_transport_score: transport.score(),
            furnished_status,
            owner_type,
        })
    }

    /// Record used for the quick price forecast, where only the city and
    /// size are asked for and everything else is a typical apartment.
    pub fn forecast_template(
        &self,
        city: &str,
        size_in_sqft: f64,
    ) -> Result<PropertyRecord, ValidationError> {
        let form = PropertyForm {
            city: city.to_string(),
            state: "Unknown".to_string(),
            property_type: PropertyType::Apartment.to_string(),
            bhk: 2.0,
            size_in_sqft,
            price_per_sqft: 2000.0,
            age_of_property: 5.0,
            amenities_count: 3,
            parking: ParkingChoice::Yes.to_string(),
            public_transport: TransportAccess::Medium.to_string(),
            furnished_status: FurnishedStatus::Unfurnished.to_string(),
            owner_type: OwnerType::Owner.to_string(),
        };

        self.assemble(&form)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Get feature names (training order).
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn at_least(
    field: &'static str,
    value: f64,
    min: f64,
    bound: &'static str,
) -> Result<f64, ValidationError> {
    if value.is_finite() && value >= min {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange { field, bound, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::property::FeatureValue;

    #[test]
    fn test_default_form_assembles() {
        let assembler = FeatureAssembler::new();
        let record = assembler.assemble(&PropertyForm::default()).unwrap();

        assert_eq!(record.city(), "Mumbai");
        assert_eq!(record.property_type(), PropertyType::Apartment);
        assert_eq!(record.bhk(), 2.0);
        assert_eq!(record.parking_available(), 0);
        assert_eq!(record.public_transport_score(), 0);
    }

    #[test]
    fn test_columns_follow_training_order() {
        let assembler = FeatureAssembler::new();
        let form = PropertyForm {
            property_type: "Independent House".to_string(),
            parking: "Yes".to_string(),
            public_transport: "High".to_string(),
            furnished_status: "Semi-furnished".to_string(),
            owner_type: "Builder".to_string(),
            ..PropertyForm::default()
        };

        let record = assembler.assemble(&form).unwrap();
        let columns = record.columns();

        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, assembler.feature_names());
        assert_eq!(columns.len(), assembler.feature_count());

        assert_eq!(columns[2].1, FeatureValue::Text("Independent House"));
        assert_eq!(columns[4].1, FeatureValue::Float(900.0));
        assert_eq!(columns[7].1, FeatureValue::Integer(3));
        assert_eq!(columns[8].1, FeatureValue::Integer(1));
        assert_eq!(columns[9].1, FeatureValue::Integer(2));
        assert_eq!(columns[10].1, FeatureValue::Text("Semi-furnished"));
        assert_eq!(columns[11].1, FeatureValue::Text("Builder"));
    }

    #[test]
    fn test_numeric_bounds() {
        let assembler = FeatureAssembler::new();

        let cases = [
            PropertyForm { bhk: 0.5, ..PropertyForm::default() },
            PropertyForm { size_in_sqft: 49.9, ..PropertyForm::default() },
            PropertyForm { price_per_sqft: 10.0, ..PropertyForm::default() },
            PropertyForm { age_of_property: -1.0, ..PropertyForm::default() },
            PropertyForm { age_of_property: f64::NAN, ..PropertyForm::default() },
            PropertyForm { amenities_count: 21, ..PropertyForm::default() },
            PropertyForm { amenities_count: -1, ..PropertyForm::default() },
        ];

        for form in &cases {
            assert!(matches!(
                assembler.assemble(form),
                Err(ValidationError::OutOfRange { .. })
            ));
        }

        // Lower bounds are inclusive
        let edge = PropertyForm {
            bhk: 1.0,
            size_in_sqft: 50.0,
            price_per_sqft: 50.0,
            age_of_property: 0.0,
            amenities_count: 20,
            ..PropertyForm::default()
        };
        assert!(assembler.assemble(&edge).is_ok());
    }

    #[test]
    fn test_unknown_selection_rejected() {
        let assembler = FeatureAssembler::new();
        let form = PropertyForm {
            public_transport: "Excellent".to_string(),
            ..PropertyForm::default()
        };

        let err = assembler.assemble(&form).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownCategory {
                field: "Public_Transport_Score",
                expected: "Low, Medium, High",
                value: "Excellent".to_string(),
            }
        );
    }

    #[test]
    fn test_forecast_template() {
        let assembler = FeatureAssembler::new();
        let record = assembler.forecast_template("Delhi", 1200.0).unwrap();

        assert_eq!(record.city(), "Delhi");
        assert_eq!(record.state(), "Unknown");
        assert_eq!(record.size_in_sqft(), 1200.0);
        assert_eq!(record.price_per_sqft(), 2000.0);
        assert_eq!(record.parking_available(), 1);
        assert_eq!(record.public_transport_score(), 1);

        assert!(assembler.forecast_template("Delhi", 20.0).is_err());
    }
}
