//! Single-property CSV intake.
//!
//! An uploaded CSV can stand in for manual form entry. It must hold exactly
//! one data row; columns use the training column names and any column that
//! is missing or empty keeps the form default.

use crate::error::ValidationError;
use crate::types::property::{ParkingChoice, PropertyForm, TransportAccess};
use serde::Deserialize;
use std::io;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct BulkRow {
    #[serde(rename = "City", default)]
    city: Option<String>,
    #[serde(rename = "State", default)]
    state: Option<String>,
    #[serde(rename = "Property_Type", default)]
    property_type: Option<String>,
    #[serde(rename = "BHK", default)]
    bhk: Option<f64>,
    #[serde(rename = "Size_in_SqFt", default)]
    size_in_sqft: Option<f64>,
    #[serde(rename = "Price_per_SqFt", default)]
    price_per_sqft: Option<f64>,
    #[serde(rename = "Age_of_Property", default)]
    age_of_property: Option<f64>,
    #[serde(rename = "Amenities_Count", default)]
    amenities_count: Option<f64>,
    #[serde(rename = "Parking_Available", default)]
    parking: Option<String>,
    #[serde(rename = "Public_Transport_Score", default)]
    public_transport: Option<String>,
    #[serde(rename = "Furnished_Status", default)]
    furnished_status: Option<String>,
    #[serde(rename = "Owner_Type", default)]
    owner_type: Option<String>,
}

/// Parse an uploaded CSV document into a form.
pub fn parse_single_property(csv_text: &str) -> Result<PropertyForm, ValidationError> {
    read_single_property(csv_text.as_bytes())
}

/// Read a CSV stream holding exactly one property.
pub fn read_single_property<R: io::Read>(reader: R) -> Result<PropertyForm, ValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().map_err(malformed)?.clone();
    let rows = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(malformed)?;

    if rows.len() != 1 {
        return Err(ValidationError::RowCount(rows.len()));
    }

    let row: BulkRow = rows[0].deserialize(Some(&headers)).map_err(malformed)?;
    debug!(columns = headers.len(), "Parsed single-property upload");

    row.into_form()
}

impl BulkRow {
    fn into_form(self) -> Result<PropertyForm, ValidationError> {
        let defaults = PropertyForm::default();

        let amenities_count = match self.amenities_count {
            Some(count) => whole_number(count)?,
            None => defaults.amenities_count,
        };

        Ok(PropertyForm {
            city: self.city.unwrap_or(defaults.city),
            state: self.state.unwrap_or(defaults.state),
            property_type: self.property_type.unwrap_or(defaults.property_type),
            bhk: self.bhk.unwrap_or(defaults.bhk),
            size_in_sqft: self.size_in_sqft.unwrap_or(defaults.size_in_sqft),
            price_per_sqft: self.price_per_sqft.unwrap_or(defaults.price_per_sqft),
            age_of_property: self.age_of_property.unwrap_or(defaults.age_of_property),
            amenities_count,
            parking: self
                .parking
                .map(decode_parking)
                .unwrap_or(defaults.parking),
            public_transport: self
                .public_transport
                .map(decode_transport)
                .unwrap_or(defaults.public_transport),
            furnished_status: self.furnished_status.unwrap_or(defaults.furnished_status),
            owner_type: self.owner_type.unwrap_or(defaults.owner_type),
        })
    }
}

/// Rows exported from the training data carry the encoded flag.
fn decode_parking(value: String) -> String {
    match value.as_str() {
        "1" => ParkingChoice::Yes.to_string(),
        "0" => ParkingChoice::No.to_string(),
        _ => value,
    }
}

/// Rows exported from the training data carry the ordinal score.
fn decode_transport(value: String) -> String {
    match value.as_str() {
        "0" => TransportAccess::Low.to_string(),
        "1" => TransportAccess::Medium.to_string(),
        "2" => TransportAccess::High.to_string(),
        _ => value,
    }
}

fn whole_number(value: f64) -> Result<i64, ValidationError> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= i64::MAX as f64 {
        Ok(value as i64)
    } else {
        Err(ValidationError::OutOfRange {
            field: "Amenities_Count",
            bound: "a whole number",
            value,
        })
    }
}

fn malformed(err: csv::Error) -> ValidationError {
    ValidationError::MalformedCsv(err.to_string())
}
