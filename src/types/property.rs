//! Property data structures for investment evaluation

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column names in the order the models were trained on.
pub const FEATURE_NAMES: [&str; 12] = [
    "City",
    "State",
    "Property_Type",
    "BHK",
    "Size_in_SqFt",
    "Price_per_SqFt",
    "Age_of_Property",
    "Amenities_Count",
    "Parking_Available",
    "Public_Transport_Score",
    "Furnished_Status",
    "Owner_Type",
];

/// Declares a closed set of labelled choices with strict parsing.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal, $expected:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            /// All choices, in display order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Label as it appears in the form and in the training data
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($label => Ok($name::$variant),)+
                    other => Err(ValidationError::UnknownCategory {
                        field: $field,
                        expected: $expected,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labelled_enum! {
    /// Kind of dwelling
    PropertyType, "Property_Type", "Apartment, Villa, Independent House, Studio" {
        Apartment => "Apartment",
        Villa => "Villa",
        IndependentHouse => "Independent House",
        Studio => "Studio",
    }
}

labelled_enum! {
    /// Furnishing level
    FurnishedStatus, "Furnished_Status", "Unfurnished, Semi-furnished, Furnished" {
        Unfurnished => "Unfurnished",
        SemiFurnished => "Semi-furnished",
        Furnished => "Furnished",
    }
}

labelled_enum! {
    /// Who is selling
    OwnerType, "Owner_Type", "Owner, Builder" {
        Owner => "Owner",
        Builder => "Builder",
    }
}

labelled_enum! {
    /// Public transport access, ordinal
    TransportAccess, "Public_Transport_Score", "Low, Medium, High" {
        Low => "Low",
        Medium => "Medium",
        High => "High",
    }
}

labelled_enum! {
    /// Parking selection
    ParkingChoice, "Parking_Available", "Yes, No" {
        Yes => "Yes",
        No => "No",
    }
}

impl TransportAccess {
    /// Ordinal score fed to the models (Low=0, Medium=1, High=2)
    pub fn score(&self) -> i64 {
        match self {
            TransportAccess::Low => 0,
            TransportAccess::Medium => 1,
            TransportAccess::High => 2,
        }
    }
}

impl ParkingChoice {
    /// Flag fed to the models (Yes=1, No=0)
    pub fn flag(&self) -> i64 {
        match self {
            ParkingChoice::Yes => 1,
            ParkingChoice::No => 0,
        }
    }
}

/// Raw form submission for a single property.
///
/// Selections arrive as their display labels and are only checked when the
/// form is assembled into a [`PropertyRecord`]. Missing fields take the same
/// defaults the valuation form starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyForm {
    #[serde(alias = "City")]
    pub city: String,

    #[serde(alias = "State")]
    pub state: String,

    /// Apartment, Villa, Independent House or Studio
    #[serde(alias = "Property_Type")]
    pub property_type: String,

    /// Bedrooms, hall and kitchen count
    #[serde(alias = "BHK")]
    pub bhk: f64,

    #[serde(alias = "Size_in_SqFt")]
    pub size_in_sqft: f64,

    #[serde(alias = "Price_per_SqFt")]
    pub price_per_sqft: f64,

    /// Age in years
    #[serde(alias = "Age_of_Property")]
    pub age_of_property: f64,

    #[serde(alias = "Amenities_Count")]
    pub amenities_count: i64,

    /// Yes or No
    #[serde(alias = "Parking_Available")]
    pub parking: String,

    /// Low, Medium or High
    #[serde(alias = "Public_Transport_Score")]
    pub public_transport: String,

    /// Unfurnished, Semi-furnished or Furnished
    #[serde(alias = "Furnished_Status")]
    pub furnished_status: String,

    /// Owner or Builder
    #[serde(alias = "Owner_Type")]
    pub owner_type: String,
}

impl Default for PropertyForm {
    fn default() -> Self {
        Self {
            city: "Mumbai".to_string(),
            state: "Maharashtra".to_string(),
            property_type: PropertyType::Apartment.to_string(),
            bhk: 2.0,
            size_in_sqft: 900.0,
            price_per_sqft: 1800.0,
            age_of_property: 5.0,
            amenities_count: 3,
            parking: ParkingChoice::No.to_string(),
            public_transport: TransportAccess::Low.to_string(),
            furnished_status: FurnishedStatus::Unfurnished.to_string(),
            owner_type: OwnerType::Owner.to_string(),
        }
    }
}

/// A single model input value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue<'a> {
    Text(&'a str),
    Float(f64),
    Integer(i64),
}

/// Validated model input for one property.
///
/// Only [`crate::feature_assembler::FeatureAssembler`] builds these, so every
/// field is present and within bounds. The record cannot be modified after it
/// is built.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub(crate) city: String,
    pub(crate) state: String,
    pub(crate) property_type: PropertyType,
    pub(crate) bhk: f64,
    pub(crate) size_in_sqft: f64,
    pub(crate) price_per_sqft: f64,
    pub(crate) age_of_property: f64,
    pub(crate) amenities_count: i64,
    pub(crate) parking_available: i64,
    pub(crate) public_transport_score: i64,
    pub(crate) furnished_status: FurnishedStatus,
    pub(crate) owner_type: OwnerType,
}

impl PropertyRecord {
    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    pub fn bhk(&self) -> f64 {
        self.bhk
    }

    pub fn size_in_sqft(&self) -> f64 {
        self.size_in_sqft
    }

    pub fn price_per_sqft(&self) -> f64 {
        self.price_per_sqft
    }

    pub fn age_of_property(&self) -> f64 {
        self.age_of_property
    }

    pub fn amenities_count(&self) -> i64 {
        self.amenities_count
    }

    /// 1 when parking is available, 0 otherwise
    pub fn parking_available(&self) -> i64 {
        self.parking_available
    }

    /// 0, 1 or 2
    pub fn public_transport_score(&self) -> i64 {
        self.public_transport_score
    }

    pub fn furnished_status(&self) -> FurnishedStatus {
        self.furnished_status
    }

    pub fn owner_type(&self) -> OwnerType {
        self.owner_type
    }

    /// Named model inputs in training order (see [`FEATURE_NAMES`]).
    pub fn columns(&self) -> [(&'static str, FeatureValue<'_>); 12] {
        [
            (FEATURE_NAMES[0], FeatureValue::Text(&self.city)),
            (FEATURE_NAMES[1], FeatureValue::Text(&self.state)),
            (FEATURE_NAMES[2], FeatureValue::Text(self.property_type.as_str())),
            (FEATURE_NAMES[3], FeatureValue::Float(self.bhk)),
            (FEATURE_NAMES[4], FeatureValue::Float(self.size_in_sqft)),
            (FEATURE_NAMES[5], FeatureValue::Float(self.price_per_sqft)),
            (FEATURE_NAMES[6], FeatureValue::Float(self.age_of_property)),
            (FEATURE_NAMES[7], FeatureValue::Integer(self.amenities_count)),
            (FEATURE_NAMES[8], FeatureValue::Integer(self.parking_available)),
            (FEATURE_NAMES[9], FeatureValue::Integer(self.public_transport_score)),
            (FEATURE_NAMES[10], FeatureValue::Text(self.furnished_status.as_str())),
            (FEATURE_NAMES[11], FeatureValue::Text(self.owner_type.as_str())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_score_encoding() {
        let scores: Vec<i64> = TransportAccess::ALL.iter().map(|t| t.score()).collect();
        assert_eq!(scores, vec![0, 1, 2]);
        assert_eq!("Medium".parse::<TransportAccess>().unwrap().score(), 1);
        assert!("Very High".parse::<TransportAccess>().is_err());
        assert!("low".parse::<TransportAccess>().is_err());
    }

    #[test]
    fn test_parking_flag_encoding() {
        assert_eq!("Yes".parse::<ParkingChoice>().unwrap().flag(), 1);
        assert_eq!("No".parse::<ParkingChoice>().unwrap().flag(), 0);
        assert!(matches!(
            "Maybe".parse::<ParkingChoice>(),
            Err(ValidationError::UnknownCategory {
                field: "Parking_Available",
                ..
            })
        ));
    }

    #[test]
    fn test_labels_round_trip_through_from_str() {
        for t in PropertyType::ALL {
            assert_eq!(t.as_str().parse::<PropertyType>().unwrap(), *t);
        }
        assert_eq!(
            "Semi-furnished".parse::<FurnishedStatus>().unwrap(),
            FurnishedStatus::SemiFurnished
        );
    }

    #[test]
    fn test_form_defaults_from_partial_json() {
        let form: PropertyForm =
            serde_json::from_str(r#"{"City": "Pune", "bhk": 3.0, "parking": "Yes"}"#).unwrap();

        assert_eq!(form.city, "Pune");
        assert_eq!(form.state, "Maharashtra");
        assert_eq!(form.bhk, 3.0);
        assert_eq!(form.size_in_sqft, 900.0);
        assert_eq!(form.parking, "Yes");
        assert_eq!(form.public_transport, "Low");
    }
}
