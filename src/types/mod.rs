//! Type definitions for property valuation

pub mod property;
pub mod verdict;

pub use property::{FeatureValue, PropertyForm, PropertyRecord, FEATURE_NAMES};
pub use verdict::{InvestmentPotential, InvestmentVerdict, VerdictThresholds};
