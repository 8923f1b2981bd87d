//! Rule-based price projection

use serde::{Deserialize, Serialize};

pub const DEFAULT_ANNUAL_GROWTH_RATE: f64 = 0.08;
pub const DEFAULT_HORIZON_YEARS: u32 = 5;

/// Compound growth projection, independent of any model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthProjection {
    /// Yearly appreciation as a fraction (0.08 = 8%)
    pub annual_growth_rate: f64,
    pub horizon_years: u32,
}

impl GrowthProjection {
    pub fn new(annual_growth_rate: f64, horizon_years: u32) -> Self {
        Self {
            annual_growth_rate,
            horizon_years,
        }
    }

    /// Project `current_price` forward by the horizon.
    pub fn project(&self, current_price: f64) -> f64 {
        let years = i32::try_from(self.horizon_years).unwrap_or(i32::MAX);
        current_price * (1.0 + self.annual_growth_rate).powi(years)
    }
}

impl Default for GrowthProjection {
    fn default() -> Self {
        Self::new(DEFAULT_ANNUAL_GROWTH_RATE, DEFAULT_HORIZON_YEARS)
    }
}

/// Five-year projection at 8% yearly growth.
pub fn rule_based_forecast(current_price: f64) -> f64 {
    GrowthProjection::default().project(current_price)
}
