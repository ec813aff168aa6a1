//! Prediction output

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One predicted day on the standardized scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
    pub seasonal: f64,
    pub holidays: f64,
    pub extra_regressors: f64,
}

/// Per-row predictions with their additive components
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Forecast {
    pub rows: Vec<ForecastRow>,
}

impl Forecast {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn yhat(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.yhat).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.ds).collect()
    }
}
