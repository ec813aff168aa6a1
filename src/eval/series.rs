//! Aligned actual/predicted series handed to plotting

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Dates with actual and predicted standardized targets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSeries {
    pub ds: Vec<NaiveDate>,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

#[derive(Serialize)]
struct SeriesRow {
    ds: NaiveDate,
    actual: f64,
    predicted: f64,
}

impl EvaluationSeries {
    pub fn new(ds: Vec<NaiveDate>, actual: Vec<f64>, predicted: Vec<f64>) -> Result<Self> {
        if ds.len() != actual.len() || ds.len() != predicted.len() {
            return Err(Error::invalid(format!(
                "series lengths differ: {} dates, {} actual, {} predicted",
                ds.len(),
                actual.len(),
                predicted.len()
            )));
        }
        Ok(Self {
            ds,
            actual,
            predicted,
        })
    }

    pub fn len(&self) -> usize {
        self.ds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ds.is_empty()
    }

    /// Append another partition's rows
    pub fn extend(&mut self, other: EvaluationSeries) {
        self.ds.extend(other.ds);
        self.actual.extend(other.actual);
        self.predicted.extend(other.predicted);
    }

    /// Write `ds,actual,predicted` rows
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for ((ds, actual), predicted) in self.ds.iter().zip(&self.actual).zip(&self.predicted) {
            writer.serialize(SeriesRow {
                ds: *ds,
                actual: *actual,
                predicted: *predicted,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}
