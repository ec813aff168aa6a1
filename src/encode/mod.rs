//! Feature encoding fit on the training partition
//!
//! Categorical covariates become ordinal codes learned from the training rows,
//! numeric covariates pass through. The resulting [`FeatureEncoding`] is stored
//! with the model and reused unchanged for validation, test and inference.

use crate::config::FeatureConfig;
use crate::data::{ColumnKind, ColumnValues, FeatureFrame};
use crate::error::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Code assigned to categories never seen during fit
pub const UNKNOWN_CATEGORY: f64 = -1.0;

/// Sorted category list of one categorical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCodes {
    pub column: String,
    /// Lexicographically sorted, deduplicated; the code is the index
    pub categories: Vec<String>,
}

impl CategoryCodes {
    fn learn(column: &str, values: &[String]) -> Self {
        let mut categories = values.to_vec();
        categories.sort();
        categories.dedup();
        Self {
            column: column.to_string(),
            categories,
        }
    }

    pub fn code(&self, value: &str) -> f64 {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .map_or(UNKNOWN_CATEGORY, |i| i as f64)
    }
}

/// Fitted encoding: feature order plus the learned category codes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoding {
    /// Categorical names first, then numeric names
    pub feature_names: Vec<String>,
    pub categorical: Vec<CategoryCodes>,
    pub numeric: Vec<String>,
}

/// Named numeric feature matrix, one row per frame row
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl EncodedFeatures {
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if names.len() != values.ncols() {
            return Err(Error::invalid(format!(
                "{} feature names for {} columns",
                names.len(),
                values.ncols()
            )));
        }
        Ok(Self { names, values })
    }

    /// Matrix with no feature columns
    pub fn empty(rows: usize) -> Self {
        Self {
            names: Vec::new(),
            values: Array2::zeros((rows, 0)),
        }
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn column(&self, name: &str) -> Option<ndarray::ArrayView1<'_, f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values.column(i))
    }
}

/// Builds a [`FeatureEncoding`] from a training frame
#[derive(Debug, Clone, Default)]
pub struct FeaturePipeline {
    exclude: Vec<String>,
}

impl FeaturePipeline {
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            exclude: config.exclude.clone(),
        }
    }

    /// Learn the encoding from the training partition only
    pub fn fit(&self, train: &FeatureFrame) -> Result<FeatureEncoding> {
        if train.is_empty() {
            return Err(Error::Configuration(
                "cannot build a feature encoding on an empty frame".to_string(),
            ));
        }

        let mut categorical = Vec::new();
        let mut numeric = Vec::new();
        for column in train.columns() {
            if self.exclude.iter().any(|e| e == &column.name) {
                continue;
            }
            match &column.values {
                ColumnValues::Categorical(values) => {
                    categorical.push(CategoryCodes::learn(&column.name, values))
                }
                ColumnValues::Numeric(_) => numeric.push(column.name.clone()),
            }
        }
        if categorical.is_empty() && numeric.is_empty() {
            return Err(Error::Configuration(
                "frame has no covariate columns to encode".to_string(),
            ));
        }

        let feature_names = categorical
            .iter()
            .map(|c| c.column.clone())
            .chain(numeric.iter().cloned())
            .collect();
        tracing::debug!(
            categorical = categorical.len(),
            numeric = numeric.len(),
            "fitted feature encoding"
        );
        Ok(FeatureEncoding {
            feature_names,
            categorical,
            numeric,
        })
    }
}

impl FeatureEncoding {
    pub fn len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_names.is_empty()
    }

    /// Encode a frame into the fitted column order
    pub fn transform(&self, frame: &FeatureFrame) -> Result<EncodedFeatures> {
        let mut values = Array2::zeros((frame.len(), self.len()));

        for (j, codes) in self.categorical.iter().enumerate() {
            match frame.column(&codes.column).map(|c| &c.values) {
                Some(ColumnValues::Categorical(raw)) => {
                    for (i, value) in raw.iter().enumerate() {
                        values[[i, j]] = codes.code(value);
                    }
                }
                _ => return Err(self.mismatch(frame)),
            }
        }

        let offset = self.categorical.len();
        for (j, name) in self.numeric.iter().enumerate() {
            match frame.column(name).map(|c| &c.values) {
                Some(ColumnValues::Numeric(raw)) => {
                    for (i, value) in raw.iter().enumerate() {
                        values[[i, offset + j]] = *value;
                    }
                }
                _ => return Err(self.mismatch(frame)),
            }
        }

        EncodedFeatures::new(self.feature_names.clone(), values)
    }

    fn mismatch(&self, frame: &FeatureFrame) -> Error {
        let expected = self
            .categorical
            .iter()
            .map(|c| format!("{}:{}", c.column, ColumnKind::Categorical))
            .chain(
                self.numeric
                    .iter()
                    .map(|n| format!("{n}:{}", ColumnKind::Numeric)),
            )
            .collect();
        let got = frame
            .columns()
            .iter()
            .map(|c| format!("{}:{}", c.name, c.kind()))
            .collect();
        Error::SchemaMismatch { expected, got }
    }
}
