//! Design matrix construction: time scaling, changepoints, Fourier and holiday
//! features, regressor scaling

use super::config::{Holiday, ModelConfig, SeasonalityToggle};
use chrono::NaiveDate;
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Column names never treated as regressors
pub const RESERVED_COLUMNS: [&str; 4] = ["ds", "y", "cap", "floor"];

/// Which additive component a feature column feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Seasonal,
    Holidays,
    ExtraRegressors,
}

/// Fourier seasonality definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub name: String,
    pub period: f64,
    pub order: usize,
}

/// Scaling applied to one regressor before it enters the design matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressorScaling {
    pub name: String,
    /// Position of the column in the encoded feature matrix
    pub source_index: usize,
    pub mu: f64,
    pub std: f64,
    pub standardized: bool,
}

impl RegressorScaling {
    /// Mean and sample std, skipped for constant and binary columns
    fn fit(name: &str, source_index: usize, values: &[f64]) -> Self {
        let mut unique: Vec<f64> = values.to_vec();
        unique.sort_by(|a, b| a.total_cmp(b));
        unique.dedup();
        let binary = unique.iter().all(|v| *v == 0.0 || *v == 1.0);

        if unique.len() < 2 || binary {
            return Self {
                name: name.to_string(),
                source_index,
                mu: 0.0,
                std: 1.0,
                standardized: false,
            };
        }

        let n = values.len() as f64;
        let mu = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / (n - 1.0);
        let std = if var.sqrt() > 0.0 { var.sqrt() } else { 1.0 };
        Self {
            name: name.to_string(),
            source_index,
            mu,
            std,
            standardized: true,
        }
    }

    fn apply(&self, value: f64) -> f64 {
        if self.standardized {
            (value - self.mu) / self.std
        } else {
            value
        }
    }
}

/// Everything needed to rebuild the design matrix for new dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignLayout {
    pub start: NaiveDate,
    /// Length of the training history in days
    pub span_days: f64,
    /// Changepoint locations on the scaled time axis
    pub changepoints: Vec<f64>,
    pub seasonalities: Vec<Seasonality>,
    pub holidays: Vec<Holiday>,
    /// Encoded feature names exactly as presented at fit time
    pub feature_names: Vec<String>,
    pub regressors: Vec<RegressorScaling>,
    /// Divisor applied to the target
    pub y_scale: f64,
}

/// Scaled time, changepoint basis and feature matrix for a set of rows
#[derive(Debug, Clone)]
pub struct Design {
    pub t: Array1<f64>,
    /// `(t − s_j)` where `t ≥ s_j`, else 0
    pub changepoint_basis: Array2<f64>,
    pub features: Array2<f64>,
    pub components: Vec<Component>,
    pub prior_scales: Array1<f64>,
}

impl DesignLayout {
    /// Derive the layout from training dates, target and encoded features.
    ///
    /// Callers guarantee at least two distinct dates.
    pub fn fit(
        dates: &[NaiveDate],
        y: &[f64],
        feature_names: &[String],
        features: ArrayView2<'_, f64>,
        config: &ModelConfig,
    ) -> Self {
        let start = dates.iter().min().copied().unwrap_or_default();
        let end = dates.iter().max().copied().unwrap_or_default();
        let span_days = ((end - start).num_days() as f64).max(1.0);

        let y_scale = y.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

        let mut sorted_t: Vec<f64> = dates
            .iter()
            .map(|d| (*d - start).num_days() as f64 / span_days)
            .collect();
        sorted_t.sort_by(|a, b| a.total_cmp(b));
        let changepoints = place_changepoints(&sorted_t, config);

        let seasonalities = select_seasonalities(dates, span_days, config);

        let holidays = config
            .holidays
            .iter()
            .filter(|h| h.dates.iter().any(|d| dates.contains(d)))
            .cloned()
            .collect();

        let regressors = feature_names
            .iter()
            .enumerate()
            .filter(|(_, name)| !RESERVED_COLUMNS.contains(&name.as_str()))
            .map(|(i, name)| {
                let column: Vec<f64> = features.column(i).to_vec();
                RegressorScaling::fit(name, i, &column)
            })
            .collect();

        Self {
            start,
            span_days,
            changepoints,
            seasonalities,
            holidays,
            feature_names: feature_names.to_vec(),
            regressors,
            y_scale,
        }
    }

    pub fn n_changepoints(&self) -> usize {
        self.changepoints.len()
    }

    pub fn regressor_names(&self) -> Vec<String> {
        self.regressors.iter().map(|r| r.name.clone()).collect()
    }

    /// Number of columns in the feature matrix
    pub fn n_features(&self) -> usize {
        self.seasonalities.iter().map(|s| 2 * s.order).sum::<usize>()
            + self.holidays.len()
            + self.regressors.len()
    }

    pub fn scale_time(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }

    /// Build the design for the given rows; `features` follows `feature_names`
    pub fn build(
        &self,
        dates: &[NaiveDate],
        features: ArrayView2<'_, f64>,
        config: &ModelConfig,
    ) -> Design {
        let n = dates.len();
        let t: Array1<f64> = dates.iter().map(|d| self.scale_time(*d)).collect();

        let mut changepoint_basis = Array2::zeros((n, self.changepoints.len()));
        for (i, ti) in t.iter().enumerate() {
            for (j, s) in self.changepoints.iter().enumerate() {
                if *ti >= *s {
                    changepoint_basis[[i, j]] = ti - s;
                }
            }
        }

        let width = self.n_features();
        let mut matrix = Array2::zeros((n, width));
        let mut components = Vec::with_capacity(width);
        let mut prior_scales = Vec::with_capacity(width);
        let mut col = 0;

        for seasonality in &self.seasonalities {
            for order in 1..=seasonality.order {
                for (i, date) in dates.iter().enumerate() {
                    let x = 2.0 * PI * order as f64 * epoch_days(*date) / seasonality.period;
                    matrix[[i, col]] = x.sin();
                    matrix[[i, col + 1]] = x.cos();
                }
                col += 2;
                components.extend([Component::Seasonal, Component::Seasonal]);
                prior_scales.extend([config.seasonality_prior_scale; 2]);
            }
        }

        for holiday in &self.holidays {
            for (i, date) in dates.iter().enumerate() {
                if holiday.dates.contains(date) {
                    matrix[[i, col]] = 1.0;
                }
            }
            col += 1;
            components.push(Component::Holidays);
            prior_scales.push(config.holidays_prior_scale);
        }

        for regressor in &self.regressors {
            for i in 0..n {
                matrix[[i, col]] = regressor.apply(features[[i, regressor.source_index]]);
            }
            col += 1;
            components.push(Component::ExtraRegressors);
            prior_scales.push(config.regressor_prior_scale);
        }

        Design {
            t,
            changepoint_basis,
            features: matrix,
            components,
            prior_scales: Array1::from(prior_scales),
        }
    }
}

/// Days since 1970-01-01, the phase origin of every Fourier term
fn epoch_days(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as f64
}

/// Uniform changepoints over the first `changepoint_range` of the sorted history
fn place_changepoints(sorted_t: &[f64], config: &ModelConfig) -> Vec<f64> {
    let hist = (sorted_t.len() as f64 * config.changepoint_range).floor() as usize;
    if hist < 2 {
        return Vec::new();
    }
    let n_cp = config.n_changepoints.min(hist - 1);
    if n_cp == 0 {
        return Vec::new();
    }
    let last = (hist - 1) as f64;
    let mut points: Vec<f64> = (1..=n_cp)
        .map(|i| {
            let idx = (last * i as f64 / n_cp as f64).round() as usize;
            sorted_t[idx]
        })
        .collect();
    points.dedup();
    points
}

fn select_seasonalities(dates: &[NaiveDate], span_days: f64, config: &ModelConfig) -> Vec<Seasonality> {
    let mut distinct: Vec<NaiveDate> = dates.to_vec();
    distinct.sort();
    distinct.dedup();
    let min_gap = distinct
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .min()
        .unwrap_or(i64::MAX);

    let yearly = match config.yearly_seasonality {
        SeasonalityToggle::Enabled => true,
        SeasonalityToggle::Disabled => false,
        SeasonalityToggle::Auto => span_days >= 730.0,
    };
    let weekly = match config.weekly_seasonality {
        SeasonalityToggle::Enabled => true,
        SeasonalityToggle::Disabled => false,
        SeasonalityToggle::Auto => span_days >= 14.0 && min_gap < 7,
    };

    let mut out = Vec::new();
    if yearly && config.yearly_order > 0 {
        out.push(Seasonality {
            name: "yearly".to_string(),
            period: 365.25,
            order: config.yearly_order,
        });
    }
    if weekly && config.weekly_order > 0 {
        out.push(Seasonality {
            name: "weekly".to_string(),
            period: 7.0,
            order: config.weekly_order,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn days(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn test_time_scaled_to_unit_interval() {
        let dates = days(11);
        let y = vec![1.0; 11];
        let layout = DesignLayout::fit(
            &dates,
            &y,
            &[],
            Array2::zeros((11, 0)).view(),
            &ModelConfig::default(),
        );
        assert_abs_diff_eq!(layout.scale_time(dates[0]), 0.0);
        assert_abs_diff_eq!(layout.scale_time(dates[10]), 1.0);
        assert_abs_diff_eq!(layout.span_days, 10.0);
    }

    #[test]
    fn test_changepoints_within_range() {
        let dates = days(100);
        let layout = DesignLayout::fit(
            &dates,
            &vec![0.0; 100],
            &[],
            Array2::zeros((100, 0)).view(),
            &ModelConfig::default(),
        );
        assert_eq!(layout.n_changepoints(), 25);
        assert!(layout.changepoints.iter().all(|s| *s > 0.0 && *s <= 0.8));
        assert!(layout.changepoints.windows(2).all(|w| w[0] < w[1]));
        // all-zero target still scales by 1
        assert_eq!(layout.y_scale, 1.0);
    }

    #[test]
    fn test_few_rows_limit_changepoints() {
        let dates = days(5);
        let layout = DesignLayout::fit(
            &dates,
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            &[],
            Array2::zeros((5, 0)).view(),
            &ModelConfig::default(),
        );
        // hist = floor(5 * 0.8) = 4, so at most 3 changepoints
        assert_eq!(layout.n_changepoints(), 3);
        assert_eq!(layout.y_scale, 5.0);
    }

    #[test]
    fn test_auto_seasonality() {
        let config = ModelConfig::default();
        let short = DesignLayout::fit(&days(10), &[0.0; 10], &[], Array2::zeros((10, 0)).view(), &config);
        assert!(short.seasonalities.is_empty());

        let month = DesignLayout::fit(&days(30), &[0.0; 30], &[], Array2::zeros((30, 0)).view(), &config);
        assert_eq!(month.seasonalities.len(), 1);
        assert_eq!(month.seasonalities[0].name, "weekly");

        let long = DesignLayout::fit(&days(800), &[0.0; 800], &[], Array2::zeros((800, 0)).view(), &config);
        let names: Vec<_> = long.seasonalities.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["yearly", "weekly"]);
        assert_eq!(long.n_features(), 26);
    }

    #[test]
    fn test_regressor_scaling_rules() {
        let names: Vec<String> = ["flag", "constant", "hours", "cap"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let features = ndarray::array![
            [0.0, 3.0, 2.0, 9.0],
            [1.0, 3.0, 4.0, 9.0],
            [1.0, 3.0, 6.0, 9.0],
        ];
        let layout = DesignLayout::fit(
            &days(3),
            &[1.0, 2.0, 3.0],
            &names,
            features.view(),
            &ModelConfig::default(),
        );

        assert_eq!(layout.regressor_names(), vec!["flag", "constant", "hours"]);
        assert!(!layout.regressors[0].standardized);
        assert!(!layout.regressors[1].standardized);
        let hours = &layout.regressors[2];
        assert!(hours.standardized);
        assert_abs_diff_eq!(hours.mu, 4.0);
        assert_abs_diff_eq!(hours.std, 2.0);

        let design = layout.build(&days(3), features.view(), &ModelConfig::default());
        assert_eq!(design.features.ncols(), 3);
        assert_abs_diff_eq!(design.features[[0, 2]], -1.0);
        assert_abs_diff_eq!(design.features[[1, 1]], 3.0);
    }

    #[test]
    fn test_holiday_indicator() {
        let dates = days(5);
        let config = ModelConfig {
            holidays: vec![
                Holiday {
                    name: "new_year".into(),
                    dates: vec![dates[0]],
                },
                Holiday {
                    name: "unused".into(),
                    dates: vec![NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()],
                },
            ],
            ..ModelConfig::default()
        };
        let layout = DesignLayout::fit(&dates, &[1.0; 5], &[], Array2::zeros((5, 0)).view(), &config);
        assert_eq!(layout.holidays.len(), 1);

        let design = layout.build(&dates, Array2::zeros((5, 0)).view(), &config);
        assert_eq!(design.features.column(0).to_vec(), vec![1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(design.components, vec![Component::Holidays]);
    }

    #[test]
    fn test_changepoint_basis_is_hinge() {
        let dates = days(10);
        let layout = DesignLayout::fit(&dates, &[1.0; 10], &[], Array2::zeros((10, 0)).view(), &ModelConfig::default());
        let design = layout.build(&dates, Array2::zeros((10, 0)).view(), &ModelConfig::default());
        for (j, s) in layout.changepoints.iter().enumerate() {
            for i in 0..10 {
                let expected = (design.t[i] - s).max(0.0);
                assert_abs_diff_eq!(design.changepoint_basis[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }
}
