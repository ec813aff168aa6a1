//! Regressor-augmented additive model: MAP fit and prediction

use super::config::ModelConfig;
use super::design::{Component, DesignLayout};
use super::forecast::{Forecast, ForecastRow};
use super::objective::Objective;
use super::params::{FitParams, PointParams};
use crate::encode::EncodedFeatures;
use crate::error::{Error, Result};
use crate::optim::{Adam, CosineAnnealingLR, LRScheduler, Optimizer};
use crate::warm_start::WarmStart;
use chrono::NaiveDate;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeSet;

/// Outcome of the optimizer run that produced a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub iterations: usize,
    pub converged: bool,
    /// Negative log posterior at the returned parameters
    pub objective: f64,
    pub warm_started: bool,
}

/// Fitted additive model, serializable as part of a model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastModel {
    config: ModelConfig,
    layout: DesignLayout,
    params: FitParams,
    summary: FitSummary,
}

impl ForecastModel {
    /// MAP fit on the standardized target.
    ///
    /// `features` are the encoded covariates in fitted order. A warm start
    /// only changes the optimizer's starting point.
    pub fn fit(
        dates: &[NaiveDate],
        y: &[f64],
        features: &EncodedFeatures,
        config: &ModelConfig,
        warm_start: Option<&WarmStart>,
    ) -> Result<Self> {
        if y.len() != dates.len() || features.nrows() != dates.len() {
            return Err(Error::invalid(format!(
                "{} dates, {} targets and {} feature rows",
                dates.len(),
                y.len(),
                features.nrows()
            )));
        }
        let distinct = dates.iter().collect::<BTreeSet<_>>().len();
        if distinct < 2 {
            return Err(Error::InsufficientData(format!(
                "need at least 2 distinct dates to fit, got {distinct}"
            )));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(Error::NumericInstability(
                "target contains non-finite values".to_string(),
            ));
        }
        if features.values.iter().any(|v| !v.is_finite()) {
            return Err(Error::NumericInstability(
                "features contain non-finite values".to_string(),
            ));
        }

        let layout = DesignLayout::fit(dates, y, &features.names, features.values.view(), config);
        let design = layout.build(dates, features.values.view(), config);
        let y_scaled: Array1<f64> = y.iter().map(|v| v / layout.y_scale).collect();
        let objective = Objective::new(&design, y_scaled.view(), config.changepoint_prior_scale);

        let cold = cold_start(dates, y_scaled.view(), &layout);
        let init = match warm_start {
            Some(warm) => seed_from(warm, cold),
            None => cold,
        };

        tracing::debug!(
            rows = dates.len(),
            changepoints = layout.n_changepoints(),
            features = layout.n_features(),
            warm_start = warm_start.is_some(),
            "fitting additive model"
        );

        let opt = &config.optimizer;
        let mut theta = objective.pack(&init);
        let mut optimizer = Adam::default_params(opt.lr);
        let mut scheduler = CosineAnnealingLR::with_min_ratio(opt.lr, opt.max_iters, opt.min_lr_ratio);

        let (mut best_value, mut grad) = objective.value_and_grad(&theta);
        if !best_value.is_finite() {
            return Err(Error::NumericInstability(
                "objective is not finite at the initial point".to_string(),
            ));
        }
        let mut best = theta.clone();
        let mut iterations = 0;
        let mut converged = false;

        for iter in 0..opt.max_iters {
            if max_abs(&grad) < opt.grad_tol {
                converged = true;
                break;
            }
            scheduler.apply(&mut optimizer);
            optimizer.step(&mut theta, &grad);
            objective.project(&mut theta);
            scheduler.step();
            iterations = iter + 1;

            let (value, next_grad) = objective.value_and_grad(&theta);
            if !value.is_finite() || next_grad.iter().any(|g| !g.is_finite()) {
                return Err(Error::NumericInstability(format!(
                    "objective diverged at iteration {iterations}"
                )));
            }
            if value < best_value {
                best_value = value;
                best.assign(&theta);
            }
            grad = next_grad;

            if iterations % 500 == 0 {
                tracing::debug!(iterations, objective = value, lr = optimizer.lr(), "optimizer progress");
            }
        }
        if !converged && max_abs(&grad) < opt.grad_tol {
            converged = true;
        }

        tracing::debug!(iterations, converged, objective = best_value, "fit finished");

        Ok(Self {
            config: config.clone(),
            params: FitParams::single(objective.unpack(&best)),
            layout,
            summary: FitSummary {
                iterations,
                converged,
                objective: best_value,
                warm_started: warm_start.is_some(),
            },
        })
    }

    /// Predict on the standardized scale.
    ///
    /// Feature names must equal the fitted names in content and order.
    pub fn predict(&self, dates: &[NaiveDate], features: &EncodedFeatures) -> Result<Forecast> {
        if features.names != self.layout.feature_names {
            return Err(Error::SchemaMismatch {
                expected: self.layout.feature_names.clone(),
                got: features.names.clone(),
            });
        }
        if features.nrows() != dates.len() {
            return Err(Error::invalid(format!(
                "{} dates for {} feature rows",
                dates.len(),
                features.nrows()
            )));
        }
        if features.values.iter().any(|v| !v.is_finite()) {
            return Err(Error::NumericInstability(
                "features contain non-finite values".to_string(),
            ));
        }

        let point = self.params.point_estimate();
        check_len("changepoint rates", self.layout.n_changepoints(), point.delta.len())?;
        check_len("feature coefficients", self.layout.n_features(), point.beta.len())?;

        let design = self.layout.build(dates, features.values.view(), &self.config);
        let scale = self.layout.y_scale;

        let delta = ArrayView1::from(&point.delta[..]);
        let trend = (&design.t * point.k + point.m + design.changepoint_basis.dot(&delta)) * scale;

        let mut seasonal = Array1::<f64>::zeros(dates.len());
        let mut holidays = Array1::<f64>::zeros(dates.len());
        let mut extra = Array1::<f64>::zeros(dates.len());
        for (c, (component, beta)) in design.components.iter().zip(&point.beta).enumerate() {
            let contribution = design.features.column(c).mapv(|x| x * beta * scale);
            match component {
                Component::Seasonal => seasonal += &contribution,
                Component::Holidays => holidays += &contribution,
                Component::ExtraRegressors => extra += &contribution,
            }
        }

        let z = interval_z(self.config.interval_width)?;
        let half_width = z * point.sigma_obs * scale;

        let rows = dates
            .iter()
            .enumerate()
            .map(|(i, ds)| {
                let yhat = trend[i] + seasonal[i] + holidays[i] + extra[i];
                ForecastRow {
                    ds: *ds,
                    yhat,
                    yhat_lower: yhat - half_width,
                    yhat_upper: yhat + half_width,
                    trend: trend[i],
                    seasonal: seasonal[i],
                    holidays: holidays[i],
                    extra_regressors: extra[i],
                }
            })
            .collect();
        Ok(Forecast { rows })
    }

    pub fn params(&self) -> &FitParams {
        &self.params
    }

    pub fn summary(&self) -> &FitSummary {
        &self.summary
    }

    pub fn layout(&self) -> &DesignLayout {
        &self.layout
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Encoded feature names the model was fit on
    pub fn feature_names(&self) -> &[String] {
        &self.layout.feature_names
    }

    /// Feature names actually used as regressors
    pub fn regressor_names(&self) -> Vec<String> {
        self.layout.regressor_names()
    }
}

/// Line through the first and last observations, everything else zero
fn cold_start(dates: &[NaiveDate], y: ArrayView1<'_, f64>, layout: &DesignLayout) -> PointParams {
    let first = (0..dates.len()).min_by_key(|&i| dates[i]).unwrap_or(0);
    let last = (0..dates.len()).rev().max_by_key(|&i| dates[i]).unwrap_or(0);
    let (t0, t1) = (layout.scale_time(dates[first]), layout.scale_time(dates[last]));
    let k = if t1 > t0 { (y[last] - y[first]) / (t1 - t0) } else { 0.0 };
    PointParams {
        k,
        m: y[first] - k * t0,
        delta: vec![0.0; layout.n_changepoints()],
        sigma_obs: 1.0,
        beta: vec![0.0; layout.n_features()],
    }
}

/// Overlay warm-start values whose shape still fits the new layout
fn seed_from(warm: &WarmStart, cold: PointParams) -> PointParams {
    let delta = if warm.delta.len() == cold.delta.len() {
        warm.delta.clone()
    } else {
        tracing::warn!(
            previous = warm.delta.len(),
            current = cold.delta.len(),
            "changepoint count changed, cold-starting delta"
        );
        cold.delta
    };
    let beta = if warm.beta.len() == cold.beta.len() {
        warm.beta.clone()
    } else {
        tracing::warn!(
            previous = warm.beta.len(),
            current = cold.beta.len(),
            "feature count changed, cold-starting beta"
        );
        cold.beta
    };
    PointParams {
        k: if warm.k.is_finite() { warm.k } else { cold.k },
        m: if warm.m.is_finite() { warm.m } else { cold.m },
        sigma_obs: if warm.sigma_obs.is_finite() && warm.sigma_obs > 0.0 {
            warm.sigma_obs
        } else {
            cold.sigma_obs
        },
        delta,
        beta,
    }
}

/// Stored parameter vectors must match the design they were fitted on
fn check_len(what: &str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::SchemaMismatch {
            expected: vec![format!("{expected} {what}")],
            got: vec![format!("{got} {what}")],
        })
    }
}

fn max_abs(values: &Array1<f64>) -> f64 {
    values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
}

/// Two-sided standard normal quantile for the given coverage
fn interval_z(width: f64) -> Result<f64> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| Error::NumericInstability(e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + width / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    /// Linear trend plus one informative regressor and one constant column
    fn synthetic(n: usize) -> (Vec<NaiveDate>, Vec<f64>, EncodedFeatures) {
        let x: Vec<f64> = (0..n).map(|i| ((i * 7) % 11) as f64).collect();
        let y: Vec<f64> = (0..n)
            .map(|i| -1.0 + 2.0 * i as f64 / (n - 1) as f64 + 0.1 * (x[i] - 5.0))
            .collect();
        let mut values = Array2::<f64>::zeros((n, 2));
        for i in 0..n {
            values[[i, 0]] = x[i];
            values[[i, 1]] = 3.0;
        }
        let features =
            EncodedFeatures::new(vec!["hours".into(), "region".into()], values).unwrap();
        (dates(n), y, features)
    }

    fn quick_config() -> ModelConfig {
        let mut config = ModelConfig::default();
        config.optimizer.max_iters = 1500;
        config
    }

    #[test]
    fn test_predict_rejects_corrupt_parameter_lengths() {
        let (ds, y, features) = synthetic(30);
        let model = ForecastModel::fit(&ds, &y, &features, &quick_config(), None).unwrap();

        let mut long_delta = model.clone();
        let n_cp = long_delta.layout.n_changepoints();
        long_delta.params.delta = vec![vec![0.0; n_cp + 2]];
        assert!(matches!(
            long_delta.predict(&ds, &features),
            Err(Error::SchemaMismatch { .. })
        ));

        let mut long_beta = model.clone();
        let n = long_beta.params.beta[0].len();
        long_beta.params.beta = vec![vec![0.0; n + 1]];
        assert!(matches!(
            long_beta.predict(&ds, &features),
            Err(Error::SchemaMismatch { .. })
        ));

        assert!(model.predict(&ds, &features).is_ok());
    }

    #[test]
    fn test_fit_tracks_trend_and_regressor() {
        let (ds, y, features) = synthetic(60);
        let model = ForecastModel::fit(&ds, &y, &features, &quick_config(), None).unwrap();
        let forecast = model.predict(&ds, &features).unwrap();

        let mae = forecast
            .yhat()
            .iter()
            .zip(&y)
            .map(|(p, a)| (p - a).abs())
            .sum::<f64>()
            / y.len() as f64;
        assert!(mae < 0.15, "mae {mae}");
        assert_eq!(model.params().n_draws(), 1);
        assert!(!model.summary().warm_started);
    }

    #[test]
    fn test_components_sum_to_yhat() {
        let (ds, y, features) = synthetic(30);
        let model = ForecastModel::fit(&ds, &y, &features, &quick_config(), None).unwrap();
        let forecast = model.predict(&ds, &features).unwrap();
        for row in &forecast.rows {
            let total = row.trend + row.seasonal + row.holidays + row.extra_regressors;
            assert_abs_diff_eq!(row.yhat, total, epsilon = 1e-9);
            assert!(row.yhat_lower < row.yhat && row.yhat < row.yhat_upper);
        }
    }

    #[test]
    fn test_single_date_is_insufficient() {
        let ds = vec![NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(); 3];
        let result = ForecastModel::fit(
            &ds,
            &[1.0, 2.0, 3.0],
            &EncodedFeatures::empty(3),
            &quick_config(),
            None,
        );
        assert!(matches!(result, Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_non_finite_target_rejected() {
        let result = ForecastModel::fit(
            &dates(3),
            &[1.0, f64::NAN, 3.0],
            &EncodedFeatures::empty(3),
            &quick_config(),
            None,
        );
        assert!(matches!(result, Err(Error::NumericInstability(_))));
    }

    #[test]
    fn test_predict_requires_same_feature_order() {
        let (ds, y, features) = synthetic(20);
        let model = ForecastModel::fit(&ds, &y, &features, &quick_config(), None).unwrap();

        let mut swapped = features.clone();
        swapped.names.reverse();
        assert!(matches!(
            model.predict(&ds, &swapped),
            Err(Error::SchemaMismatch { .. })
        ));

        let mut wider = Array2::<f64>::zeros((20, 3));
        wider.slice_mut(ndarray::s![.., ..2]).assign(&features.values);
        let extended = EncodedFeatures::new(
            vec!["hours".into(), "region".into(), "extra".into()],
            wider,
        )
        .unwrap();
        assert!(matches!(
            model.predict(&ds, &extended),
            Err(Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_reserved_columns_are_not_regressors() {
        let (ds, y, features) = synthetic(20);
        let mut values = Array2::<f64>::zeros((20, 3));
        values.slice_mut(ndarray::s![.., ..2]).assign(&features.values);
        let with_cap = EncodedFeatures::new(
            vec!["hours".into(), "region".into(), "cap".into()],
            values,
        )
        .unwrap();
        let model = ForecastModel::fit(&ds, &y, &with_cap, &quick_config(), None).unwrap();
        assert_eq!(model.regressor_names(), vec!["hours", "region"]);
        assert_eq!(model.feature_names().len(), 3);
    }

    #[test]
    fn test_warm_start_on_same_data_is_no_worse() {
        let (ds, y, features) = synthetic(45);
        let config = quick_config();
        let cold = ForecastModel::fit(&ds, &y, &features, &config, None).unwrap();
        let warm_start = WarmStart::from_params(cold.params());
        let warm = ForecastModel::fit(&ds, &y, &features, &config, Some(&warm_start)).unwrap();

        assert!(warm.summary().warm_started);
        assert!(warm.summary().objective <= cold.summary().objective + 1e-9);
    }

    #[test]
    fn test_warm_start_shape_mismatch_falls_back() {
        let (ds, y, features) = synthetic(30);
        let warm_start = WarmStart {
            k: 0.5,
            m: 0.0,
            sigma_obs: 0.2,
            delta: vec![0.1; 3],
            beta: vec![1.0; 99],
        };
        let model =
            ForecastModel::fit(&ds, &y, &features, &quick_config(), Some(&warm_start)).unwrap();
        assert!(model.summary().objective.is_finite());
    }

    #[test]
    fn test_serde_roundtrip_predicts_identically() {
        let (ds, y, features) = synthetic(25);
        let model = ForecastModel::fit(&ds, &y, &features, &quick_config(), None).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let back: ForecastModel = serde_json::from_str(&json).unwrap();
        assert_eq!(
            model.predict(&ds, &features).unwrap(),
            back.predict(&ds, &features).unwrap()
        );
    }

    #[test]
    fn test_interval_z() {
        assert_abs_diff_eq!(interval_z(0.8).unwrap(), 1.281_551_6, epsilon = 1e-6);
    }
}
