//! Typed per-day feature frame

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Column type as seen by the feature pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// Values of one covariate column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnValues::Numeric(_) => ColumnKind::Numeric,
            ColumnValues::Categorical(_) => ColumnKind::Categorical,
        }
    }

    fn select(&self, indices: &[usize]) -> Self {
        match self {
            ColumnValues::Numeric(v) => ColumnValues::Numeric(indices.iter().map(|&i| v[i]).collect()),
            ColumnValues::Categorical(v) => {
                ColumnValues::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// Named covariate column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Numeric(values),
        }
    }

    pub fn categorical(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Categorical(values),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        self.values.kind()
    }
}

/// One calendar day of one user's history.
///
/// Raw income is a dedicated field: it is the source of the target and never
/// a covariate. `y` is only present once a standardization has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    ds: Vec<NaiveDate>,
    income: Vec<f64>,
    y: Option<Vec<f64>>,
    columns: Vec<Column>,
}

impl FeatureFrame {
    /// Build a frame, checking that every column has one value per date
    pub fn new(ds: Vec<NaiveDate>, income: Vec<f64>, columns: Vec<Column>) -> Result<Self> {
        if income.len() != ds.len() {
            return Err(Error::invalid(format!(
                "income has {} values for {} dates",
                income.len(),
                ds.len()
            )));
        }
        let mut seen = BTreeSet::new();
        for column in &columns {
            if column.values.len() != ds.len() {
                return Err(Error::invalid(format!(
                    "column '{}' has {} values for {} dates",
                    column.name,
                    column.values.len(),
                    ds.len()
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(Error::invalid(format!("duplicate column '{}'", column.name)));
            }
        }
        Ok(Self {
            ds,
            income,
            y: None,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.ds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ds.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.ds
    }

    pub fn income(&self) -> &[f64] {
        &self.income
    }

    pub fn target(&self) -> Option<&[f64]> {
        self.y.as_deref()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Attach the standardized target
    pub fn set_target(&mut self, y: Vec<f64>) -> Result<()> {
        if y.len() != self.len() {
            return Err(Error::invalid(format!(
                "target has {} values for {} dates",
                y.len(),
                self.len()
            )));
        }
        self.y = Some(y);
        Ok(())
    }

    /// Number of distinct calendar dates
    pub fn distinct_dates(&self) -> usize {
        self.ds.iter().collect::<BTreeSet<_>>().len()
    }

    pub fn is_sorted(&self) -> bool {
        self.ds.windows(2).all(|w| w[0] <= w[1])
    }

    /// Stable sort of every row by date
    pub fn sort_by_date(&mut self) {
        if self.is_sorted() {
            return;
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.ds[i]);
        *self = self.select(&order);
    }

    /// Collapse rows sharing a date into one row.
    ///
    /// Income is summed, numeric covariates are averaged, and categorical
    /// covariates keep the first value in date-stable order. Sorts first.
    /// A standardized target no longer matches the summed income, so it is
    /// cleared and must be set again from the new income.
    pub fn aggregate_duplicate_dates(&mut self) {
        self.sort_by_date();
        if self.distinct_dates() == self.len() {
            return;
        }

        let mut groups: Vec<(usize, usize)> = Vec::new();
        let mut start = 0;
        for i in 1..=self.len() {
            if i == self.len() || self.ds[i] != self.ds[start] {
                groups.push((start, i));
                start = i;
            }
        }
        tracing::warn!(
            rows = self.len(),
            dates = groups.len(),
            "aggregating duplicate dates"
        );

        let ds: Vec<NaiveDate> = groups.iter().map(|&(s, _)| self.ds[s]).collect();
        let income: Vec<f64> = groups
            .iter()
            .map(|&(s, e)| self.income[s..e].iter().sum())
            .collect();
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|column| {
                let values = match &column.values {
                    ColumnValues::Numeric(v) => ColumnValues::Numeric(
                        groups
                            .iter()
                            .map(|&(s, e)| v[s..e].iter().sum::<f64>() / (e - s) as f64)
                            .collect(),
                    ),
                    ColumnValues::Categorical(v) => {
                        ColumnValues::Categorical(groups.iter().map(|&(s, _)| v[s].clone()).collect())
                    }
                };
                Column {
                    name: column.name.clone(),
                    values,
                }
            })
            .collect();

        self.ds = ds;
        self.income = income;
        self.y = None;
        self.columns = columns;
    }

    /// Split into `[0, index)` and `[index, len)` without reordering
    pub fn split_at(&self, index: usize) -> (FeatureFrame, FeatureFrame) {
        let index = index.min(self.len());
        let head: Vec<usize> = (0..index).collect();
        let tail: Vec<usize> = (index..self.len()).collect();
        (self.select(&head), self.select(&tail))
    }

    /// Last row as a standalone frame
    pub fn last_row(&self) -> Option<FeatureFrame> {
        if self.is_empty() {
            return None;
        }
        Some(self.select(&[self.len() - 1]))
    }

    fn select(&self, indices: &[usize]) -> FeatureFrame {
        FeatureFrame {
            ds: indices.iter().map(|&i| self.ds[i]).collect(),
            income: indices.iter().map(|&i| self.income[i]).collect(),
            y: self
                .y
                .as_ref()
                .map(|y| indices.iter().map(|&i| y[i]).collect()),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values.select(indices),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn frame() -> FeatureFrame {
        FeatureFrame::new(
            vec![date(3), date(1), date(2)],
            vec![800.0, 1000.0, 1200.0],
            vec![
                Column::numeric("hours", vec![3.0, 1.0, 2.0]),
                Column::categorical("job", vec!["c".into(), "a".into(), "b".into()]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let err = FeatureFrame::new(
            vec![date(1), date(2)],
            vec![1.0, 2.0],
            vec![Column::numeric("hours", vec![1.0])],
        )
        .unwrap_err();
        assert!(err.to_string().contains("hours"));
    }

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let result = FeatureFrame::new(
            vec![date(1)],
            vec![1.0],
            vec![
                Column::numeric("hours", vec![1.0]),
                Column::numeric("hours", vec![2.0]),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_sort_by_date_moves_all_columns() {
        let mut f = frame();
        f.sort_by_date();
        assert_eq!(f.dates(), &[date(1), date(2), date(3)]);
        assert_eq!(f.income(), &[1000.0, 1200.0, 800.0]);
        assert_eq!(
            f.column("hours").unwrap().values,
            ColumnValues::Numeric(vec![1.0, 2.0, 3.0])
        );
        assert_eq!(
            f.column("job").unwrap().values,
            ColumnValues::Categorical(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn test_aggregate_duplicate_dates() {
        let mut f = FeatureFrame::new(
            vec![date(2), date(1), date(2)],
            vec![100.0, 50.0, 300.0],
            vec![
                Column::numeric("gas", vec![2.0, 1.0, 4.0]),
                Column::categorical("job", vec!["x".into(), "y".into(), "z".into()]),
            ],
        )
        .unwrap();
        f.aggregate_duplicate_dates();

        assert_eq!(f.len(), 2);
        assert_eq!(f.dates(), &[date(1), date(2)]);
        assert_eq!(f.income(), &[50.0, 400.0]);
        assert_eq!(
            f.column("gas").unwrap().values,
            ColumnValues::Numeric(vec![1.0, 3.0])
        );
        // first value in stable date order
        assert_eq!(
            f.column("job").unwrap().values,
            ColumnValues::Categorical(vec!["y".into(), "x".into()])
        );
    }

    #[test]
    fn test_aggregation_clears_stale_target() {
        let mut f = FeatureFrame::new(
            vec![date(1), date(1), date(2)],
            vec![100.0, 300.0, 200.0],
            vec![Column::numeric("gas", vec![1.0, 1.0, 1.0])],
        )
        .unwrap();
        f.set_target(vec![-1.0, 1.0, 0.0]).unwrap();
        f.aggregate_duplicate_dates();

        assert_eq!(f.income(), &[400.0, 200.0]);
        assert!(f.target().is_none());
        f.set_target(vec![0.5, -0.5]).unwrap();
        assert_eq!(f.target().unwrap(), &[0.5, -0.5]);
    }

    #[test]
    fn test_aggregation_without_duplicates_keeps_target() {
        let mut f = frame();
        f.sort_by_date();
        f.set_target(vec![0.0, 1.0, -1.0]).unwrap();
        f.aggregate_duplicate_dates();
        assert_eq!(f.target().unwrap(), &[0.0, 1.0, -1.0]);
    }

    #[test]
    fn test_split_at_is_exhaustive() {
        let mut f = frame();
        f.sort_by_date();
        let (head, tail) = f.split_at(2);
        assert_eq!(head.len() + tail.len(), f.len());
        assert_eq!(head.dates(), &[date(1), date(2)]);
        assert_eq!(tail.dates(), &[date(3)]);

        let (all, none) = f.split_at(10);
        assert_eq!(all.len(), 3);
        assert!(none.is_empty());
    }

    #[test]
    fn test_set_target_checks_length() {
        let mut f = frame();
        assert!(f.set_target(vec![0.0]).is_err());
        f.set_target(vec![0.0, 1.0, -1.0]).unwrap();
        assert_eq!(f.target().unwrap().len(), 3);
    }
}
