//! Chronological partitioning

use crate::data::FeatureFrame;
use crate::error::{Error, Result};

/// Tolerance absorbing float error in `n · f` before taking the ceiling
const CEIL_EPSILON: f64 = 1e-9;

/// Number of leading rows assigned to training: `ceil(n · f)` for `0 < f ≤ 1`
pub fn split_index(n: usize, train_frac: f64) -> Result<usize> {
    if !(train_frac > 0.0 && train_frac <= 1.0) {
        return Err(Error::Configuration(format!(
            "train_frac must be in (0, 1], got {train_frac}"
        )));
    }
    let idx = (n as f64 * train_frac - CEIL_EPSILON).ceil().max(0.0) as usize;
    Ok(idx.min(n))
}

/// Index where the held-out tail of `ceil(n · test_size)` rows begins
pub fn holdout_index(n: usize, test_size: f64) -> Result<usize> {
    if !(0.0..1.0).contains(&test_size) {
        return Err(Error::Configuration(format!(
            "test_size must be in [0, 1), got {test_size}"
        )));
    }
    let tail = (n as f64 * test_size - CEIL_EPSILON).ceil().max(0.0) as usize;
    Ok(n - tail.min(n))
}

/// Train / validation / test partitions of one date-sorted frame
#[derive(Debug, Clone)]
pub struct ChronologicalSplit {
    pub train: FeatureFrame,
    pub validation: FeatureFrame,
    pub test: FeatureFrame,
}

impl ChronologicalSplit {
    /// Hold out the test tail, then split the rest into train and validation.
    ///
    /// The frame must already be sorted by date; rows are never reordered.
    pub fn new(frame: &FeatureFrame, train_frac: f64, test_size: f64) -> Result<Self> {
        if !frame.is_sorted() {
            return Err(Error::invalid("frame must be sorted by date before splitting"));
        }
        let (rest, test) = frame.split_at(holdout_index(frame.len(), test_size)?);
        let (train, validation) = rest.split_at(split_index(rest.len(), train_frac)?);
        Ok(Self {
            train,
            validation,
            test,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn frame(n: usize) -> FeatureFrame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        FeatureFrame::new(
            (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect(),
            (0..n).map(|i| i as f64).collect(),
            vec![Column::numeric("x", vec![0.0; n])],
        )
        .unwrap()
    }

    #[test]
    fn test_split_index() {
        assert_eq!(split_index(10, 0.9).unwrap(), 9);
        assert_eq!(split_index(10, 0.85).unwrap(), 9);
        assert_eq!(split_index(10, 1.0).unwrap(), 10);
        assert_eq!(split_index(3, 0.1).unwrap(), 1);
        assert_eq!(split_index(0, 0.5).unwrap(), 0);
        assert!(split_index(10, 0.0).is_err());
        assert!(split_index(10, 1.5).is_err());
        assert!(split_index(10, f64::NAN).is_err());
    }

    #[test]
    fn test_holdout_index() {
        assert_eq!(holdout_index(10, 0.0).unwrap(), 10);
        assert_eq!(holdout_index(10, 0.2).unwrap(), 8);
        assert_eq!(holdout_index(10, 0.25).unwrap(), 7);
        assert!(holdout_index(10, 1.0).is_err());
        assert!(holdout_index(10, -0.1).is_err());
    }

    #[test]
    fn test_full_train_frac_leaves_empty_validation() {
        let split = ChronologicalSplit::new(&frame(5), 1.0, 0.0).unwrap();
        assert_eq!(split.train.len(), 5);
        assert!(split.validation.is_empty());
        assert!(split.test.is_empty());
    }

    #[test]
    fn test_unsorted_frame_rejected() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let unsorted = FeatureFrame::new(
            vec![start + chrono::Duration::days(1), start],
            vec![1.0, 2.0],
            vec![],
        )
        .unwrap();
        assert!(ChronologicalSplit::new(&unsorted, 0.5, 0.0).is_err());
    }

    proptest! {
        #[test]
        fn prop_split_is_order_preserving_and_exhaustive(
            n in 1usize..200,
            train_frac in 0.01f64..=1.0,
            test_size in 0.0f64..0.9,
        ) {
            let f = frame(n);
            let split = ChronologicalSplit::new(&f, train_frac, test_size).unwrap();
            prop_assert_eq!(split.train.len() + split.validation.len() + split.test.len(), n);

            let rejoined: Vec<_> = split
                .train
                .dates()
                .iter()
                .chain(split.validation.dates())
                .chain(split.test.dates())
                .copied()
                .collect();
            prop_assert_eq!(rejoined.as_slice(), f.dates());
        }
    }
}
