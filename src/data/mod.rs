//! Boundary data: raw daily records, feature extraction and the typed
//! per-day feature frame

mod features;
mod frame;
mod loader;
mod record;

pub use features::{
    aggregate_records, columns, extract_features, next_day_history, unemployment_rate,
};
pub use frame::{Column, ColumnKind, ColumnValues, FeatureFrame};
pub use loader::{load_feature_csv, load_income_stats, load_records_csv, DS_COLUMN, INCOME_COLUMN};
pub use record::{fields, parse_date_str, parse_request, DailyRecord};
