//! CSV loaders for raw records, prepared feature tables and income stats

use super::frame::{Column, FeatureFrame};
use super::record::{fields, parse_date_str, DailyRecord};
use crate::error::{Error, Result};
use crate::standardize::SampleIncomeStats;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Date column of a prepared feature table
pub const DS_COLUMN: &str = "ds";
/// Raw income column of a prepared feature table
pub const INCOME_COLUMN: &str = "Income_Total";
/// Target column; always recomputed, so ignored on load
const TARGET_COLUMN: &str = "y";

fn open(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(csv::Reader::from_reader(BufReader::new(file)))
}

fn require_headers(headers: &csv::StringRecord, required: &[&str]) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !headers.iter().any(|h| h.trim() == **name))
        .map(|name| name.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::missing_fields(missing))
    }
}

/// Load raw daily records with the same schema as a training request
pub fn load_records_csv(path: &Path) -> Result<Vec<DailyRecord>> {
    let mut reader = open(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    require_headers(&csv::StringRecord::from(headers.clone()), &fields::REQUIRED)?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let raw = result?;
        let map: Map<String, Value> = headers
            .iter()
            .zip(raw.iter())
            .map(|(h, v)| (h.clone(), Value::String(v.to_string())))
            .collect();
        records.push(DailyRecord::from_fields(row, &map)?);
    }
    if records.is_empty() {
        return Err(Error::invalid(format!("{} contains no records", path.display())));
    }
    tracing::debug!(path = %path.display(), records = records.len(), "loaded raw records");
    Ok(records)
}

/// Load a prepared feature table.
///
/// Requires `ds` and `Income_Total`. Rows whose `ds` does not parse are
/// dropped, empty cells read as 0, and a column is numeric when every
/// non-empty cell parses as a number.
pub fn load_feature_csv(path: &Path) -> Result<FeatureFrame> {
    let mut reader = open(path)?;
    let headers = reader.headers()?.clone();
    require_headers(&headers, &[DS_COLUMN, INCOME_COLUMN])?;
    let names: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
    let ds_idx = names.iter().position(|h| h == DS_COLUMN).unwrap_or(0);
    let income_idx = names.iter().position(|h| h == INCOME_COLUMN).unwrap_or(0);

    let mut ds = Vec::new();
    let mut rows: Vec<csv::StringRecord> = Vec::new();
    let mut dropped = 0usize;
    for result in reader.records() {
        let record = result?;
        match record.get(ds_idx).and_then(parse_date_str) {
            Some(date) => {
                ds.push(date);
                rows.push(record);
            }
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::warn!(dropped, path = %path.display(), "dropped rows with unparseable ds");
    }

    let income = rows
        .iter()
        .enumerate()
        .map(|(row, r)| {
            let cell = r.get(income_idx).unwrap_or("").trim();
            if cell.is_empty() {
                Ok(0.0)
            } else {
                cell.parse::<f64>().map_err(|_| {
                    Error::invalid(format!("row {row}: invalid {INCOME_COLUMN}: {cell}"))
                })
            }
        })
        .collect::<Result<Vec<f64>>>()?;

    let mut columns = Vec::new();
    for (idx, name) in names.iter().enumerate() {
        if idx == ds_idx || idx == income_idx || name == TARGET_COLUMN || name.is_empty() {
            continue;
        }
        let cells: Vec<&str> = rows.iter().map(|r| r.get(idx).unwrap_or("").trim()).collect();
        let numeric = cells
            .iter()
            .filter(|c| !c.is_empty())
            .all(|c| c.parse::<f64>().is_ok());
        let column = if numeric {
            Column::numeric(
                name.clone(),
                cells.iter().map(|c| c.parse::<f64>().unwrap_or(0.0)).collect(),
            )
        } else {
            Column::categorical(
                name.clone(),
                cells
                    .iter()
                    .map(|c| if c.is_empty() { "0".to_string() } else { c.to_string() })
                    .collect(),
            )
        };
        columns.push(column);
    }

    FeatureFrame::new(ds, income, columns)
}

/// Mean and sample std of one column of a stats CSV
pub fn load_income_stats(path: &Path, column: &str) -> Result<SampleIncomeStats> {
    let mut reader = open(path)?;
    let headers = reader.headers()?.clone();
    require_headers(&headers, &[column])?;
    let idx = headers.iter().position(|h| h.trim() == column).unwrap_or(0);

    let mut values = Vec::new();
    for result in reader.records() {
        let record = result?;
        if let Some(v) = record.get(idx).and_then(|c| c.trim().parse::<f64>().ok()) {
            values.push(v);
        }
    }
    SampleIncomeStats::from_values(&values)
}
