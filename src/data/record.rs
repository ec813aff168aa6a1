//! Raw daily records and boundary validation

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names accepted at the boundary
pub mod fields {
    pub const DATE: &str = "Date";
    pub const CATEGORY: &str = "Category";
    pub const DAILY_INCOME: &str = "Daily_Income";
    pub const DAILY_EXPENSES: &str = "Daily_Expenses";
    pub const HOURS_WORKED: &str = "Hours_Worked";
    pub const GAS_PRICE: &str = "Local_Gas_Price";
    pub const IS_HOLIDAY: &str = "Is_Holiday";
    pub const JOB_TYPE: &str = "Job_Type";

    pub const REQUIRED: [&str; 4] = [DATE, CATEGORY, DAILY_EXPENSES, DAILY_INCOME];
}

/// One validated day of raw activity for a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub category: String,
    pub daily_income: f64,
    pub daily_expenses: f64,
    pub hours_worked: Option<f64>,
    pub gas_price: Option<f64>,
    pub is_holiday: bool,
    pub job_type: Option<String>,
}

impl DailyRecord {
    /// Convert one loosely typed record.
    ///
    /// `row` is the zero-based position used in error messages.
    pub fn from_fields(row: usize, record: &Map<String, Value>) -> Result<Self> {
        let missing = missing_in(record);
        if !missing.is_empty() {
            return Err(Error::missing_fields(missing));
        }

        Ok(Self {
            date: parse_date(row, required(record, fields::DATE))?,
            category: parse_text(row, fields::CATEGORY, required(record, fields::CATEGORY))?,
            daily_income: parse_number(row, fields::DAILY_INCOME, required(record, fields::DAILY_INCOME))?,
            daily_expenses: parse_number(
                row,
                fields::DAILY_EXPENSES,
                required(record, fields::DAILY_EXPENSES),
            )?,
            hours_worked: optional(record, fields::HOURS_WORKED)
                .map(|v| parse_number(row, fields::HOURS_WORKED, v))
                .transpose()?,
            gas_price: optional(record, fields::GAS_PRICE)
                .map(|v| parse_number(row, fields::GAS_PRICE, v))
                .transpose()?
                .filter(|price| *price > 0.0),
            is_holiday: optional(record, fields::IS_HOLIDAY)
                .map(|v| parse_flag(row, v))
                .transpose()?
                .unwrap_or(false),
            job_type: optional(record, fields::JOB_TYPE)
                .map(|v| parse_text(row, fields::JOB_TYPE, v))
                .transpose()?,
        })
    }
}

/// Validate a training request body.
///
/// Accepts a JSON array of records or an object wrapping one under `data`.
/// Missing required fields are reported together for the whole request.
pub fn parse_request(payload: &Value) -> Result<Vec<DailyRecord>> {
    let records = match payload {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::invalid(
                    "provide a non-empty JSON array or {\"data\": [...]}",
                ))
            }
        },
        _ => {
            return Err(Error::invalid(
                "provide a non-empty JSON array or {\"data\": [...]}",
            ))
        }
    };
    if records.is_empty() {
        return Err(Error::invalid(
            "provide a non-empty JSON array or {\"data\": [...]}",
        ));
    }

    let mut objects = Vec::with_capacity(records.len());
    for (row, item) in records.iter().enumerate() {
        match item {
            Value::Object(obj) => objects.push(obj),
            other => {
                return Err(Error::invalid(format!(
                    "record {row} is not an object: {other}"
                )))
            }
        }
    }

    let mut missing: Vec<String> = Vec::new();
    for obj in &objects {
        for name in missing_in(obj) {
            if !missing.contains(&name) {
                missing.push(name);
            }
        }
    }
    if !missing.is_empty() {
        missing.sort_by_key(|name| fields::REQUIRED.iter().position(|r| *r == name.as_str()));
        return Err(Error::missing_fields(missing));
    }

    objects
        .iter()
        .enumerate()
        .map(|(row, obj)| DailyRecord::from_fields(row, obj))
        .collect()
}

fn missing_in(record: &Map<String, Value>) -> Vec<String> {
    fields::REQUIRED
        .iter()
        .filter(|name| optional(record, name).is_none())
        .map(|name| name.to_string())
        .collect()
}

fn optional<'a>(record: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    match record.get(name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    }
}

static NULL: Value = Value::Null;

fn required<'a>(record: &'a Map<String, Value>, name: &str) -> &'a Value {
    optional(record, name).unwrap_or(&NULL)
}

/// Parse `YYYY-MM-DD`, ignoring any time suffix
pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_date(row: usize, value: &Value) -> Result<NaiveDate> {
    value
        .as_str()
        .and_then(parse_date_str)
        .ok_or_else(|| Error::invalid(format!("record {row}: invalid {}: {value}", fields::DATE)))
}

fn parse_number(row: usize, field: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(x) if x.is_finite() => Ok(x),
        _ => Err(Error::invalid(format!("record {row}: invalid {field}: {value}"))),
    }
}

fn parse_text(row: usize, field: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::invalid(format!("record {row}: invalid {field}: {value}"))),
    }
}

fn parse_flag(row: usize, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().map_or(false, |x| x != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "1.0" => Ok(true),
            "false" | "no" | "0" | "0.0" => Ok(false),
            _ => Err(Error::invalid(format!(
                "record {row}: invalid {}: {value}",
                fields::IS_HOLIDAY
            ))),
        },
        _ => Err(Error::invalid(format!(
            "record {row}: invalid {}: {value}",
            fields::IS_HOLIDAY
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_array_and_wrapped() {
        let record = json!({
            "Date": "2024-03-01",
            "Category": "delivery",
            "Daily_Income": 1200,
            "Daily_Expenses": "300.5",
        });
        let direct = parse_request(&json!([record.clone()])).unwrap();
        let wrapped = parse_request(&json!({ "data": [record] })).unwrap();
        assert_eq!(direct, wrapped);

        let r = &direct[0];
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(r.daily_income, 1200.0);
        assert_eq!(r.daily_expenses, 300.5);
        assert_eq!(r.hours_worked, None);
        assert!(!r.is_holiday);
    }

    #[test]
    fn test_empty_request_rejected() {
        assert!(parse_request(&json!([])).is_err());
        assert!(parse_request(&json!({ "data": [] })).is_err());
        assert!(parse_request(&json!({ "rows": [] })).is_err());
        assert!(parse_request(&json!("nope")).is_err());
    }

    #[test]
    fn test_missing_fields_collected_across_records() {
        let payload = json!([
            { "Date": "2024-03-01", "Category": "a", "Daily_Income": 1 },
            { "Category": "a", "Daily_Income": 1, "Daily_Expenses": 0 },
        ]);
        match parse_request(&payload).unwrap_err() {
            Error::Validation { missing_fields, .. } => {
                assert_eq!(missing_fields, vec!["Date", "Daily_Expenses"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_optional_fields_and_time_suffix() {
        let payload = json!([{
            "Date": "2024-03-01T08:30:00",
            "Category": "ride",
            "Daily_Income": "900",
            "Daily_Expenses": 100,
            "Hours_Worked": 7.5,
            "Local_Gas_Price": 0,
            "Is_Holiday": "1",
            "Job_Type": "part-time",
        }]);
        let r = &parse_request(&payload).unwrap()[0];
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(r.hours_worked, Some(7.5));
        // zero price counts as missing
        assert_eq!(r.gas_price, None);
        assert!(r.is_holiday);
        assert_eq!(r.job_type.as_deref(), Some("part-time"));
    }

    #[test]
    fn test_bad_values_rejected() {
        let bad_date = json!([{
            "Date": "03/01/2024", "Category": "a", "Daily_Income": 1, "Daily_Expenses": 0
        }]);
        assert!(parse_request(&bad_date).is_err());

        let bad_income = json!([{
            "Date": "2024-03-01", "Category": "a", "Daily_Income": "lots", "Daily_Expenses": 0
        }]);
        let err = parse_request(&bad_income).unwrap_err();
        assert!(err.to_string().contains("Daily_Income"));
    }
}
