//! Per-day feature extraction from raw records

use super::frame::{Column, ColumnValues, FeatureFrame};
use super::record::DailyRecord;
use crate::config::FeatureConfig;
use crate::error::{Error, Result};
use crate::standardize::round_to;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Feature column names produced by [`extract_features`]
pub mod columns {
    pub const JOB_CATEGORIES: &str = "Job_Categories";
    pub const JOB_TYPE: &str = "Job_Type";
    pub const EXPENSES_TOTAL: &str = "Expenses_Total";
    pub const HOURS_WORKED: &str = "Hours_Worked";
    pub const GAS_PRICE: &str = "Local_Gas_Price";
    pub const UNEMPLOYMENT_RATE: &str = "Monthly_Unemployment_Rate";
    pub const IS_HOLIDAY: &str = "Is_Holiday";
    pub const WEEKLY_INCOME: &str = "Weekly_Income";
    pub const WEEKLY_EXPENSES: &str = "Weekly_Expenses";
    pub const MONTHLY_INCOME: &str = "Monthly_Income";
    pub const MONTHLY_EXPENSES: &str = "Monthly_Expenses";
    pub const INCOME_ROLLING_3M: &str = "income_rolling_avg_3m";
    pub const EXPENSE_RATIO: &str = "expense_to_income_ratio";
    pub const NET_INCOME: &str = "net_Income";
    pub const SAVINGS: &str = "savings";
    pub const BURNOUT_RISK: &str = "burnout_risk_score";
}

const WEEK_ROWS: usize = 7;
const MONTH_ROWS: usize = 30;
const QUARTER_ROWS: usize = 90;

/// Regional unemployment rate (%) for a calendar month
pub fn unemployment_rate(date: NaiveDate) -> f64 {
    const RATES: [f64; 12] = [5.0, 5.1, 5.2, 5.3, 5.4, 5.5, 5.6, 5.7, 5.8, 5.9, 6.0, 6.1];
    RATES[date.month0() as usize]
}

/// Collapse records sharing a date.
///
/// Income, expenses and hours are summed, gas price averaged, the holiday flag
/// set if any record has it. Category and job type come from the record with
/// the largest income, ties going to the lexicographically smallest category
/// and then the smallest job type.
pub fn aggregate_records(records: &[DailyRecord]) -> Vec<DailyRecord> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&DailyRecord>> = BTreeMap::new();
    for record in records {
        by_date.entry(record.date).or_default().push(record);
    }
    if by_date.len() < records.len() {
        tracing::warn!(
            records = records.len(),
            dates = by_date.len(),
            "aggregating records that share a date"
        );
    }

    by_date
        .into_iter()
        .map(|(date, group)| {
            let lead = group
                .iter()
                .copied()
                .min_by(|a, b| {
                    b.daily_income
                        .total_cmp(&a.daily_income)
                        .then_with(|| a.category.cmp(&b.category))
                        .then_with(|| a.job_type.cmp(&b.job_type))
                })
                .unwrap_or(group[0]);

            let hours: Vec<f64> = group.iter().filter_map(|r| r.hours_worked).collect();
            let prices: Vec<f64> = group.iter().filter_map(|r| r.gas_price).collect();

            DailyRecord {
                date,
                category: lead.category.clone(),
                daily_income: group.iter().map(|r| r.daily_income).sum(),
                daily_expenses: group.iter().map(|r| r.daily_expenses).sum(),
                hours_worked: (!hours.is_empty()).then(|| hours.iter().sum()),
                gas_price: (!prices.is_empty())
                    .then(|| prices.iter().sum::<f64>() / prices.len() as f64),
                is_holiday: group.iter().any(|r| r.is_holiday),
                job_type: lead.job_type.clone(),
            }
        })
        .collect()
}

/// Derive the per-day feature frame from raw records.
///
/// Records are aggregated per date and sorted before any rolling window is
/// taken. Every column built from income (and the expense windows paired
/// with it) looks only at earlier rows: row `t` sees rows `< t`, so a day's
/// income never appears in its own covariates. Rolling sums cover up to the
/// previous 7 / 30 rows; the 90-row mean is 0 until 90 rows precede it.
pub fn extract_features(records: &[DailyRecord], config: &FeatureConfig) -> Result<FeatureFrame> {
    if records.is_empty() {
        return Err(Error::InsufficientData("no records to extract features from".to_string()));
    }
    let days = aggregate_records(records);

    let ds: Vec<NaiveDate> = days.iter().map(|d| d.date).collect();
    let income: Vec<f64> = days.iter().map(|d| d.daily_income).collect();
    let expenses: Vec<f64> = days.iter().map(|d| d.daily_expenses).collect();
    let hours: Option<Vec<f64>> = days
        .iter()
        .any(|d| d.hours_worked.is_some())
        .then(|| days.iter().map(|d| d.hours_worked.unwrap_or(0.0)).collect());

    let history = history_columns(&income, &expenses, hours.as_deref());

    let mut cols = vec![Column::categorical(
        columns::JOB_CATEGORIES,
        days.iter().map(|d| d.category.clone()).collect(),
    )];
    if days.iter().any(|d| d.job_type.is_some()) {
        cols.push(Column::categorical(
            columns::JOB_TYPE,
            days.iter()
                .map(|d| d.job_type.clone().unwrap_or_else(|| "unknown".to_string()))
                .collect(),
        ));
    }
    cols.push(Column::numeric(columns::EXPENSES_TOTAL, expenses));
    if let Some(hours) = hours {
        cols.push(Column::numeric(columns::HOURS_WORKED, hours));
    }

    cols.extend([
        Column::numeric(
            columns::GAS_PRICE,
            days.iter()
                .map(|d| d.gas_price.unwrap_or(config.default_gas_price))
                .collect(),
        ),
        Column::numeric(
            columns::UNEMPLOYMENT_RATE,
            ds.iter().map(|d| unemployment_rate(*d)).collect(),
        ),
        Column::numeric(
            columns::IS_HOLIDAY,
            days.iter().map(|d| if d.is_holiday { 1.0 } else { 0.0 }).collect(),
        ),
    ]);
    cols.extend(history);

    FeatureFrame::new(ds, income, cols)
}

/// Values of the history-derived columns for the day after `history`.
///
/// Needs the `Expenses_Total` column; returns nothing for frames without it
/// (prepared tables), whose columns are then carried forward as they are.
pub fn next_day_history(history: &FeatureFrame) -> Vec<(String, f64)> {
    let numeric = |name: &str| match history.column(name).map(|c| &c.values) {
        Some(ColumnValues::Numeric(v)) => Some(v.clone()),
        _ => None,
    };
    let Some(mut expenses) = numeric(columns::EXPENSES_TOTAL) else {
        return Vec::new();
    };
    let mut income = history.income().to_vec();
    let mut hours = numeric(columns::HOURS_WORKED);

    // the placeholder row only receives values computed from earlier rows
    income.push(0.0);
    expenses.push(0.0);
    if let Some(hours) = hours.as_mut() {
        hours.push(0.0);
    }

    history_columns(&income, &expenses, hours.as_deref())
        .into_iter()
        .filter_map(|column| match column.values {
            ColumnValues::Numeric(v) => v.last().map(|last| (column.name, *last)),
            ColumnValues::Categorical(_) => None,
        })
        .collect()
}

/// Columns computed from income and expense history, each row from the rows
/// before it
fn history_columns(income: &[f64], expenses: &[f64], hours: Option<&[f64]>) -> Vec<Column> {
    let weekly_income = trailing_sum(income, WEEK_ROWS);
    let weekly_expenses = trailing_sum(expenses, WEEK_ROWS);
    let monthly_income = trailing_sum(income, MONTH_ROWS);
    let monthly_expenses = trailing_sum(expenses, MONTH_ROWS);
    let rolling_3m: Vec<f64> = trailing_mean_full(income, QUARTER_ROWS)
        .into_iter()
        .map(|v| round_to(v, -1))
        .collect();

    let prev_income = previous(income);
    let prev_expenses = previous(expenses);
    let ratio: Vec<f64> = prev_income
        .iter()
        .zip(&prev_expenses)
        .map(|(i, e)| if *i == 0.0 { 0.0 } else { round_to(e / i, 2) })
        .collect();
    let net: Vec<f64> = prev_income
        .iter()
        .zip(&prev_expenses)
        .map(|(i, e)| round_to(i - e, -1))
        .collect();
    let savings: Vec<f64> = monthly_income
        .iter()
        .zip(&monthly_expenses)
        .map(|(i, e)| i - e)
        .collect();

    let mut cols = vec![
        Column::numeric(columns::WEEKLY_INCOME, weekly_income),
        Column::numeric(columns::WEEKLY_EXPENSES, weekly_expenses),
        Column::numeric(columns::MONTHLY_INCOME, monthly_income),
        Column::numeric(columns::MONTHLY_EXPENSES, monthly_expenses),
        Column::numeric(columns::INCOME_ROLLING_3M, rolling_3m),
        Column::numeric(columns::EXPENSE_RATIO, ratio),
        Column::numeric(columns::NET_INCOME, net),
        Column::numeric(columns::SAVINGS, savings),
    ];
    if let Some(hours) = hours {
        let burnout = previous(hours)
            .iter()
            .zip(&prev_income)
            .map(|(h, i)| if *i == 0.0 { 0.0 } else { h / i * 1000.0 })
            .collect();
        cols.push(Column::numeric(columns::BURNOUT_RISK, burnout));
    }
    cols
}

/// Value of the row before, 0 for the first row
fn previous(values: &[f64]) -> Vec<f64> {
    std::iter::once(0.0)
        .chain(values.iter().copied())
        .take(values.len())
        .collect()
}

/// Sum over up to `window` rows strictly before each row
fn trailing_sum(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut acc = 0.0;
    for i in 0..values.len() {
        out.push(acc);
        acc += values[i];
        if i >= window {
            acc -= values[i - window];
        }
    }
    out
}

/// Mean over the `window` rows strictly before each row, 0 until that many
/// rows precede it
fn trailing_mean_full(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i < window {
                0.0
            } else {
                values[i - window..i].iter().sum::<f64>() / window as f64
            }
        })
        .collect()
}
