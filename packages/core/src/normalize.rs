//! Turns raw source rows into typed, time-ordered metric tables.

use chrono::{DateTime, NaiveDate};

use crate::error::AppError;
use crate::models::{
    AssetMetrics, DailyMetrics, MonthlyMetrics, RawAssetData, RawDailyRow, RawMonthlyRow,
};

/// Parse a date column value.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM` (first of the month), RFC 3339, and any
/// `YYYY-MM-DD` followed by a space or `T` and a time of day.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    let text = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Ok(timestamp.date_naive());
    }
    if matches!(text.as_bytes().get(10), Some(b' ') | Some(b'T')) {
        if let Some(date) = text
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        {
            return Ok(date);
        }
    }

    Err(AppError::Parse(format!("Unrecognised date: {:?}", raw)))
}

/// Average fee per transaction; `NaN` when there were no transactions.
pub fn average_fee(total_fee: f64, transaction_count: u64) -> f64 {
    if transaction_count == 0 {
        return f64::NAN;
    }
    total_fee / transaction_count as f64
}

pub fn normalize_monthly(rows: &[RawMonthlyRow]) -> Result<Vec<MonthlyMetrics>, AppError> {
    let mut table = rows
        .iter()
        .map(|row| {
            Ok(MonthlyMetrics {
                month: parse_date(&row.month)?,
                transaction_count: row.transaction_count,
                total_fee: row.total_fee,
                avg_fee: average_fee(row.total_fee, row.transaction_count),
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    table.sort_by_key(|row| row.month);
    Ok(table)
}

pub fn normalize_daily(rows: &[RawDailyRow]) -> Result<Vec<DailyMetrics>, AppError> {
    let mut table = rows
        .iter()
        .map(|row| {
            Ok(DailyMetrics {
                transaction_date: parse_date(&row.transaction_date)?,
                daily_transaction_count: row.daily_transaction_count,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    table.sort_by_key(|row| row.transaction_date);
    Ok(table)
}

pub fn normalize_asset(raw: &RawAssetData) -> Result<AssetMetrics, AppError> {
    let monthly = normalize_monthly(&raw.monthly)?;
    let daily = normalize_daily(&raw.daily)?;

    tracing::debug!(
        "Normalized {}: {} monthly rows, {} daily rows",
        raw.asset,
        monthly.len(),
        daily.len()
    );

    Ok(AssetMetrics {
        asset: raw.asset,
        monthly,
        daily,
    })
}
