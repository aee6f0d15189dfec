//! Core data model: assets, lookback windows and the metric tables.
//!
//! `Raw*` rows are what a source hands back, with dates still as text.
//! The normalizer turns them into `MonthlyMetrics` / `DailyMetrics`.

use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A network whose transactions are charted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    Bitcoin,
    Ethereum,
}

impl Asset {
    pub fn name(self) -> &'static str {
        match self {
            Asset::Bitcoin => "Bitcoin",
            Asset::Ethereum => "Ethereum",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Asset::Bitcoin => "BTC",
            Asset::Ethereum => "ETH",
        }
    }

    /// SQL expression yielding the fee of one transaction in native units.
    pub fn fee_expression(self) -> &'static str {
        match self {
            Asset::Bitcoin => "fee",
            Asset::Ethereum => "gas_price * receipt_gas_used",
        }
    }

    /// Power-of-ten exponent from the smallest native unit (satoshi, wei)
    /// to the display unit.
    pub fn fee_divider(self) -> u32 {
        match self {
            Asset::Bitcoin => 8,
            Asset::Ethereum => 18,
        }
    }

    pub fn default_table(self) -> &'static str {
        match self {
            Asset::Bitcoin => "bigquery-public-data.crypto_bitcoin.transactions",
            Asset::Ethereum => "bigquery-public-data.crypto_ethereum.transactions",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of trailing years of history to include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LookbackWindow {
    TwoYears,
    FiveYears,
    #[default]
    TenYears,
}

impl LookbackWindow {
    pub const ALL: [LookbackWindow; 3] = [
        LookbackWindow::TwoYears,
        LookbackWindow::FiveYears,
        LookbackWindow::TenYears,
    ];

    pub fn years(self) -> u32 {
        match self {
            LookbackWindow::TwoYears => 2,
            LookbackWindow::FiveYears => 5,
            LookbackWindow::TenYears => 10,
        }
    }

    pub fn from_years(years: u32) -> Result<Self, AppError> {
        match years {
            2 => Ok(LookbackWindow::TwoYears),
            5 => Ok(LookbackWindow::FiveYears),
            10 => Ok(LookbackWindow::TenYears),
            other => Err(AppError::InvalidInput(format!(
                "Unsupported lookback window: {} years (expected 2, 5 or 10)",
                other
            ))),
        }
    }

    /// Earliest date still inside the window when the newest data is `latest`.
    pub fn cutoff_from(self, latest: NaiveDate) -> NaiveDate {
        latest
            .checked_sub_months(Months::new(12 * self.years()))
            .unwrap_or(NaiveDate::MIN)
    }
}

impl FromStr for LookbackWindow {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix('y').unwrap_or(trimmed);
        let years = digits.parse::<u32>().map_err(|_| {
            AppError::InvalidInput(format!("Unsupported lookback window: {:?}", s))
        })?;
        Self::from_years(years)
    }
}

impl fmt::Display for LookbackWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.years())
    }
}

/// Monthly aggregate as delivered by a source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMonthlyRow {
    pub month: String,
    pub transaction_count: u64,
    #[serde(alias = "total_fee_btc", alias = "total_fee_eth")]
    pub total_fee: f64,
}

/// Daily transaction count as delivered by a source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawDailyRow {
    pub transaction_date: String,
    pub daily_transaction_count: u64,
}

/// Everything one source returned for one asset.
#[derive(Debug, Clone)]
pub struct RawAssetData {
    pub asset: Asset,
    pub monthly: Vec<RawMonthlyRow>,
    pub daily: Vec<RawDailyRow>,
}

impl RawAssetData {
    pub fn empty(asset: Asset) -> Self {
        Self {
            asset,
            monthly: Vec::new(),
            daily: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyMetrics {
    pub month: NaiveDate,
    pub transaction_count: u64,
    pub total_fee: f64,
    /// `NaN` when `transaction_count` is zero.
    pub avg_fee: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyMetrics {
    pub transaction_date: NaiveDate,
    pub daily_transaction_count: u64,
}

/// Normalized tables for one asset. `daily` is empty for sources that only
/// provide monthly aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct AssetMetrics {
    pub asset: Asset,
    pub monthly: Vec<MonthlyMetrics>,
    pub daily: Vec<DailyMetrics>,
}

/// Both assets' tables for one lookback window.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub bitcoin: AssetMetrics,
    pub ethereum: AssetMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookback_window_parses_plain_and_suffixed_years() {
        assert_eq!("2".parse::<LookbackWindow>().unwrap(), LookbackWindow::TwoYears);
        assert_eq!("5y".parse::<LookbackWindow>().unwrap(), LookbackWindow::FiveYears);
        assert_eq!(" 10 ".parse::<LookbackWindow>().unwrap(), LookbackWindow::TenYears);
    }

    #[test]
    fn lookback_window_rejects_unsupported_values() {
        assert!("3".parse::<LookbackWindow>().is_err());
        assert!("ten".parse::<LookbackWindow>().is_err());
        assert!(LookbackWindow::from_years(0).is_err());
    }

    #[test]
    fn default_window_is_ten_years() {
        assert_eq!(LookbackWindow::default().years(), 10);
    }

    #[test]
    fn cutoff_goes_back_whole_years() {
        let latest = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            LookbackWindow::TwoYears.cutoff_from(latest),
            NaiveDate::from_ymd_opt(2022, 6, 1).unwrap()
        );
    }

    #[test]
    fn fee_dividers_match_native_precision() {
        assert_eq!(Asset::Bitcoin.fee_divider(), 8);
        assert_eq!(Asset::Ethereum.fee_divider(), 18);
    }
}
