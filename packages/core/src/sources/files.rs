//! CSV exports on local disk.
//!
//! Four files: monthly and daily tables for each asset. The lookback window
//! is applied relative to the newest row of each table, since the exports
//! are static snapshots.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::MetricsSource;
use crate::error::AppError;
use crate::models::{Asset, LookbackWindow, RawAssetData};
use crate::normalize::parse_date;

pub const BTC_MONTHLY_FILE: &str = "bitcoin.csv";
pub const ETH_MONTHLY_FILE: &str = "ethereum.csv";
pub const BTC_DAILY_FILE: &str = "bitcoin-daily.csv";
pub const ETH_DAILY_FILE: &str = "ethereum-daily.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePaths {
    pub btc_monthly: PathBuf,
    pub eth_monthly: PathBuf,
    pub btc_daily: PathBuf,
    pub eth_daily: PathBuf,
}

/// Paths set one by one; these survive a change of data directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOverrides {
    pub btc_monthly: Option<PathBuf>,
    pub eth_monthly: Option<PathBuf>,
    pub btc_daily: Option<PathBuf>,
    pub eth_daily: Option<PathBuf>,
}

impl FilePaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            btc_monthly: dir.join(BTC_MONTHLY_FILE),
            eth_monthly: dir.join(ETH_MONTHLY_FILE),
            btc_daily: dir.join(BTC_DAILY_FILE),
            eth_daily: dir.join(ETH_DAILY_FILE),
        }
    }

    /// Default file names inside `dir`, with any individual overrides applied.
    pub fn resolve(dir: impl AsRef<Path>, overrides: &FileOverrides) -> Self {
        let defaults = Self::in_dir(dir);
        Self {
            btc_monthly: overrides.btc_monthly.clone().unwrap_or(defaults.btc_monthly),
            eth_monthly: overrides.eth_monthly.clone().unwrap_or(defaults.eth_monthly),
            btc_daily: overrides.btc_daily.clone().unwrap_or(defaults.btc_daily),
            eth_daily: overrides.eth_daily.clone().unwrap_or(defaults.eth_daily),
        }
    }

    pub fn monthly(&self, asset: Asset) -> &Path {
        match asset {
            Asset::Bitcoin => &self.btc_monthly,
            Asset::Ethereum => &self.eth_monthly,
        }
    }

    pub fn daily(&self, asset: Asset) -> &Path {
        match asset {
            Asset::Bitcoin => &self.btc_daily,
            Asset::Ethereum => &self.eth_daily,
        }
    }
}

pub struct FileSource {
    paths: FilePaths,
}

impl FileSource {
    pub fn new(paths: FilePaths) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl MetricsSource for FileSource {
    async fn fetch(&self, asset: Asset, window: LookbackWindow) -> Result<RawAssetData, AppError> {
        let monthly_path = self.paths.monthly(asset).to_path_buf();
        let daily_path = self.paths.daily(asset).to_path_buf();

        let mut raw = tokio::task::spawn_blocking(move || -> Result<RawAssetData, AppError> {
            Ok(RawAssetData {
                asset,
                monthly: read_csv(&monthly_path)?,
                daily: read_csv(&daily_path)?,
            })
        })
        .await
        .map_err(|err| AppError::Internal(format!("CSV reader task failed: {}", err)))??;

        trim_to_window(&mut raw, window);
        Ok(raw)
    }

    fn source_name(&self) -> &str {
        "files"
    }
}

/// Read every record of a headed CSV file.
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|err| AppError::csv(path, err))?;

    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|err| AppError::csv(path, err))?;

    tracing::debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Drop rows older than `window` years before the newest row of each table.
///
/// Rows whose date does not parse are kept; the normalizer reports them.
pub fn trim_to_window(raw: &mut RawAssetData, window: LookbackWindow) {
    let latest_month = raw
        .monthly
        .iter()
        .filter_map(|row| parse_date(&row.month).ok())
        .max();
    if let Some(latest) = latest_month {
        let cutoff = window.cutoff_from(latest);
        raw.monthly
            .retain(|row| parse_date(&row.month).map_or(true, |month| month >= cutoff));
    }

    let latest_day = raw
        .daily
        .iter()
        .filter_map(|row| parse_date(&row.transaction_date).ok())
        .max();
    if let Some(latest) = latest_day {
        let cutoff = window.cutoff_from(latest);
        raw.daily
            .retain(|row| parse_date(&row.transaction_date).map_or(true, |day| day >= cutoff));
    }
}
