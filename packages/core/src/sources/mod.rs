//! Data source adapters.
//!
//! A `MetricsSource` hands back raw, text-dated rows for one asset and one
//! lookback window. `load_dataset` runs fetch and normalization for both
//! assets, in order, failing on the first error.

pub mod files;
pub mod memory;
pub mod warehouse;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, SourceKind};
use crate::error::AppError;
use crate::models::{Asset, Dataset, LookbackWindow, RawAssetData};
use crate::normalize::normalize_asset;

pub use files::{FilePaths, FileSource};
pub use memory::MemorySource;
pub use warehouse::WarehouseClient;

/// Abstraction over where transaction metrics come from.
#[async_trait]
pub trait MetricsSource {
    /// Fetch the raw tables for `asset` covering `window`.
    async fn fetch(&self, asset: Asset, window: LookbackWindow) -> Result<RawAssetData, AppError>;

    /// Name of this source for logging.
    fn source_name(&self) -> &str;
}

pub type SharedSource = Arc<dyn MetricsSource + Send + Sync>;

/// Fetch and normalize both assets for `window`.
pub async fn load_dataset(
    source: &(dyn MetricsSource + Send + Sync),
    window: LookbackWindow,
) -> Result<Dataset, AppError> {
    let bitcoin = source.fetch(Asset::Bitcoin, window).await?;
    let ethereum = source.fetch(Asset::Ethereum, window).await?;

    tracing::info!(
        "Fetched {}-year window from {}: BTC {} monthly / {} daily, ETH {} monthly / {} daily",
        window.years(),
        source.source_name(),
        bitcoin.monthly.len(),
        bitcoin.daily.len(),
        ethereum.monthly.len(),
        ethereum.daily.len(),
    );

    Ok(Dataset {
        bitcoin: normalize_asset(&bitcoin)?,
        ethereum: normalize_asset(&ethereum)?,
    })
}

/// Build the source selected by `config`.
pub fn from_config(config: &Config) -> Result<SharedSource, AppError> {
    match config.source {
        SourceKind::Files => Ok(Arc::new(FileSource::new(config.files.clone()))),
        SourceKind::Warehouse => {
            let warehouse = config.warehouse.as_ref().ok_or_else(|| {
                AppError::Config(
                    "WAREHOUSE_PROJECT and WAREHOUSE_TOKEN are required for the warehouse source"
                        .to_string(),
                )
            })?;
            Ok(Arc::new(WarehouseClient::from_config(warehouse)))
        }
    }
}
