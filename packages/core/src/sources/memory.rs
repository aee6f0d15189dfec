//! In-memory source standing in for files or a warehouse in unit and
//! integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::files::trim_to_window;
use super::MetricsSource;
use crate::error::AppError;
use crate::models::{Asset, LookbackWindow, RawAssetData};

/// Serves fixed tables, trimmed to the requested window the same way
/// `FileSource` trims its exports. Counts every fetch.
#[derive(Debug, Default)]
pub struct MemorySource {
    data: HashMap<Asset, RawAssetData>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, raw: RawAssetData) -> Self {
        self.data.insert(raw.asset, raw);
        self
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSource for MemorySource {
    async fn fetch(&self, asset: Asset, window: LookbackWindow) -> Result<RawAssetData, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut raw = self
            .data
            .get(&asset)
            .cloned()
            .unwrap_or_else(|| RawAssetData::empty(asset));
        trim_to_window(&mut raw, window);
        Ok(raw)
    }

    fn source_name(&self) -> &str {
        "memory"
    }
}
