//! Decides whether the dataset comes from disk or from the network.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::domain::Dataset;
use crate::infra::cache::{CacheError, DatasetCache, Manifest};
use crate::infra::eddb::{parse_dataset, DumpSource, EddbClientError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Eddb(#[from] EddbClientError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("no market data in {0}; run `edtp update` while online")]
    NoData(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Fresh,
    Cached,
    Stale,
}

#[derive(Clone, Debug)]
pub struct CachedPayload<T> {
    pub data: T,
    pub manifest: Manifest,
    pub status: CacheStatus,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LoadMode {
    pub force_refresh: bool,
    pub offline: bool,
}

pub struct DataStore<S> {
    source: S,
    cache: DatasetCache,
    ttl: Duration,
}

impl<S: DumpSource> DataStore<S> {
    pub fn new(source: S, cache: DatasetCache, ttl: Duration) -> Self {
        Self { source, cache, ttl }
    }

    pub async fn load(&self, mode: LoadMode) -> Result<CachedPayload<Dataset>, StoreError> {
        let manifest = self.cache.manifest();

        if let Some(manifest) = manifest.as_ref() {
            if !mode.force_refresh && !manifest.is_expired(self.ttl) {
                log::info!("[store] Using cached dataset (age: {})", manifest.age_string());
                return self.from_cache(manifest.clone(), CacheStatus::Cached);
            }
        }

        if mode.offline {
            return match manifest {
                Some(manifest) => {
                    let status = if manifest.is_expired(self.ttl) {
                        log::warn!(
                            "[store] Offline: using expired dataset (age: {})",
                            manifest.age_string()
                        );
                        CacheStatus::Stale
                    } else {
                        CacheStatus::Cached
                    };
                    self.from_cache(manifest, status)
                }
                None => Err(StoreError::NoData(self.cache.dir().to_path_buf())),
            };
        }

        match self.refresh().await {
            Ok(payload) => Ok(payload),
            Err(error) => match manifest {
                Some(manifest) => {
                    log::warn!(
                        "[store] Refresh failed ({error}); falling back to cached dataset (age: {})",
                        manifest.age_string()
                    );
                    self.from_cache(manifest, CacheStatus::Stale)
                }
                None => Err(error),
            },
        }
    }

    /// Download, persist and parse a fresh dump set.
    pub async fn refresh(&self) -> Result<CachedPayload<Dataset>, StoreError> {
        log::info!("[store] Fetching dumps from {}", self.source.source_url());
        let raw = self.source.fetch_all().await?;
        // Parse before storing so a broken download never replaces a good cache.
        let dataset = parse_dataset(&raw)?;
        let manifest = self.cache.store(&raw, &self.source.source_url())?;
        Ok(CachedPayload {
            data: dataset,
            manifest,
            status: CacheStatus::Fresh,
        })
    }

    fn from_cache(
        &self,
        manifest: Manifest,
        status: CacheStatus,
    ) -> Result<CachedPayload<Dataset>, StoreError> {
        let raw = self.cache.load_raw()?;
        let dataset = parse_dataset(&raw)?;
        Ok(CachedPayload {
            data: dataset,
            manifest,
            status,
        })
    }
}
