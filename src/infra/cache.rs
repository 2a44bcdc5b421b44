//! Persistent on-disk cache for the market dumps with TTL tracking.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infra::eddb::{DumpFile, RawDumps};
use crate::util::{format_age, version::APP_VERSION};

const MANIFEST_FILENAME: &str = "manifest.json";
const CACHE_DIR_ENV: &str = "EDTP_CACHE_DIR";

/// Default dataset TTL: 24 hours. The upstream dumps are regenerated daily.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("cache manifest is unreadable: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("no cached dataset in {0}")]
    Missing(PathBuf),
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Describes the dump set currently on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Unix timestamp (seconds) of the download.
    pub fetched_at: u64,
    pub source_url: String,
    /// File name -> size in bytes.
    pub files: BTreeMap<String, u64>,
    pub edtp_version: String,
}

impl Manifest {
    pub fn new(source_url: &str, raw: &RawDumps) -> Self {
        let files = DumpFile::ALL
            .iter()
            .map(|file| (file.file_name().to_string(), raw.get(*file).len() as u64))
            .collect();
        Self {
            fetched_at: unix_now(),
            source_url: source_url.to_string(),
            files,
            edtp_version: APP_VERSION.to_string(),
        }
    }

    pub fn age(&self) -> Duration {
        Duration::from_secs(unix_now().saturating_sub(self.fetched_at))
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    pub fn age_string(&self) -> String {
        format_age(self.age().as_secs())
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct DatasetCache {
    dir: PathBuf,
}

impl DatasetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `EDTP_CACHE_DIR`, else the platform cache directory, else `./.edtp-cache`.
    pub fn default_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::cache_dir()
            .map(|base| base.join("edtp"))
            .unwrap_or_else(|| PathBuf::from(".edtp-cache"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Load the manifest, if a complete dump set is present.
    pub fn manifest(&self) -> Option<Manifest> {
        let path = self.path(MANIFEST_FILENAME);
        if !path.exists() {
            log::debug!("[cache] No manifest at {}", path.display());
            return None;
        }

        let manifest = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Manifest>(&content) {
                Ok(manifest) => manifest,
                Err(e) => {
                    log::warn!("[cache] Failed to parse manifest: {e}");
                    return None;
                }
            },
            Err(e) => {
                log::warn!("[cache] Failed to read manifest: {e}");
                return None;
            }
        };

        for file in DumpFile::ALL {
            let name = file.file_name();
            let actual = fs::metadata(self.path(name)).map(|meta| meta.len()).ok();
            let recorded = manifest.files.get(name).copied();
            if actual.is_none() || actual != recorded {
                log::warn!(
                    "[cache] {name} does not match the manifest (recorded {recorded:?} bytes, found {actual:?})"
                );
                return None;
            }
        }

        log::debug!(
            "[cache] Found dataset from {} (age: {})",
            manifest.source_url,
            manifest.age_string()
        );
        Some(manifest)
    }

    pub fn load_raw(&self) -> Result<RawDumps, CacheError> {
        if self.manifest().is_none() {
            return Err(CacheError::Missing(self.dir.clone()));
        }
        let mut raw = RawDumps::default();
        for file in DumpFile::ALL {
            let data = fs::read(self.path(file.file_name()))?;
            raw.set(file, data);
        }
        log::info!(
            "[cache] Loaded {} bytes of dumps from {}",
            raw.total_bytes(),
            self.dir.display()
        );
        Ok(raw)
    }

    /// Write all dumps, then the manifest. Each file goes to a temporary
    /// name first so an interrupted write never leaves a torn dump behind.
    pub fn store(&self, raw: &RawDumps, source_url: &str) -> Result<Manifest, CacheError> {
        fs::create_dir_all(&self.dir)?;
        // Dumps and manifest must never disagree, even if this write is interrupted.
        remove_if_present(&self.path(MANIFEST_FILENAME))?;

        for file in DumpFile::ALL {
            write_atomic(&self.path(file.file_name()), raw.get(file))?;
        }

        let manifest = Manifest::new(source_url, raw);
        let content = serde_json::to_string_pretty(&manifest)?;
        write_atomic(&self.path(MANIFEST_FILENAME), content.as_bytes())?;

        log::info!(
            "[cache] Saved {} bytes of dumps to {}",
            manifest.total_bytes(),
            self.dir.display()
        );
        Ok(manifest)
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        let names = DumpFile::ALL
            .iter()
            .map(|file| file.file_name())
            .chain(std::iter::once(MANIFEST_FILENAME));
        for name in names {
            remove_if_present(&self.path(name))?;
        }
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<(), io::Error> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), io::Error> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawDumps {
        RawDumps {
            systems: b"[]".to_vec(),
            stations: b"[]".to_vec(),
            commodities: b"[]".to_vec(),
            listings: b"station_id,commodity_id\n".to_vec(),
        }
    }

    #[test]
    fn empty_cache_has_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DatasetCache::new(dir.path());
        assert!(cache.manifest().is_none());
        assert!(matches!(cache.load_raw(), Err(CacheError::Missing(_))));
    }

    #[test]
    fn store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DatasetCache::new(dir.path().join("nested"));

        let stored = cache.store(&raw(), "https://example.org/").unwrap();
        assert_eq!(stored.files["listings.csv"], 24);
        assert_eq!(stored.total_bytes(), 30);

        let manifest = cache.manifest().unwrap();
        assert_eq!(manifest, stored);
        assert!(!manifest.is_expired(DEFAULT_TTL));
        assert_eq!(cache.load_raw().unwrap(), raw());
    }

    #[test]
    fn missing_dump_invalidates_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DatasetCache::new(dir.path());
        cache.store(&raw(), "https://example.org/").unwrap();
        fs::remove_file(dir.path().join("stations.json")).unwrap();
        assert!(cache.manifest().is_none());
    }

    #[test]
    fn resized_dump_invalidates_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DatasetCache::new(dir.path());
        cache.store(&raw(), "https://example.org/").unwrap();
        fs::write(
            dir.path().join("systems_populated.json"),
            br#"[{"id": 1, "x": 0}]"#,
        )
        .unwrap();

        assert!(cache.manifest().is_none());
        assert!(matches!(cache.load_raw(), Err(CacheError::Missing(_))));
    }

    #[test]
    fn interrupted_store_leaves_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DatasetCache::new(dir.path());
        cache.store(&raw(), "https://example.org/").unwrap();

        // A directory where a dump should go makes the next write fail.
        fs::remove_file(dir.path().join("listings.csv")).unwrap();
        fs::create_dir(dir.path().join("listings.csv.tmp")).unwrap();
        assert!(cache.store(&raw(), "https://example.org/").is_err());

        assert!(!dir.path().join(MANIFEST_FILENAME).exists());
        assert!(cache.manifest().is_none());
    }

    #[test]
    fn clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DatasetCache::new(dir.path());
        cache.store(&raw(), "https://example.org/").unwrap();
        cache.clear().unwrap();
        assert!(cache.manifest().is_none());
        cache.clear().unwrap();
    }

    #[test]
    fn manifest_expiry_and_age() {
        let mut manifest = Manifest::new("https://example.org/", &raw());
        assert!(!manifest.is_expired(Duration::from_secs(60)));

        manifest.fetched_at -= 2 * 86_400;
        assert!(manifest.is_expired(DEFAULT_TTL));
        assert_eq!(manifest.age_string(), "2d");
    }
}
