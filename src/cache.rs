//! Persistent feature cache
//!
//! Maps `(path, mtime_ns, size)` to the full feature bundle so unchanged
//! files skip re-extraction across runs. The cache is loaded once at
//! startup, owned by the coordinator thread, and written back once at the
//! end. A missing, corrupt, or version-mismatched file degrades to an
//! empty cache: stale state can cost work, never correctness.

use crate::types::Features;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Bumped whenever the serialized layout changes; older caches are
/// discarded instead of being misread
const CACHE_FORMAT_VERSION: u32 = 1;

/// Identity of one extraction input
///
/// Any change to a file's size or mtime produces a different key and
/// therefore a miss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub path: PathBuf,
    pub mtime_ns: u128,
    pub size: u64,
}

impl CacheKey {
    /// Stat `path` and derive its cache key
    pub fn for_path(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        let mtime_ns = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Ok(Self {
            path: path.to_path_buf(),
            mtime_ns,
            size: meta.len(),
        })
    }
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    key: CacheKey,
    features: Features,
}

#[derive(Serialize, Deserialize)]
struct CacheDocument {
    version: u32,
    entries: Vec<CacheEntry>,
}

/// In-memory view of the on-disk cache
pub struct FeatureCache {
    path: PathBuf,
    map: HashMap<CacheKey, Features>,
    dirty: bool,
}

impl FeatureCache {
    /// Load the cache at `path`, treating any failure as an empty cache
    pub fn load(path: &Path) -> Self {
        let map = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<CacheDocument>(&text) {
                Ok(doc) if doc.version == CACHE_FORMAT_VERSION => doc
                    .entries
                    .into_iter()
                    .map(|e| (e.key, e.features))
                    .collect(),
                Ok(doc) => {
                    warn!(
                        "discarding feature cache {}: format version {} (expected {})",
                        path.display(),
                        doc.version,
                        CACHE_FORMAT_VERSION
                    );
                    HashMap::new()
                }
                Err(e) => {
                    warn!("discarding corrupt feature cache {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("could not read feature cache {}: {}", path.display(), e);
                }
                HashMap::new()
            }
        };
        debug!("loaded {} cached feature bundles", map.len());
        Self {
            path: path.to_path_buf(),
            map,
            dirty: false,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&Features> {
        self.map.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, features: Features) {
        self.map.insert(key, features);
        self.dirty = true;
    }

    /// True when entries were added since load
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Write the cache back to disk
    pub fn save(&self) -> Result<()> {
        let mut entries: Vec<CacheEntry> = self
            .map
            .iter()
            .map(|(key, features)| CacheEntry {
                key: key.clone(),
                features: features.clone(),
            })
            .collect();
        // Stable on-disk order keeps repeated runs byte-identical.
        entries.sort_by(|a, b| a.key.path.cmp(&b.key.path));
        let doc = CacheDocument {
            version: CACHE_FORMAT_VERSION,
            entries,
        };
        let text = serde_json::to_string(&doc).context("failed to serialize feature cache")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write feature cache {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract_from_source;
    use crate::types::AnalysisConfig;

    fn sample_features() -> Features {
        extract_from_source(
            "int main(void) { int i = 0; while (i < 3) { i++; } return i; }",
            &AnalysisConfig::default(),
        )
    }

    fn sample_key(path: &str) -> CacheKey {
        CacheKey {
            path: PathBuf::from(path),
            mtime_ns: 1_700_000_000_000_000_000,
            size: 64,
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("cache.json");
        let key = sample_key("/tmp/q1_abc.c");
        let features = sample_features();

        let mut cache = FeatureCache::load(&cache_path);
        assert!(cache.is_empty());
        cache.insert(key.clone(), features.clone());
        assert!(cache.is_dirty());
        cache.save().unwrap();

        let reloaded = FeatureCache::load(&cache_path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(&key), Some(&features));
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn test_corrupt_cache_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("cache.json");
        fs::write(&cache_path, "{ not json").unwrap();
        let cache = FeatureCache::load(&cache_path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_version_mismatch_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("cache.json");
        let doc = CacheDocument {
            version: CACHE_FORMAT_VERSION + 1,
            entries: vec![CacheEntry {
                key: sample_key("/tmp/q1_abc.c"),
                features: sample_features(),
            }],
        };
        fs::write(&cache_path, serde_json::to_string(&doc).unwrap()).unwrap();
        let cache = FeatureCache::load(&cache_path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_changed_size_misses() {
        let mut cache = FeatureCache::load(Path::new("/nonexistent/cache.json"));
        let key = sample_key("/tmp/q1_abc.c");
        cache.insert(key.clone(), sample_features());

        let grown = CacheKey {
            size: key.size + 1,
            ..key.clone()
        };
        assert!(cache.get(&key).is_some());
        assert!(cache.get(&grown).is_none());
    }
}
