//! Render cache
//!
//! Remembers a hash of every page written to the public directory so
//! periodic regeneration only rewrites pages whose HTML actually changed.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Cache directory, relative to the site root
pub const CACHE_DIR: &str = ".spacetraveling-cache";

/// Cache file name
const CACHE_FILE: &str = ".spacetraveling-cache/db.json";

/// Hashes of rendered output, keyed by path relative to the public dir
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenderCache {
    /// Version of the cache format
    pub version: u32,
    pub outputs: HashMap<String, u64>,
}

impl RenderCache {
    /// Current cache format version
    const VERSION: u32 = 1;

    /// Create a new cache with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Load cache from disk, or create a new empty cache
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = base_dir.join(CACHE_FILE);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            match serde_json::from_str::<RenderCache>(&content) {
                Ok(cache) if cache.version == Self::VERSION => return cache,
                Ok(_) => tracing::info!("Cache version mismatch, rebuilding cache"),
                Err(e) => tracing::warn!("Ignoring unreadable cache {:?}: {}", cache_path, e),
            }
        }
        Self::new()
    }

    /// Save cache to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        fs::create_dir_all(base_dir.join(CACHE_DIR))?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(base_dir.join(CACHE_FILE), content)?;
        Ok(())
    }

    /// Whether `output` was last written with exactly this content
    pub fn is_fresh(&self, output: &str, hash: u64) -> bool {
        self.outputs.get(output) == Some(&hash)
    }

    pub fn record(&mut self, output: &str, hash: u64) {
        self.outputs.insert(output.to_string(), hash);
    }

    pub fn forget(&mut self, output: &str) {
        self.outputs.remove(output);
    }
}

/// Calculate a hash for rendered content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_content() {
        assert_eq!(hash_content("<p>a</p>"), hash_content("<p>a</p>"));
        assert_ne!(hash_content("<p>a</p>"), hash_content("<p>b</p>"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = RenderCache::new();
        cache.record("index.html", 42);
        cache.save(dir.path()).unwrap();

        let loaded = RenderCache::load(dir.path());
        assert!(loaded.is_fresh("index.html", 42));
        assert!(!loaded.is_fresh("index.html", 43));
        assert!(!loaded.is_fresh("post/a/index.html", 42));
    }

    #[test]
    fn test_version_mismatch_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CACHE_DIR)).unwrap();
        fs::write(
            dir.path().join(CACHE_FILE),
            r#"{"version": 0, "outputs": {"index.html": 1}}"#,
        )
        .unwrap();

        let cache = RenderCache::load(dir.path());
        assert_eq!(cache.version, 1);
        assert!(cache.outputs.is_empty());
    }
}
