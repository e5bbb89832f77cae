//! Parsed-dataset cache.
//!
//! Repeated filter/aggregate passes over the same upload must not re-parse it.
//! The cache is an explicit collaborator (`DatasetCache`) keyed by the content
//! hash of the input plus the options used to parse it.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::LoadError;
use crate::io::ingest::{LoadOptions, LoadedDataset, load_dataset};

/// Identity of one parse: SHA-256 over the bytes and the load options.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(bytes: &[u8], options: &LoadOptions) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hasher.update([0u8, options.delimiter]);
        hasher.update(options.decimal.as_char().to_string().as_bytes());
        for column in options.schema.columns() {
            hasher.update([0u8]);
            hasher.update(column.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Storage for parsed datasets.
pub trait DatasetCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<LoadedDataset>>;
    fn insert(&mut self, key: CacheKey, value: Arc<LoadedDataset>);
    fn invalidate(&mut self);
}

/// Keeps only the currently active file; a new key replaces the old entry.
#[derive(Debug, Default)]
pub struct SingleFileCache {
    entry: Option<(CacheKey, Arc<LoadedDataset>)>,
}

impl SingleFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_key(&self) -> Option<&CacheKey> {
        self.entry.as_ref().map(|(k, _)| k)
    }
}

impl DatasetCache for SingleFileCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<LoadedDataset>> {
        match &self.entry {
            Some((k, v)) if k == key => Some(Arc::clone(v)),
            _ => None,
        }
    }

    fn insert(&mut self, key: CacheKey, value: Arc<LoadedDataset>) {
        self.entry = Some((key, value));
    }

    fn invalidate(&mut self) {
        self.entry = None;
    }
}

/// Never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl DatasetCache for NoCache {
    fn get(&self, _key: &CacheKey) -> Option<Arc<LoadedDataset>> {
        None
    }

    fn insert(&mut self, _key: CacheKey, _value: Arc<LoadedDataset>) {}

    fn invalidate(&mut self) {}
}

/// Load through `cache`. Failed loads are never stored.
pub fn load_cached<C: DatasetCache>(
    cache: &mut C,
    bytes: &[u8],
    options: &LoadOptions,
) -> Result<Arc<LoadedDataset>, LoadError> {
    let key = CacheKey::new(bytes, options);
    let short = &key.as_str()[..12];
    if let Some(hit) = cache.get(&key) {
        debug!(key = short, "Dataset cache hit");
        return Ok(hit);
    }

    debug!(key = short, "Dataset cache miss");
    let loaded = Arc::new(load_dataset(bytes, options)?);
    cache.insert(key, Arc::clone(&loaded));
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DecimalSeparator;

    const FILE_A: &str = "Date;Product type;Product line;Quantity;Sale price;Purchase cost;Ordering method;Country of sale\n\
                          2024-01-01;Tents;Camping;1;10;4;Web;AR";
    const FILE_B: &str = "Date;Product type;Product line;Quantity;Sale price;Purchase cost;Ordering method;Country of sale\n\
                          2024-01-01;Boots;Hiking;3;10;4;Web;MX";

    #[test]
    fn same_bytes_hit_the_cache() {
        let mut cache = SingleFileCache::new();
        let options = LoadOptions::default();
        let a1 = load_cached(&mut cache, FILE_A.as_bytes(), &options).unwrap();
        let a2 = load_cached(&mut cache, FILE_A.as_bytes(), &options).unwrap();
        assert!(Arc::ptr_eq(&a1, &a2));
    }

    #[test]
    fn new_file_replaces_the_entry() {
        let mut cache = SingleFileCache::new();
        let options = LoadOptions::default();
        let a = load_cached(&mut cache, FILE_A.as_bytes(), &options).unwrap();
        let b = load_cached(&mut cache, FILE_B.as_bytes(), &options).unwrap();
        assert_ne!(a.dataset, b.dataset);
        assert!(cache.get(&CacheKey::new(FILE_A.as_bytes(), &options)).is_none());
        assert_eq!(cache.active_key(), Some(&CacheKey::new(FILE_B.as_bytes(), &options)));

        cache.invalidate();
        assert!(cache.active_key().is_none());
    }

    #[test]
    fn options_are_part_of_the_key() {
        let dot = LoadOptions::default();
        let comma = LoadOptions {
            decimal: DecimalSeparator::Comma,
            ..LoadOptions::default()
        };
        assert_ne!(CacheKey::new(b"x", &dot), CacheKey::new(b"x", &comma));
        assert_eq!(CacheKey::new(b"x", &dot), CacheKey::new(b"x", &dot));
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache = SingleFileCache::new();
        let options = LoadOptions::default();
        assert!(load_cached(&mut cache, b"Date;Quantity\n2024-01-01;1", &options).is_err());
        assert!(cache.active_key().is_none());
    }

    #[test]
    fn no_cache_always_reparses() {
        let mut cache = NoCache;
        let options = LoadOptions::default();
        let a1 = load_cached(&mut cache, FILE_A.as_bytes(), &options).unwrap();
        let a2 = load_cached(&mut cache, FILE_A.as_bytes(), &options).unwrap();
        assert!(!Arc::ptr_eq(&a1, &a2));
        assert_eq!(a1, a2);
    }
}
