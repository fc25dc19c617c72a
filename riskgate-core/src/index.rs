//! Index Registry: named, concurrently-readable sets of entries,
//! replaced wholesale via an atomic pointer swap.
//!
//! Each category lives behind its own `ArcSwap<HashSet<String>>` so a reader
//! mid-lookup always sees either the pre-swap or post-swap snapshot, never a
//! torn one. The MX cache is a distinct write pattern (single-entry,
//! insert-only) and is kept as its own `DashMap` field rather than forced
//! behind the same wholesale-replace abstraction (see DESIGN.md).

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{LoaderError, LoaderResult};
use crate::types::MxStatus;

/// How long a parsed-CIDR cache is trusted before it is rebuilt from the live
/// snapshot.
const CIDR_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// A single category's live (or staging) data: a concurrently-readable set of
/// entry strings plus a lazily rebuilt cache of parsed CIDR ranges.
pub struct CategoryIndex {
    entries: ArcSwap<HashSet<String>>,
    generation: AtomicU64,
    cidr_cache: Mutex<Option<CidrCache>>,
}

struct CidrCache {
    generation: u64,
    built_at: Instant,
    ranges: Vec<(u32, u32)>,
}

impl CategoryIndex {
    fn empty() -> Self {
        Self {
            entries: ArcSwap::from_pointee(HashSet::new()),
            generation: AtomicU64::new(0),
            cidr_cache: Mutex::new(None),
        }
    }

    pub fn size(&self) -> usize {
        self.entries.load().len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.load().contains(key)
    }

    pub fn scan(&self) -> Vec<String> {
        self.entries.load().iter().cloned().collect()
    }

    fn replace(&self, entries: HashSet<String>) {
        self.entries.store(Arc::new(entries));
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Parsed `(base, mask)` pairs for every syntactically valid CIDR entry,
    /// rebuilt when the swap generation has advanced or the cache is stale.
    /// Malformed CIDR entries are silently skipped.
    pub(crate) fn cidr_ranges(&self) -> Vec<(u32, u32)> {
        let generation = self.generation.load(Ordering::SeqCst);
        let mut cache = self.cidr_cache.lock();

        let stale = match cache.as_ref() {
            Some(c) => c.generation != generation || c.built_at.elapsed() > CIDR_CACHE_TTL,
            None => true,
        };

        if stale {
            let snapshot = self.entries.load();
            let ranges = snapshot
                .iter()
                .filter(|e| e.contains('/'))
                .filter_map(|e| crate::matcher::parse_cidr(e))
                .collect();
            *cache = Some(CidrCache {
                generation,
                built_at: Instant::now(),
                ranges,
            });
        }

        cache.as_ref().expect("just populated").ranges.clone()
    }
}

impl std::fmt::Debug for CategoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryIndex")
            .field("size", &self.size())
            .finish()
    }
}

/// The set of named, live, readable indexes plus the distinguished MX cache
/// slot.
#[derive(Debug)]
pub struct Registry {
    indexes: DashMap<String, Arc<CategoryIndex>>,
    mx_cache: DashMap<String, MxStatus>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            indexes: DashMap::new(),
            mx_cache: DashMap::new(),
        }
    }

    /// Creation of an already-existing index is a race-safe no-op.
    pub fn create(&self, name: &str) {
        self.indexes
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CategoryIndex::empty()));
    }

    pub fn exists(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    pub fn size(&self, name: &str) -> Option<usize> {
        self.indexes.get(name).map(|i| i.size())
    }

    pub fn lookup(&self, name: &str, key: &str) -> bool {
        self.indexes.get(name).map(|i| i.contains(key)).unwrap_or(false)
    }

    pub fn scan(&self, name: &str) -> Vec<String> {
        self.indexes.get(name).map(|i| i.scan()).unwrap_or_default()
    }

    pub fn delete(&self, name: &str) {
        self.indexes.remove(name);
    }

    pub fn rename(&self, from: &str, to: &str) {
        if let Some((_, idx)) = self.indexes.remove(from) {
            self.indexes.insert(to.to_string(), idx);
        }
    }

    /// Fetch the live `CategoryIndex` handle for a category, used by the IP
    /// matcher to reach the CIDR cache.
    pub fn handle(&self, name: &str) -> Option<Arc<CategoryIndex>> {
        self.indexes.get(name).map(|r| r.clone())
    }

    /// Replace the contents of a staging-named index, creating it if absent
    /// and clearing it otherwise.
    pub fn load_staging(&self, staging_name: &str, entries: HashSet<String>) {
        self.create(staging_name);
        let idx = self.indexes.get(staging_name).expect("just created").clone();
        idx.replace(entries);
    }

    /// Atomically replace `live`'s contents with `staging`'s current
    /// snapshot. Readers mid-lookup see either the old or new set, never a
    /// missing or half-populated one.
    pub fn swap(&self, staging_name: &str, live_name: &str) -> LoaderResult<()> {
        let staging = self
            .indexes
            .get(staging_name)
            .ok_or_else(|| LoaderError::SwapFailed(format!("missing staging index {staging_name}")))?
            .clone();
        self.create(live_name);
        let live = self.indexes.get(live_name).expect("just created").clone();
        let snapshot = staging.entries.load_full();
        live.entries.store(snapshot);
        live.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn delete_staging(&self, staging_name: &str) {
        self.indexes.remove(staging_name);
    }

    // --- MX cache (distinguished slot) ---

    pub fn mx_get(&self, domain: &str) -> Option<MxStatus> {
        self.mx_cache.get(domain).map(|v| *v)
    }

    /// Insert-only: the first writer for a given domain wins.
    pub fn mx_insert_if_absent(&self, domain: &str, status: MxStatus) {
        self.mx_cache.entry(domain.to_string()).or_insert(status);
    }

    pub fn mx_size(&self) -> usize {
        self.mx_cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_is_idempotent() {
        let reg = Registry::new();
        reg.create("tor_network_ip");
        reg.create("tor_network_ip");
        assert!(reg.exists("tor_network_ip"));
        assert_eq!(reg.size("tor_network_ip"), Some(0));
    }

    #[test]
    fn swap_replaces_live_contents_atomically() {
        let reg = Registry::new();
        reg.create("tor_network_ip");
        let mut staged = HashSet::new();
        staged.insert("185.220.101.1".to_string());
        reg.load_staging("staging:tor_network_ip", staged);

        reg.swap("staging:tor_network_ip", "tor_network_ip").unwrap();

        assert!(reg.lookup("tor_network_ip", "185.220.101.1"));
        assert_eq!(reg.size("tor_network_ip"), Some(1));
    }

    #[test]
    fn swap_failure_leaves_live_untouched() {
        let reg = Registry::new();
        reg.create("tor_network_ip");
        reg.load_staging("staging:tor_network_ip", {
            let mut s = HashSet::new();
            s.insert("1.2.3.4".to_string());
            s
        });
        reg.swap("staging:tor_network_ip", "tor_network_ip").unwrap();

        // staging for a *different* category was never created.
        let err = reg.swap("staging:malicious_ip", "malicious_ip");
        assert!(err.is_err());
        assert!(reg.lookup("tor_network_ip", "1.2.3.4"));
    }

    #[test]
    fn mx_cache_is_insert_only() {
        let reg = Registry::new();
        reg.mx_insert_if_absent("acme.com", MxStatus::ValidMx);
        reg.mx_insert_if_absent("acme.com", MxStatus::NoMx);
        assert_eq!(reg.mx_get("acme.com"), Some(MxStatus::ValidMx));
    }
}
