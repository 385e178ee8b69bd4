//! Process-wide resource cache keyed by client-chosen `cache-id` (spec §4.H).
//!
//! Grounded on the teacher's moka-backed `TerminologyResourceCache`, but a
//! `cache-id` is an opaque, unauthenticated handle a client hands back
//! across calls — so this cache is a `DashMap` of per-id `RwLock`-protected
//! lists rather than a single keyed LRU, and both the per-id list and the
//! number of distinct ids are size-bounded.

use std::sync::{LazyLock, RwLock};

use dashmap::DashMap;

use crate::error::{Result, TxError};
use crate::model::{CodeSystem, ConceptMap, ValueSet};

const DEFAULT_MAX_PER_ID: usize = 500;
const DEFAULT_MAX_IDS: usize = 10_000;

/// One additional resource supplied inline on a `tx-resource` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedResource {
    CodeSystem(CodeSystem),
    ValueSet(ValueSet),
    ConceptMap(ConceptMap),
}

impl CachedResource {
    /// The `(resourceType, url, version)` triple resources are de-duplicated
    /// by.
    fn identity(&self) -> (&'static str, Option<&str>, Option<&str>) {
        match self {
            Self::CodeSystem(cs) => ("CodeSystem", Some(cs.url.as_str()), cs.version.as_deref()),
            Self::ValueSet(vs) => ("ValueSet", vs.url.as_deref(), vs.version.as_deref()),
            Self::ConceptMap(cm) => ("ConceptMap", cm.url.as_deref(), cm.version.as_deref()),
        }
    }
}

/// Process-wide cache from `cache-id` to the ordered list of resources a
/// client has registered under it.
pub struct ResourceCache {
    entries: DashMap<String, RwLock<Vec<CachedResource>>>,
    max_per_id: usize,
    max_ids: usize,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_PER_ID, DEFAULT_MAX_IDS)
    }

    pub fn with_limits(max_per_id: usize, max_ids: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_per_id,
            max_ids,
        }
    }

    /// Appends `resources` to `id`'s list, de-duplicating by identity.
    /// Rejects a brand-new id once the id-count cap is reached, and rejects
    /// growth past the per-id cap (spec: "implementations must size-bound
    /// both the per-id list and the total number of ids").
    pub fn add(&self, id: &str, resources: Vec<CachedResource>) -> Result<()> {
        if !self.entries.contains_key(id) && self.entries.len() >= self.max_ids {
            return Err(TxError::too_costly(vec![format!(
                "cache-id limit reached ({} ids)",
                self.max_ids
            )]));
        }

        let entry = self
            .entries
            .entry(id.to_string())
            .or_insert_with(|| RwLock::new(Vec::new()));
        let mut list = entry.write().unwrap();
        for resource in resources {
            let key = resource.identity();
            if !list.iter().any(|existing| existing.identity() == key) {
                list.push(resource);
            }
        }
        if list.len() > self.max_per_id {
            return Err(TxError::too_costly(vec![format!(
                "cache-id '{id}' exceeds {} resources",
                self.max_per_id
            )]));
        }
        Ok(())
    }

    /// A lock-free snapshot of `id`'s current resources: the write lock is
    /// only held long enough to clone the list out.
    pub fn get(&self, id: &str) -> Vec<CachedResource> {
        self.entries
            .get(id)
            .map(|entry| entry.read().unwrap().clone())
            .unwrap_or_default()
    }

    pub fn clear(&self, id: &str) {
        self.entries.remove(id);
    }

    pub fn id_count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Global instance shared across all in-flight operations.
pub static RESOURCE_CACHE: LazyLock<ResourceCache> = LazyLock::new(ResourceCache::new);

pub fn get_cache() -> &'static ResourceCache {
    &RESOURCE_CACHE
}
