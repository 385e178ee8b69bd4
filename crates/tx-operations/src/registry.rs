//! Resolves the working set of `CodeSystem`/`ValueSet`/`ConceptMap`
//! resources for one request: inline `tx-resource` parameters merged with
//! the named cache, falling back to whatever the host process knows about
//! (spec §4.G.2, §4.G.4).
//!
//! Package-registry crawling, tarball extraction, and SQLite persistence of
//! a package index are external collaborators (spec §1) — this module only
//! defines the seam ([`ResourceCatalog`]) a host implements to plug them in.

use std::collections::HashMap;
use std::sync::Arc;

use tx_core::model::{CodeSystem, ConceptMap, ValueSet};
use tx_core::{
    CachedResource, CodeSystemProvider, FragmentCodeSystemProvider, InMemoryCodeSystemProvider, NotFoundKind,
    ProviderResolver, Result, SupplementedCodeSystemProvider, TxError,
};

use crate::pins::PinRules;

/// Everything the host process knows about terminology resources that
/// weren't supplied inline on this request — typically backed by a package
/// store. Implementations live outside this crate.
pub trait ResourceCatalog: Send + Sync {
    fn code_system(&self, url: &str, version: Option<&str>) -> Option<Arc<dyn CodeSystemProvider>>;
    /// Every version known for `url`, for the "system known but version
    /// unknown" not-found sub-case.
    fn code_system_versions(&self, url: &str) -> Vec<String>;
    fn code_system_known(&self, url: &str) -> bool;
    /// Looks a code system up by its resource `id` rather than canonical
    /// `url` (spec §6 `CodeSystem/{id}/$lookup`). Default implementation
    /// reports "not found" for hosts that don't index by id.
    fn code_system_by_id(&self, _id: &str) -> Option<Arc<dyn CodeSystemProvider>> {
        None
    }
    fn value_set(&self, url: &str, version: Option<&str>) -> Option<ValueSet>;
    fn value_set_by_id(&self, id: &str) -> Option<ValueSet>;
    fn concept_map(&self, url: &str, version: Option<&str>) -> Option<ConceptMap>;
    fn concept_maps_referencing(&self, source: &str, target: Option<&str>) -> Vec<ConceptMap>;
}

/// A catalog with nothing in it — the working set is then exactly whatever
/// the request supplies inline or via the cache. Useful standalone and in
/// tests.
#[derive(Debug, Default)]
pub struct EmptyCatalog;

impl ResourceCatalog for EmptyCatalog {
    fn code_system(&self, _url: &str, _version: Option<&str>) -> Option<Arc<dyn CodeSystemProvider>> {
        None
    }
    fn code_system_versions(&self, _url: &str) -> Vec<String> {
        Vec::new()
    }
    fn code_system_known(&self, _url: &str) -> bool {
        false
    }
    fn value_set(&self, _url: &str, _version: Option<&str>) -> Option<ValueSet> {
        None
    }
    fn value_set_by_id(&self, _id: &str) -> Option<ValueSet> {
        None
    }
    fn concept_map(&self, _url: &str, _version: Option<&str>) -> Option<ConceptMap> {
        None
    }
    fn concept_maps_referencing(&self, _source: &str, _target: Option<&str>) -> Vec<ConceptMap> {
        Vec::new()
    }
}

/// One request's additional resources plus the pin rules in effect, backing
/// resolution of every system/value-set/concept-map reference in that
/// request (spec §4.G "Resolution").
pub struct ResourceResolver<'a> {
    additional_code_systems: HashMap<String, Vec<CodeSystem>>,
    additional_value_sets: HashMap<String, ValueSet>,
    additional_concept_maps: Vec<ConceptMap>,
    catalog: &'a dyn ResourceCatalog,
    pins: PinRules,
}

impl<'a> ResourceResolver<'a> {
    pub fn new(additional: Vec<CachedResource>, catalog: &'a dyn ResourceCatalog, pins: PinRules) -> Self {
        let mut additional_code_systems: HashMap<String, Vec<CodeSystem>> = HashMap::new();
        let mut additional_value_sets = HashMap::new();
        let mut additional_concept_maps = Vec::new();

        for resource in additional {
            match resource {
                CachedResource::CodeSystem(cs) => {
                    additional_code_systems.entry(cs.url.clone()).or_default().push(cs);
                }
                CachedResource::ValueSet(vs) => {
                    if let Some(url) = vs.url.clone() {
                        additional_value_sets.insert(url, vs);
                    }
                }
                CachedResource::ConceptMap(cm) => additional_concept_maps.push(cm),
            }
        }

        Self {
            additional_code_systems,
            additional_value_sets,
            additional_concept_maps,
            catalog,
            pins,
        }
    }

    pub fn pins(&self) -> &PinRules {
        &self.pins
    }

    /// Builds a provider for `url`, applying version pins, preferring
    /// inline/cached resources over the catalog, and layering any inline
    /// supplements whose `supplements` URL matches (spec §3 "Supplement").
    pub fn resolve_code_system(&self, url: &str, version: Option<&str>) -> Result<Arc<dyn CodeSystemProvider>> {
        let effective_version = self.pins.apply(url, version)?;

        if let Some(candidates) = self.additional_code_systems.get(url) {
            let hosts: Vec<&CodeSystem> = candidates
                .iter()
                .filter(|cs| cs.supplements.is_none())
                .collect();
            let supplements: Vec<&CodeSystem> = candidates
                .iter()
                .filter(|cs| cs.supplements.as_deref() == Some(url))
                .collect();

            let host = match effective_version.as_deref() {
                Some(v) => hosts.iter().find(|cs| cs.version.as_deref() == Some(v)).copied(),
                None => hosts.first().copied(),
            };

            if let Some(host) = host {
                let base: Arc<dyn CodeSystemProvider> = match host.content {
                    tx_core::model::ContentMode::Fragment => Arc::new(FragmentCodeSystemProvider::from_resource(host)),
                    _ => Arc::new(InMemoryCodeSystemProvider::from_resource(host)),
                };
                let mut provider = base;
                for supplement in &supplements {
                    provider = Arc::new(SupplementedCodeSystemProvider::new(provider, supplement));
                }
                return Ok(provider);
            }
        }

        if let Some(provider) = self.catalog.code_system(url, effective_version.as_deref()) {
            return Ok(provider);
        }

        self.not_found_for_system(url, effective_version.as_deref())
    }

    fn not_found_for_system(&self, url: &str, version: Option<&str>) -> Result<Arc<dyn CodeSystemProvider>> {
        let known_inline = self.additional_code_systems.contains_key(url);
        let known_in_catalog = self.catalog.code_system_known(url);
        if !known_inline && !known_in_catalog {
            return Err(TxError::not_found(NotFoundKind::System, format!("unknown code system '{url}'")));
        }
        if version.is_some() {
            let mut available = self.catalog.code_system_versions(url);
            if let Some(candidates) = self.additional_code_systems.get(url) {
                available.extend(candidates.iter().filter_map(|cs| cs.version.clone()));
            }
            if available.is_empty() {
                return Err(TxError::not_found(
                    NotFoundKind::SystemVersion { available },
                    format!("code system '{url}' is known but has no recorded versions"),
                ));
            }
            return Err(TxError::not_found(
                NotFoundKind::VersionPinUnsatisfied,
                format!("no version of '{url}' satisfies the requested pin '{}'", version.unwrap_or("")),
            ));
        }
        Err(TxError::not_found(
            NotFoundKind::SystemVersion {
                available: self.catalog.code_system_versions(url),
            },
            format!("code system '{url}' is known but no usable version was found"),
        ))
    }

    /// Resolves a code system by its resource `id` (spec §6
    /// `CodeSystem/{id}/$lookup`), falling back to the catalog only — inline
    /// `tx-resource` entries have no stable id-indexed lookup, matching
    /// `resolve_value_set_by_id`'s catalog-only behaviour.
    pub fn resolve_code_system_by_id(&self, id: &str) -> Result<Arc<dyn CodeSystemProvider>> {
        self.catalog
            .code_system_by_id(id)
            .ok_or_else(|| TxError::not_found(NotFoundKind::System, format!("unknown code system id '{id}'")))
    }

    pub fn resolve_value_set(&self, url: &str, version: Option<&str>) -> Result<ValueSet> {
        if let Some(vs) = self.additional_value_sets.get(url) {
            return Ok(vs.clone());
        }
        self.catalog
            .value_set(url, version)
            .ok_or_else(|| TxError::not_found(NotFoundKind::ValueSet, format!("unknown value set '{url}'")))
    }

    pub fn resolve_value_set_by_id(&self, id: &str) -> Result<ValueSet> {
        self.catalog
            .value_set_by_id(id)
            .ok_or_else(|| TxError::not_found(NotFoundKind::ValueSet, format!("unknown value set id '{id}'")))
    }

    pub fn resolve_concept_maps(&self, source: &str, target: Option<&str>) -> Vec<ConceptMap> {
        let mut maps: Vec<ConceptMap> = self
            .additional_concept_maps
            .iter()
            .filter(|cm| {
                cm.group
                    .iter()
                    .any(|g| g.source == source && target.is_none_or(|t| g.target == t))
            })
            .cloned()
            .collect();
        maps.extend(self.catalog.concept_maps_referencing(source, target));
        maps
    }

    pub fn resolve_concept_map(&self, url: &str, version: Option<&str>) -> Result<ConceptMap> {
        if let Some(cm) = self.additional_concept_maps.iter().find(|cm| cm.url.as_deref() == Some(url)) {
            return Ok(cm.clone());
        }
        self.catalog
            .concept_map(url, version)
            .ok_or_else(|| TxError::not_found(NotFoundKind::ConceptMap, format!("unknown concept map '{url}'")))
    }
}

impl ProviderResolver for ResourceResolver<'_> {
    fn resolve_provider(&self, system: &str, version: Option<&str>) -> Result<Arc<dyn CodeSystemProvider>> {
        self.resolve_code_system(system, version)
    }

    fn resolve_value_set(&self, url: &str, version: Option<&str>) -> Result<ValueSet> {
        ResourceResolver::resolve_value_set(self, url, version)
    }
}
