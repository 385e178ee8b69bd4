//! A [`ResourceCatalog`] backed by a directory of FHIR `CodeSystem`/
//! `ValueSet`/`ConceptMap` JSON files, read once at startup.
//!
//! Grounded on the teacher's package-loading shape (`PackagesConfig.load`
//! pointing at a directory) without reimplementing its tarball-fetching
//! `octofhir-canonical-manager` machinery (spec §1 non-goal) — this walks a
//! local directory only.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tx_core::model::{CodeSystem, ConceptMap, ContentMode, ValueSet};
use tx_core::{CodeSystemProvider, FragmentCodeSystemProvider, InMemoryCodeSystemProvider};
use tx_operations::ResourceCatalog;

#[derive(Debug, Default)]
pub struct DirectoryCatalog {
    code_systems: HashMap<String, Vec<CodeSystem>>,
    value_sets_by_url: HashMap<String, ValueSet>,
    value_sets_by_id: HashMap<String, ValueSet>,
    concept_maps: Vec<ConceptMap>,
}

impl DirectoryCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads every `*.json` file directly under `dir`, sorting R5-shaped
    /// `CodeSystem`/`ValueSet`/`ConceptMap` resources into the catalog by
    /// `resourceType`. Files that don't parse are skipped with a warning,
    /// not a hard failure — one malformed package file shouldn't take the
    /// whole catalog down.
    pub fn load_from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut catalog = Self::default();
        if !dir.is_dir() {
            return Ok(catalog);
        }
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(file = %path.display(), %err, "failed to read package file");
                    continue;
                }
            };
            let value: serde_json::Value = match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(file = %path.display(), %err, "failed to parse package file");
                    continue;
                }
            };
            match value.get("resourceType").and_then(serde_json::Value::as_str) {
                Some("CodeSystem") => match serde_json::from_value::<CodeSystem>(value) {
                    Ok(cs) => catalog.code_systems.entry(cs.url.clone()).or_default().push(cs),
                    Err(err) => tracing::warn!(file = %path.display(), %err, "invalid CodeSystem"),
                },
                Some("ValueSet") => match serde_json::from_value::<ValueSet>(value) {
                    Ok(vs) => {
                        if let Some(url) = vs.url.clone() {
                            catalog.value_sets_by_url.insert(url, vs.clone());
                        }
                        if let Some(id) = vs.id.clone() {
                            catalog.value_sets_by_id.insert(id, vs);
                        }
                    }
                    Err(err) => tracing::warn!(file = %path.display(), %err, "invalid ValueSet"),
                },
                Some("ConceptMap") => match serde_json::from_value::<ConceptMap>(value) {
                    Ok(cm) => catalog.concept_maps.push(cm),
                    Err(err) => tracing::warn!(file = %path.display(), %err, "invalid ConceptMap"),
                },
                other => tracing::warn!(file = %path.display(), ?other, "unrecognised resourceType, skipping"),
            }
        }
        tracing::info!(
            code_systems = catalog.code_systems.len(),
            value_sets = catalog.value_sets_by_url.len(),
            concept_maps = catalog.concept_maps.len(),
            "loaded package catalog",
        );
        Ok(catalog)
    }
}

impl ResourceCatalog for DirectoryCatalog {
    fn code_system(&self, url: &str, version: Option<&str>) -> Option<Arc<dyn CodeSystemProvider>> {
        let candidates = self.code_systems.get(url)?;
        let hosts: Vec<&CodeSystem> = candidates.iter().filter(|cs| cs.supplements.is_none()).collect();
        let host = match version {
            Some(v) => hosts.iter().find(|cs| cs.version.as_deref() == Some(v)).copied(),
            None => hosts.first().copied(),
        }?;
        let provider: Arc<dyn CodeSystemProvider> = match host.content {
            ContentMode::Fragment => Arc::new(FragmentCodeSystemProvider::from_resource(host)),
            _ => Arc::new(InMemoryCodeSystemProvider::from_resource(host)),
        };
        Some(provider)
    }

    fn code_system_versions(&self, url: &str) -> Vec<String> {
        self.code_systems
            .get(url)
            .map(|candidates| candidates.iter().filter_map(|cs| cs.version.clone()).collect())
            .unwrap_or_default()
    }

    fn code_system_known(&self, url: &str) -> bool {
        self.code_systems.contains_key(url)
    }

    fn code_system_by_id(&self, id: &str) -> Option<Arc<dyn CodeSystemProvider>> {
        let host = self.code_systems.values().flatten().find(|cs| cs.id.as_deref() == Some(id))?;
        let provider: Arc<dyn CodeSystemProvider> = match host.content {
            ContentMode::Fragment => Arc::new(FragmentCodeSystemProvider::from_resource(host)),
            _ => Arc::new(InMemoryCodeSystemProvider::from_resource(host)),
        };
        Some(provider)
    }

    fn value_set(&self, url: &str, _version: Option<&str>) -> Option<ValueSet> {
        self.value_sets_by_url.get(url).cloned()
    }

    fn value_set_by_id(&self, id: &str) -> Option<ValueSet> {
        self.value_sets_by_id.get(id).cloned()
    }

    fn concept_map(&self, url: &str, _version: Option<&str>) -> Option<ConceptMap> {
        self.concept_maps.iter().find(|cm| cm.url.as_deref() == Some(url)).cloned()
    }

    fn concept_maps_referencing(&self, source: &str, target: Option<&str>) -> Vec<ConceptMap> {
        self.concept_maps
            .iter()
            .filter(|cm| cm.group.iter().any(|g| g.source == source && target.is_none_or(|t| g.target == t)))
            .cloned()
            .collect()
    }
}
