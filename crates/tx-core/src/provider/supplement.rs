use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{CodeSystem, Concept, ConceptSetFilter, ContentMode, PropertyValue};

use super::{CodeSystemProvider, LocatedConcept, Subsumption};

/// Overlays a `CodeSystem` supplement onto a base provider by *composition*,
/// not inheritance: the supplement contributes extra designations and
/// property values for codes the base already knows, but never introduces
/// new codes or changes the base's hierarchy (spec §4.D).
pub struct SupplementedCodeSystemProvider {
    base: Arc<dyn CodeSystemProvider>,
    supplement_url: String,
    overlay: HashMap<String, Concept>,
}

impl SupplementedCodeSystemProvider {
    pub fn new(base: Arc<dyn CodeSystemProvider>, supplement: &CodeSystem) -> Self {
        let supplement_url = supplement
            .supplements
            .clone()
            .unwrap_or_else(|| supplement.url.clone());
        let overlay = supplement
            .concept
            .iter()
            .map(|c| (c.code.clone(), c.clone()))
            .collect();
        Self {
            base,
            supplement_url,
            overlay,
        }
    }

    fn overlay_for(&self, code: &str) -> Option<&Concept> {
        self.overlay.get(code)
    }
}

impl CodeSystemProvider for SupplementedCodeSystemProvider {
    fn system(&self) -> &str {
        self.base.system()
    }

    fn version(&self) -> Option<&str> {
        self.base.version()
    }

    fn content_mode(&self) -> ContentMode {
        self.base.content_mode()
    }

    fn has_supplement(&self, url: &str) -> bool {
        self.supplement_url == url || self.base.has_supplement(url)
    }

    fn locate(&self, code: &str) -> Result<Option<LocatedConcept>> {
        let Some(mut located) = self.base.locate(code)? else {
            return Ok(None);
        };
        if let Some(overlay) = self.overlay_for(&located.code) {
            if located.display.is_none() {
                located.display = overlay.display.clone();
            }
            located
                .designations
                .extend(overlay.designation.iter().cloned());
        }
        Ok(Some(located))
    }

    fn subsumes(&self, a: &str, b: &str) -> Result<Subsumption> {
        self.base.subsumes(a, b)
    }

    fn iter_codes(&self, filter: Option<&ConceptSetFilter>) -> Box<dyn Iterator<Item = LocatedConcept> + '_> {
        let overlay = &self.overlay;
        Box::new(self.base.iter_codes(filter).map(move |mut located| {
            if let Some(extra) = overlay.get(&located.code) {
                located.designations.extend(extra.designation.iter().cloned());
            }
            located
        }))
    }

    fn get_property(&self, code: &str, property: &str) -> Option<PropertyValue> {
        self.overlay_for(code)
            .and_then(|c| c.property.iter().find(|p| p.code == property))
            .map(|p| p.value.clone())
            .or_else(|| self.base.get_property(code, property))
    }

    fn all_properties(&self, code: &str) -> Vec<(String, PropertyValue)> {
        let mut combined = self.base.all_properties(code);
        if let Some(overlay) = self.overlay_for(code) {
            for prop in &overlay.property {
                if let Some(existing) = combined.iter_mut().find(|(name, _)| name == &prop.code) {
                    existing.1 = prop.value.clone();
                } else {
                    combined.push((prop.code.clone(), prop.value.clone()));
                }
            }
        }
        combined
    }
}
