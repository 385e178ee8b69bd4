
use crate::error::Result;
use crate::model::{CodeSystem, ConceptSetFilter, ContentMode, PropertyValue};

use super::{CodeSystemProvider, InMemoryCodeSystemProvider, LocatedConcept, Subsumption};

/// A `CodeSystem` with `content = fragment`: it only carries a subset of the
/// system's codes. A miss here doesn't mean the code doesn't exist in the
/// real system — callers are expected to check [`content_mode`] and
/// downgrade an unmatched lookup to a warning rather than a 404 (spec §4.D).
///
/// [`content_mode`]: CodeSystemProvider::content_mode
pub struct FragmentCodeSystemProvider {
    inner: InMemoryCodeSystemProvider,
}

impl FragmentCodeSystemProvider {
    pub fn from_resource(cs: &CodeSystem) -> Self {
        Self {
            inner: InMemoryCodeSystemProvider::from_resource(cs),
        }
    }
}

impl CodeSystemProvider for FragmentCodeSystemProvider {
    fn system(&self) -> &str {
        self.inner.system()
    }

    fn version(&self) -> Option<&str> {
        self.inner.version()
    }

    fn content_mode(&self) -> ContentMode {
        ContentMode::Fragment
    }

    fn locate(&self, code: &str) -> Result<Option<LocatedConcept>> {
        self.inner.locate(code)
    }

    fn subsumes(&self, a: &str, b: &str) -> Result<Subsumption> {
        self.inner.subsumes(a, b)
    }

    fn iter_codes(&self, filter: Option<&ConceptSetFilter>) -> Box<dyn Iterator<Item = LocatedConcept> + '_> {
        self.inner.iter_codes(filter)
    }

    fn get_property(&self, code: &str, property: &str) -> Option<PropertyValue> {
        self.inner.get_property(code, property)
    }

    fn all_properties(&self, code: &str) -> Vec<(String, PropertyValue)> {
        self.inner.all_properties(code)
    }
}
