//! Code-system provider abstraction (spec §4.D).
//!
//! Every concrete code system the engine knows about — whether backed by an
//! in-memory `CodeSystem` resource, a supplement overlay, UCUM's algebraic
//! grammar, the BCP-47 registry, or a fragment that only knows a handful of
//! codes — is reached through this one trait. Operations never match on the
//! concrete kind; they only ever hold `Arc<dyn CodeSystemProvider>`.

mod fragment;
mod in_memory;
mod lang_provider;
mod supplement;
mod ucum;

pub use fragment::FragmentCodeSystemProvider;
pub use in_memory::InMemoryCodeSystemProvider;
pub use lang_provider::LanguageCodeSystemProvider;
pub use supplement::SupplementedCodeSystemProvider;
pub use ucum::UcumCodeSystemProvider;

use crate::error::Result;
use crate::model::{ConceptSetFilter, ContentMode, Designation, PropertyValue};

/// The outcome of comparing two codes within one provider's hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsumption {
    Equivalent,
    Subsumes,
    SubsumedBy,
    NotSubsumed,
}

/// A concept as seen through a provider, independent of how it's stored.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedConcept {
    pub code: String,
    pub display: Option<String>,
    pub designations: Vec<Designation>,
    pub inactive: bool,
}

impl LocatedConcept {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display: None,
            designations: Vec::new(),
            inactive: false,
        }
    }
}

/// A code system as seen by the rest of the engine: lookup, display
/// resolution, subsumption, and unfiltered/filtered enumeration.
///
/// Implementors are expected to be cheap to clone behind an `Arc` and safe to
/// share across concurrent operations; nothing here is `&mut self`.
pub trait CodeSystemProvider: Send + Sync {
    fn system(&self) -> &str;
    fn version(&self) -> Option<&str>;
    fn content_mode(&self) -> ContentMode;

    /// True when this provider layers a `CodeSystem` supplement with the
    /// given canonical URL over its base content.
    fn has_supplement(&self, _url: &str) -> bool {
        false
    }

    /// Resolves one code to its concept, or `None` if the system doesn't
    /// know it. A `Fragment` provider returning `None` here means "not among
    /// the codes this fragment happens to carry", not "does not exist" —
    /// callers are expected to downgrade that to a warning rather than a
    /// hard failure (spec §4.D).
    fn locate(&self, code: &str) -> Result<Option<LocatedConcept>>;

    /// Tests whether `a` subsumes `b` within this system's hierarchy.
    fn subsumes(&self, a: &str, b: &str) -> Result<Subsumption>;

    /// Iterates the system's concepts, optionally restricted by a single
    /// compose filter. Returns an owned, restartable iterator so expansion
    /// can page or abandon it without holding a borrow across an await.
    fn iter_codes(&self, filter: Option<&ConceptSetFilter>) -> Box<dyn Iterator<Item = LocatedConcept> + '_>;

    fn get_property(&self, code: &str, property: &str) -> Option<PropertyValue>;

    /// All property name/value pairs declared on `code`, for `$lookup`'s
    /// `property=*` (spec §4.I "`*` means all"). Default is empty for
    /// providers with no per-concept property storage.
    fn all_properties(&self, _code: &str) -> Vec<(String, PropertyValue)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn located_concept_defaults_to_active_with_no_designations() {
        let c = LocatedConcept::new("m");
        assert!(!c.inactive);
        assert!(c.designations.is_empty());
    }
}
