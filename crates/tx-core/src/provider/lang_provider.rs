use std::sync::Arc;

use crate::error::Result;
use crate::lang::LanguageRegistry;
use crate::model::{ConceptSetFilter, ContentMode, PropertyValue};

use super::{CodeSystemProvider, LocatedConcept, Subsumption};

/// The BCP-47 language tag space (`urn:ietf:bcp:47`) exposed as a code
/// system: codes are tags, validated and rendered via the registry (spec
/// §4.B, §4.D).
pub struct LanguageCodeSystemProvider {
    registry: Arc<LanguageRegistry>,
}

impl LanguageCodeSystemProvider {
    pub fn new(registry: Arc<LanguageRegistry>) -> Self {
        Self { registry }
    }

    fn subsumption_of_components(a_has_more: bool, b_has_more: bool) -> Subsumption {
        match (a_has_more, b_has_more) {
            (false, true) => Subsumption::Subsumes,
            (true, false) => Subsumption::SubsumedBy,
            _ => Subsumption::NotSubsumed,
        }
    }
}

impl CodeSystemProvider for LanguageCodeSystemProvider {
    fn system(&self) -> &str {
        "urn:ietf:bcp:47"
    }

    fn version(&self) -> Option<&str> {
        None
    }

    fn content_mode(&self) -> ContentMode {
        ContentMode::NotPresent
    }

    fn locate(&self, code: &str) -> Result<Option<LocatedConcept>> {
        match self.registry.parse_memoized(code) {
            Ok(tag) => {
                let mut located = LocatedConcept::new(tag.to_code());
                located.display = Some(self.registry.present(&tag, 0, None));
                Ok(Some(located))
            }
            Err(_) => Ok(None),
        }
    }

    fn subsumes(&self, a: &str, b: &str) -> Result<Subsumption> {
        let (Ok(ta), Ok(tb)) = (self.registry.parse_memoized(a), self.registry.parse_memoized(b)) else {
            return Ok(Subsumption::NotSubsumed);
        };
        if ta == tb {
            return Ok(Subsumption::Equivalent);
        }
        if ta.language != tb.language {
            return Ok(Subsumption::NotSubsumed);
        }
        let a_more = ta.script.is_some() || ta.region.is_some() || ta.variant.is_some();
        let b_more = tb.script.is_some() || tb.region.is_some() || tb.variant.is_some();
        if !a_more && b_more {
            // `a` names only the language; `b` narrows it further, and every
            // component `a` specifies (none beyond language) agrees.
            return Ok(Self::subsumption_of_components(a_more, b_more));
        }
        if a_more && !b_more {
            return Ok(Self::subsumption_of_components(a_more, b_more));
        }
        Ok(Subsumption::NotSubsumed)
    }

    fn iter_codes(&self, _filter: Option<&ConceptSetFilter>) -> Box<dyn Iterator<Item = LocatedConcept> + '_> {
        // The tag space is unbounded; this system is locate-only.
        Box::new(std::iter::empty())
    }

    fn get_property(&self, _code: &str, _property: &str) -> Option<PropertyValue> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
%%
Type: language
Subtag: en
Description: English
%%
Type: region
Subtag: US
Description: United States
";

    #[test]
    fn locate_resolves_a_valid_tag() {
        let registry = Arc::new(LanguageRegistry::parse(SAMPLE).unwrap());
        let provider = LanguageCodeSystemProvider::new(registry);
        let located = provider.locate("en-US").unwrap().unwrap();
        assert_eq!(located.display.as_deref(), Some("English (Region=United States)"));
    }

    #[test]
    fn locate_rejects_unknown_subtag() {
        let registry = Arc::new(LanguageRegistry::parse(SAMPLE).unwrap());
        let provider = LanguageCodeSystemProvider::new(registry);
        assert!(provider.locate("xx-ZZ").unwrap().is_none());
    }

    #[test]
    fn bare_language_subsumes_its_region_variant() {
        let registry = Arc::new(LanguageRegistry::parse(SAMPLE).unwrap());
        let provider = LanguageCodeSystemProvider::new(registry);
        let result = provider.subsumes("en", "en-US").unwrap();
        assert_eq!(result, Subsumption::Subsumes);
    }
}
