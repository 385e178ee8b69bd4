//! `ValueSet/$expand` (spec §4.I, §8 scenarios 3-4).

use serde_json::{json, Value};
use tx_core::model::ValueSet;
use tx_core::{Expander, ExpansionParameters, Result, TxError};

use crate::context::WorkerContext;
use crate::params::RawParams;
use crate::registry::ResourceResolver;

#[derive(Debug, Default)]
pub struct ExpandParams {
    pub url: Option<String>,
    pub value_set_id: Option<String>,
    pub filter: Option<String>,
    pub count: Option<usize>,
    /// `None` when the request didn't specify `offset` at all, so a
    /// compose's embedded default (spec §4.E) isn't clobbered by an
    /// implicit zero (see [`ExpansionParameters::overlay`]).
    pub offset: Option<usize>,
    pub active_only: Option<bool>,
    pub include_designations: Option<bool>,
    pub display_language: Option<String>,
}

impl ExpandParams {
    /// `context` is explicitly rejected as `not-supported` (spec §4.I).
    pub fn extract(raw: &RawParams) -> Result<Self> {
        if raw.get("context").is_some() {
            return Err(TxError::semantic(
                tx_core::IssueCode::NotSupported,
                "'context' is not supported by $expand",
            ));
        }

        let params = Self {
            url: raw.get_str("url").or_else(|| raw.get_str("valueSet")),
            value_set_id: None,
            filter: raw.get_str("filter"),
            count: raw.get_usize("count"),
            offset: raw.get_usize("offset"),
            active_only: raw.get_bool("activeOnly"),
            include_designations: raw.get_bool("includeDesignations"),
            display_language: raw.get_str("displayLanguage"),
        };

        Ok(params)
    }

    pub fn with_instance_id(mut self, id: String) -> Self {
        self.value_set_id = Some(id);
        self
    }
}

/// Resolves the `ValueSet` named by `params`, compiles its compose, and
/// returns a `ValueSet` resource with `expansion.contains` populated.
#[tracing::instrument(skip(resolver, ctx, params), fields(url = params.url.as_deref(), id = params.value_set_id.as_deref()))]
pub fn expand(resolver: &ResourceResolver, ctx: &mut WorkerContext, params: &ExpandParams) -> Result<Value> {
    let vs: ValueSet = if let Some(id) = &params.value_set_id {
        resolver.resolve_value_set_by_id(id)?
    } else if let Some(url) = &params.url {
        let (bare_url, version) = tx_core::version::split_canonical(url);
        resolver.resolve_value_set(bare_url, version)?
    } else {
        return Err(TxError::structural("$expand requires a 'url' (or instance id)"));
    };

    // Embedded compose defaults are the baseline; explicit operation
    // parameters overlay on top, never the other way around (spec §4.E).
    let defaults = vs
        .compose
        .as_ref()
        .map(|compose| ExpansionParameters::from_compose_defaults(&compose.default_parameters))
        .unwrap_or_default();
    let expansion_params = defaults.overlay(
        params.count,
        params.offset,
        params.active_only,
        params.include_designations,
        params.display_language.clone(),
        params.filter.clone(),
    );

    let expander = Expander::new(resolver);
    let expansion = expander.expand(&vs, &expansion_params, &mut ctx.operation)?;

    let mut result = json!({
        "resourceType": "ValueSet",
        "url": vs.url,
        "version": vs.version,
        "expansion": expansion,
    });

    if !ctx.operation.warnings().is_empty() {
        result["_warnings"] = json!(ctx
            .operation
            .warnings()
            .iter()
            .map(|w| format!("{}: {}", w.place, w.message))
            .collect::<Vec<_>>());
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::PinRules;
    use crate::registry::EmptyCatalog;
    use tx_core::model::{CodeSystem, Concept, ConceptSet, ValueSetCompose};
    use tx_core::CachedResource;

    fn animals() -> CodeSystem {
        CodeSystem {
            url: "http://example.org/animals".to_string(),
            concept: vec![
                Concept {
                    code: "dog".to_string(),
                    display: Some("Dog".to_string()),
                    ..Default::default()
                },
                Concept {
                    code: "cat".to_string(),
                    display: Some("Cat".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    fn animal_vs() -> ValueSet {
        ValueSet {
            url: Some("http://example.org/vs/animals".to_string()),
            compose: Some(ValueSetCompose {
                include: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn context_parameter_is_rejected() {
        let raw = RawParams::Query(vec![
            ("url".to_string(), "http://example.org/vs/animals".to_string()),
            ("context".to_string(), "x".to_string()),
        ]);
        let err = ExpandParams::extract(&raw).unwrap_err();
        assert_eq!(err.issue_code(), Some(tx_core::IssueCode::NotSupported));
    }

    #[test]
    fn expand_by_url_populates_contains_and_total() {
        let catalog = EmptyCatalog;
        let resolver = ResourceResolver::new(
            vec![
                CachedResource::CodeSystem(animals()),
                CachedResource::ValueSet(animal_vs()),
            ],
            &catalog,
            PinRules::default(),
        );
        let raw = RawParams::Query(vec![("url".to_string(), "http://example.org/vs/animals".to_string())]);
        let params = ExpandParams::extract(&raw).unwrap();
        let mut wc = WorkerContext {
            operation: tx_core::OperationContext::new(std::time::Duration::from_secs(5), 1000),
            languages: tx_core::LanguagePreferenceList::new(),
        };
        let result = expand(&resolver, &mut wc, &params).unwrap();
        assert_eq!(result["expansion"]["total"], 2);
        assert_eq!(result["expansion"]["contains"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn missing_url_and_instance_id_is_structural() {
        let raw = RawParams::Query(vec![]);
        let params = ExpandParams::extract(&raw).unwrap();
        let catalog = EmptyCatalog;
        let resolver = ResourceResolver::new(vec![], &catalog, PinRules::default());
        let mut wc = WorkerContext {
            operation: tx_core::OperationContext::new(std::time::Duration::from_secs(5), 1000),
            languages: tx_core::LanguagePreferenceList::new(),
        };
        let err = expand(&resolver, &mut wc, &params).unwrap_err();
        assert!(matches!(err, TxError::Structural(_)));
    }

    /// Minimal stand-in for a host's package catalog, indexing one
    /// `ValueSet` by id — `resolve_value_set_by_id` only ever consults the
    /// catalog, never the request's inline/cached resources.
    struct ByIdCatalog {
        value_set: ValueSet,
    }

    impl crate::registry::ResourceCatalog for ByIdCatalog {
        fn code_system(&self, _url: &str, _version: Option<&str>) -> Option<std::sync::Arc<dyn tx_core::CodeSystemProvider>> {
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
        fn value_set_by_id(&self, id: &str) -> Option<ValueSet> {
            (self.value_set.id.as_deref() == Some(id)).then(|| self.value_set.clone())
        }
        fn concept_map(&self, _url: &str, _version: Option<&str>) -> Option<tx_core::model::ConceptMap> {
            None
        }
        fn concept_maps_referencing(&self, _source: &str, _target: Option<&str>) -> Vec<tx_core::model::ConceptMap> {
            Vec::new()
        }
    }

    #[test]
    fn instance_id_alone_resolves_without_a_url_parameter() {
        let mut vs_with_id = animal_vs();
        vs_with_id.id = Some("animals-vs".to_string());
        let catalog = ByIdCatalog { value_set: vs_with_id };
        let resolver = ResourceResolver::new(vec![CachedResource::CodeSystem(animals())], &catalog, PinRules::default());

        // No `url`/`valueSet` query parameter at all — only the instance id,
        // applied after `extract` the way the `{id}` route handler does.
        let raw = RawParams::Query(vec![]);
        let params = ExpandParams::extract(&raw).unwrap().with_instance_id("animals-vs".to_string());
        let mut wc = WorkerContext {
            operation: tx_core::OperationContext::new(std::time::Duration::from_secs(5), 1000),
            languages: tx_core::LanguagePreferenceList::new(),
        };
        let result = expand(&resolver, &mut wc, &params).unwrap();
        assert_eq!(result["expansion"]["total"], 2);
    }

    #[test]
    fn count_zero_returns_empty_contains_with_total_set() {
        let catalog = EmptyCatalog;
        let resolver = ResourceResolver::new(
            vec![
                CachedResource::CodeSystem(animals()),
                CachedResource::ValueSet(animal_vs()),
            ],
            &catalog,
            PinRules::default(),
        );
        let params = ExpandParams {
            url: Some("http://example.org/vs/animals".to_string()),
            count: Some(0),
            ..Default::default()
        };
        let mut wc = WorkerContext {
            operation: tx_core::OperationContext::new(std::time::Duration::from_secs(5), 1000),
            languages: tx_core::LanguagePreferenceList::new(),
        };
        let result = expand(&resolver, &mut wc, &params).unwrap();
        assert_eq!(result["expansion"]["total"], 2);
        assert!(result["expansion"]["contains"].as_array().unwrap().is_empty());
    }

    fn animal_vs_with_default_count_one() -> ValueSet {
        let mut vs = animal_vs();
        vs.compose.as_mut().unwrap().default_parameters = vec![("count".to_string(), "1".to_string())];
        vs
    }

    #[test]
    fn embedded_default_count_applies_when_request_omits_count() {
        let catalog = EmptyCatalog;
        let resolver = ResourceResolver::new(
            vec![
                CachedResource::CodeSystem(animals()),
                CachedResource::ValueSet(animal_vs_with_default_count_one()),
            ],
            &catalog,
            PinRules::default(),
        );
        let raw = RawParams::Query(vec![("url".to_string(), "http://example.org/vs/animals".to_string())]);
        let params = ExpandParams::extract(&raw).unwrap();
        let mut wc = WorkerContext {
            operation: tx_core::OperationContext::new(std::time::Duration::from_secs(5), 1000),
            languages: tx_core::LanguagePreferenceList::new(),
        };
        let result = expand(&resolver, &mut wc, &params).unwrap();
        assert_eq!(result["expansion"]["total"], 2);
        assert_eq!(result["expansion"]["contains"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn explicit_count_overrides_embedded_default() {
        let catalog = EmptyCatalog;
        let resolver = ResourceResolver::new(
            vec![
                CachedResource::CodeSystem(animals()),
                CachedResource::ValueSet(animal_vs_with_default_count_one()),
            ],
            &catalog,
            PinRules::default(),
        );
        let raw = RawParams::Query(vec![
            ("url".to_string(), "http://example.org/vs/animals".to_string()),
            ("count".to_string(), "2".to_string()),
        ]);
        let params = ExpandParams::extract(&raw).unwrap();
        let mut wc = WorkerContext {
            operation: tx_core::OperationContext::new(std::time::Duration::from_secs(5), 1000),
            languages: tx_core::LanguagePreferenceList::new(),
        };
        let result = expand(&resolver, &mut wc, &params).unwrap();
        assert_eq!(result["expansion"]["contains"].as_array().unwrap().len(), 2);
    }
}
