//! ValueSet expansion and membership testing (spec §4.E).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::context::OperationContext;
use crate::designation::{with_primary_display, DesignationStore, DisplayEqualityMode};
use crate::error::{NotFoundKind, Result, TxError};
use crate::lang::LanguagePreferenceList;
use crate::model::{ConceptSet, ConceptSetFilter, Expansion, ExpansionContains, ValueSet};
use crate::provider::{CodeSystemProvider, LocatedConcept};

/// Resolves the providers and imported value sets an expansion needs.
/// Implemented by the HTTP-facing layer, which knows about the package
/// store, the resource cache, and version-pinning rules; the engine itself
/// only ever calls through this trait.
pub trait ProviderResolver: Send + Sync {
    fn resolve_provider(&self, system: &str, version: Option<&str>) -> Result<Arc<dyn CodeSystemProvider>>;
    fn resolve_value_set(&self, url: &str, version: Option<&str>) -> Result<ValueSet>;
}

#[derive(Debug, Clone, Default)]
pub struct ExpansionParameters {
    pub count: Option<usize>,
    pub offset: usize,
    pub active_only: bool,
    pub include_designations: bool,
    pub display_language: Option<String>,
    pub filter_text: Option<String>,
}

impl ExpansionParameters {
    /// Builds the baseline parameter set from a compose's embedded
    /// `default_parameters` (spec §4.E "Embedded parameters"). Recognised
    /// keys mirror the operation's own parameter names (`count`, `offset`,
    /// `activeOnly`, `includeDesignations`, `displayLanguage`, `filter`);
    /// anything else, or a value that fails to parse, is ignored rather
    /// than rejected — this is a lenient compose-authoring convenience, not
    /// a wire contract.
    pub fn from_compose_defaults(defaults: &[(String, String)]) -> Self {
        let mut params = Self::default();
        for (key, value) in defaults {
            match key.as_str() {
                "count" => params.count = value.parse().ok(),
                "offset" => {
                    if let Ok(v) = value.parse() {
                        params.offset = v;
                    }
                }
                "activeOnly" => {
                    if let Ok(v) = value.parse() {
                        params.active_only = v;
                    }
                }
                "includeDesignations" => {
                    if let Ok(v) = value.parse() {
                        params.include_designations = v;
                    }
                }
                "displayLanguage" => params.display_language = Some(value.clone()),
                "filter" => params.filter_text = Some(value.clone()),
                _ => {}
            }
        }
        params
    }

    /// Layers explicit operation-level values onto `self` (the embedded
    /// defaults). Spec §4.E: defaults are "merged into the effective
    /// parameter set *before* operation-level overrides, never after" — so
    /// every `Some`/explicit override here wins, and everything left `None`
    /// keeps the embedded default untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn overlay(
        mut self,
        count: Option<usize>,
        offset: Option<usize>,
        active_only: Option<bool>,
        include_designations: Option<bool>,
        display_language: Option<String>,
        filter_text: Option<String>,
    ) -> Self {
        if let Some(count) = count {
            self.count = Some(count);
        }
        if let Some(offset) = offset {
            self.offset = offset;
        }
        if let Some(active_only) = active_only {
            self.active_only = active_only;
        }
        if let Some(include_designations) = include_designations {
            self.include_designations = include_designations;
        }
        if let Some(display_language) = display_language {
            self.display_language = Some(display_language);
        }
        if let Some(filter_text) = filter_text {
            self.filter_text = Some(filter_text);
        }
        self
    }
}

/// The result of testing one coding against a compose (spec §4.E
/// "Membership test").
#[derive(Debug, Clone)]
pub struct MembershipResult {
    pub in_value_set: bool,
    pub display_check: Option<crate::designation::DisplayCheck>,
}

type ResultMap = IndexMap<(String, String), ExpansionContains>;

pub struct Expander<'a> {
    resolver: &'a dyn ProviderResolver,
}

impl<'a> Expander<'a> {
    pub fn new(resolver: &'a dyn ProviderResolver) -> Self {
        Self { resolver }
    }

    /// Compiles `vs.compose` into a deterministic, de-duplicated expansion.
    #[tracing::instrument(skip(self, vs, ctx), fields(url = vs.url.as_deref().unwrap_or("<inline>")))]
    pub fn expand(
        &self,
        vs: &ValueSet,
        params: &ExpansionParameters,
        ctx: &mut OperationContext,
    ) -> Result<Expansion> {
        tracing::debug!(count = ?params.count, offset = params.offset, "expanding value set");
        let compose = vs
            .compose
            .as_ref()
            .ok_or_else(|| TxError::structural("ValueSet has no compose to expand"))?;

        let mut included: ResultMap = IndexMap::new();
        for include in &compose.include {
            ctx.check("compose.include")?;
            self.apply_rule(include, &mut included, ctx)?;
        }

        let mut excluded: std::collections::HashSet<(String, String)> = std::collections::HashSet::new();
        for exclude in &compose.exclude {
            ctx.check("compose.exclude")?;
            let mut exclude_map = ResultMap::new();
            self.apply_rule(exclude, &mut exclude_map, ctx)?;
            excluded.extend(exclude_map.into_keys());
        }
        included.retain(|key, _| !excluded.contains(key));

        if params.active_only {
            included.retain(|_, c| !c.inactive);
        }
        if let Some(text) = &params.filter_text {
            let needle = text.to_ascii_lowercase();
            included.retain(|_, c| {
                c.display
                    .as_deref()
                    .map(|d| d.to_ascii_lowercase().contains(&needle))
                    .unwrap_or(false)
            });
        }
        if !params.include_designations {
            for c in included.values_mut() {
                c.designation.clear();
            }
        }

        let total = included.len();
        let contains: Vec<ExpansionContains> = included
            .into_values()
            .skip(params.offset)
            .take(params.count.unwrap_or(usize::MAX))
            .collect();

        let identifier = self.expansion_identifier(compose, params);
        Ok(Expansion {
            identifier: Some(identifier),
            timestamp: Some(crate::fhir::now_timestamp()),
            total: Some(total),
            offset: Some(params.offset),
            contains,
        })
    }

    /// Walks the compose rules and short-circuits on the first accepting
    /// include, instead of materialising a full expansion.
    #[tracing::instrument(skip(self, vs, prefs, ctx), fields(url = vs.url.as_deref().unwrap_or("<inline>")))]
    pub fn test_membership(
        &self,
        vs: &ValueSet,
        system: &str,
        version: Option<&str>,
        code: &str,
        display: Option<&str>,
        prefs: &LanguagePreferenceList,
        ctx: &mut OperationContext,
    ) -> Result<MembershipResult> {
        let compose = vs
            .compose
            .as_ref()
            .ok_or_else(|| TxError::structural("ValueSet has no compose to test against"))?;

        for exclude in &compose.exclude {
            ctx.check("compose.exclude")?;
            if self.rule_accepts(exclude, system, version, code, ctx)? {
                return Ok(MembershipResult {
                    in_value_set: false,
                    display_check: None,
                });
            }
        }

        for include in &compose.include {
            ctx.check("compose.include")?;
            if self.rule_accepts(include, system, version, code, ctx)? {
                let display_check = match display {
                    Some(requested) => {
                        let provider = self.resolver.resolve_provider(system, version)?;
                        let located = provider.locate(code)?;
                        located.map(|concept| {
                            let designations = with_primary_display(&concept.designations, concept.display.as_deref());
                            let store = DesignationStore::new(&designations);
                            store.has_display_for_languages(requested, DisplayEqualityMode::Exact, prefs)
                        })
                    }
                    None => None,
                };
                return Ok(MembershipResult {
                    in_value_set: true,
                    display_check,
                });
            }
        }

        Ok(MembershipResult {
            in_value_set: false,
            display_check: None,
        })
    }

    fn rule_accepts(
        &self,
        rule: &ConceptSet,
        system: &str,
        version: Option<&str>,
        code: &str,
        ctx: &mut OperationContext,
    ) -> Result<bool> {
        if let Some(ref rule_system) = rule.system {
            if rule_system != system {
                return Ok(false);
            }
        }
        if let Some(ref rule_version) = rule.version {
            if version.is_some() && version != Some(rule_version.as_str()) {
                return Ok(false);
            }
        }

        if !rule.concept.is_empty() {
            return Ok(rule.concept.iter().any(|c| c.code == code));
        }

        for imported in &rule.value_set {
            ctx.check("compose.include.valueSet")?;
            let (url, v) = crate::version::split_canonical(imported);
            let inner = self.resolver.resolve_value_set(&url, v)?;
            let result = self.test_membership(
                &inner,
                system,
                version,
                code,
                None,
                &LanguagePreferenceList::new(),
                ctx,
            )?;
            if result.in_value_set {
                return Ok(true);
            }
        }

        let Some(ref rule_system) = rule.system else {
            return Ok(false);
        };
        let provider = self.resolver.resolve_provider(rule_system, rule.version.as_deref())?;
        if rule.filter.is_empty() {
            return Ok(provider.locate(code)?.is_some());
        }
        let codes = self.compile_filters(provider.as_ref(), &rule.filter, ctx)?;
        Ok(codes.contains(code))
    }

    fn apply_rule(&self, rule: &ConceptSet, acc: &mut ResultMap, ctx: &mut OperationContext) -> Result<()> {
        if !rule.value_set.is_empty() {
            for imported in &rule.value_set {
                ctx.check("compose.include.valueSet")?;
                let (url, v) = crate::version::split_canonical(imported);
                let inner = self.resolver.resolve_value_set(&url, v)?;
                if let Some(inner_compose) = inner.compose.clone() {
                    for inner_rule in &inner_compose.include {
                        self.apply_rule(inner_rule, acc, ctx)?;
                    }
                }
            }
            return Ok(());
        }

        let Some(ref system) = rule.system else {
            return Err(TxError::structural("compose rule has neither system nor valueSet"));
        };
        let provider = self.resolver.resolve_provider(system, rule.version.as_deref())?;
        ctx.record_used("system-version", format!("{system}|{}", provider.version().unwrap_or("")));

        if !rule.concept.is_empty() {
            for concept_ref in &rule.concept {
                ctx.check("compose.include.concept")?;
                match provider.locate(&concept_ref.code)? {
                    Some(located) => self.insert(acc, system, provider.version(), located, ctx)?,
                    None if provider.content_mode() == crate::model::ContentMode::Fragment => {
                        ctx.record_warning(
                            "compose.include.concept",
                            format!("code '{}' not present in fragment of {system}", concept_ref.code),
                        );
                        let mut located = LocatedConcept::new(concept_ref.code.clone());
                        located.display = concept_ref.display.clone();
                        self.insert(acc, system, provider.version(), located, ctx)?;
                    }
                    None => {
                        return Err(TxError::structural(format!(
                            "code '{}' not found in {system}",
                            concept_ref.code
                        )));
                    }
                }
            }
            return Ok(());
        }

        if !rule.filter.is_empty() {
            let allowed = self.compile_filters(provider.as_ref(), &rule.filter, ctx)?;
            for located in provider.iter_codes(None) {
                if allowed.contains(&located.code) {
                    ctx.check("compose.include.filter")?;
                    self.insert(acc, system, provider.version(), located, ctx)?;
                }
            }
            return Ok(());
        }

        for located in provider.iter_codes(None) {
            ctx.check("compose.include.full")?;
            self.insert(acc, system, provider.version(), located, ctx)?;
        }
        Ok(())
    }

    fn compile_filters(
        &self,
        provider: &dyn CodeSystemProvider,
        filters: &[ConceptSetFilter],
        ctx: &mut OperationContext,
    ) -> Result<std::collections::HashSet<String>> {
        let mut result: Option<std::collections::HashSet<String>> = None;
        for filter in filters {
            ctx.check("compose.filter")?;
            let codes: std::collections::HashSet<String> =
                provider.iter_codes(Some(filter)).map(|c| c.code).collect();
            result = Some(match result {
                None => codes,
                Some(prev) => prev.intersection(&codes).cloned().collect(),
            });
        }
        Ok(result.unwrap_or_default())
    }

    fn insert(
        &self,
        acc: &mut ResultMap,
        system: &str,
        version: Option<&str>,
        located: LocatedConcept,
        ctx: &mut OperationContext,
    ) -> Result<()> {
        let key = (system.to_string(), located.code.clone());
        if acc.contains_key(&key) {
            return Ok(());
        }
        ctx.record_result("expansion")?;
        acc.insert(
            key,
            ExpansionContains {
                system: system.to_string(),
                version: version.map(str::to_string),
                code: located.code,
                display: located.display,
                designation: located.designations,
                contains: Vec::new(),
                inactive: located.inactive,
            },
        );
        Ok(())
    }

    fn expansion_identifier(&self, compose: &crate::model::ValueSetCompose, params: &ExpansionParameters) -> String {
        let mut sources: Vec<String> = compose
            .include
            .iter()
            .chain(compose.exclude.iter())
            .filter_map(|rule| rule.system.as_ref().map(|s| format!("{s}|{}", rule.version.as_deref().unwrap_or(""))))
            .collect();
        sources.sort();

        let mut hasher = DefaultHasher::new();
        sources.hash(&mut hasher);
        params.count.hash(&mut hasher);
        params.offset.hash(&mut hasher);
        params.active_only.hash(&mut hasher);
        params.include_designations.hash(&mut hasher);
        params.display_language.hash(&mut hasher);
        params.filter_text.hash(&mut hasher);
        format!("urn:uuid:{:016x}", hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CodeSystem, Concept, ConceptReference, ValueSetCompose};
    use crate::provider::InMemoryCodeSystemProvider;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[test]
    fn compose_defaults_fill_in_unset_fields_only() {
        let defaults = ExpansionParameters::from_compose_defaults(&[
            ("count".to_string(), "5".to_string()),
            ("activeOnly".to_string(), "true".to_string()),
        ]);
        assert_eq!(defaults.count, Some(5));
        assert!(defaults.active_only);

        // No explicit override for `count`/`active_only` — the embedded
        // defaults survive; `offset` *is* overridden.
        let effective = defaults.overlay(None, Some(3), None, None, None, None);
        assert_eq!(effective.count, Some(5));
        assert!(effective.active_only);
        assert_eq!(effective.offset, 3);
    }

    #[test]
    fn explicit_override_wins_over_compose_default() {
        let defaults = ExpansionParameters::from_compose_defaults(&[("count".to_string(), "5".to_string())]);
        let effective = defaults.overlay(Some(10), None, None, None, None, None);
        assert_eq!(effective.count, Some(10));
    }

    struct FakeResolver {
        providers: HashMap<String, Arc<dyn CodeSystemProvider>>,
        value_sets: Mutex<HashMap<String, ValueSet>>,
    }

    impl ProviderResolver for FakeResolver {
        fn resolve_provider(&self, system: &str, _version: Option<&str>) -> Result<Arc<dyn CodeSystemProvider>> {
            self.providers
                .get(system)
                .cloned()
                .ok_or_else(|| TxError::not_found(NotFoundKind::System, system.to_string()))
        }

        fn resolve_value_set(&self, url: &str, _version: Option<&str>) -> Result<ValueSet> {
            self.value_sets
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| TxError::not_found(NotFoundKind::ValueSet, url.to_string()))
        }
    }

    fn animal_cs() -> CodeSystem {
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

    fn resolver_with_animals() -> FakeResolver {
        let cs = animal_cs();
        let provider: Arc<dyn CodeSystemProvider> = Arc::new(InMemoryCodeSystemProvider::from_resource(&cs));
        let mut providers = HashMap::new();
        providers.insert(cs.url.clone(), provider);
        FakeResolver {
            providers,
            value_sets: Mutex::new(HashMap::new()),
        }
    }

    fn default_ctx() -> OperationContext {
        OperationContext::new(std::time::Duration::from_secs(5), 1000)
    }

    #[test]
    fn expand_full_system_returns_all_codes() {
        let resolver = resolver_with_animals();
        let expander = Expander::new(&resolver);
        let vs = ValueSet {
            compose: Some(ValueSetCompose {
                include: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut ctx = default_ctx();
        let expansion = expander.expand(&vs, &ExpansionParameters::default(), &mut ctx).unwrap();
        assert_eq!(expansion.total, Some(2));
        let codes: Vec<&str> = expansion.contains.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["dog", "cat"]);
    }

    #[test]
    fn expand_full_system_order_is_stable_across_runs() {
        // Spec §8: "expand(vs) is deterministic ... the same codes in the
        // same order" — not just the same set. A `HashMap`-backed provider
        // would shuffle this per process run; rebuild the provider fresh
        // each iteration to catch that regression rather than reusing one
        // warmed-up instance.
        let vs = ValueSet {
            compose: Some(ValueSetCompose {
                include: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut orders = std::collections::HashSet::new();
        for _ in 0..20 {
            let resolver = resolver_with_animals();
            let expander = Expander::new(&resolver);
            let mut ctx = default_ctx();
            let expansion = expander.expand(&vs, &ExpansionParameters::default(), &mut ctx).unwrap();
            let codes: Vec<String> = expansion.contains.iter().map(|c| c.code.clone()).collect();
            orders.insert(codes);
        }
        assert_eq!(orders.len(), 1, "expansion order must be stable across provider rebuilds");
    }

    #[test]
    fn expand_respects_concept_list_and_dedups() {
        let resolver = resolver_with_animals();
        let expander = Expander::new(&resolver);
        let vs = ValueSet {
            compose: Some(ValueSetCompose {
                include: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    concept: vec![
                        ConceptReference {
                            code: "dog".to_string(),
                            display: None,
                        },
                        ConceptReference {
                            code: "dog".to_string(),
                            display: None,
                        },
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut ctx = default_ctx();
        let expansion = expander.expand(&vs, &ExpansionParameters::default(), &mut ctx).unwrap();
        assert_eq!(expansion.total, Some(1));
    }

    #[test]
    fn expand_applies_exclude_after_union() {
        let resolver = resolver_with_animals();
        let expander = Expander::new(&resolver);
        let vs = ValueSet {
            compose: Some(ValueSetCompose {
                include: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    ..Default::default()
                }],
                exclude: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    concept: vec![ConceptReference {
                        code: "cat".to_string(),
                        display: None,
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut ctx = default_ctx();
        let expansion = expander.expand(&vs, &ExpansionParameters::default(), &mut ctx).unwrap();
        assert_eq!(expansion.total, Some(1));
        assert_eq!(expansion.contains[0].code, "dog");
    }

    #[test]
    fn expand_pagination_respects_offset_and_count() {
        let resolver = resolver_with_animals();
        let expander = Expander::new(&resolver);
        let vs = ValueSet {
            compose: Some(ValueSetCompose {
                include: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut ctx = default_ctx();
        let params = ExpansionParameters {
            count: Some(1),
            offset: 1,
            ..Default::default()
        };
        let expansion = expander.expand(&vs, &params, &mut ctx).unwrap();
        assert_eq!(expansion.total, Some(2));
        assert_eq!(expansion.contains.len(), 1);
    }

    #[test]
    fn identical_inputs_produce_identical_expansion_identifier() {
        let resolver = resolver_with_animals();
        let expander = Expander::new(&resolver);
        let vs = ValueSet {
            compose: Some(ValueSetCompose {
                include: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut ctx1 = default_ctx();
        let mut ctx2 = default_ctx();
        let a = expander.expand(&vs, &ExpansionParameters::default(), &mut ctx1).unwrap();
        let b = expander.expand(&vs, &ExpansionParameters::default(), &mut ctx2).unwrap();
        assert_eq!(a.identifier, b.identifier);
    }

    #[test]
    fn membership_test_short_circuits_on_first_accepting_include() {
        let resolver = resolver_with_animals();
        let expander = Expander::new(&resolver);
        let vs = ValueSet {
            compose: Some(ValueSetCompose {
                include: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    concept: vec![ConceptReference {
                        code: "dog".to_string(),
                        display: None,
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut ctx = default_ctx();
        let result = expander
            .test_membership(
                &vs,
                "http://example.org/animals",
                None,
                "dog",
                None,
                &LanguagePreferenceList::new(),
                &mut ctx,
            )
            .unwrap();
        assert!(result.in_value_set);
    }

    #[test]
    fn membership_test_rejects_excluded_code() {
        let resolver = resolver_with_animals();
        let expander = Expander::new(&resolver);
        let vs = ValueSet {
            compose: Some(ValueSetCompose {
                include: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    ..Default::default()
                }],
                exclude: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    concept: vec![ConceptReference {
                        code: "cat".to_string(),
                        display: None,
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut ctx = default_ctx();
        let result = expander
            .test_membership(
                &vs,
                "http://example.org/animals",
                None,
                "cat",
                None,
                &LanguagePreferenceList::new(),
                &mut ctx,
            )
            .unwrap();
        assert!(!result.in_value_set);
    }

    #[test]
    fn membership_test_validates_primary_display_with_no_designations() {
        // "dog" has a `display` but no `designation`s at all — the display
        // check must still see it rather than reporting an empty store.
        let resolver = resolver_with_animals();
        let expander = Expander::new(&resolver);
        let vs = ValueSet {
            compose: Some(ValueSetCompose {
                include: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut ctx = default_ctx();
        let result = expander
            .test_membership(
                &vs,
                "http://example.org/animals",
                None,
                "dog",
                Some("Dog"),
                &LanguagePreferenceList::new(),
                &mut ctx,
            )
            .unwrap();
        assert!(result.in_value_set);
        let check = result.display_check.unwrap();
        assert!(check.found);
    }

    #[test]
    fn fragment_missing_concept_becomes_a_warning_not_an_error() {
        let mut fragment_cs = animal_cs();
        fragment_cs.content = crate::model::ContentMode::Fragment;
        let provider: Arc<dyn CodeSystemProvider> = Arc::new(InMemoryCodeSystemProvider::from_resource(&fragment_cs));
        let mut providers = HashMap::new();
        providers.insert(fragment_cs.url.clone(), provider);
        let resolver = FakeResolver {
            providers,
            value_sets: Mutex::new(HashMap::new()),
        };
        let expander = Expander::new(&resolver);
        let vs = ValueSet {
            compose: Some(ValueSetCompose {
                include: vec![ConceptSet {
                    system: Some("http://example.org/animals".to_string()),
                    concept: vec![ConceptReference {
                        code: "bird".to_string(),
                        display: Some("Bird".to_string()),
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut ctx = default_ctx();
        let expansion = expander.expand(&vs, &ExpansionParameters::default(), &mut ctx).unwrap();
        assert_eq!(expansion.total, Some(1));
        assert_eq!(ctx.warnings().len(), 1);
    }
}
