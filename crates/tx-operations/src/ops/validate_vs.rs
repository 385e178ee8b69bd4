//! `ValueSet/$validate-code` (spec §4.E "Membership test", §4.I).

use serde_json::{json, Value};
use tx_core::model::ValueSet;
use tx_core::{DisplayDifference, Expander, Result, TxError};

use crate::context::WorkerContext;
use crate::params::RawParams;
use crate::registry::ResourceResolver;

#[derive(Debug, Default)]
pub struct ValidateVsParams {
    pub url: Option<String>,
    pub value_set_id: Option<String>,
    pub system: Option<String>,
    pub version: Option<String>,
    pub code: Option<String>,
    pub display: Option<String>,
}

impl ValidateVsParams {
    pub fn extract(raw: &RawParams) -> Result<Self> {
        let mut params = Self {
            url: raw.get_str("url").or_else(|| raw.get_str("valueSet")),
            value_set_id: None,
            system: raw.get_str("system"),
            version: raw.get_str("system-version"),
            code: raw.get_str("code"),
            display: raw.get_str("display"),
        };

        if let Some(coding) = raw.get_resource("coding") {
            if params.code.is_none() {
                params.code = coding.get("code").and_then(Value::as_str).map(String::from);
            }
            if params.system.is_none() {
                params.system = coding.get("system").and_then(Value::as_str).map(String::from);
            }
        }

        if params.code.is_none() || params.system.is_none() {
            return Err(TxError::structural(
                "ValueSet $validate-code requires 'system' and 'code' (or a 'coding')",
            ));
        }
        if params.url.is_none() && params.value_set_id.is_none() {
            return Err(TxError::structural(
                "ValueSet $validate-code requires a 'url' (or instance id)",
            ));
        }
        Ok(params)
    }

    pub fn with_instance_id(mut self, id: String) -> Self {
        self.value_set_id = Some(id);
        self
    }
}

fn difference_name(diff: DisplayDifference) -> &'static str {
    match diff {
        DisplayDifference::None => "none",
        DisplayDifference::Case => "case",
        DisplayDifference::Normalized => "normalized",
    }
}

#[tracing::instrument(skip(resolver, ctx, params), fields(url = params.url.as_deref(), id = params.value_set_id.as_deref()))]
pub fn validate_vs(resolver: &ResourceResolver, ctx: &mut WorkerContext, params: &ValidateVsParams) -> Result<Value> {
    let vs: ValueSet = if let Some(id) = &params.value_set_id {
        resolver.resolve_value_set_by_id(id)?
    } else {
        let url = params.url.as_deref().expect("validated by extract");
        let (bare_url, version) = tx_core::version::split_canonical(url);
        resolver.resolve_value_set(bare_url, version)?
    };

    let system = params.system.as_deref().expect("validated by extract");
    let code = params.code.as_deref().expect("validated by extract");

    let expander = Expander::new(resolver);
    let result = expander.test_membership(
        &vs,
        system,
        params.version.as_deref(),
        code,
        params.display.as_deref(),
        &ctx.languages,
        &mut ctx.operation,
    )?;

    if !result.in_value_set {
        return Ok(json!({
            "resourceType": "Parameters",
            "parameter": [
                { "name": "result", "valueBoolean": false },
                { "name": "message", "valueString": format!("'{system}#{code}' is not in the value set") },
            ],
        }));
    }

    let mut parameter = vec![json!({ "name": "result", "valueBoolean": true })];
    if let Some(check) = result.display_check {
        if !check.found {
            parameter[0] = json!({ "name": "result", "valueBoolean": false });
            parameter.push(json!({
                "name": "message",
                "valueString": format!("display does not match for '{system}#{code}'"),
            }));
            parameter.push(json!({ "name": "difference", "valueCode": difference_name(check.difference) }));
        }
    }

    Ok(json!({ "resourceType": "Parameters", "parameter": parameter }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::PinRules;
    use crate::registry::EmptyCatalog;
    use std::time::Duration;
    use tx_core::model::{CodeSystem, Concept, ConceptSet, ValueSetCompose};
    use tx_core::{CachedResource, LanguagePreferenceList, OperationContext};

    fn animals() -> CodeSystem {
        CodeSystem {
            url: "http://example.org/animals".to_string(),
            concept: vec![Concept {
                code: "dog".to_string(),
                display: Some("Dog".to_string()),
                ..Default::default()
            }],
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

    fn ctx() -> WorkerContext {
        WorkerContext {
            operation: OperationContext::new(Duration::from_secs(5), 1000),
            languages: LanguagePreferenceList::new(),
        }
    }

    fn resolver(resources: Vec<CachedResource>) -> (EmptyCatalog, Vec<CachedResource>) {
        (EmptyCatalog, resources)
    }

    #[test]
    fn code_in_value_set_passes() {
        let (catalog, resources) = resolver(vec![
            CachedResource::CodeSystem(animals()),
            CachedResource::ValueSet(animal_vs()),
        ]);
        let resolver = ResourceResolver::new(resources, &catalog, PinRules::default());
        let params = ValidateVsParams {
            url: Some("http://example.org/vs/animals".to_string()),
            system: Some("http://example.org/animals".to_string()),
            code: Some("dog".to_string()),
            ..Default::default()
        };
        let mut wc = ctx();
        let result = validate_vs(&resolver, &mut wc, &params).unwrap();
        assert_eq!(result["parameter"][0]["valueBoolean"], true);
    }

    #[test]
    fn code_not_in_value_set_fails() {
        let (catalog, resources) = resolver(vec![
            CachedResource::CodeSystem(animals()),
            CachedResource::ValueSet(animal_vs()),
        ]);
        let resolver = ResourceResolver::new(resources, &catalog, PinRules::default());
        let params = ValidateVsParams {
            url: Some("http://example.org/vs/animals".to_string()),
            system: Some("http://example.org/animals".to_string()),
            code: Some("cat".to_string()),
            ..Default::default()
        };
        let mut wc = ctx();
        let result = validate_vs(&resolver, &mut wc, &params).unwrap();
        assert_eq!(result["parameter"][0]["valueBoolean"], false);
    }
}
