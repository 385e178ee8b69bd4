//! `CodeSystem/$validate-code` (spec §4.I).

use serde_json::{json, Value};
use tx_core::{
    with_primary_display, DesignationStore, DisplayDifference, DisplayEqualityMode, LanguagePreferenceList, Result,
    TxError,
};

use crate::context::WorkerContext;
use crate::params::RawParams;
use crate::registry::ResourceResolver;

#[derive(Debug, Default)]
pub struct ValidateCodeParams {
    pub system: Option<String>,
    pub version: Option<String>,
    pub code: Option<String>,
    pub display: Option<String>,
    pub display_language: Option<String>,
}

impl ValidateCodeParams {
    pub fn extract(raw: &RawParams) -> Result<Self> {
        let mut params = Self {
            system: raw.get_str("system"),
            version: raw.get_str("version"),
            code: raw.get_str("code"),
            display: raw.get_str("display"),
            display_language: raw.get_str("displayLanguage"),
        };

        if let Some(coding) = raw.get_resource("coding") {
            if params.code.is_none() {
                params.code = coding.get("code").and_then(Value::as_str).map(String::from);
            }
            if params.system.is_none() {
                params.system = coding.get("system").and_then(Value::as_str).map(String::from);
            }
            if params.display.is_none() {
                params.display = coding.get("display").and_then(Value::as_str).map(String::from);
            }
        }

        if params.code.is_none() || params.system.is_none() {
            return Err(TxError::structural(
                "$validate-code requires 'system' and 'code' (or a 'coding')",
            ));
        }
        Ok(params)
    }
}

fn difference_name(diff: DisplayDifference) -> &'static str {
    match diff {
        DisplayDifference::None => "none",
        DisplayDifference::Case => "case",
        DisplayDifference::Normalized => "normalized",
    }
}

/// Validates `(system, code)` and, when a `display` was supplied, reports
/// the display-equality outcome per spec §4.C.
#[tracing::instrument(skip(resolver, ctx, params), fields(system = params.system.as_deref(), code = params.code.as_deref()))]
pub fn validate_code(resolver: &ResourceResolver, ctx: &mut WorkerContext, params: &ValidateCodeParams) -> Result<Value> {
    let system = params.system.as_deref().expect("validated by extract");
    let code = params.code.as_deref().expect("validated by extract");

    let provider = match resolver.resolve_code_system(system, params.version.as_deref()) {
        Ok(p) => p,
        Err(_) => {
            return Ok(invalid_result(format!("unknown code system '{system}'")));
        }
    };

    let located = match provider.locate(code)? {
        Some(c) => c,
        None => {
            return Ok(invalid_result(format!("code '{code}' not found in {system}")));
        }
    };

    ctx.operation
        .record_used("system-version", format!("{system}|{}", provider.version().unwrap_or("")));

    let mut parameter = vec![json!({ "name": "result", "valueBoolean": true })];
    if let Some(display) = &located.display {
        parameter.push(json!({ "name": "display", "valueString": display }));
    }

    if let Some(requested) = &params.display {
        let prefs = match &params.display_language {
            Some(lang) => LanguagePreferenceList::from_single(lang.clone()),
            None => ctx.languages.clone(),
        };
        let _ = &prefs;
        let designations = with_primary_display(&located.designations, located.display.as_deref());
        let store = DesignationStore::new(&designations);
        let check = store.has_display(requested, DisplayEqualityMode::Exact);
        if !check.found {
            parameter[0] = json!({ "name": "result", "valueBoolean": false });
            parameter.push(json!({
                "name": "message",
                "valueString": format!(
                    "display '{requested}' does not match known designations for '{code}' ({})",
                    if store.designations().is_empty() { "no designations".to_string() } else { store.render_for_error() }
                ),
            }));
            parameter.push(json!({ "name": "difference", "valueCode": difference_name(check.difference) }));
        }
    }

    Ok(json!({ "resourceType": "Parameters", "parameter": parameter }))
}

fn invalid_result(message: String) -> Value {
    json!({
        "resourceType": "Parameters",
        "parameter": [
            { "name": "result", "valueBoolean": false },
            { "name": "message", "valueString": message },
        ],
    })
}
