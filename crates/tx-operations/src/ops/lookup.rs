//! `CodeSystem/$lookup` (spec §4.I, §8 scenario 1-2).
//!
//! Grounded on the teacher's `LookupOperation` (parameter shape, `Designation`/
//! `ConceptProperty` wire parts), rewired onto the typed [`CodeSystemProvider`]
//! interface instead of raw `serde_json::Value` trees.

use serde_json::{json, Value};
use tx_core::model::PropertyValue;
use tx_core::{DesignationStore, LanguagePreferenceList, NotFoundKind, Result, TxError};

use crate::context::WorkerContext;
use crate::params::RawParams;
use crate::registry::ResourceResolver;

const KNOWN_PARAMS: &[&str] = &[
    "code", "system", "version", "coding", "date", "property", "displayLanguage",
];

#[derive(Debug, Default)]
pub struct LookupParams {
    pub code: Option<String>,
    pub system: Option<String>,
    pub system_id: Option<String>,
    pub version: Option<String>,
    pub properties: Vec<String>,
    pub display_language: Option<String>,
    pub unknown_parameters: Vec<String>,
}

impl LookupParams {
    pub fn extract(raw: &RawParams) -> Result<Self> {
        let mut params = Self {
            code: raw.get_str("code"),
            system: raw.get_str("system"),
            version: raw.get_str("version"),
            properties: raw.get_all_str("property"),
            display_language: raw.get_str("displayLanguage"),
            unknown_parameters: raw.unknown_names(KNOWN_PARAMS),
        };

        if let Some(coding) = raw.get_resource("coding") {
            if params.code.is_none() {
                params.code = coding.get("code").and_then(Value::as_str).map(String::from);
            }
            if params.system.is_none() {
                params.system = coding.get("system").and_then(Value::as_str).map(String::from);
            }
        }

        if params.code.is_none() {
            return Err(TxError::structural("$lookup requires a 'code' parameter or 'coding.code'"));
        }
        Ok(params)
    }

    /// Binds this lookup to a specific `CodeSystem` instance (spec §6
    /// `CodeSystem/{id}/$lookup`) instead of resolving `system`/`version`.
    pub fn with_instance_id(mut self, id: String) -> Self {
        self.system_id = Some(id);
        self
    }
}

/// Performs one `$lookup` and renders the FHIR `Parameters` response.
#[tracing::instrument(skip(resolver, ctx, params), fields(system = params.system.as_deref(), code = params.code.as_deref()))]
pub fn lookup(resolver: &ResourceResolver, ctx: &mut WorkerContext, params: &LookupParams) -> Result<Value> {
    let code = params.code.as_deref().expect("validated by extract");

    for unknown in &params.unknown_parameters {
        ctx.operation.record_warning("parameter", format!("unrecognised parameter '{unknown}'"));
    }

    let provider = if let Some(id) = &params.system_id {
        resolver.resolve_code_system_by_id(id)?
    } else if let Some(system) = &params.system {
        resolver.resolve_code_system(system, params.version.as_deref())?
    } else {
        return Err(TxError::structural("$lookup requires a 'system' parameter or 'coding.system'"));
    };
    let system = provider.system().to_string();
    let located = provider
        .locate(code)?
        .ok_or_else(|| TxError::not_found(NotFoundKind::Code, format!("code '{code}' not found in {system}")))?;

    let prefs = match &params.display_language {
        Some(lang) => LanguagePreferenceList::from_single(lang.clone()),
        None => ctx.languages.clone(),
    };
    let store = DesignationStore::new(&located.designations);
    let resolved_display = store
        .preferred(&prefs)
        .map(|d| d.value)
        .or_else(|| located.display.clone());

    let mut parameter = vec![
        json!({ "name": "name", "valueString": system }),
    ];
    if let Some(version) = provider.version() {
        parameter.push(json!({ "name": "version", "valueString": version }));
    }
    if let Some(display) = &resolved_display {
        parameter.push(json!({ "name": "display", "valueString": display }));
    }

    let want_all = params.properties.iter().any(|p| p == "*") || params.properties.is_empty();
    // `inactive` is always present (spec §4.I default property set).
    parameter.push(property_part("inactive", &PropertyValue::Boolean(located.inactive)));
    if want_all {
        for (name, value) in provider.all_properties(code) {
            if name == "inactive" {
                continue;
            }
            parameter.push(property_part(&name, &value));
        }
    } else {
        for name in &params.properties {
            if name == "inactive" {
                continue;
            }
            if let Some(value) = provider.get_property(code, name) {
                parameter.push(property_part(name, &value));
            }
        }
    }

    for designation in &located.designations {
        let mut parts = vec![json!({ "name": "value", "valueString": designation.value })];
        if let Some(language) = &designation.language {
            parts.push(json!({ "name": "language", "valueCode": language }));
        }
        if let Some(use_code) = &designation.use_code {
            parts.push(json!({ "name": "use", "valueCoding": coding_json(use_code) }));
        }
        parameter.push(json!({ "name": "designation", "part": parts }));
    }

    ctx.operation
        .record_used("system-version", format!("{system}|{}", provider.version().unwrap_or("")));

    Ok(json!({ "resourceType": "Parameters", "parameter": parameter }))
}

fn coding_json(coding: &tx_core::model::Coding) -> Value {
    let mut out = json!({});
    if let Some(system) = &coding.system {
        out["system"] = json!(system);
    }
    if let Some(code) = &coding.code {
        out["code"] = json!(code);
    }
    if let Some(display) = &coding.display {
        out["display"] = json!(display);
    }
    out
}

fn property_part(code: &str, value: &PropertyValue) -> Value {
    let mut parts = vec![json!({ "name": "code", "valueCode": code })];
    let value_json = match value {
        PropertyValue::Code(v) => json!({ "name": "value", "valueCode": v }),
        PropertyValue::Coding(c) => json!({ "name": "value", "valueCoding": coding_json(c) }),
        PropertyValue::String(v) => json!({ "name": "value", "valueString": v }),
        PropertyValue::Integer(v) => json!({ "name": "value", "valueInteger": v }),
        PropertyValue::Boolean(v) => json!({ "name": "value", "valueBoolean": v }),
        PropertyValue::DateTime(v) => json!({ "name": "value", "valueDateTime": v }),
        PropertyValue::Decimal(v) => json!({ "name": "value", "valueDecimal": v }),
    };
    parts.push(value_json);
    json!({ "name": "property", "part": parts })
}
