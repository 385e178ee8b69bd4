//! `ConceptMap/$translate` (spec §4.F, §4.I).

use serde_json::{json, Value};
use tx_core::model::{ConceptMap, Relationship};
use tx_core::{conceptmap, Result, TxError, Translator};

use crate::context::WorkerContext;
use crate::params::RawParams;
use crate::registry::ResourceResolver;

#[derive(Debug, Default)]
pub struct TranslateParams {
    pub code: Option<String>,
    pub system: Option<String>,
    pub version: Option<String>,
    pub source: Option<String>,
    pub target: Option<String>,
    pub concept_map_url: Option<String>,
    pub target_system: Option<String>,
    pub reverse: bool,
}

impl TranslateParams {
    pub fn extract(raw: &RawParams) -> Result<Self> {
        let mut params = Self {
            code: raw.get_str("code"),
            system: raw.get_str("system"),
            version: raw.get_str("version"),
            source: raw.get_str("source"),
            target: raw.get_str("target"),
            concept_map_url: raw.get_str("conceptMap").or_else(|| raw.get_str("url")),
            target_system: raw.get_str("targetSystem"),
            reverse: raw.get_bool("reverse").unwrap_or(false),
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
                "$translate requires 'system' and 'code' (or a 'coding')",
            ));
        }
        Ok(params)
    }
}

/// Resolves the governing `ConceptMap`(s) and renders every matching
/// `Translation` as a `match` part, reversing source/target when
/// `reverse` is set (spec §4.F).
#[tracing::instrument(skip(resolver, ctx, params), fields(system = params.system.as_deref(), reverse = params.reverse))]
pub fn translate(resolver: &ResourceResolver, ctx: &mut WorkerContext, params: &TranslateParams) -> Result<Value> {
    let system = params.system.as_deref().expect("validated by extract");
    let code = params.code.as_deref().expect("validated by extract");

    let wanted_other_side = params.target_system.as_deref().or(params.target.as_deref());

    let maps = if let Some(url) = &params.concept_map_url {
        let (bare, version) = tx_core::version::split_canonical(url);
        vec![resolver.resolve_concept_map(bare, version)?]
    } else if params.reverse {
        resolver.resolve_concept_maps(wanted_other_side.unwrap_or(system), Some(system))
    } else {
        resolver.resolve_concept_maps(system, wanted_other_side)
    };

    if maps.is_empty() {
        return Ok(failure("no ConceptMap found relating the given source".to_string()));
    }

    let mut matches = Vec::new();
    for map in &maps {
        let results = if params.reverse {
            reverse_translate(map, system, code, wanted_other_side)
        } else {
            let translator = Translator::new(map);
            translator
                .translate(system, params.version.as_deref(), code, wanted_other_side, true, &mut ctx.operation)?
                .into_iter()
                .map(|t| (t.target_system, t.target_code, t.target_display, t.relationship))
                .collect()
        };
        for (target_system, target_code, target_display, relationship) in results {
            ctx.operation.check("conceptmap.match")?;
            matches.push(json!({
                "name": "match",
                "part": [
                    { "name": "equivalence", "valueCode": conceptmap::relationship_to_equivalence(relationship) },
                    { "name": "concept", "valueCoding": {
                        "system": target_system,
                        "code": target_code,
                        "display": target_display,
                    }},
                ],
            }));
        }
    }

    if matches.is_empty() {
        return Ok(failure(format!("no translation found for '{code}' in {system}")));
    }

    let mut parameter = vec![json!({ "name": "result", "valueBoolean": true })];
    parameter.extend(matches);
    Ok(json!({ "resourceType": "Parameters", "parameter": parameter }))
}

/// Scans `map` for groups whose `target` is `system` and whose elements'
/// target list contains `code`, yielding the governing source element as the
/// "translation" — the only way to invert a directional `ConceptMap` without
/// a second map authored the other way round (spec §4.F "reverse").
fn reverse_translate(
    map: &ConceptMap,
    system: &str,
    code: &str,
    wanted_source: Option<&str>,
) -> Vec<(String, String, Option<String>, Relationship)> {
    let mut out = Vec::new();
    for group in &map.group {
        if group.target != system {
            continue;
        }
        if let Some(wanted) = wanted_source {
            if group.source != wanted {
                continue;
            }
        }
        for element in &group.element {
            for target in &element.target {
                if target.code == code {
                    out.push((
                        group.source.clone(),
                        element.code.clone(),
                        element.display.clone(),
                        target.relationship,
                    ));
                }
            }
        }
    }
    out
}

fn failure(message: String) -> Value {
    json!({
        "resourceType": "Parameters",
        "parameter": [
            { "name": "result", "valueBoolean": false },
            { "name": "message", "valueString": message },
        ],
    })
}
