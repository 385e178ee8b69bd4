//! `CodeSystem/$subsumes` (spec §4.D "Subsumption", §4.I).

use serde_json::{json, Value};
use tx_core::{Result, Subsumption, TxError};

use crate::context::WorkerContext;
use crate::params::RawParams;
use crate::registry::ResourceResolver;

#[derive(Debug, Default)]
pub struct SubsumesParams {
    pub code_a: Option<String>,
    pub code_b: Option<String>,
    pub system: Option<String>,
    pub version: Option<String>,
}

impl SubsumesParams {
    pub fn extract(raw: &RawParams) -> Result<Self> {
        let mut params = Self {
            code_a: raw.get_str("codeA"),
            code_b: raw.get_str("codeB"),
            system: raw.get_str("system"),
            version: raw.get_str("version"),
        };

        if let Some(coding) = raw.get_resource("codingA") {
            if params.code_a.is_none() {
                params.code_a = coding.get("code").and_then(Value::as_str).map(String::from);
            }
            if params.system.is_none() {
                params.system = coding.get("system").and_then(Value::as_str).map(String::from);
            }
        }
        if let Some(coding) = raw.get_resource("codingB") {
            if params.code_b.is_none() {
                params.code_b = coding.get("code").and_then(Value::as_str).map(String::from);
            }
        }

        if params.code_a.is_none() || params.code_b.is_none() || params.system.is_none() {
            return Err(TxError::structural(
                "$subsumes requires 'system', 'codeA' and 'codeB' (or codingA/codingB)",
            ));
        }
        Ok(params)
    }
}

fn outcome_code(s: Subsumption) -> &'static str {
    match s {
        Subsumption::Equivalent => "equivalent",
        Subsumption::Subsumes => "subsumes",
        Subsumption::SubsumedBy => "subsumed-by",
        Subsumption::NotSubsumed => "not-subsumed",
    }
}

#[tracing::instrument(skip(resolver, ctx, params), fields(system = params.system.as_deref()))]
pub fn subsumes(resolver: &ResourceResolver, ctx: &mut WorkerContext, params: &SubsumesParams) -> Result<Value> {
    let system = params.system.as_deref().expect("validated by extract");
    let code_a = params.code_a.as_deref().expect("validated by extract");
    let code_b = params.code_b.as_deref().expect("validated by extract");

    let provider = resolver.resolve_code_system(system, params.version.as_deref())?;
    let outcome = provider.subsumes(code_a, code_b)?;

    ctx.operation
        .record_used("system-version", format!("{system}|{}", provider.version().unwrap_or("")));

    Ok(json!({
        "resourceType": "Parameters",
        "parameter": [{ "name": "outcome", "valueCode": outcome_code(outcome) }],
    }))
}
