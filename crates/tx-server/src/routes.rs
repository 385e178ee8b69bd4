//! Thin axum handlers wiring HTTP onto the six terminology workers (spec
//! §6). Each handler: assembles [`RawParams`] from the query string or JSON
//! body, builds a [`ResourceResolver`]/[`WorkerContext`] for this request,
//! calls the matching `tx_operations::ops` function, and renders the result
//! — mirroring the teacher's `operations::router` "thin handler delegates to
//! an operation struct" layering without its multi-operation dispatch table,
//! since this binary only ever serves the six terminology operations.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use tx_core::CachedResource;
use tx_operations::{
    expand, lookup, subsumes, translate, validate_code, validate_vs, ExpandParams, LookupParams, RawParams,
    ResourceResolver, SubsumesParams, TranslateParams, ValidateCodeParams, ValidateVsParams, WorkerContext,
};

use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/{version}/CodeSystem/$lookup", get(lookup_get).post(lookup_post))
        .route("/{version}/CodeSystem/{id}/$lookup", get(lookup_instance_get).post(lookup_instance_post))
        .route("/{version}/CodeSystem/$validate-code", get(validate_code_get).post(validate_code_post))
        .route("/{version}/CodeSystem/$subsumes", get(subsumes_get).post(subsumes_post))
        .route("/{version}/ValueSet/$expand", get(expand_get).post(expand_post))
        .route("/{version}/ValueSet/{id}/$expand", get(expand_instance_get).post(expand_instance_post))
        .route("/{version}/ValueSet/$validate-code", get(validate_vs_get).post(validate_vs_post))
        .route("/{version}/ConceptMap/$translate", get(translate_get).post(translate_post))
        .with_state(state)
}

/// Parses the repeating `tx-resource` parameter into typed wrappers. Each
/// entry is a full `CodeSystem`/`ValueSet`/`ConceptMap` resource, identified
/// by its own `resourceType` field.
fn parse_tx_resources(raw: &RawParams) -> Vec<CachedResource> {
    raw.get_all("tx-resource")
        .into_iter()
        .filter_map(|value| {
            let resource_type = value.get("resourceType").and_then(Value::as_str)?;
            match resource_type {
                "CodeSystem" => serde_json::from_value(value).ok().map(CachedResource::CodeSystem),
                "ValueSet" => serde_json::from_value(value).ok().map(CachedResource::ValueSet),
                "ConceptMap" => serde_json::from_value(value).ok().map(CachedResource::ConceptMap),
                _ => None,
            }
        })
        .collect()
}

fn worker_context(state: &AppState, raw: &RawParams, cancellation: CancellationToken) -> WorkerContext {
    let accept_language = raw.get_str("displayLanguage");
    WorkerContext::new(&state.worker_config, accept_language.as_deref(), None, Some(cancellation))
}

/// Builds the working resource set for one request (spec §4.H): inline
/// `tx-resource`s are merged into the named cache, if any, and the working
/// set becomes that cache-id's full contents; without a `cache-id` the
/// working set is just the inline resources.
fn cached_for(state: &AppState, raw: &RawParams) -> Result<Vec<CachedResource>, tx_core::TxError> {
    let inline = parse_tx_resources(raw);
    match raw.get_str("cache-id") {
        Some(id) => {
            if !inline.is_empty() {
                state.cache.add(&id, inline)?;
            }
            Ok(state.cache.get(&id))
        }
        None => Ok(inline),
    }
}

fn query_to_raw(query: HashMap<String, String>) -> RawParams {
    RawParams::Query(query.into_iter().collect())
}

macro_rules! handler_pair {
    ($get_name:ident, $post_name:ident, $body:expr) => {
        async fn $get_name(
            State(state): State<AppState>,
            Query(query): Query<HashMap<String, String>>,
        ) -> impl IntoResponse {
            let raw = query_to_raw(query);
            run(state, raw, $body).await
        }

        async fn $post_name(State(state): State<AppState>, Json(body): Json<Value>) -> impl IntoResponse {
            let raw = RawParams::Body(body);
            run(state, raw, $body).await
        }
    };
}

type OpFn = for<'a> fn(&ResourceResolver<'a>, &mut WorkerContext, &RawParams) -> Result<Value, tx_core::TxError>;

async fn run(state: AppState, raw: RawParams, op: OpFn) -> axum::response::Response {
    let resources = match cached_for(&state, &raw) {
        Ok(resources) => resources,
        Err(err) => return AppError(err).into_response(),
    };
    let pins = match tx_operations::PinRules::from_params(&raw) {
        Ok(pins) => pins,
        Err(err) => return AppError(err).into_response(),
    };
    let resolver = ResourceResolver::new(resources, state.catalog.as_ref(), pins);
    let mut ctx = worker_context(&state, &raw, CancellationToken::new());
    match op(&resolver, &mut ctx, &raw) {
        Ok(mut body) => {
            let warnings = tx_operations::warning_issues(ctx.operation.warnings());
            if !warnings.is_empty() {
                if let Some(arr) = body.get_mut("issue").and_then(Value::as_array_mut) {
                    arr.extend(warnings);
                } else if body.get("resourceType").and_then(Value::as_str) == Some("Parameters") {
                    // Terminology `Parameters` responses don't carry `issue`;
                    // warnings ride along as extra `warning` parameters.
                    if let Some(params) = body.get_mut("parameter").and_then(Value::as_array_mut) {
                        for warning in warnings {
                            params.push(serde_json::json!({ "name": "warning", "valueString": warning["diagnostics"] }));
                        }
                    }
                }
            }
            (axum::http::StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => AppError(err).into_response(),
    }
}

fn run_lookup(resolver: &ResourceResolver, ctx: &mut WorkerContext, raw: &RawParams) -> Result<Value, tx_core::TxError> {
    let params = LookupParams::extract(raw)?;
    lookup(resolver, ctx, &params)
}

fn run_validate_code(
    resolver: &ResourceResolver,
    ctx: &mut WorkerContext,
    raw: &RawParams,
) -> Result<Value, tx_core::TxError> {
    let params = ValidateCodeParams::extract(raw)?;
    validate_code(resolver, ctx, &params)
}

fn run_subsumes(resolver: &ResourceResolver, ctx: &mut WorkerContext, raw: &RawParams) -> Result<Value, tx_core::TxError> {
    let params = SubsumesParams::extract(raw)?;
    subsumes(resolver, ctx, &params)
}

fn run_expand(resolver: &ResourceResolver, ctx: &mut WorkerContext, raw: &RawParams) -> Result<Value, tx_core::TxError> {
    let params = ExpandParams::extract(raw)?;
    expand(resolver, ctx, &params)
}

fn run_validate_vs(
    resolver: &ResourceResolver,
    ctx: &mut WorkerContext,
    raw: &RawParams,
) -> Result<Value, tx_core::TxError> {
    let params = ValidateVsParams::extract(raw)?;
    validate_vs(resolver, ctx, &params)
}

fn run_translate(resolver: &ResourceResolver, ctx: &mut WorkerContext, raw: &RawParams) -> Result<Value, tx_core::TxError> {
    let params = TranslateParams::extract(raw)?;
    translate(resolver, ctx, &params)
}

handler_pair!(lookup_get, lookup_post, run_lookup);
handler_pair!(validate_code_get, validate_code_post, run_validate_code);
handler_pair!(subsumes_get, subsumes_post, run_subsumes);
handler_pair!(expand_get, expand_post, run_expand);
handler_pair!(validate_vs_get, validate_vs_post, run_validate_vs);
handler_pair!(translate_get, translate_post, run_translate);

async fn expand_instance_get(
    State(state): State<AppState>,
    Path((_version, id)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let raw = query_to_raw(query);
    run_with_instance_id(state, raw, id).await
}

async fn expand_instance_post(
    State(state): State<AppState>,
    Path((_version, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let raw = RawParams::Body(body);
    run_with_instance_id(state, raw, id).await
}

async fn lookup_instance_get(
    State(state): State<AppState>,
    Path((_version, id)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let raw = query_to_raw(query);
    run_lookup_with_instance_id(state, raw, id).await
}

async fn lookup_instance_post(
    State(state): State<AppState>,
    Path((_version, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let raw = RawParams::Body(body);
    run_lookup_with_instance_id(state, raw, id).await
}

async fn run_lookup_with_instance_id(state: AppState, raw: RawParams, id: String) -> axum::response::Response {
    let resources = match cached_for(&state, &raw) {
        Ok(resources) => resources,
        Err(err) => return AppError(err).into_response(),
    };
    let pins = match tx_operations::PinRules::from_params(&raw) {
        Ok(pins) => pins,
        Err(err) => return AppError(err).into_response(),
    };
    let resolver = ResourceResolver::new(resources, state.catalog.as_ref(), pins);
    let mut ctx = worker_context(&state, &raw, CancellationToken::new());
    let result = LookupParams::extract(&raw)
        .map(|params| params.with_instance_id(id))
        .and_then(|params| lookup(&resolver, &mut ctx, &params));
    match result {
        Ok(body) => (axum::http::StatusCode::OK, Json(body)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}

async fn run_with_instance_id(state: AppState, raw: RawParams, id: String) -> axum::response::Response {
    let resources = match cached_for(&state, &raw) {
        Ok(resources) => resources,
        Err(err) => return AppError(err).into_response(),
    };
    let pins = match tx_operations::PinRules::from_params(&raw) {
        Ok(pins) => pins,
        Err(err) => return AppError(err).into_response(),
    };
    let resolver = ResourceResolver::new(resources, state.catalog.as_ref(), pins);
    let mut ctx = worker_context(&state, &raw, CancellationToken::new());
    let result = ExpandParams::extract(&raw)
        .map(|params| params.with_instance_id(id))
        .and_then(|params| expand(&resolver, &mut ctx, &params));
    match result {
        Ok(body) => (axum::http::StatusCode::OK, Json(body)).into_response(),
        Err(err) => AppError(err).into_response(),
    }
}
