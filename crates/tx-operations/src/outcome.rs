//! `TxError` -> `OperationOutcome` shaping (spec §6 "OperationOutcome", §7
//! "Propagation policy"). The worker is the only layer that performs this
//! conversion — every inner component deals exclusively in `TxError`.

use serde_json::{json, Value};
use tx_core::{IssueCode, NotFoundKind, TxError, TxWarning};

/// FHIR issue severity for one `OperationOutcome.issue` entry.
fn severity_and_code(err: &TxError) -> (&'static str, &'static str) {
    match err {
        TxError::Structural(_) => ("error", "invalid"),
        TxError::NotFound { .. } => ("error", "not-found"),
        TxError::Semantic { issue, .. } => match issue {
            IssueCode::TooCostly => ("error", "too-costly"),
            IssueCode::VersionError => ("error", "invalid"),
            IssueCode::NotSupported => ("error", "not-supported"),
            _ => ("error", "processing"),
        },
        TxError::TooCostly(_) => ("error", "too-costly"),
        TxError::Internal(_) => ("fatal", "exception"),
        TxError::Json(_) | TxError::Regex(_) | TxError::Url(_) => ("error", "invalid"),
    }
}

/// The HTTP status a worker's caller should respond with, per spec §6
/// "Exit codes".
pub fn http_status(err: &TxError) -> u16 {
    match err {
        TxError::Structural(_) => 400,
        TxError::NotFound { .. } => 404,
        // `$expand` rejects `context` as a malformed request (spec §4.I,
        // §8 scenario 4), not a processing failure, so it keeps the 400
        // of the other "bad parameter" cases rather than the 422 used for
        // version-pin conflicts and unsupported filter operators.
        TxError::Semantic { issue: IssueCode::NotSupported, .. } => 400,
        TxError::Semantic { .. } | TxError::TooCostly(_) => 422,
        TxError::Internal(_) => 500,
        TxError::Json(_) | TxError::Regex(_) | TxError::Url(_) => 400,
    }
}

/// Distinguishes the three not-found sub-cases of spec §4.G(4) in the
/// diagnostics text, and carries `details.coding` per spec §6 when the
/// error has a stable issue code.
fn diagnostics_for_not_found(kind: &NotFoundKind, message: &str) -> String {
    match kind {
        NotFoundKind::System => format!("system unknown: {message}"),
        NotFoundKind::SystemVersion { available } if available.is_empty() => {
            format!("system known but version unknown: {message}")
        }
        NotFoundKind::SystemVersion { available } => {
            format!(
                "system known but version unknown: {message} (available: {})",
                available.join(", ")
            )
        }
        NotFoundKind::VersionPinUnsatisfied => format!("no version satisfies the requested pin: {message}"),
        NotFoundKind::Code => format!("code not found: {message}"),
        NotFoundKind::ValueSet => format!("value set not found: {message}"),
        NotFoundKind::ConceptMap => format!("concept map not found: {message}"),
    }
}

/// Builds a FHIR `OperationOutcome` for one error, with `details.coding`
/// populated from the error's stable issue code when it has one.
pub fn operation_outcome(err: &TxError) -> Value {
    let (severity, code) = severity_and_code(err);
    let diagnostics = match err {
        TxError::NotFound { kind, message } => diagnostics_for_not_found(kind, message),
        other => other.to_string(),
    };

    let mut issue = json!({
        "severity": severity,
        "code": code,
        "diagnostics": diagnostics,
    });

    if let Some(issue_code) = err.issue_code() {
        issue["details"] = json!({
            "coding": [{
                "system": "http://hl7.org/fhir/tools/CodeSystem/tx-issue-type",
                "code": issue_code.as_str(),
            }]
        });
    }

    json!({
        "resourceType": "OperationOutcome",
        "issue": [issue],
    })
}

/// Appends a warning-level `issue` for every collected [`TxWarning`] to an
/// otherwise-successful `OperationOutcome`-shaped issue list, per spec §7
/// "Partial success".
pub fn warning_issues(warnings: &[TxWarning]) -> Vec<Value> {
    warnings
        .iter()
        .map(|w| {
            json!({
                "severity": "warning",
                "code": "informational",
                "diagnostics": format!("{}: {}", w.place, w.message),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_system_version_lists_available_versions() {
        let err = TxError::not_found(
            NotFoundKind::SystemVersion {
                available: vec!["2.73".to_string(), "2.74".to_string()],
            },
            "http://loinc.org",
        );
        let outcome = operation_outcome(&err);
        let diag = outcome["issue"][0]["diagnostics"].as_str().unwrap();
        assert!(diag.contains("2.73"));
        assert!(diag.contains("2.74"));
    }

    #[test]
    fn too_costly_maps_to_422_and_carries_issue_code() {
        let err = TxError::too_costly(vec!["compose.include".to_string()]);
        assert_eq!(http_status(&err), 422);
        let outcome = operation_outcome(&err);
        assert_eq!(outcome["issue"][0]["details"]["coding"][0]["code"], "TOO_COSTLY");
    }

    #[test]
    fn internal_error_is_fatal_and_500() {
        let err = TxError::internal("cycle detected");
        assert_eq!(http_status(&err), 500);
        assert_eq!(operation_outcome(&err)["issue"][0]["severity"], "fatal");
    }

    #[test]
    fn not_supported_semantic_error_is_400() {
        let err = TxError::semantic(IssueCode::NotSupported, "'context' is not supported by $expand");
        assert_eq!(http_status(&err), 400);
        assert_eq!(operation_outcome(&err)["issue"][0]["code"], "not-supported");
    }

    #[test]
    fn structural_error_is_400_invalid() {
        let err = TxError::structural("missing 'code' parameter");
        assert_eq!(http_status(&err), 400);
        assert_eq!(operation_outcome(&err)["issue"][0]["code"], "invalid");
    }

    #[test]
    fn warning_issues_render_one_entry_per_warning() {
        let warnings = vec![TxWarning {
            place: "compose.include.concept".to_string(),
            message: "code 'x' not present in fragment".to_string(),
        }];
        let issues = warning_issues(&warnings);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0]["severity"], "warning");
    }
}
