use thiserror::Error;

/// Stable, machine-readable issue codes surfaced on `OperationOutcome.issue[].details.coding`.
///
/// This is a closed set: every semantic failure the engine can produce maps to
/// exactly one of these. New failure modes extend this enum rather than
/// growing an open string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCode {
    UnknownCodeSystemExp,
    UnknownCodeSystemVersion,
    ValueSetVersionCheck,
    SystemVersionMultipleOverride,
    SystemVersionMultipleDefault,
    TooCostly,
    VersionError,
    FilterUnsupported,
    SupplementMissing,
    NotSupported,
    InvalidParameter,
}

impl IssueCode {
    /// The wire string used in `details.coding.code`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownCodeSystemExp => "UNKNOWN_CODESYSTEM_EXP",
            Self::UnknownCodeSystemVersion => "UNKNOWN_CODESYSTEM_VERSION",
            Self::ValueSetVersionCheck => "VALUESET_VERSION_CHECK",
            Self::SystemVersionMultipleOverride => "SYSTEM_VERSION_MULTIPLE_OVERRIDE",
            Self::SystemVersionMultipleDefault => "SYSTEM_VERSION_MULTIPLE_DEFAULT",
            Self::TooCostly => "TOO_COSTLY",
            Self::VersionError => "VERSION_ERROR",
            Self::FilterUnsupported => "FILTER_UNSUPPORTED",
            Self::SupplementMissing => "SUPPLEMENT_MISSING",
            Self::NotSupported => "NOT_SUPPORTED",
            Self::InvalidParameter => "INVALID_PARAMETER",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Distinguishes the three "not found" sub-cases required by spec.G(4):
/// system unknown, system known but version unknown, system known but no
/// version satisfies a pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundKind {
    System,
    SystemVersion { available: Vec<String> },
    VersionPinUnsatisfied,
    Code,
    ValueSet,
    ConceptMap,
}

/// Structured error type shared by every component in the core.
///
/// Every variant carries a stable `code` (via [`TxError::issue_code`] for the
/// semantic/cost variants) and a human `diagnostics` string. Only the HTTP
/// layer (outside this crate) is responsible for turning this into a status
/// code and an `OperationOutcome` — inner components never assume HTTP.
#[derive(Debug, Error)]
pub enum TxError {
    /// Malformed input: bad BCP-47 tag, ill-formed compose, missing required
    /// parameter. Maps to 400.
    #[error("{0}")]
    Structural(String),

    /// Unknown system/version/code/value set/concept map. Maps to 404.
    #[error("{kind:?}: {message}")]
    NotFound { kind: NotFoundKind, message: String },

    /// Known resources, but the operation cannot complete: version pin
    /// conflict, missing supplement, unsupported filter operator. Maps to 422.
    #[error("[{issue}] {message}")]
    Semantic { issue: IssueCode, message: String },

    /// Deadline or result-size cap exceeded. Maps to 422 `too-costly`.
    #[error("too costly: {0:?}")]
    TooCostly(Vec<String>),

    /// Precondition violated: cycle detected, invariant broken. Maps to 5xx.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl TxError {
    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }

    pub fn not_found(kind: NotFoundKind, message: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            message: message.into(),
        }
    }

    pub fn semantic(issue: IssueCode, message: impl Into<String>) -> Self {
        Self::Semantic {
            issue,
            message: message.into(),
        }
    }

    pub fn too_costly(partial: Vec<String>) -> Self {
        Self::TooCostly(partial)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The stable issue code, when this error carries one.
    pub fn issue_code(&self) -> Option<IssueCode> {
        match self {
            Self::Semantic { issue, .. } => Some(*issue),
            Self::TooCostly(_) => Some(IssueCode::TooCostly),
            Self::NotFound {
                kind: NotFoundKind::System,
                ..
            } => Some(IssueCode::UnknownCodeSystemExp),
            Self::NotFound {
                kind: NotFoundKind::SystemVersion { .. },
                ..
            } => Some(IssueCode::UnknownCodeSystemVersion),
            _ => None,
        }
    }

    /// A coarse category for logging/metrics, mirroring the taxonomy of §7.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Structural(_) => "structural",
            Self::NotFound { .. } => "not-found",
            Self::Semantic { .. } => "semantic",
            Self::TooCostly(_) => "cost",
            Self::Internal(_) => "internal",
            Self::Json(_) | Self::Regex(_) | Self::Url(_) => "structural",
        }
    }
}

pub type Result<T> = std::result::Result<T, TxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_code_strings_are_stable() {
        assert_eq!(IssueCode::TooCostly.as_str(), "TOO_COSTLY");
        assert_eq!(
            IssueCode::SystemVersionMultipleOverride.as_str(),
            "SYSTEM_VERSION_MULTIPLE_OVERRIDE"
        );
    }

    #[test]
    fn not_found_carries_kind() {
        let err = TxError::not_found(NotFoundKind::Code, "code 'xyz' not found");
        match err {
            TxError::NotFound { kind, .. } => assert_eq!(kind, NotFoundKind::Code),
            _ => panic!("expected NotFound"),
        }
    }

    #[test]
    fn semantic_error_exposes_issue_code() {
        let err = TxError::semantic(IssueCode::VersionError, "mismatch");
        assert_eq!(err.issue_code(), Some(IssueCode::VersionError));
        assert_eq!(err.category(), "semantic");
    }

    #[test]
    fn too_costly_exposes_issue_code_and_partial() {
        let err = TxError::too_costly(vec!["place-a".into(), "place-b".into()]);
        assert_eq!(err.issue_code(), Some(IssueCode::TooCostly));
        assert_eq!(err.category(), "cost");
        if let TxError::TooCostly(partial) = &err {
            assert_eq!(partial.len(), 2);
        } else {
            panic!("expected TooCostly");
        }
    }

    #[test]
    fn not_found_category_is_not_found() {
        let err = TxError::not_found(NotFoundKind::ValueSet, "unknown");
        assert_eq!(err.category(), "not-found");
    }
}
