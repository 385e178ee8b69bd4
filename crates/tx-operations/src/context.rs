//! Builds a [`tx_core::OperationContext`] and resolves the effective
//! language preference for one request (spec §4.G.5, §5).

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tx_core::{LanguagePreferenceList, OperationContext};

/// Process-wide defaults a host configures once at startup — the
/// operations crate never reads environment variables or files itself.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub default_timeout: Duration,
    pub max_results: usize,
    pub default_language: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            max_results: 10_000,
            default_language: None,
        }
    }
}

/// Everything a worker needs beyond the typed operation parameters: the
/// core's bookkeeping context plus the language preference to apply when an
/// operation does any designation/display selection.
pub struct WorkerContext {
    pub operation: OperationContext,
    pub languages: LanguagePreferenceList,
}

impl WorkerContext {
    /// Resolves the language preference list in the order spec §4.G.5 gives
    /// it: an explicit `displayLanguage`/`Accept-Language` value first, then
    /// a value-set/resource's own `language`, then the configured default.
    pub fn new(
        config: &WorkerConfig,
        accept_language: Option<&str>,
        resource_language: Option<&str>,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        let languages = match accept_language {
            Some(header) if !header.trim().is_empty() => LanguagePreferenceList::parse(header),
            _ => match resource_language.or(config.default_language.as_deref()) {
                Some(tag) => LanguagePreferenceList::from_single(tag),
                None => LanguagePreferenceList::new(),
            },
        };

        let mut operation = OperationContext::new(config.default_timeout, config.max_results);
        if let Some(token) = cancellation {
            operation = operation.with_cancellation(token);
        }

        Self { operation, languages }
    }

    pub fn as_membership_test(mut self) -> Self {
        self.operation = self.operation.as_membership_test();
        self
    }
}
