//! Operation context: deadline, result cap, and provenance threaded
//! explicitly through every provider/expander call (spec §4.G, §5).
//!
//! Nothing here is ambient or task-local — a caller that forgets to pass a
//! context simply can't call into the engine, which is the point.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{Result, TxError};

/// One parameter (or resolved version pin) that influenced the result,
/// echoed back on the response's `used` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedParameter {
    pub name: String,
    pub value: String,
}

/// A non-fatal condition surfaced alongside a successful result — e.g. a
/// fragment provider missing a declared code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxWarning {
    pub place: String,
    pub message: String,
}

/// Threaded explicitly through every provider, expander, and translator
/// call within one request. Never cloned mid-request — carries mutable
/// bookkeeping (result count, warnings, used list) that belongs to exactly
/// one in-flight operation.
pub struct OperationContext {
    deadline: Instant,
    max_results: usize,
    result_count: usize,
    membership_test: bool,
    cancellation: Option<CancellationToken>,
    used: Vec<UsedParameter>,
    warnings: Vec<TxWarning>,
}

impl OperationContext {
    pub fn new(timeout: Duration, max_results: usize) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            max_results,
            result_count: 0,
            membership_test: false,
            cancellation: None,
            used: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// In membership-test mode, `record_result` never trips the result cap —
    /// only the deadline still bounds the search (spec §4.E).
    pub fn as_membership_test(mut self) -> Self {
        self.membership_test = true;
        self
    }

    /// Deadline/cancellation checkpoint. `place` is a debugging label only.
    pub fn check(&self, place: &str) -> Result<()> {
        if let Some(token) = &self.cancellation {
            if token.is_cancelled() {
                return Err(TxError::too_costly(vec![place.to_string()]));
            }
        }
        if Instant::now() >= self.deadline {
            return Err(TxError::too_costly(vec![place.to_string()]));
        }
        Ok(())
    }

    /// Counts one emitted result, tripping the cap outside membership-test
    /// mode.
    pub fn record_result(&mut self, place: &str) -> Result<()> {
        self.result_count += 1;
        if !self.membership_test && self.result_count > self.max_results {
            return Err(TxError::too_costly(vec![place.to_string()]));
        }
        Ok(())
    }

    pub fn record_used(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.used.push(UsedParameter {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn record_warning(&mut self, place: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(TxWarning {
            place: place.into(),
            message: message.into(),
        });
    }

    pub fn used(&self) -> &[UsedParameter] {
        &self.used
    }

    pub fn warnings(&self) -> &[TxWarning] {
        &self.warnings
    }

    pub fn result_count(&self) -> usize {
        self.result_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_fails_once_deadline_has_passed() {
        let ctx = OperationContext::new(Duration::from_millis(0), 100);
        std::thread::sleep(Duration::from_millis(5));
        assert!(ctx.check("loop").is_err());
    }

    #[test]
    fn record_result_trips_cap() {
        let mut ctx = OperationContext::new(Duration::from_secs(5), 2);
        ctx.record_result("a").unwrap();
        ctx.record_result("b").unwrap();
        assert!(ctx.record_result("c").is_err());
    }

    #[test]
    fn membership_test_mode_ignores_result_cap() {
        let mut ctx = OperationContext::new(Duration::from_secs(5), 1).as_membership_test();
        ctx.record_result("a").unwrap();
        ctx.record_result("b").unwrap();
        assert_eq!(ctx.result_count(), 2);
    }

    #[test]
    fn cancellation_token_trips_check() {
        let token = CancellationToken::new();
        let ctx = OperationContext::new(Duration::from_secs(5), 100).with_cancellation(token.clone());
        assert!(ctx.check("loop").is_ok());
        token.cancel();
        assert!(ctx.check("loop").is_err());
    }

    #[test]
    fn used_and_warnings_accumulate_in_order() {
        let mut ctx = OperationContext::new(Duration::from_secs(5), 100);
        ctx.record_used("system-version", "http://loinc.org|2.73");
        ctx.record_warning("expand", "fragment missing declared code 'x'");
        assert_eq!(ctx.used().len(), 1);
        assert_eq!(ctx.warnings().len(), 1);
    }
}
