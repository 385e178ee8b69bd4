//! Version-pinning rules applied while resolving a system reference
//! (spec §4.G.3).
//!
//! Three repeating parameters interact in a fixed precedence:
//! `force-system-version` (override, conflicts are errors), then
//! `system-version` (default, only applies when the reference itself didn't
//! specify a version), then `check-system-version` (guard, mismatches raise
//! `version-error`). Per spec §9's first Open Question, a force pin always
//! overrides an explicit version on the reference itself.

use std::collections::HashMap;

use tx_core::{IssueCode, Result, TxError};

use crate::params::RawParams;

#[derive(Debug, Clone, Default)]
pub struct PinRules {
    force: HashMap<String, String>,
    default: HashMap<String, String>,
    check: HashMap<String, String>,
}

impl PinRules {
    /// Parses the three repeating pin parameters off a request, rejecting
    /// conflicting entries for the same system up front rather than at
    /// resolution time.
    pub fn from_params(params: &RawParams) -> Result<Self> {
        let mut rules = Self::default();
        for raw in params.get_all_str("force-system-version") {
            let (url, version) = tx_core::version::split_canonical(&raw);
            let Some(version) = version else {
                return Err(TxError::structural(format!(
                    "force-system-version '{raw}' is missing a version"
                )));
            };
            if let Some(existing) = rules.force.get(url) {
                if existing != version {
                    return Err(TxError::semantic(
                        IssueCode::SystemVersionMultipleOverride,
                        format!("conflicting force-system-version for '{url}': '{existing}' and '{version}'"),
                    ));
                }
            } else {
                rules.force.insert(url.to_string(), version.to_string());
            }
        }
        for raw in params.get_all_str("system-version") {
            let (url, version) = tx_core::version::split_canonical(&raw);
            let Some(version) = version else {
                return Err(TxError::structural(format!(
                    "system-version '{raw}' is missing a version"
                )));
            };
            if let Some(existing) = rules.default.get(url) {
                if existing != version {
                    return Err(TxError::semantic(
                        IssueCode::SystemVersionMultipleDefault,
                        format!("conflicting system-version for '{url}': '{existing}' and '{version}'"),
                    ));
                }
            } else {
                rules.default.insert(url.to_string(), version.to_string());
            }
        }
        for raw in params.get_all_str("check-system-version") {
            let (url, version) = tx_core::version::split_canonical(&raw);
            if let Some(version) = version {
                rules.check.insert(url.to_string(), version.to_string());
            }
        }
        Ok(rules)
    }

    /// Applies the three rules in precedence order to one `(url, version)`
    /// reference, returning the effective version. Also validates the
    /// `check-system-version` guard, if any.
    pub fn apply(&self, url: &str, version: Option<&str>) -> Result<Option<String>> {
        let effective = if let Some(forced) = self.force.get(url) {
            Some(forced.clone())
        } else if version.is_none() {
            self.default.get(url).cloned()
        } else {
            version.map(str::to_string)
        };

        if let Some(expected) = self.check.get(url) {
            let actual = effective.as_deref().unwrap_or("");
            if actual != expected {
                return Err(TxError::semantic(
                    IssueCode::VersionError,
                    format!("check-system-version expected '{url}|{expected}' but resolved to '{url}|{actual}'"),
                ));
            }
        }

        Ok(effective)
    }

    pub fn is_empty(&self) -> bool {
        self.force.is_empty() && self.default.is_empty() && self.check.is_empty()
    }
}
