use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TxError;

/// The FHIR wire version a request/response is expressed in. The core
/// operates internally on R5 shapes regardless of this value; wrappers
/// outside this crate convert on ingress/egress (see `tx-server::wire`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FhirVersion {
    #[serde(rename = "3.0.2")]
    R3,
    #[serde(rename = "4.0.1")]
    R4,
    #[serde(rename = "5.0.0")]
    R5,
}

impl FhirVersion {
    /// The base-path segment used in the HTTP surface (`/r3/`, `/r4/`, `/r5/`).
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::R3 => "r3",
            Self::R4 => "r4",
            Self::R5 => "r5",
        }
    }
}

impl fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::R3 => write!(f, "3.0.2"),
            Self::R4 => write!(f, "4.0.1"),
            Self::R5 => write!(f, "5.0.0"),
        }
    }
}

impl FromStr for FhirVersion {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "3.0.2" | "R3" | "r3" => Ok(Self::R3),
            "4.0.1" | "R4" | "r4" => Ok(Self::R4),
            "5.0.0" | "R5" | "r5" => Ok(Self::R5),
            other => Err(TxError::structural(format!(
                "unknown FHIR version: {other}"
            ))),
        }
    }
}

impl Default for FhirVersion {
    fn default() -> Self {
        Self::R5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_segments() {
        assert_eq!(FhirVersion::from_str("r3").unwrap(), FhirVersion::R3);
        assert_eq!(FhirVersion::from_str("r4").unwrap(), FhirVersion::R4);
        assert_eq!(FhirVersion::from_str("r5").unwrap(), FhirVersion::R5);
    }

    #[test]
    fn rejects_unknown_version() {
        assert!(FhirVersion::from_str("r2").is_err());
    }

    #[test]
    fn default_is_r5() {
        assert_eq!(FhirVersion::default(), FhirVersion::R5);
    }

    #[test]
    fn display_matches_semver() {
        assert_eq!(FhirVersion::R4.to_string(), "4.0.1");
    }
}
