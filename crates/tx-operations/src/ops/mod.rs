//! One module per terminology operation (spec §4.I), each a typed
//! parameter extractor plus a function taking a [`crate::registry::ResourceResolver`]
//! and a [`crate::context::WorkerContext`] and returning a FHIR `Parameters`
//! or resource `Value`. Wiring these onto HTTP routes is a host concern.

pub mod expand;
pub mod lookup;
pub mod subsumes;
pub mod translate;
pub mod validate_code;
pub mod validate_vs;

pub use expand::{expand, ExpandParams};
pub use lookup::{lookup, LookupParams};
pub use subsumes::{subsumes, SubsumesParams};
pub use translate::{translate, TranslateParams};
pub use validate_code::{validate_code, ValidateCodeParams};
pub use validate_vs::{validate_vs, ValidateVsParams};
