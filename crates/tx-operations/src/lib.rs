//! Request orchestration on top of `tx-core`: parameter assembly, version
//! pinning, resource resolution, and the six terminology operation workers.

pub mod context;
pub mod ops;
pub mod outcome;
pub mod params;
pub mod pins;
pub mod registry;

pub use context::{WorkerConfig, WorkerContext};
pub use ops::{
    expand, lookup, subsumes, translate, validate_code, validate_vs, ExpandParams, LookupParams, SubsumesParams,
    TranslateParams, ValidateCodeParams, ValidateVsParams,
};
pub use outcome::{http_status, operation_outcome, warning_issues};
pub use params::RawParams;
pub use pins::PinRules;
pub use registry::{EmptyCatalog, ResourceCatalog, ResourceResolver};
