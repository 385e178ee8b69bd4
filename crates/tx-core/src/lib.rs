pub mod cache;
pub mod conceptmap;
pub mod context;
pub mod designation;
pub mod error;
pub mod fhir;
pub mod lang;
pub mod model;
pub mod provider;
pub mod valueset;
pub mod version;

pub use cache::{get_cache, CachedResource, ResourceCache};
pub use conceptmap::{equivalence_to_relationship, relationship_to_equivalence, Translation, Translator};
pub use context::{OperationContext, TxWarning, UsedParameter};
pub use designation::{with_primary_display, DesignationStore, DisplayCheck, DisplayDifference, DisplayEqualityMode};
pub use error::{IssueCode, NotFoundKind, Result, TxError};
pub use fhir::FhirVersion;
pub use lang::{LanguagePreference, LanguagePreferenceList, LanguageRegistry, LanguageTag, MatchDepth};
pub use provider::{
    CodeSystemProvider, FragmentCodeSystemProvider, InMemoryCodeSystemProvider, LanguageCodeSystemProvider,
    LocatedConcept, Subsumption, SupplementedCodeSystemProvider, UcumCodeSystemProvider,
};
pub use valueset::{Expander, ExpansionParameters, MembershipResult, ProviderResolver};
