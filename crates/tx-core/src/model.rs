//! Internal R5-shaped terminology resources (spec §3).
//!
//! These are the types the engine operates on regardless of the wire
//! version a request arrived in; cross-version conversion lives outside
//! this crate.

use serde::{Deserialize, Serialize};

/// Identity of a terminology resource: a canonical URL with an optional
/// version (spec §3 "Canonical URL").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalRef {
    pub url: String,
    pub version: Option<String>,
}

impl CanonicalRef {
    pub fn new(url: impl Into<String>, version: Option<String>) -> Self {
        Self {
            url: url.into(),
            version,
        }
    }

    pub fn from_wire(s: &str) -> Self {
        let (url, version) = crate::version::split_canonical(s);
        Self::new(url, version.map(String::from))
    }
}

impl std::fmt::Display for CanonicalRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}|{}", self.url, v),
            None => write!(f, "{}", self.url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentMode {
    Complete,
    NotPresent,
    Example,
    Fragment,
    Supplement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DesignationStatus {
    Active,
    Inactive,
    Withdrawn,
    Unknown,
}

impl Default for DesignationStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A (language, use, value) triple attached to a concept (spec §3
/// "Designation").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Designation {
    pub language: Option<String>,
    #[serde(rename = "use")]
    pub use_code: Option<Coding>,
    #[serde(default)]
    pub status: DesignationStatus,
    pub value: String,
    #[serde(default)]
    pub extensions: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coding {
    pub system: Option<String>,
    pub code: Option<String>,
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display: None,
        }
    }
}

/// A typed property value. Wire representation is FHIR's usual
/// "one of several sibling `valueX` keys" polymorphism
/// (`valueCode`/`valueCoding`/`valueString`/...), not a tagged enum, so
/// [`ConceptProperty`] carries hand-written `Serialize`/`Deserialize`
/// impls instead of deriving them on this type — mirroring the teacher's
/// own manual `prop.get("valueCode")`/`.get("valueBoolean")` extraction
/// in `operations/terminology/lookup.rs` rather than serde's derive.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Code(String),
    Coding(Coding),
    String(String),
    Integer(i64),
    Boolean(bool),
    DateTime(String),
    Decimal(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConceptProperty {
    pub code: String,
    pub value: PropertyValue,
}

impl Serialize for ConceptProperty {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serde_json::Map::new();
        map.insert("code".to_string(), serde_json::Value::String(self.code.clone()));
        let (key, value) = match &self.value {
            PropertyValue::Code(v) => ("valueCode", serde_json::Value::String(v.clone())),
            PropertyValue::Coding(v) => (
                "valueCoding",
                serde_json::to_value(v).map_err(serde::ser::Error::custom)?,
            ),
            PropertyValue::String(v) => ("valueString", serde_json::Value::String(v.clone())),
            PropertyValue::Integer(v) => ("valueInteger", serde_json::Value::from(*v)),
            PropertyValue::Boolean(v) => ("valueBoolean", serde_json::Value::Bool(*v)),
            PropertyValue::DateTime(v) => ("valueDateTime", serde_json::Value::String(v.clone())),
            PropertyValue::Decimal(v) => ("valueDecimal", serde_json::Value::from(*v)),
        };
        map.insert(key.to_string(), value);
        serde_json::Value::Object(map).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConceptProperty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let value = serde_json::Value::deserialize(deserializer)?;
        let code = value
            .get("code")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| Error::missing_field("code"))?
            .to_string();

        let property_value = if let Some(v) = value.get("valueCode").and_then(serde_json::Value::as_str) {
            PropertyValue::Code(v.to_string())
        } else if let Some(v) = value.get("valueCoding") {
            PropertyValue::Coding(serde_json::from_value(v.clone()).map_err(Error::custom)?)
        } else if let Some(v) = value.get("valueString").and_then(serde_json::Value::as_str) {
            PropertyValue::String(v.to_string())
        } else if let Some(v) = value.get("valueInteger").and_then(serde_json::Value::as_i64) {
            PropertyValue::Integer(v)
        } else if let Some(v) = value.get("valueBoolean").and_then(serde_json::Value::as_bool) {
            PropertyValue::Boolean(v)
        } else if let Some(v) = value.get("valueDateTime").and_then(serde_json::Value::as_str) {
            PropertyValue::DateTime(v.to_string())
        } else if let Some(v) = value.get("valueDecimal").and_then(serde_json::Value::as_f64) {
            PropertyValue::Decimal(v)
        } else {
            return Err(Error::custom("concept property is missing a recognised 'valueX' field"));
        };

        Ok(ConceptProperty { code, value: property_value })
    }
}

/// One concept in a `CodeSystem`, possibly with nested children (authoring
/// shape). Providers flatten this into parent/child maps at construction
/// time (spec §9 Design Notes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub code: String,
    pub display: Option<String>,
    pub definition: Option<String>,
    #[serde(default)]
    pub designation: Vec<Designation>,
    #[serde(default)]
    pub property: Vec<ConceptProperty>,
    #[serde(default)]
    pub concept: Vec<Concept>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    Code,
    Coding,
    String,
    Integer,
    Boolean,
    DateTime,
    Decimal,
}

/// Declares the type of a named property so concept values can be decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub code: String,
    pub uri: Option<String>,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub description: Option<String>,
}

/// Internal R5 shape of a `CodeSystem` (spec §3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSystem {
    pub id: Option<String>,
    pub url: String,
    pub version: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    #[serde(default = "default_content_mode")]
    pub content: ContentModeOpt,
    #[serde(default)]
    pub case_sensitive: bool,
    /// For a `supplement`: the canonical URL of the system it supplements.
    pub supplements: Option<String>,
    #[serde(default)]
    pub property: Vec<PropertyDefinition>,
    #[serde(default)]
    pub concept: Vec<Concept>,
}

// `ContentMode` has no sensible "absent" variant in FHIR, but our default
// construction path (e.g. tests) wants one without forcing every caller to
// spell it out.
pub type ContentModeOpt = ContentMode;
fn default_content_mode() -> ContentModeOpt {
    ContentMode::Complete
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "is-a")]
    IsA,
    #[serde(rename = "is-not-a")]
    IsNotA,
    #[serde(rename = "descendent-of")]
    DescendentOf,
    #[serde(rename = "regex")]
    Regex,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not-in")]
    NotIn,
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "generalizes")]
    Generalizes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptSetFilter {
    pub property: String,
    pub op: FilterOperator,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptReference {
    pub code: String,
    pub display: Option<String>,
}

/// One `include` or `exclude` rule in a `ValueSet.compose`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptSet {
    pub system: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub concept: Vec<ConceptReference>,
    #[serde(default)]
    pub filter: Vec<ConceptSetFilter>,
    #[serde(default)]
    pub value_set: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetCompose {
    #[serde(default)]
    pub include: Vec<ConceptSet>,
    #[serde(default)]
    pub exclude: Vec<ConceptSet>,
    /// Default expansion parameters embedded in the compose; merged before
    /// operation-level overrides (spec §4.E "Embedded parameters").
    #[serde(default)]
    pub default_parameters: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionContains {
    pub system: String,
    pub version: Option<String>,
    pub code: String,
    pub display: Option<String>,
    #[serde(default)]
    pub designation: Vec<Designation>,
    #[serde(default)]
    pub contains: Vec<ExpansionContains>,
    #[serde(default)]
    pub inactive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    pub identifier: Option<String>,
    pub timestamp: Option<String>,
    pub total: Option<usize>,
    pub offset: Option<usize>,
    #[serde(default)]
    pub contains: Vec<ExpansionContains>,
}

/// Internal R5 shape of a `ValueSet` (spec §3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueSet {
    pub id: Option<String>,
    pub url: Option<String>,
    pub version: Option<String>,
    pub name: Option<String>,
    pub language: Option<String>,
    pub compose: Option<ValueSetCompose>,
    pub expansion: Option<Expansion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relationship {
    Equivalent,
    SourceIsBroaderThanTarget,
    SourceIsNarrowerThanTarget,
    RelatedTo,
    NotRelatedTo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetElement {
    pub code: String,
    pub display: Option<String>,
    pub relationship: Relationship,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceElement {
    pub code: String,
    pub display: Option<String>,
    #[serde(default)]
    pub target: Vec<TargetElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMapGroup {
    pub source: String,
    pub source_version: Option<String>,
    pub target: String,
    pub target_version: Option<String>,
    pub element: Vec<SourceElement>,
}

/// Internal R5 shape of a `ConceptMap` (spec §3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptMap {
    pub id: Option<String>,
    pub url: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub group: Vec<ConceptMapGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_ref_from_wire_splits_pipe() {
        let r = CanonicalRef::from_wire("http://loinc.org|2.73");
        assert_eq!(r.url, "http://loinc.org");
        assert_eq!(r.version.as_deref(), Some("2.73"));
    }

    #[test]
    fn canonical_ref_display_round_trips() {
        let r = CanonicalRef::new("http://loinc.org", Some("2.73".to_string()));
        assert_eq!(r.to_string(), "http://loinc.org|2.73");
    }

    #[test]
    fn canonical_ref_without_version_displays_bare_url() {
        let r = CanonicalRef::new("http://loinc.org", None);
        assert_eq!(r.to_string(), "http://loinc.org");
    }

    #[test]
    fn concept_set_defaults_are_empty() {
        let cs = ConceptSet::default();
        assert!(cs.concept.is_empty());
        assert!(cs.filter.is_empty());
    }

    #[test]
    fn code_system_deserializes_camel_case_wire_fields() {
        let cs: CodeSystem = serde_json::from_str(
            r#"{
                "url": "http://example.org/cs",
                "caseSensitive": true,
                "concept": [{ "code": "a" }]
            }"#,
        )
        .unwrap();
        assert!(cs.case_sensitive);
    }

    #[test]
    fn concept_set_deserializes_camel_case_value_set_import() {
        let cs: ConceptSet = serde_json::from_str(r#"{ "valueSet": ["http://example.org/vs/a"] }"#).unwrap();
        assert_eq!(cs.value_set, vec!["http://example.org/vs/a".to_string()]);
    }

    #[test]
    fn concept_map_group_deserializes_camel_case_versions() {
        let group: ConceptMapGroup = serde_json::from_str(
            r#"{
                "source": "http://a",
                "sourceVersion": "1",
                "target": "http://b",
                "targetVersion": "2",
                "element": []
            }"#,
        )
        .unwrap();
        assert_eq!(group.source_version.as_deref(), Some("1"));
        assert_eq!(group.target_version.as_deref(), Some("2"));
    }

    #[test]
    fn designation_use_field_is_wire_name_use_not_use_code() {
        let d: Designation = serde_json::from_str(
            r#"{ "value": "Male", "use": { "system": "http://snomed.info/sct", "code": "900000000000013009" } }"#,
        )
        .unwrap();
        assert_eq!(d.use_code.unwrap().code.as_deref(), Some("900000000000013009"));
    }

    #[test]
    fn concept_property_deserializes_fhir_polymorphic_value_shape() {
        let p: ConceptProperty = serde_json::from_str(r#"{ "code": "inactive", "valueBoolean": false }"#).unwrap();
        assert_eq!(p.code, "inactive");
        assert_eq!(p.value, PropertyValue::Boolean(false));
    }

    #[test]
    fn concept_property_serializes_back_to_the_same_polymorphic_shape() {
        let p = ConceptProperty {
            code: "inactive".to_string(),
            value: PropertyValue::Boolean(false),
        };
        let value = serde_json::to_value(&p).unwrap();
        assert_eq!(value["code"], "inactive");
        assert_eq!(value["valueBoolean"], false);
        assert!(value.get("value").is_none());
    }

    #[test]
    fn concept_property_missing_value_field_is_an_error() {
        let result: Result<ConceptProperty, _> = serde_json::from_str(r#"{ "code": "inactive" }"#);
        assert!(result.is_err());
    }
}
