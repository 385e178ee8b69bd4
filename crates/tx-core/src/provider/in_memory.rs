use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::error::{Result, TxError};
use crate::model::{CodeSystem, Concept, ConceptSetFilter, ContentMode, FilterOperator, PropertyValue};

use super::{CodeSystemProvider, LocatedConcept, Subsumption};

/// A fully materialised `CodeSystem` held in memory: four flat maps built
/// once at construction time from the resource's (possibly nested)
/// `concept` tree (spec §9 Design Notes — "providers flatten the authoring
/// shape"). `code_to_concept` is an `IndexMap`, not a `HashMap`: iteration
/// order backs `iter_codes(None)` directly, and spec §8 requires
/// `expand(vs)` to emit "the same codes in the same order" across runs, not
/// just the same set.
pub struct InMemoryCodeSystemProvider {
    system: String,
    version: Option<String>,
    content_mode: ContentMode,
    case_sensitive: bool,
    code_to_concept: IndexMap<String, Concept>,
    parent_to_children: HashMap<String, Vec<String>>,
    child_to_parents: HashMap<String, Vec<String>>,
}

fn fold(code: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        code.to_string()
    } else {
        code.to_ascii_lowercase()
    }
}

fn is_inactive(concept: &Concept) -> bool {
    concept.property.iter().any(|p| {
        p.code == "inactive" && matches!(p.value, PropertyValue::Boolean(true))
    })
}

const PARENT_PROPERTY_URI: &str = "http://hl7.org/fhir/concept-properties#parent";
const CHILD_PROPERTY_URI: &str = "http://hl7.org/fhir/concept-properties#child";

/// Resolves which `ConceptProperty.code`s mean "parent"/"child" for this
/// system: the literal names always count, plus any property the system
/// declares under the standard parent/child property URIs (spec §4.D).
fn parent_child_property_codes(cs: &CodeSystem) -> (HashSet<String>, HashSet<String>) {
    let mut parent_codes: HashSet<String> = ["parent".to_string()].into_iter().collect();
    let mut child_codes: HashSet<String> = ["child".to_string()].into_iter().collect();
    for def in &cs.property {
        match def.uri.as_deref() {
            Some(PARENT_PROPERTY_URI) => {
                parent_codes.insert(def.code.clone());
            }
            Some(CHILD_PROPERTY_URI) => {
                child_codes.insert(def.code.clone());
            }
            _ => {}
        }
    }
    (parent_codes, child_codes)
}

fn property_as_code(value: &PropertyValue) -> Option<&str> {
    match value {
        PropertyValue::Code(s) | PropertyValue::String(s) => Some(s.as_str()),
        PropertyValue::Coding(c) => c.code.as_deref(),
        _ => None,
    }
}

impl InMemoryCodeSystemProvider {
    #[tracing::instrument(skip(cs), fields(system = %cs.url, concepts = cs.concept.len()))]
    pub fn from_resource(cs: &CodeSystem) -> Self {
        tracing::debug!("flattening code system into provider maps");
        let mut code_to_concept = IndexMap::new();
        let mut parent_to_children: HashMap<String, Vec<String>> = HashMap::new();
        let mut child_to_parents: HashMap<String, Vec<String>> = HashMap::new();

        fn walk(
            concepts: &[Concept],
            parent: Option<&str>,
            case_sensitive: bool,
            code_to_concept: &mut IndexMap<String, Concept>,
            parent_to_children: &mut HashMap<String, Vec<String>>,
            child_to_parents: &mut HashMap<String, Vec<String>>,
        ) {
            for concept in concepts {
                let key = fold(&concept.code, case_sensitive);
                if let Some(p) = parent {
                    parent_to_children.entry(p.to_string()).or_default().push(key.clone());
                    child_to_parents.entry(key.clone()).or_default().push(p.to_string());
                }
                walk(
                    &concept.concept,
                    Some(&key),
                    case_sensitive,
                    code_to_concept,
                    parent_to_children,
                    child_to_parents,
                );
                code_to_concept.insert(key, concept.clone());
            }
        }

        walk(
            &cs.concept,
            None,
            cs.case_sensitive,
            &mut code_to_concept,
            &mut parent_to_children,
            &mut child_to_parents,
        );

        // Hierarchy also comes from `parent`/`child` properties on a flat
        // concept list, not only from nested `concept` arrays.
        let (parent_codes, child_codes) = parent_child_property_codes(cs);
        for (key, concept) in &code_to_concept {
            for prop in &concept.property {
                if parent_codes.contains(&prop.code) {
                    if let Some(parent_code) = property_as_code(&prop.value) {
                        let parent_key = fold(parent_code, cs.case_sensitive);
                        parent_to_children.entry(parent_key.clone()).or_default().push(key.clone());
                        child_to_parents.entry(key.clone()).or_default().push(parent_key);
                    }
                }
                if child_codes.contains(&prop.code) {
                    if let Some(child_code) = property_as_code(&prop.value) {
                        let child_key = fold(child_code, cs.case_sensitive);
                        parent_to_children.entry(key.clone()).or_default().push(child_key.clone());
                        child_to_parents.entry(child_key).or_default().push(key.clone());
                    }
                }
            }
        }

        Self {
            system: cs.url.clone(),
            version: cs.version.clone(),
            content_mode: cs.content,
            case_sensitive: cs.case_sensitive,
            code_to_concept,
            parent_to_children,
            child_to_parents,
        }
    }

    fn ancestors_of(&self, code: &str) -> Result<HashSet<String>> {
        let mut visited = HashSet::new();
        let mut stack = vec![code.to_string()];
        let mut ancestors = HashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                return Err(TxError::internal(format!(
                    "cycle detected while walking ancestors of '{code}'"
                )));
            }
            if let Some(parents) = self.child_to_parents.get(&current) {
                for p in parents {
                    ancestors.insert(p.clone());
                    stack.push(p.clone());
                }
            }
        }
        Ok(ancestors)
    }

    fn descendants_of(&self, code: &str) -> Result<HashSet<String>> {
        let mut visited = HashSet::new();
        let mut stack = vec![code.to_string()];
        let mut descendants = HashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                return Err(TxError::internal(format!(
                    "cycle detected while walking descendants of '{code}'"
                )));
            }
            if let Some(children) = self.parent_to_children.get(&current) {
                for c in children {
                    descendants.insert(c.clone());
                    stack.push(c.clone());
                }
            }
        }
        Ok(descendants)
    }

    fn to_located(&self, key: &str, concept: &Concept) -> LocatedConcept {
        let mut located = LocatedConcept::new(key);
        located.display = concept.display.clone();
        located.designations = concept.designation.clone();
        located.inactive = is_inactive(concept);
        located
    }
}

impl CodeSystemProvider for InMemoryCodeSystemProvider {
    fn system(&self) -> &str {
        &self.system
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn content_mode(&self) -> ContentMode {
        self.content_mode
    }

    fn locate(&self, code: &str) -> Result<Option<LocatedConcept>> {
        let key = fold(code, self.case_sensitive);
        Ok(self
            .code_to_concept
            .get(&key)
            .map(|concept| self.to_located(&key, concept)))
    }

    fn subsumes(&self, a: &str, b: &str) -> Result<Subsumption> {
        let key_a = fold(a, self.case_sensitive);
        let key_b = fold(b, self.case_sensitive);
        if key_a == key_b {
            return Ok(Subsumption::Equivalent);
        }
        if self.ancestors_of(&key_b)?.contains(&key_a) {
            return Ok(Subsumption::Subsumes);
        }
        if self.ancestors_of(&key_a)?.contains(&key_b) {
            return Ok(Subsumption::SubsumedBy);
        }
        Ok(Subsumption::NotSubsumed)
    }

    fn iter_codes(&self, filter: Option<&ConceptSetFilter>) -> Box<dyn Iterator<Item = LocatedConcept> + '_> {
        let Some(filter) = filter else {
            return Box::new(
                self.code_to_concept
                    .iter()
                    .map(move |(key, concept)| self.to_located(key, concept)),
            );
        };

        match filter.op {
            FilterOperator::IsA => {
                let Ok(mut allowed) = self.descendants_of(&fold(&filter.value, self.case_sensitive)) else {
                    return Box::new(std::iter::empty());
                };
                allowed.insert(fold(&filter.value, self.case_sensitive));
                Box::new(
                    self.code_to_concept
                        .iter()
                        .filter(move |(key, _)| allowed.contains(*key))
                        .map(move |(key, concept)| self.to_located(key, concept)),
                )
            }
            FilterOperator::DescendentOf => {
                let Ok(allowed) = self.descendants_of(&fold(&filter.value, self.case_sensitive)) else {
                    return Box::new(std::iter::empty());
                };
                Box::new(
                    self.code_to_concept
                        .iter()
                        .filter(move |(key, _)| allowed.contains(*key))
                        .map(move |(key, concept)| self.to_located(key, concept)),
                )
            }
            FilterOperator::IsNotA => {
                let Ok(mut excluded) = self.descendants_of(&fold(&filter.value, self.case_sensitive)) else {
                    return Box::new(std::iter::empty());
                };
                excluded.insert(fold(&filter.value, self.case_sensitive));
                Box::new(
                    self.code_to_concept
                        .iter()
                        .filter(move |(key, _)| !excluded.contains(*key))
                        .map(move |(key, concept)| self.to_located(key, concept)),
                )
            }
            FilterOperator::Regex => match regex::Regex::new(&filter.value) {
                Ok(re) => Box::new(
                    self.code_to_concept
                        .iter()
                        .filter(move |(key, _)| re.is_match(key))
                        .map(move |(key, concept)| self.to_located(key, concept)),
                ),
                Err(_) => Box::new(std::iter::empty()),
            },
            FilterOperator::In => {
                let set: HashSet<String> = filter
                    .value
                    .split(',')
                    .map(|c| fold(c.trim(), self.case_sensitive))
                    .collect();
                Box::new(
                    self.code_to_concept
                        .iter()
                        .filter(move |(key, _)| set.contains(*key))
                        .map(move |(key, concept)| self.to_located(key, concept)),
                )
            }
            FilterOperator::NotIn => {
                let set: HashSet<String> = filter
                    .value
                    .split(',')
                    .map(|c| fold(c.trim(), self.case_sensitive))
                    .collect();
                Box::new(
                    self.code_to_concept
                        .iter()
                        .filter(move |(key, _)| !set.contains(*key))
                        .map(move |(key, concept)| self.to_located(key, concept)),
                )
            }
            FilterOperator::Exists => {
                let property = filter.property.clone();
                let want_present = filter.value == "true";
                Box::new(self.code_to_concept.iter().filter_map(move |(key, concept)| {
                    let present = concept.property.iter().any(|p| p.code == property);
                    (present == want_present).then(|| self.to_located(key, concept))
                }))
            }
            FilterOperator::Equals => {
                let property = filter.property.clone();
                let value = filter.value.clone();
                Box::new(self.code_to_concept.iter().filter_map(move |(key, concept)| {
                    let matches = concept.property.iter().any(|p| {
                        p.code == property
                            && match &p.value {
                                PropertyValue::String(s) | PropertyValue::Code(s) | PropertyValue::DateTime(s) => {
                                    s == &value
                                }
                                PropertyValue::Boolean(b) => value.parse::<bool>().map(|v| v == *b).unwrap_or(false),
                                PropertyValue::Integer(i) => value.parse::<i64>().map(|v| v == *i).unwrap_or(false),
                                PropertyValue::Decimal(d) => value.parse::<f64>().map(|v| v == *d).unwrap_or(false),
                                PropertyValue::Coding(c) => c.code.as_deref() == Some(value.as_str()),
                            }
                    });
                    matches.then(|| self.to_located(key, concept))
                }))
            }
            FilterOperator::Generalizes => {
                // Inverse of is-a: concepts that are ancestors of the given code.
                let Ok(mut allowed) = self.ancestors_of(&fold(&filter.value, self.case_sensitive)) else {
                    return Box::new(std::iter::empty());
                };
                allowed.insert(fold(&filter.value, self.case_sensitive));
                Box::new(
                    self.code_to_concept
                        .iter()
                        .filter(move |(key, _)| allowed.contains(*key))
                        .map(move |(key, concept)| self.to_located(key, concept)),
                )
            }
        }
    }

    fn get_property(&self, code: &str, property: &str) -> Option<PropertyValue> {
        let key = fold(code, self.case_sensitive);
        self.code_to_concept
            .get(&key)
            .and_then(|c| c.property.iter().find(|p| p.code == property))
            .map(|p| p.value.clone())
    }

    fn all_properties(&self, code: &str) -> Vec<(String, PropertyValue)> {
        let key = fold(code, self.case_sensitive);
        self.code_to_concept
            .get(&key)
            .map(|c| c.property.iter().map(|p| (p.code.clone(), p.value.clone())).collect())
            .unwrap_or_default()
    }
}
