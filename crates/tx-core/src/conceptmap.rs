//! ConceptMap translation (spec §4.F).

use crate::context::OperationContext;
use crate::error::{Result, TxError};
use crate::model::{ConceptMap, Relationship};
use crate::version::{version_matches, VersionAlgorithm};

/// One emitted translation, carrying its governing group's relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub target_system: String,
    pub target_code: String,
    pub target_display: Option<String>,
    pub relationship: Relationship,
    pub comment: Option<String>,
}

/// Scans every group of a `ConceptMap` for entries that translate
/// `(source_system, source_code, source_version)` into `target_system`
/// (when given), returning every matching target across every matching
/// group (spec §4.F).
pub struct Translator<'a> {
    map: &'a ConceptMap,
}

impl<'a> Translator<'a> {
    pub fn new(map: &'a ConceptMap) -> Self {
        Self { map }
    }

    pub fn translate(
        &self,
        source_system: &str,
        source_version: Option<&str>,
        source_code: &str,
        target_system: Option<&str>,
        case_sensitive: bool,
        ctx: &mut OperationContext,
    ) -> Result<Vec<Translation>> {
        let mut out = Vec::new();
        for group in &self.map.group {
            ctx.check("conceptmap.group")?;

            if group.source != source_system {
                continue;
            }
            if let (Some(pattern), Some(actual)) = (group.source_version.as_deref(), source_version) {
                if !version_matches(pattern, actual, VersionAlgorithm::default()) {
                    continue;
                }
            }
            if let Some(wanted) = target_system {
                if group.target != wanted {
                    continue;
                }
            }

            for element in &group.element {
                ctx.check("conceptmap.element")?;
                let matches = if case_sensitive {
                    element.code == source_code
                } else {
                    element.code.eq_ignore_ascii_case(source_code)
                };
                if !matches {
                    continue;
                }
                for target in &element.target {
                    ctx.record_result("conceptmap.target")?;
                    out.push(Translation {
                        target_system: group.target.clone(),
                        target_code: target.code.clone(),
                        target_display: target.display.clone(),
                        relationship: target.relationship,
                        comment: target.comment.clone(),
                    });
                }
            }
        }
        Ok(out)
    }
}

/// The fixed bidirectional relationship-to-wire-equivalence table (spec
/// §4.F). Internal code always speaks [`Relationship`]; these functions are
/// the only place the FHIR `ConceptMapEquivalence` vocabulary is named.
pub fn relationship_to_equivalence(relationship: Relationship) -> &'static str {
    match relationship {
        Relationship::Equivalent => "equivalent",
        Relationship::SourceIsBroaderThanTarget => "wider",
        Relationship::SourceIsNarrowerThanTarget => "narrower",
        Relationship::RelatedTo => "relatedto",
        Relationship::NotRelatedTo => "unmatched",
    }
}

pub fn equivalence_to_relationship(equivalence: &str) -> Result<Relationship> {
    match equivalence {
        "equivalent" | "equal" => Ok(Relationship::Equivalent),
        "wider" | "subsumes" => Ok(Relationship::SourceIsBroaderThanTarget),
        "narrower" | "specializes" => Ok(Relationship::SourceIsNarrowerThanTarget),
        "relatedto" => Ok(Relationship::RelatedTo),
        "inexact" | "unmatched" | "disjoint" => Ok(Relationship::NotRelatedTo),
        other => Err(TxError::structural(format!("unrecognised concept map equivalence '{other}'"))),
    }
}
