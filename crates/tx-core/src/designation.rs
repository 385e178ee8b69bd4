//! Designation / display matching (spec §4.C).

use std::borrow::Cow;

use crate::lang::{LanguagePreferenceList, LanguageTag, MatchDepth};
use crate::model::{Coding, Designation, DesignationStatus};

/// A concept's `display` element is itself a display-designation candidate
/// even when it carries no `designation` entries of its own (spec §3
/// "Designation" derives display-ness from `use`, but every concept has an
/// implicit primary display). Callers building a [`DesignationStore`] for
/// display validation/lookup must seed this in first, or a concept with a
/// bare `display` and no `designation`s looks like it has no display at
/// all. Returns the designations unchanged (no allocation) when `display`
/// is absent or already present among them.
pub fn with_primary_display<'a>(designations: &'a [Designation], display: Option<&str>) -> Cow<'a, [Designation]> {
    match display {
        Some(display) if !designations.iter().any(|d| d.value == display) => {
            let mut combined = Vec::with_capacity(designations.len() + 1);
            combined.push(Designation {
                language: None,
                use_code: None,
                status: DesignationStatus::Active,
                value: display.to_string(),
                extensions: Vec::new(),
            });
            combined.extend_from_slice(designations);
            Cow::Owned(combined)
        }
        _ => Cow::Borrowed(designations),
    }
}

/// How far apart two displays can be and still be considered "the same".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEqualityMode {
    Exact,
    CaseInsensitive,
    Normalised,
}

/// Degree of difference found between a requested and an actual display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayDifference {
    None,
    Case,
    Normalized,
}

/// Result of [`DesignationStore::has_display`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayCheck {
    pub found: bool,
    pub difference: DisplayDifference,
}

fn normalise(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn equal_under(mode: DisplayEqualityMode, a: &str, b: &str) -> bool {
    match mode {
        DisplayEqualityMode::Exact => a == b,
        DisplayEqualityMode::CaseInsensitive => a.eq_ignore_ascii_case(b),
        DisplayEqualityMode::Normalised => normalise(a).eq_ignore_ascii_case(&normalise(b)),
    }
}

/// Predicate for whether a designation counts as a "display" (spec §3):
/// `use` absent, or equal to the canonical "display" use, or the SNOMED
/// "preferred term" use. Providers may override via [`DesignationStore::with_is_display`].
pub fn default_is_display(d: &Designation) -> bool {
    match &d.use_code {
        None => true,
        Some(Coding { system, code, .. }) => {
            let is_fhir_display = system.as_deref()
                == Some("http://terminology.hl7.org/CodeSystem/designation-usage")
                && code.as_deref() == Some("display");
            let is_snomed_preferred =
                system.as_deref() == Some("http://snomed.info/sct") && code.as_deref() == Some("900000000000013009");
            is_fhir_display || is_snomed_preferred
        }
    }
}

fn is_preferred(d: &Designation) -> bool {
    matches!(
        &d.use_code,
        Some(Coding { code: Some(c), .. }) if c == "preferred" || c == "900000000000548007"
    )
}

/// Holds the designations of one concept (or expansion entry) and answers
/// display-equality, preferred-designation, and enumeration queries.
pub struct DesignationStore<'a> {
    designations: &'a [Designation],
    is_display: Box<dyn Fn(&Designation) -> bool + 'a>,
}

impl<'a> DesignationStore<'a> {
    pub fn new(designations: &'a [Designation]) -> Self {
        Self {
            designations,
            is_display: Box::new(default_is_display),
        }
    }

    /// Delegates the "is display" predicate to the provider when it
    /// advertises custom display logic.
    pub fn with_is_display(mut self, predicate: impl Fn(&Designation) -> bool + 'a) -> Self {
        self.is_display = Box::new(predicate);
        self
    }

    pub fn designations(&self) -> &[Designation] {
        self.designations
    }

    pub fn count_matching(&self, display: &str, mode: DisplayEqualityMode) -> usize {
        self.designations
            .iter()
            .filter(|d| equal_under(mode, &d.value, display))
            .count()
    }

    /// `hasDisplay`: tries `mode` first; on a miss, retries progressively
    /// laxer modes only to report *how far off* the closest match is, never
    /// to report `found: true`.
    pub fn has_display(&self, display: &str, mode: DisplayEqualityMode) -> DisplayCheck {
        if self
            .designations
            .iter()
            .any(|d| equal_under(mode, &d.value, display))
        {
            return DisplayCheck {
                found: true,
                difference: DisplayDifference::None,
            };
        }

        // Report the closest difference among laxer modes without saying
        // "found".
        if mode != DisplayEqualityMode::CaseInsensitive
            && self
                .designations
                .iter()
                .any(|d| equal_under(DisplayEqualityMode::CaseInsensitive, &d.value, display))
        {
            return DisplayCheck {
                found: false,
                difference: DisplayDifference::Case,
            };
        }
        if self
            .designations
            .iter()
            .any(|d| equal_under(DisplayEqualityMode::Normalised, &d.value, display))
        {
            return DisplayCheck {
                found: false,
                difference: DisplayDifference::Normalized,
            };
        }

        DisplayCheck {
            found: false,
            difference: DisplayDifference::None,
        }
    }

    /// `hasDisplay`, but restricted to designations that are either
    /// language-less (apply regardless of preference) or match one of
    /// `prefs` at depth LANGUAGE (spec §4.E: "plus the probe's declared
    /// language preferences"). An empty or all-non-matching preference list
    /// falls back to the unrestricted [`Self::has_display`] behaviour, so a
    /// probe with no language opinion — or a concept whose designations
    /// don't carry language tags at all — isn't penalised.
    pub fn has_display_for_languages(
        &self,
        display: &str,
        mode: DisplayEqualityMode,
        prefs: &LanguagePreferenceList,
    ) -> DisplayCheck {
        if prefs.is_empty() {
            return self.has_display(display, mode);
        }

        let wanted: Vec<LanguageTag> = prefs
            .iter()
            .filter(|p| p.quality > 0.0)
            .filter_map(|p| LanguageTag::parse(&p.tag).ok())
            .collect();
        if wanted.is_empty() {
            return self.has_display(display, mode);
        }

        let filtered: Vec<Designation> = self
            .designations
            .iter()
            .filter(|d| match d.language.as_deref().and_then(|l| LanguageTag::parse(l).ok()) {
                None => true,
                Some(tag) => wanted.iter().any(|w| tag.matches(w, MatchDepth::Language)),
            })
            .cloned()
            .collect();

        if filtered.is_empty() {
            return self.has_display(display, mode);
        }
        DesignationStore::new(&filtered).has_display(display, mode)
    }

    /// Render the designation set for an error message, e.g. when a
    /// requested display doesn't match any known designation.
    pub fn render_for_error(&self) -> String {
        self.designations
            .iter()
            .map(|d| d.value.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn parsed_tag(d: &Designation) -> Option<LanguageTag> {
        d.language.as_deref().and_then(|l| LanguageTag::parse(l).ok())
    }

    fn first_display(designations: &[&Designation], is_display: &dyn Fn(&Designation) -> bool) -> Option<Designation> {
        designations
            .iter()
            .find(|d| is_display(d) && is_preferred(d))
            .or_else(|| designations.iter().find(|d| is_display(d)))
            .or_else(|| designations.first().copied())
            .cloned()
    }

    /// Preferred-designation algorithm (spec §4.C).
    pub fn preferred(&self, prefs: &LanguagePreferenceList) -> Option<Designation> {
        if prefs.is_empty() {
            return Self::first_display(
                &self.designations.iter().collect::<Vec<_>>(),
                &*self.is_display,
            );
        }

        for pref in prefs.iter() {
            let wanted = match LanguageTag::parse(&pref.tag) {
                Ok(t) => t,
                Err(_) => continue,
            };
            if wanted.language == "*" {
                if let Some(d) = Self::first_display(
                    &self.designations.iter().collect::<Vec<_>>(),
                    &*self.is_display,
                ) {
                    return Some(d);
                }
                continue;
            }

            // FULL: language + script + region + variant.
            let full: Vec<&Designation> = self
                .designations
                .iter()
                .filter(|d| {
                    Self::parsed_tag(d)
                        .map(|t| {
                            t.language == wanted.language
                                && t.script == wanted.script
                                && t.region == wanted.region
                                && t.variant == wanted.variant
                        })
                        .unwrap_or(false)
                })
                .collect();
            if !full.is_empty() {
                return Self::first_display(&full, &*self.is_display);
            }

            // LANG_REGION: language + region.
            let lang_region: Vec<&Designation> = self
                .designations
                .iter()
                .filter(|d| {
                    Self::parsed_tag(d)
                        .map(|t| t.language == wanted.language && t.region == wanted.region)
                        .unwrap_or(false)
                })
                .collect();
            if !lang_region.is_empty() {
                return Self::first_display(&lang_region, &*self.is_display);
            }

            // LANG: language only.
            let lang_only: Vec<&Designation> = self
                .designations
                .iter()
                .filter(|d| {
                    Self::parsed_tag(d)
                        .map(|t| t.language == wanted.language)
                        .unwrap_or(false)
                })
                .collect();
            if !lang_only.is_empty() {
                return Self::first_display(&lang_only, &*self.is_display);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn designation(lang: &str, value: &str) -> Designation {
        Designation {
            language: Some(lang.to_string()),
            use_code: None,
            status: Default::default(),
            value: value.to_string(),
            extensions: Vec::new(),
        }
    }

    #[test]
    fn has_display_exact_match() {
        let ds = vec![designation("en", "Male")];
        let store = DesignationStore::new(&ds);
        let check = store.has_display("Male", DisplayEqualityMode::Exact);
        assert!(check.found);
        assert_eq!(check.difference, DisplayDifference::None);
    }

    #[test]
    fn has_display_reports_case_difference_without_finding() {
        let ds = vec![designation("en", "Male")];
        let store = DesignationStore::new(&ds);
        let check = store.has_display("male", DisplayEqualityMode::Exact);
        assert!(!check.found);
        assert_eq!(check.difference, DisplayDifference::Case);
    }

    #[test]
    fn has_display_reports_normalized_difference() {
        let ds = vec![designation("en", "Heart  Failure")];
        let store = DesignationStore::new(&ds);
        let check = store.has_display("heart failure", DisplayEqualityMode::Exact);
        assert!(!check.found);
        assert_eq!(check.difference, DisplayDifference::Normalized);
    }

    #[test]
    fn case_insensitive_mode_finds_case_variant() {
        let ds = vec![designation("en", "Male")];
        let store = DesignationStore::new(&ds);
        let check = store.has_display("male", DisplayEqualityMode::CaseInsensitive);
        assert!(check.found);
    }

    #[test]
    fn preferred_selects_full_match_over_language_only() {
        let ds = vec![designation("en", "English generic"), designation("en-US", "American")];
        let store = DesignationStore::new(&ds);
        let prefs = LanguagePreferenceList::from_single("en-US");
        let preferred = store.preferred(&prefs).unwrap();
        assert_eq!(preferred.value, "American");
    }

    #[test]
    fn preferred_falls_back_to_language_only_match() {
        let ds = vec![designation("en-GB", "British")];
        let store = DesignationStore::new(&ds);
        let prefs = LanguagePreferenceList::from_single("en-US");
        let preferred = store.preferred(&prefs).unwrap();
        assert_eq!(preferred.value, "British");
    }

    #[test]
    fn preferred_with_empty_list_returns_first_display() {
        let ds = vec![designation("fr", "Francais"), designation("en", "English")];
        let store = DesignationStore::new(&ds);
        let preferred = store.preferred(&LanguagePreferenceList::new()).unwrap();
        assert_eq!(preferred.value, "Francais");
    }

    #[test]
    fn wildcard_preference_matches_any_designation() {
        let ds = vec![designation("de", "Deutsch")];
        let store = DesignationStore::new(&ds);
        let prefs = LanguagePreferenceList::from_single("*");
        assert!(store.preferred(&prefs).is_some());
    }

    #[test]
    fn primary_display_is_seeded_when_no_designations_exist() {
        let combined = with_primary_display(&[], Some("Male"));
        assert_eq!(combined.len(), 1);
        let store = DesignationStore::new(&combined);
        assert!(store.has_display("Male", DisplayEqualityMode::Exact).found);
    }

    #[test]
    fn primary_display_is_not_duplicated_when_already_present() {
        let ds = vec![designation("en", "Male")];
        let combined = with_primary_display(&ds, Some("Male"));
        assert_eq!(combined.len(), 1);
    }

    #[test]
    fn has_display_for_languages_restricts_to_matching_language() {
        let ds = vec![designation("fr", "Homme"), designation("en", "Male")];
        let store = DesignationStore::new(&ds);
        let prefs = LanguagePreferenceList::from_single("en");
        assert!(store.has_display_for_languages("Male", DisplayEqualityMode::Exact, &prefs).found);
        assert!(!store.has_display_for_languages("Homme", DisplayEqualityMode::Exact, &prefs).found);
    }

    #[test]
    fn has_display_for_languages_falls_back_when_nothing_matches() {
        let ds = vec![designation("fr", "Homme")];
        let store = DesignationStore::new(&ds);
        let prefs = LanguagePreferenceList::from_single("en");
        // No designation matches "en" — falls back to the unrestricted
        // check rather than reporting a false negative.
        assert!(store.has_display_for_languages("Homme", DisplayEqualityMode::Exact, &prefs).found);
    }

    #[test]
    fn has_display_for_languages_always_includes_language_less_entries() {
        let ds = vec![Designation {
            language: None,
            use_code: None,
            status: Default::default(),
            value: "Male".to_string(),
            extensions: Vec::new(),
        }];
        let store = DesignationStore::new(&ds);
        let prefs = LanguagePreferenceList::from_single("fr");
        assert!(store.has_display_for_languages("Male", DisplayEqualityMode::Exact, &prefs).found);
    }

    #[test]
    fn custom_is_display_predicate_overrides_default() {
        let mut d = designation("en", "Synonym term");
        d.use_code = Some(Coding::new("http://snomed.info/sct", "900000000000013009"));
        let ds = vec![d];
        let store = DesignationStore::new(&ds).with_is_display(|_| true);
        assert_eq!(store.count_matching("Synonym term", DisplayEqualityMode::Exact), 1);
    }
}
