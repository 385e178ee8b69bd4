//! BCP-47 language tag parsing, matching, and rendering against the IETF
//! subtag registry (spec §4.B).

mod registry;
mod tag;

pub use registry::{LanguageRegistry, RegistryError, SubtagRecord, SubtagTable};
pub use tag::{LanguageTag, MatchDepth, TagParseError};

/// An ordered language preference derived from an `Accept-Language`-style
/// header (spec §3 "Language preference list").
#[derive(Debug, Clone, PartialEq)]
pub struct LanguagePreference {
    pub tag: String,
    pub quality: f32,
}

/// An ordered, quality-sorted list of language preferences. Stable on
/// insertion order for ties; quality 0 means "forbidden".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguagePreferenceList(Vec<LanguagePreference>);

impl LanguagePreferenceList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Parses an `Accept-Language`-style header value: comma-separated
    /// `tag;q=value` entries, sorted by descending quality (stable).
    pub fn parse(header: &str) -> Self {
        let mut entries: Vec<LanguagePreference> = header
            .split(',')
            .filter_map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return None;
                }
                let mut pieces = part.split(';');
                let tag = pieces.next()?.trim().to_string();
                let quality = pieces
                    .find_map(|p| {
                        let p = p.trim();
                        p.strip_prefix("q=").and_then(|v| v.parse::<f32>().ok())
                    })
                    .unwrap_or(1.0);
                Some(LanguagePreference { tag, quality })
            })
            .collect();
        entries.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(std::cmp::Ordering::Equal));
        Self(entries)
    }

    pub fn from_single(tag: impl Into<String>) -> Self {
        Self(vec![LanguagePreference {
            tag: tag.into(),
            quality: 1.0,
        }])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanguagePreference> {
        self.0.iter().filter(|p| p.quality > 0.0)
    }

    pub fn as_slice(&self) -> &[LanguagePreference] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_accept_language_header_sorted_by_quality() {
        let list = LanguagePreferenceList::parse("fr;q=0.3, en-US;q=0.9, *;q=0.1");
        let tags: Vec<&str> = list.iter().map(|p| p.tag.as_str()).collect();
        assert_eq!(tags, vec!["en-US", "fr", "*"]);
    }

    #[test]
    fn zero_quality_is_forbidden_and_excluded_from_iter() {
        let list = LanguagePreferenceList::parse("en;q=0, fr;q=0.5");
        let tags: Vec<&str> = list.iter().map(|p| p.tag.as_str()).collect();
        assert_eq!(tags, vec!["fr"]);
    }

    #[test]
    fn defaults_to_quality_one_when_absent() {
        let list = LanguagePreferenceList::parse("en-US");
        assert_eq!(list.as_slice()[0].quality, 1.0);
    }
}
