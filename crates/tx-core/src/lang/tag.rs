use std::fmt;

use super::registry::LanguageRegistry;

/// Total order over how specifically two tags must agree to "match".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchDepth {
    None,
    Language,
    ExtLang,
    Script,
    Region,
    Variant,
    Extension,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagParseError {
    pub component: String,
    pub code: String,
}

impl fmt::Display for TagParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid BCP-47 component '{}' in tag '{}'",
            self.component, self.code
        )
    }
}

impl std::error::Error for TagParseError {}

/// A parsed BCP-47 language tag (spec §3 "Language tag").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LanguageTag {
    pub language: String,
    pub ext_lang: Vec<String>,
    pub script: Option<String>,
    pub region: Option<String>,
    pub variant: Option<String>,
    pub extension: Option<String>,
    pub private_use: Vec<String>,
}

fn is_alpha(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_variant_token(s: &str) -> bool {
    (5..=8).contains(&s.len())
        || (s.len() == 4 && s.chars().next().is_some_and(|c| c.is_ascii_digit()))
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => {
            first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
        }
        None => String::new(),
    }
}

impl LanguageTag {
    /// Parses a tag string without validating subtags against a registry.
    /// `*` is permitted as a whole-tag wildcard.
    pub fn parse(code: &str) -> Result<Self, TagParseError> {
        if code == "*" {
            return Ok(Self {
                language: "*".to_string(),
                ..Default::default()
            });
        }

        let tokens: Vec<&str> = code.split('-').collect();
        if tokens.is_empty() || tokens[0].is_empty() {
            return Err(TagParseError {
                component: "language".into(),
                code: code.into(),
            });
        }

        let mut idx = 0;
        let mut tag = LanguageTag {
            language: tokens[0].to_ascii_lowercase(),
            ..Default::default()
        };
        idx += 1;

        // Up to three 3-letter ext-language subtags.
        while idx < tokens.len() && tag.ext_lang.len() < 3 && is_alpha(tokens[idx], 3) {
            tag.ext_lang.push(tokens[idx].to_ascii_lowercase());
            idx += 1;
        }

        // Optional 4-letter script.
        if idx < tokens.len() && is_alpha(tokens[idx], 4) {
            tag.script = Some(title_case(tokens[idx]));
            idx += 1;
        }

        // Optional region: 2-letter alpha (upper-cased) or 3-digit.
        if idx < tokens.len() {
            let t = tokens[idx];
            if is_alpha(t, 2) {
                tag.region = Some(t.to_ascii_uppercase());
                idx += 1;
            } else if t.len() == 3 && t.chars().all(|c| c.is_ascii_digit()) {
                tag.region = Some(t.to_string());
                idx += 1;
            }
        }

        // Optional variant.
        if idx < tokens.len() && is_variant_token(tokens[idx]) {
            tag.variant = Some(tokens[idx].to_ascii_lowercase());
            idx += 1;
        }

        // Optional private-use tail or single-letter extension prefix.
        if idx < tokens.len() {
            if tokens[idx].eq_ignore_ascii_case("x") {
                tag.private_use = tokens[idx + 1..].iter().map(|s| s.to_string()).collect();
                idx = tokens.len();
            } else if tokens[idx].len() == 1 {
                tag.extension = Some(tokens[idx..].join("-"));
                idx = tokens.len();
            }
        }

        if idx != tokens.len() {
            return Err(TagParseError {
                component: tokens[idx].to_string(),
                code: code.into(),
            });
        }

        Ok(tag)
    }

    /// Parses and validates every subtag against a loaded registry,
    /// memoising the result per input code (spec requirement).
    pub fn parse_checked(
        registry: &LanguageRegistry,
        code: &str,
    ) -> Result<Self, TagParseError> {
        registry.parse_memoized(code)
    }

    fn is_wildcard(&self) -> bool {
        self.language == "*"
    }

    /// `matches(a, b, depth)`: true iff every component at position <= depth
    /// is equal between `self` and `other`.
    pub fn matches(&self, other: &Self, depth: MatchDepth) -> bool {
        if self.is_wildcard() || other.is_wildcard() {
            return true;
        }
        if depth >= MatchDepth::Language && self.language != other.language {
            return false;
        }
        if depth >= MatchDepth::ExtLang && self.ext_lang != other.ext_lang {
            return false;
        }
        if depth >= MatchDepth::Script && self.script != other.script {
            return false;
        }
        if depth >= MatchDepth::Region && self.region != other.region {
            return false;
        }
        if depth >= MatchDepth::Variant && self.variant != other.variant {
            return false;
        }
        if depth >= MatchDepth::Extension && self.extension != other.extension {
            return false;
        }
        true
    }

    /// `matchesSimple`: matches every *non-empty* component of `self`
    /// against `other`; empty components on `self` are ignored.
    pub fn matches_simple(&self, other: &Self) -> bool {
        if self.is_wildcard() || other.is_wildcard() {
            return true;
        }
        if !self.language.is_empty() && self.language != other.language {
            return false;
        }
        if !self.ext_lang.is_empty() && self.ext_lang != other.ext_lang {
            return false;
        }
        if self.script.is_some() && self.script != other.script {
            return false;
        }
        if self.region.is_some() && self.region != other.region {
            return false;
        }
        if self.variant.is_some() && self.variant != other.variant {
            return false;
        }
        true
    }

    /// `matchesForDisplay`: asymmetric. `self` (the receiver, e.g. a
    /// designation's language) matches `target` (the requested language) when
    /// it is equal or strictly more specific on every component `target`
    /// specifies. A blank `self` matches only `en`/`en-US` by default — this
    /// Anglophone default is the `blank_matches_english` flag per the open
    /// question in spec §9.
    pub fn matches_for_display(&self, target: &Self, blank_matches_english: bool) -> bool {
        if self.language.is_empty() {
            return blank_matches_english
                && (target.language == "en")
                && (target.region.is_none() || target.region.as_deref() == Some("US"));
        }
        if self.is_wildcard() || target.is_wildcard() {
            return true;
        }
        if self.language != target.language {
            return false;
        }
        if let Some(ref r) = target.script {
            if self.script.as_ref() != Some(r) {
                return false;
            }
        }
        if let Some(ref r) = target.region {
            if self.region.as_ref() != Some(r) {
                return false;
            }
        }
        if let Some(ref r) = target.variant {
            if self.variant.as_ref() != Some(r) {
                return false;
            }
        }
        true
    }

    /// Canonical string form, e.g. `en-US`, `zh-Hans-CN`.
    pub fn to_code(&self) -> String {
        let mut parts = vec![self.language.clone()];
        parts.extend(self.ext_lang.iter().cloned());
        if let Some(ref s) = self.script {
            parts.push(s.clone());
        }
        if let Some(ref r) = self.region {
            parts.push(r.clone());
        }
        if let Some(ref v) = self.variant {
            parts.push(v.clone());
        }
        if let Some(ref e) = self.extension {
            parts.push(e.clone());
        }
        if !self.private_use.is_empty() {
            parts.push("x".to_string());
            parts.extend(self.private_use.iter().cloned());
        }
        parts.join("-")
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_code())
    }
}
