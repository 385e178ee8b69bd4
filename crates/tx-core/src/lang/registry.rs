use std::collections::HashMap;
use std::sync::RwLock;

use super::tag::{LanguageTag, TagParseError};

/// One of the five tables a subtag registry record is partitioned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubtagTable {
    Language,
    ExtLanguage,
    Script,
    Region,
    Variant,
}

#[derive(Debug, Clone)]
pub struct SubtagRecord {
    pub subtag: String,
    pub description: String,
    pub suppress_script: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    Invalid(String),
    DuplicateSubtag { table: &'static str, subtag: String },
    UnknownType(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid registry source: {msg}"),
            Self::DuplicateSubtag { table, subtag } => {
                write!(f, "duplicate subtag '{subtag}' in table '{table}'")
            }
            Self::UnknownType(t) => write!(f, "unknown record Type: {t}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// A loaded IETF BCP-47 subtag registry (spec §4.B, §6).
pub struct LanguageRegistry {
    languages: HashMap<String, SubtagRecord>,
    ext_languages: HashMap<String, SubtagRecord>,
    scripts: HashMap<String, SubtagRecord>,
    regions: HashMap<String, SubtagRecord>,
    variants: HashMap<String, SubtagRecord>,
    parse_cache: RwLock<HashMap<String, LanguageTag>>,
}

impl LanguageRegistry {
    /// Parses the registry text format: records separated by lines equal to
    /// `%%`, each a `Key: Value` list, where repeated keys concatenate
    /// descriptions joined by `|`. The source must begin with `%%`.
    pub fn parse(source: &str) -> Result<Self, RegistryError> {
        if !source.trim_start().starts_with("%%") {
            return Err(RegistryError::Invalid(
                "source does not begin with '%%'".into(),
            ));
        }

        let mut registry = Self {
            languages: HashMap::new(),
            ext_languages: HashMap::new(),
            scripts: HashMap::new(),
            regions: HashMap::new(),
            variants: HashMap::new(),
            parse_cache: RwLock::new(HashMap::new()),
        };

        for record_text in source.split("%%") {
            let record_text = record_text.trim();
            if record_text.is_empty() {
                continue;
            }
            registry.ingest_record(record_text)?;
        }

        Ok(registry)
    }

    fn ingest_record(&mut self, record_text: &str) -> Result<(), RegistryError> {
        let mut record_type: Option<String> = None;
        let mut subtag: Option<String> = None;
        let mut descriptions: Vec<String> = Vec::new();
        let mut suppress_script: Option<String> = None;
        let mut scope: Option<String> = None;

        for line in record_text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().to_string();
            match key {
                "Type" => record_type = Some(value),
                "Subtag" | "Tag" => subtag = Some(value),
                "Description" => descriptions.push(value),
                "Suppress-Script" => suppress_script = Some(value),
                "Scope" => scope = Some(value),
                _ => {}
            }
        }

        let Some(record_type) = record_type else {
            return Ok(());
        };
        let table = match record_type.as_str() {
            "language" => SubtagTable::Language,
            "extlang" => SubtagTable::ExtLanguage,
            "script" => SubtagTable::Script,
            "region" => SubtagTable::Region,
            "variant" => SubtagTable::Variant,
            "grandfathered" | "redundant" => return Ok(()),
            other => return Err(RegistryError::UnknownType(other.to_string())),
        };

        let Some(subtag) = subtag else {
            return Ok(());
        };
        let key = subtag.to_ascii_lowercase();
        let record = SubtagRecord {
            subtag: subtag.clone(),
            description: descriptions.join("|"),
            suppress_script,
            scope,
        };

        let (map, name) = match table {
            SubtagTable::Language => (&mut self.languages, "language"),
            SubtagTable::ExtLanguage => (&mut self.ext_languages, "extlang"),
            SubtagTable::Script => (&mut self.scripts, "script"),
            SubtagTable::Region => (&mut self.regions, "region"),
            SubtagTable::Variant => (&mut self.variants, "variant"),
        };

        if map.contains_key(&key) {
            return Err(RegistryError::DuplicateSubtag {
                table: name,
                subtag,
            });
        }
        map.insert(key, record);
        Ok(())
    }

    pub fn language(&self, subtag: &str) -> Option<&SubtagRecord> {
        self.languages.get(&subtag.to_ascii_lowercase())
    }

    pub fn script(&self, subtag: &str) -> Option<&SubtagRecord> {
        self.scripts.get(&subtag.to_ascii_lowercase())
    }

    pub fn region(&self, subtag: &str) -> Option<&SubtagRecord> {
        self.regions.get(&subtag.to_ascii_lowercase())
    }

    pub fn variant(&self, subtag: &str) -> Option<&SubtagRecord> {
        self.variants.get(&subtag.to_ascii_lowercase())
    }

    pub fn ext_language(&self, subtag: &str) -> Option<&SubtagRecord> {
        self.ext_languages.get(&subtag.to_ascii_lowercase())
    }

    /// Parses `code`, validating every non-wildcard component against this
    /// registry, memoising the result. This is the two-argument form named
    /// canonical in spec §9's Open Questions.
    pub fn parse_memoized(&self, code: &str) -> Result<LanguageTag, TagParseError> {
        if let Some(cached) = self.parse_cache.read().unwrap().get(code) {
            return Ok(cached.clone());
        }

        let tag = LanguageTag::parse(code)?;
        if tag.language != "*" {
            if self.language(&tag.language).is_none() {
                return Err(TagParseError {
                    component: tag.language.clone(),
                    code: code.to_string(),
                });
            }
            for e in &tag.ext_lang {
                if self.ext_language(e).is_none() {
                    return Err(TagParseError {
                        component: e.clone(),
                        code: code.to_string(),
                    });
                }
            }
            if let Some(ref s) = tag.script
                && self.script(s).is_none()
            {
                return Err(TagParseError {
                    component: s.clone(),
                    code: code.to_string(),
                });
            }
            if let Some(ref r) = tag.region
                && self.region(r).is_none()
            {
                return Err(TagParseError {
                    component: r.clone(),
                    code: code.to_string(),
                });
            }
            if let Some(ref v) = tag.variant
                && self.variant(v).is_none()
            {
                return Err(TagParseError {
                    component: v.clone(),
                    code: code.to_string(),
                });
            }
        }

        self.parse_cache
            .write()
            .unwrap()
            .insert(code.to_string(), tag.clone());
        Ok(tag)
    }

    /// Renders a tag either via `template` (with `{{lang}}`, `{{script}}`,
    /// `{{region}}` substituted from registry display names) or, absent a
    /// template, as the canonical `"<Language> (Script=…, Region=…,
    /// Variant=…)"` form. `display_index` selects among multiple
    /// pipe-joined descriptions for a subtag (0 = first).
    pub fn present(&self, tag: &LanguageTag, display_index: usize, template: Option<&str>) -> String {
        let lang_name = self
            .language(&tag.language)
            .map(|r| nth_description(&r.description, display_index))
            .unwrap_or_else(|| tag.language.clone());
        let script_name = tag
            .script
            .as_ref()
            .and_then(|s| self.script(s))
            .map(|r| nth_description(&r.description, display_index));
        let region_name = tag
            .region
            .as_ref()
            .and_then(|r| self.region(r))
            .map(|r| nth_description(&r.description, display_index));

        if let Some(template) = template {
            return template
                .replace("{{lang}}", &lang_name)
                .replace("{{script}}", script_name.as_deref().unwrap_or(""))
                .replace("{{region}}", region_name.as_deref().unwrap_or(""));
        }

        let mut qualifiers = Vec::new();
        if let Some(s) = &script_name {
            qualifiers.push(format!("Script={s}"));
        }
        if let Some(r) = &region_name {
            qualifiers.push(format!("Region={r}"));
        }
        if let Some(v) = &tag.variant {
            qualifiers.push(format!("Variant={v}"));
        }
        if qualifiers.is_empty() {
            lang_name
        } else {
            format!("{lang_name} ({})", qualifiers.join(", "))
        }
    }
}

fn nth_description(joined: &str, index: usize) -> String {
    joined
        .split('|')
        .nth(index)
        .or_else(|| joined.split('|').next())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
%%
Type: language
Subtag: en
Description: English
%%
Type: language
Subtag: fr
Description: French
%%
Type: script
Subtag: Latn
Description: Latin
%%
Type: region
Subtag: US
Description: United States
%%
Type: variant
Subtag: scouse
Description: Scouse
%%
Type: grandfathered
Tag: i-klingon
Description: Klingon
";

    #[test]
    fn rejects_source_without_leading_marker() {
        assert!(LanguageRegistry::parse("Type: language\nSubtag: en\n").is_err());
    }

    #[test]
    fn loads_tables_and_looks_up_records() {
        let reg = LanguageRegistry::parse(SAMPLE).unwrap();
        assert!(reg.language("en").is_some());
        assert!(reg.script("Latn").is_some());
        assert!(reg.region("US").is_some());
        assert!(reg.variant("scouse").is_some());
    }

    #[test]
    fn grandfathered_records_are_ignored() {
        let reg = LanguageRegistry::parse(SAMPLE).unwrap();
        assert!(reg.language("i-klingon").is_none());
    }

    #[test]
    fn duplicate_subtag_is_fatal() {
        let dup = "%%\nType: language\nSubtag: en\nDescription: A\n%%\nType: language\nSubtag: en\nDescription: B\n";
        assert!(matches!(
            LanguageRegistry::parse(dup),
            Err(RegistryError::DuplicateSubtag { .. })
        ));
    }

    #[test]
    fn unknown_type_is_fatal() {
        let bad = "%%\nType: bogus\nSubtag: zz\nDescription: Nope\n";
        assert!(matches!(
            LanguageRegistry::parse(bad),
            Err(RegistryError::UnknownType(_))
        ));
    }

    #[test]
    fn repeated_description_keys_are_joined_with_pipe() {
        let src = "%%\nType: language\nSubtag: en\nDescription: English\nDescription: Anglais\n";
        let reg = LanguageRegistry::parse(src).unwrap();
        assert_eq!(reg.language("en").unwrap().description, "English|Anglais");
    }

    #[test]
    fn parse_memoized_rejects_unknown_subtag() {
        let reg = LanguageRegistry::parse(SAMPLE).unwrap();
        assert!(reg.parse_memoized("xx").is_err());
        assert!(reg.parse_memoized("en-US").is_ok());
    }

    #[test]
    fn parse_memoized_caches_result() {
        let reg = LanguageRegistry::parse(SAMPLE).unwrap();
        let first = reg.parse_memoized("en").unwrap();
        let second = reg.parse_memoized("en").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn present_uses_canonical_form_without_template() {
        let reg = LanguageRegistry::parse(SAMPLE).unwrap();
        let tag = reg.parse_memoized("en-US").unwrap();
        assert_eq!(reg.present(&tag, 0, None), "English (Region=United States)");
    }

    #[test]
    fn present_substitutes_template() {
        let reg = LanguageRegistry::parse(SAMPLE).unwrap();
        let tag = reg.parse_memoized("en-US").unwrap();
        let rendered = reg.present(&tag, 0, Some("{{lang}}/{{region}}"));
        assert_eq!(rendered, "English/United States");
    }
}
