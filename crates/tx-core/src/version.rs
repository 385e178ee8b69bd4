//! Canonical URL splitting and version matching (spec §4.A).
//!
//! These are pure, side-effect-free helpers used throughout the engine
//! wherever a `url|version` pair needs to be parsed or compared.

use std::cmp::Ordering;

/// How two version strings should be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionAlgorithm {
    SemVer,
    Natural,
    Alphabetical,
}

impl Default for VersionAlgorithm {
    fn default() -> Self {
        Self::SemVer
    }
}

/// Splits `url|version` into its two halves. A bare url with no `|` yields
/// `(url, None)`. Only the first `|` is significant.
pub fn split_canonical(s: &str) -> (&str, Option<&str>) {
    match s.split_once('|') {
        Some((url, version)) => (url, Some(version)),
        None => (s, None),
    }
}

/// Joins a url and an optional version back into wire form.
pub fn join_canonical(url: &str, version: Option<&str>) -> String {
    match version {
        Some(v) => format!("{url}|{v}"),
        None => url.to_string(),
    }
}

/// A parsed semver-like triple. Any segment may be absent (a "partial"
/// version such as `2` or `2.7`), and any numeric segment may instead be a
/// wildcard (`x`, `X`, `*`).
#[derive(Debug, Clone, PartialEq, Eq)]
struct SemVerParts {
    segments: Vec<Segment>,
    /// The original (pre-parse) text of each segment, e.g. `"07"` for a
    /// segment that parsed to `Number(7)`. Needed for the `?` suffix's
    /// "prefix-match within major or minor" semantics, which compares
    /// digit-string prefixes rather than parsed integers: `2.7?` must match
    /// `2.70` (the string `"70"` starts with `"7"`) while plain `2.7` must
    /// not (`70 != 7` numerically).
    raw_segments: Vec<String>,
    prefix_match: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number(u64),
    Wildcard,
}

fn parse_semver_parts(s: &str) -> Option<SemVerParts> {
    let (body, prefix_match) = match s.strip_suffix('?') {
        Some(stripped) => (stripped, true),
        None => (s, false),
    };
    if body.is_empty() {
        return None;
    }
    let mut segments = Vec::new();
    let mut raw_segments = Vec::new();
    for part in body.split('.') {
        if part.is_empty() {
            return None;
        }
        raw_segments.push(part.to_string());
        if part == "x" || part == "X" || part == "*" {
            segments.push(Segment::Wildcard);
        } else {
            segments.push(Segment::Number(part.parse::<u64>().ok()?));
        }
    }
    Some(SemVerParts {
        segments,
        raw_segments,
        prefix_match,
    })
}

/// Returns true if `s` parses as a (possibly partial, possibly wildcarded)
/// semver string.
pub fn is_semver(s: &str) -> bool {
    parse_semver_parts(s).is_some()
}

/// Implements `versionMatches(pattern, actual, algorithm)`.
///
/// Under `SemVer`: every segment present in `pattern` must equal the
/// corresponding segment of `actual` (a wildcard segment in the pattern
/// matches anything); segments present in `actual` but not in `pattern` are
/// ignored (trailing segments match anything). A trailing `?` makes the
/// last named segment a digit-string prefix match instead of an exact one:
/// `2.7?` matches `2.7`, `2.7.x`, and also `2.70`/`2.79` (whose minor
/// segment starts with "7"), which plain `2.7` does not.
///
/// Under `Natural` and `Alphabetical`, the comparison falls back to plain
/// string equality, since neither defines a structural match.
pub fn version_matches(pattern: &str, actual: &str, algorithm: VersionAlgorithm) -> bool {
    match algorithm {
        VersionAlgorithm::SemVer => match (parse_semver_parts(pattern), parse_semver_parts(actual))
        {
            (Some(p), Some(a)) => semver_parts_match(&p, &a),
            _ => pattern == actual,
        },
        VersionAlgorithm::Natural | VersionAlgorithm::Alphabetical => pattern == actual,
    }
}

fn semver_parts_match(pattern: &SemVerParts, actual: &SemVerParts) -> bool {
    let limit = pattern.segments.len();
    // Only the last segment named in the pattern gets the `?` treatment —
    // everything before it still has to match exactly.
    let prefix_segment = pattern.prefix_match.then(|| limit.saturating_sub(1));

    for i in 0..limit {
        let Some(p) = pattern.segments.get(i) else {
            break;
        };
        if Some(i) == prefix_segment {
            let Segment::Number(_) = p else { continue };
            let pattern_raw = &pattern.raw_segments[i];
            match (actual.segments.get(i), actual.raw_segments.get(i)) {
                (Some(Segment::Wildcard), _) => {}
                (Some(Segment::Number(_)), Some(actual_raw)) if actual_raw.starts_with(pattern_raw.as_str()) => {}
                _ => return false,
            }
            continue;
        }
        match p {
            Segment::Wildcard => continue,
            Segment::Number(pn) => match actual.segments.get(i) {
                Some(Segment::Number(an)) if an == pn => {}
                Some(Segment::Wildcard) => {}
                _ => return false,
            },
        }
    }
    true
}

/// Compares two semver-like version strings for ordering, numeric
/// segment-by-segment, falling back to lexicographic string comparison when
/// either side does not parse as semver.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_semver_parts(a), parse_semver_parts(b)) {
        (Some(pa), Some(pb)) => {
            let len = pa.segments.len().max(pb.segments.len());
            for i in 0..len {
                let an = match pa.segments.get(i) {
                    Some(Segment::Number(n)) => *n,
                    _ => 0,
                };
                let bn = match pb.segments.get(i) {
                    Some(Segment::Number(n)) => *n,
                    _ => 0,
                };
                match an.cmp(&bn) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        }
        _ => a.cmp(b),
    }
}

/// `isThisOrLater(a, b)`: true if `b` is the same version as `a` or later,
/// under semver ordering.
pub fn is_this_or_later(a: &str, b: &str) -> bool {
    compare_versions(b, a) != Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_canonical_on_first_pipe() {
        assert_eq!(
            split_canonical("http://loinc.org|2.73"),
            ("http://loinc.org", Some("2.73"))
        );
        assert_eq!(split_canonical("http://loinc.org"), ("http://loinc.org", None));
    }

    #[test]
    fn splits_on_first_pipe_only() {
        assert_eq!(
            split_canonical("http://x|a|b"),
            ("http://x", Some("a|b"))
        );
    }

    #[test]
    fn joins_canonical() {
        assert_eq!(join_canonical("http://x", Some("1.0")), "http://x|1.0");
        assert_eq!(join_canonical("http://x", None), "http://x");
    }

    #[test]
    fn recognizes_semver() {
        assert!(is_semver("1.2.3"));
        assert!(is_semver("1.2"));
        assert!(is_semver("1"));
        assert!(is_semver("1.x.3"));
        assert!(!is_semver("abc"));
        assert!(!is_semver(""));
    }

    #[test]
    fn semver_pattern_matches_exact_prefix() {
        assert!(version_matches("2.73", "2.73.1", VersionAlgorithm::SemVer));
        assert!(version_matches("2", "2.73.1", VersionAlgorithm::SemVer));
        assert!(!version_matches("2.74", "2.73.1", VersionAlgorithm::SemVer));
    }

    #[test]
    fn semver_wildcard_segment_matches_anything() {
        assert!(version_matches("2.x", "2.73.1", VersionAlgorithm::SemVer));
        assert!(version_matches("*.73", "2.73.1", VersionAlgorithm::SemVer));
    }

    #[test]
    fn semver_question_mark_prefix_matches_within_segment() {
        assert!(version_matches("2.7?", "2.7.9", VersionAlgorithm::SemVer));
        assert!(version_matches("2.7?", "2.7", VersionAlgorithm::SemVer));
        // The distinguishing behaviour: `?` makes the last named segment a
        // digit-string prefix match, not an exact one — `2.70` has a minor
        // segment that starts with "7", so `2.7?` matches it too.
        assert!(version_matches("2.7?", "2.70.1", VersionAlgorithm::SemVer));
        assert!(!version_matches("2.7?", "2.8.1", VersionAlgorithm::SemVer));
        // Without the `?`, the same pattern is an exact match and does not
        // accept "2.70" for "2.7".
        assert!(!version_matches("2.7", "2.70.1", VersionAlgorithm::SemVer));
    }

    #[test]
    fn natural_and_alphabetical_fall_back_to_equality() {
        assert!(version_matches("2023-10", "2023-10", VersionAlgorithm::Natural));
        assert!(!version_matches("2023-10", "2023-11", VersionAlgorithm::Alphabetical));
    }

    #[test]
    fn compares_versions_numerically() {
        assert_eq!(compare_versions("2.9", "2.10"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn is_this_or_later_basic() {
        assert!(is_this_or_later("2.73", "2.74"));
        assert!(is_this_or_later("2.73", "2.73"));
        assert!(!is_this_or_later("2.73", "2.72"));
    }
}
