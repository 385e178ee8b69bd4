use std::collections::HashSet;

use crate::error::Result;
use crate::model::{ConceptSetFilter, ContentMode, PropertyValue};

use super::{CodeSystemProvider, LocatedConcept, Subsumption};

const PREFIXES: &[&str] = &[
    "Y", "Z", "E", "P", "T", "G", "M", "k", "h", "da", "d", "c", "m", "u", "n", "p", "f", "a", "z", "y",
];

const ATOMS: &[&str] = &[
    "m", "s", "g", "rad", "K", "C", "cd", "mol", "sr", "Hz", "N", "Pa", "J", "W", "A", "V", "F", "Ohm", "S", "Wb",
    "T", "H", "lm", "lx", "Bq", "Gy", "Sv", "L", "l", "gon", "deg", "'", "''", "a", "mo", "wk", "d", "h", "min",
    "t", "bar", "u", "eV", "pc", "cal", "cal_IT", "cal_th", "atm", "[pH]", "%", "[ppth]", "[ppm]", "10*", "10^",
];

/// UCUM's algebraic unit grammar, validated structurally (no dimensional
/// analysis): `term := component (('.'|'/') component)*`, `component :=
/// atom exponent? | '(' term ')'`, `atom := [prefix] symbol` (spec §4.D).
pub struct UcumCodeSystemProvider {
    prefixes: HashSet<&'static str>,
    atoms: HashSet<&'static str>,
}

impl Default for UcumCodeSystemProvider {
    fn default() -> Self {
        Self {
            prefixes: PREFIXES.iter().copied().collect(),
            atoms: ATOMS.iter().copied().collect(),
        }
    }
}

/// Parses `s` into a canonical multiset of `(token, exponent)` pairs, folding
/// repeated tokens and expanding parenthesised groups, so that unit
/// expressions equal up to reordering, exponent folding, and division vs.
/// negative-exponent multiplication compare equal (e.g. `kg.m/s2` and
/// `m.kg.s-2` canonicalise to the same form). This does not perform
/// dimensional analysis across distinct atoms (`mg` and `g` stay distinct
/// tokens) — only syntactic canonicalisation of one algebraic expression.
struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    prefixes: &'a HashSet<&'static str>,
    atoms: &'a HashSet<&'static str>,
}

impl<'a> Parser<'a> {
    fn new(s: &'a str, prefixes: &'a HashSet<&'static str>, atoms: &'a HashSet<&'static str>) -> Self {
        Self {
            bytes: s.as_bytes(),
            pos: 0,
            prefixes,
            atoms,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn term(&mut self) -> Option<Vec<(String, i32)>> {
        let mut terms = self.component()?;
        loop {
            match self.peek() {
                Some(b'.') => {
                    self.pos += 1;
                    terms.extend(self.component()?);
                }
                Some(b'/') => {
                    self.pos += 1;
                    terms.extend(self.component()?.into_iter().map(|(t, e)| (t, -e)));
                }
                _ => break,
            }
        }
        Some(terms)
    }

    fn component(&mut self) -> Option<Vec<(String, i32)>> {
        let mut inner = if self.peek() == Some(b'(') {
            self.pos += 1;
            let t = self.term()?;
            if self.peek() != Some(b')') {
                return None;
            }
            self.pos += 1;
            t
        } else {
            vec![(self.atom()?, 1)]
        };
        let exp = self.exponent();
        if exp != 1 {
            for (_, e) in inner.iter_mut() {
                *e *= exp;
            }
        }
        Some(inner)
    }

    fn exponent(&mut self) -> i32 {
        let start = self.pos;
        let neg = matches!(self.peek(), Some(b'-'));
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            self.pos = start;
            return 1;
        }
        let magnitude: i32 = std::str::from_utf8(&self.bytes[digits_start..self.pos])
            .unwrap_or("1")
            .parse()
            .unwrap_or(1);
        if neg {
            -magnitude
        } else {
            magnitude
        }
    }

    fn atom(&mut self) -> Option<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if (c as char).is_ascii_alphabetic() || c == b'[' || c == b']' || c == b'\'' || c == b'%') {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        let token = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");
        if self.atoms.contains(token) {
            return Some(token.to_string());
        }
        for prefix in self.prefixes {
            if let Some(rest) = token.strip_prefix(prefix) {
                if !rest.is_empty() && self.atoms.contains(rest) {
                    return Some(token.to_string());
                }
            }
        }
        None
    }
}

impl UcumCodeSystemProvider {
    /// Canonical form of `code`, or `None` if it doesn't parse as a UCUM
    /// algebraic expression over the known prefixes/atoms.
    fn canonical(&self, code: &str) -> Option<Vec<(String, i32)>> {
        if code.is_empty() {
            return None;
        }
        let mut parser = Parser::new(code, &self.prefixes, &self.atoms);
        let terms = parser.term()?;
        if parser.pos != parser.bytes.len() {
            return None;
        }
        let mut folded: std::collections::BTreeMap<String, i32> = std::collections::BTreeMap::new();
        for (token, exp) in terms {
            *folded.entry(token).or_insert(0) += exp;
        }
        folded.retain(|_, exp| *exp != 0);
        Some(folded.into_iter().collect())
    }

    fn validate(&self, code: &str) -> bool {
        self.canonical(code).is_some()
    }

    fn analysed_display(canonical: &[(String, i32)]) -> String {
        if canonical.is_empty() {
            return "1".to_string();
        }
        canonical
            .iter()
            .map(|(token, exp)| if *exp == 1 { token.clone() } else { format!("{token}^{exp}") })
            .collect::<Vec<_>>()
            .join("\u{b7}")
    }
}

impl CodeSystemProvider for UcumCodeSystemProvider {
    fn system(&self) -> &str {
        "http://unitsofmeasure.org"
    }

    fn version(&self) -> Option<&str> {
        None
    }

    fn content_mode(&self) -> ContentMode {
        ContentMode::NotPresent
    }

    fn locate(&self, code: &str) -> Result<Option<LocatedConcept>> {
        match self.canonical(code) {
            Some(canonical) => {
                let mut located = LocatedConcept::new(code);
                located.display = Some(Self::analysed_display(&canonical));
                Ok(Some(located))
            }
            None => Ok(None),
        }
    }

    /// UCUM units only compare as `Equivalent` (same canonical expression)
    /// or `NotSubsumed` — the algebraic grammar has no parent/child
    /// hierarchy to subsume across distinct units.
    fn subsumes(&self, a: &str, b: &str) -> Result<Subsumption> {
        if a == b {
            return Ok(Subsumption::Equivalent);
        }
        match (self.canonical(a), self.canonical(b)) {
            (Some(ca), Some(cb)) if ca == cb => Ok(Subsumption::Equivalent),
            _ => Ok(Subsumption::NotSubsumed),
        }
    }

    fn iter_codes(&self, _filter: Option<&ConceptSetFilter>) -> Box<dyn Iterator<Item = LocatedConcept> + '_> {
        // The algebraic grammar generates an unbounded set of compound
        // expressions; only the finite base/defined atoms are enumerable.
        Box::new(self.atoms.iter().map(|atom| {
            let mut located = LocatedConcept::new(*atom);
            located.display = Some((*atom).to_string());
            located
        }))
    }

    fn get_property(&self, _code: &str, _property: &str) -> Option<PropertyValue> {
        None
    }

    fn all_properties(&self, _code: &str) -> Vec<(String, PropertyValue)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_atom() {
        let provider = UcumCodeSystemProvider::default();
        assert!(provider.locate("m").unwrap().is_some());
    }

    #[test]
    fn accepts_prefixed_atom() {
        let provider = UcumCodeSystemProvider::default();
        assert!(provider.locate("mg").unwrap().is_some());
    }

    #[test]
    fn accepts_compound_expression_with_exponents() {
        let provider = UcumCodeSystemProvider::default();
        assert!(provider.locate("kg.m/s2").unwrap().is_some());
    }

    #[test]
    fn accepts_parenthesised_expression() {
        let provider = UcumCodeSystemProvider::default();
        assert!(provider.locate("mg/(dL.d)").unwrap().is_some());
    }

    #[test]
    fn rejects_unknown_atom() {
        let provider = UcumCodeSystemProvider::default();
        assert!(provider.locate("zorp").unwrap().is_none());
    }

    #[test]
    fn rejects_unbalanced_parentheses() {
        let provider = UcumCodeSystemProvider::default();
        assert!(provider.locate("mg/(dL").unwrap().is_none());
    }

    #[test]
    fn equal_codes_are_equivalent() {
        let provider = UcumCodeSystemProvider::default();
        assert_eq!(provider.subsumes("mg", "mg").unwrap(), Subsumption::Equivalent);
    }

    #[test]
    fn reordered_terms_are_equivalent() {
        let provider = UcumCodeSystemProvider::default();
        assert_eq!(provider.subsumes("kg.m/s2", "m.kg/s2").unwrap(), Subsumption::Equivalent);
    }

    #[test]
    fn division_and_negative_exponent_are_equivalent() {
        let provider = UcumCodeSystemProvider::default();
        assert_eq!(provider.subsumes("kg.m/s2", "kg.m.s-2").unwrap(), Subsumption::Equivalent);
    }

    #[test]
    fn repeated_atoms_fold_their_exponents() {
        let provider = UcumCodeSystemProvider::default();
        assert_eq!(provider.subsumes("m.m", "m2").unwrap(), Subsumption::Equivalent);
    }

    #[test]
    fn distinct_prefixes_are_not_subsumed() {
        let provider = UcumCodeSystemProvider::default();
        assert_eq!(provider.subsumes("mg", "g").unwrap(), Subsumption::NotSubsumed);
    }

    #[test]
    fn locate_analyses_the_display() {
        let provider = UcumCodeSystemProvider::default();
        let located = provider.locate("kg.m/s2").unwrap().unwrap();
        assert_eq!(located.display.as_deref(), Some("kg\u{b7}m\u{b7}s^-2"));
    }

    #[test]
    fn iter_codes_enumerates_base_atoms() {
        let provider = UcumCodeSystemProvider::default();
        let codes: HashSet<String> = provider.iter_codes(None).map(|c| c.code).collect();
        assert!(codes.contains("m"));
        assert!(codes.contains("g"));
    }
}
