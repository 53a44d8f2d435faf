//! User-Agent signatures.
//!
//! A signature is either a literal prefix (`^Aboundex`) or an arbitrary regex
//! (`Mozilla.*NEWT`). Literal prefixes skip the regex engine entirely, which is
//! the common case for bad-bot lists.

use crate::error::ConfigError;
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Characters that make a `^`-anchored signature ineligible for prefix matching.
const REGEX_METACHARACTERS: &[char] = &['.', '$', '*', '+', '?', '{', '}', '[', ']', '|', '\\'];

/// Case-insensitive literal prefix match.
#[derive(Debug, Clone)]
pub struct PrefixSignature {
    literal: String,
    folded: String,
}

impl PrefixSignature {
    pub fn new(literal: &str) -> Self {
        Self {
            literal: literal.to_string(),
            folded: fold_case(literal).collect(),
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn is_match(&self, value: &str) -> bool {
        let mut folded_value = fold_case(value);
        self.folded.chars().all(|c| folded_value.next() == Some(c))
    }
}

/// Case-insensitive, unanchored regex match.
#[derive(Debug, Clone)]
pub struct RegexSignature {
    regex: Regex,
}

impl RegexSignature {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self { regex })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// A compiled bad-bot signature.
#[derive(Debug, Clone)]
pub enum Signature {
    Prefix(PrefixSignature),
    Regex(RegexSignature),
}

impl Signature {
    /// Compile a raw signature string, picking the cheapest strategy that
    /// preserves its meaning.
    pub fn compile(raw: &str) -> Result<Self, ConfigError> {
        match prefix_literal(raw) {
            Some(literal) => Ok(Signature::Prefix(PrefixSignature::new(literal))),
            None => Ok(Signature::Regex(RegexSignature::new(raw)?)),
        }
    }

    /// Check a header value against this signature.
    pub fn is_match(&self, value: &str) -> bool {
        match self {
            Signature::Prefix(p) => p.is_match(value),
            Signature::Regex(r) => r.is_match(value),
        }
    }

    pub fn is_prefix(&self) -> bool {
        matches!(self, Signature::Prefix(_))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Prefix(p) => write!(f, "^{}", p.literal()),
            Signature::Regex(r) => f.write_str(r.pattern()),
        }
    }
}

/// Char-wise lowercase folding. Literal and header must fold identically, so
/// no context-sensitive mappings (final sigma) here.
fn fold_case(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

/// Return the literal of a `^`-anchored signature with no other regex syntax.
fn prefix_literal(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix('^')?;
    if rest.contains(REGEX_METACHARACTERS) {
        None
    } else {
        Some(rest)
    }
}
