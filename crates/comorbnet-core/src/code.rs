//! Disease codes and directed pair keys.
//!
//! A [`DiseaseCode`] is exactly one uppercase ASCII letter followed by two
//! ASCII digits (`A00`, `K21`). Codes are validated on every parse,
//! including when they arrive embedded in a composite pair key such as
//! `"A00->B01"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ComorbError;

// ---------------------------------------------------------------------------
// DiseaseCode
// ---------------------------------------------------------------------------

/// A validated three-character disease code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiseaseCode([u8; 3]);

impl DiseaseCode {
    /// Parse and validate a code.
    ///
    /// Surrounding whitespace is rejected, not trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ComorbError::InvalidCode`] unless `raw` matches
    /// `[A-Z][0-9]{2}`.
    pub fn parse(raw: &str) -> Result<Self, ComorbError> {
        match raw.as_bytes() {
            &[letter, d1, d2]
                if letter.is_ascii_uppercase() && d1.is_ascii_digit() && d2.is_ascii_digit() =>
            {
                Ok(Self([letter, d1, d2]))
            }
            _ => Err(ComorbError::InvalidCode(raw.to_string())),
        }
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Lower-case form used in cohort file names (`matched_a00.csv`).
    #[must_use]
    pub fn to_lowercase(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for DiseaseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiseaseCode {
    type Err = ComorbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DiseaseCode {
    type Error = ComorbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DiseaseCode> for String {
    fn from(code: DiseaseCode) -> Self {
        code.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// PairKey
// ---------------------------------------------------------------------------

/// Separator used when a pair key is rendered as a single string.
pub const PAIR_SEPARATOR: &str = "->";

/// A directed `(cause, outcome)` disease pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PairKey {
    pub cause: DiseaseCode,
    pub outcome: DiseaseCode,
}

impl PairKey {
    #[must_use]
    pub const fn new(cause: DiseaseCode, outcome: DiseaseCode) -> Self {
        Self { cause, outcome }
    }

    /// Build a key from two raw code strings, validating both.
    ///
    /// # Errors
    ///
    /// Returns [`ComorbError::InvalidCode`] if either part is malformed.
    pub fn from_parts(cause: &str, outcome: &str) -> Result<Self, ComorbError> {
        Ok(Self::new(DiseaseCode::parse(cause)?, DiseaseCode::parse(outcome)?))
    }

    /// Whether both ends name the same disease.
    #[must_use]
    pub fn is_self_pair(&self) -> bool {
        self.cause == self.outcome
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{PAIR_SEPARATOR}{}", self.cause, self.outcome)
    }
}

impl FromStr for PairKey {
    type Err = ComorbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cause, outcome) = s
            .split_once(PAIR_SEPARATOR)
            .ok_or_else(|| ComorbError::InvalidCode(s.to_string()))?;
        Self::from_parts(cause, outcome)
    }
}

impl TryFrom<String> for PairKey {
    type Error = ComorbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PairKey> for String {
    fn from(key: PairKey) -> Self {
        key.to_string()
    }
}

/// Parse a whitespace- or comma-separated list of codes, preserving order and
/// dropping repeats.
///
/// # Errors
///
/// Returns the first [`ComorbError::InvalidCode`] encountered.
pub fn parse_code_list(raw: &str) -> Result<Vec<DiseaseCode>, ComorbError> {
    let mut seen = std::collections::HashSet::new();
    let mut codes = Vec::new();
    for token in raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let code = DiseaseCode::parse(token)?;
        if seen.insert(code) {
            codes.push(code);
        }
    }
    Ok(codes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_letter_two_digits() {
        let code = DiseaseCode::parse("K21").expect("valid code");
        assert_eq!(code.as_str(), "K21");
        assert_eq!(code.to_lowercase(), "k21");
    }

    #[test]
    fn rejects_malformed_codes() {
        for raw in ["", "k21", "K2", "K211", "21K", " K21", "KK1", "Ä01"] {
            assert!(DiseaseCode::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn pair_key_round_trips_through_display() {
        let key = PairKey::from_parts("A00", "B01").expect("valid pair");
        assert_eq!(key.to_string(), "A00->B01");
        let parsed: PairKey = "A00->B01".parse().expect("parse pair");
        assert_eq!(parsed, key);
    }

    #[test]
    fn pair_key_validates_both_parts() {
        assert!("A00->b01".parse::<PairKey>().is_err());
        assert!("A00-B01".parse::<PairKey>().is_err());
        assert!("A00->".parse::<PairKey>().is_err());
    }

    #[test]
    fn code_list_dedupes_in_order() {
        let codes = parse_code_list("B01, A00\nB01 C02").expect("list");
        let rendered: Vec<_> = codes.iter().map(DiseaseCode::as_str).collect();
        assert_eq!(rendered, ["B01", "A00", "C02"]);
    }

    #[test]
    fn serde_uses_string_form() {
        let key = PairKey::from_parts("A00", "B01").expect("pair");
        let json = serde_json::to_string(&key).expect("serialize");
        assert_eq!(json, "\"A00->B01\"");
        let bad: Result<DiseaseCode, _> = serde_json::from_str("\"a00\"");
        assert!(bad.is_err());
    }
}
