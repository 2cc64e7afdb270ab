//! Period identifiers and date-query matching.
//!
//! Server date strings are day-first (`"10/09/2025"`) but the separator is
//! not stable across endpoints: both `-` and `/` appear in the wild, and
//! single-digit day/month components arrive unpadded. All comparison in this
//! crate goes through [`PeriodKey`], which canonicalizes separators and
//! padding first.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Left-pads a single-digit numeric component to two digits.
fn pad_component(part: &str) -> String {
    let trimmed = part.trim();
    if trimmed.len() == 1 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        format!("0{trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Splits a raw date string on either supported separator.
fn split_date(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(['-', '/'])
}

/// An opaque, comparable period identifier.
///
/// Equality is textual on the canonical form, not calendrical: the key exists
/// for deduplication and search matching, never for ordering arithmetic.
///
/// # Example
///
/// ```
/// use livefeed_protocol::PeriodKey;
///
/// let a = PeriodKey::new("10/9/2025");
/// let b = PeriodKey::new("10-09-2025");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey {
    canonical: String,
}

impl PeriodKey {
    /// Creates a key from a raw server date string.
    ///
    /// Canonicalization is total: unrecognized shapes are kept verbatim so
    /// that equality still behaves sensibly for identical raw strings.
    pub fn new(raw: &str) -> Self {
        let parts: Vec<String> = split_date(raw).map(pad_component).collect();
        Self {
            canonical: parts.join("/"),
        }
    }

    /// Returns the canonical `DD/MM/YYYY`-style form.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Returns the padded components (day, month, year for a full date).
    fn components(&self) -> Vec<&str> {
        self.canonical.split('/').collect()
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// A user-supplied date filter at one of three granularities.
///
/// Accepts `"10"` (day), `"10/9"` (day/month), or `"10/9/2025"` (full date),
/// with either separator and unpadded components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateQuery {
    /// Match on the day component only.
    Day(String),
    /// Match on day and month.
    DayMonth(String, String),
    /// Match on day, month, and year.
    Full(String, String, String),
}

impl DateQuery {
    /// Parses a query string, or returns `None` for empty or malformed input.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<String> = split_date(raw)
            .map(pad_component)
            .filter(|p| !p.is_empty())
            .collect();

        match parts.as_slice() {
            [d] => Some(Self::Day(d.clone())),
            [d, m] => Some(Self::DayMonth(d.clone(), m.clone())),
            [d, m, y] => Some(Self::Full(d.clone(), m.clone(), y.clone())),
            _ => None,
        }
    }

    /// Returns true if the given period key matches this query.
    pub fn matches(&self, key: &PeriodKey) -> bool {
        let parts = key.components();
        match self {
            Self::Day(d) => parts.first() == Some(&d.as_str()),
            Self::DayMonth(d, m) => {
                parts.first() == Some(&d.as_str()) && parts.get(1) == Some(&m.as_str())
            }
            Self::Full(d, m, y) => {
                parts.first() == Some(&d.as_str())
                    && parts.get(1) == Some(&m.as_str())
                    && parts.get(2) == Some(&y.as_str())
            }
        }
    }
}
