//! Control identifiers.
//!
//! A control is an audit requirement identified by a dotted numeric code of
//! exactly three segments: `category.subcategory.control` (e.g. `4.2.1`).
//! The `category.subcategory` prefix is the join key used by the evidence
//! catalog, so it is exposed separately.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::CoreError;

// ---------------------------------------------------------------------------
// ControlId
// ---------------------------------------------------------------------------

/// A validated control identifier (`"4.2.1"`).
///
/// Construction goes through [`ControlId::parse`], so a held value is always
/// well-formed. Serde deserialization validates too; malformed ids are
/// rejected at the boundary instead of surfacing later as lookup misses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ControlId(String);

impl ControlId {
    /// Parses and validates a dotted control id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidControlId`] unless the input is exactly
    /// three non-empty, all-digit segments separated by dots.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() != 3 {
            return Err(CoreError::InvalidControlId(raw.to_string()));
        }
        for seg in &segments {
            if seg.is_empty() || !seg.bytes().all(|b| b.is_ascii_digit()) {
                return Err(CoreError::InvalidControlId(raw.to_string()));
            }
        }
        Ok(Self(raw.to_string()))
    }

    /// The full dotted id (`"4.2.1"`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `category.subcategory` prefix (`"4.2.1"` → `"4.2"`).
    #[must_use]
    pub fn prefix(&self) -> &str {
        let last_dot = self.0.rfind('.').unwrap_or(self.0.len());
        &self.0[..last_dot]
    }

    /// The final segment of the id (`"4.2.1"` → `"1"`).
    #[must_use]
    pub fn item(&self) -> &str {
        let last_dot = self.0.rfind('.').map_or(0, |i| i + 1);
        &self.0[last_dot..]
    }

    /// Whether this is the first sub-requirement of its subcategory
    /// (`*.*.1`). By convention these are foundational policy controls that
    /// require no evidence.
    #[must_use]
    pub fn is_foundational(&self) -> bool {
        self.item() == "1"
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ControlId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ControlId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ControlId> for String {
    fn from(id: ControlId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
