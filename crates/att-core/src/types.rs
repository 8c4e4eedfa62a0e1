//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// A normalized employee badge identifier.
///
/// Badge readers report ids with inconsistent zero-padding (`007`, `0007`,
/// `7` all name the same employee), so the raw string is normalized on
/// construction: surrounding whitespace trimmed, leading zeros stripped,
/// and an all-zero id canonicalized to `"0"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmployeeId(String);

impl EmployeeId {
    /// Creates a normalized id from a raw badge string.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty {
                field: "employee id",
            });
        }
        let stripped = trimmed.trim_start_matches('0');
        if stripped.is_empty() {
            // All zeros collapse to a single canonical zero id.
            Ok(Self("0".to_string()))
        } else {
            Ok(Self(stripped.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmployeeId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmployeeId> for String {
    fn from(id: EmployeeId) -> Self {
        id.0
    }
}

impl std::str::FromStr for EmployeeId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_zeros() {
        assert_eq!(EmployeeId::new("007").unwrap().as_str(), "7");
        assert_eq!(EmployeeId::new("0042").unwrap().as_str(), "42");
        assert_eq!(EmployeeId::new("42").unwrap().as_str(), "42");
    }

    #[test]
    fn all_zero_id_is_canonical_zero() {
        assert_eq!(EmployeeId::new("0").unwrap().as_str(), "0");
        assert_eq!(EmployeeId::new("0000").unwrap().as_str(), "0");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(EmployeeId::new("  017 ").unwrap().as_str(), "17");
    }

    #[test]
    fn rejects_empty() {
        assert!(EmployeeId::new("").is_err());
        assert!(EmployeeId::new("   ").is_err());
    }

    #[test]
    fn serde_roundtrip_normalizes() {
        let id: EmployeeId = serde_json::from_str("\"0099\"").unwrap();
        assert_eq!(id.as_str(), "99");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"99\"");
    }

    #[test]
    fn serde_rejects_empty() {
        let result: Result<EmployeeId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
