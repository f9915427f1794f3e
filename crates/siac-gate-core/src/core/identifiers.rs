// crates/siac-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: SIAC Gate Identifiers
// Description: Opaque identifiers for tools and widget-state subjects.
// Purpose: Provide strongly typed, serializable IDs with bounded string forms.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Identifiers serialize as plain strings. Both wrappers validate on
//! construction through `parse` so that every identifier reaching a store or
//! registry already satisfies its length and character limits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum length of a tool name in bytes.
pub const MAX_TOOL_NAME_LENGTH: usize = 64;
/// Maximum length of a subject identifier in characters.
pub const MAX_SUBJECT_ID_LENGTH: usize = 128;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Identifier was empty after trimming.
    #[error("{0} must be non-empty")]
    Empty(&'static str),
    /// Identifier exceeded its length limit.
    #[error("{kind} exceeds {max} characters")]
    TooLong {
        /// Identifier kind label.
        kind: &'static str,
        /// Maximum permitted length.
        max: usize,
    },
    /// Identifier contained a character outside its alphabet.
    #[error("{0} contains an invalid character")]
    InvalidCharacter(&'static str),
}

// ============================================================================
// SECTION: Tool Name
// ============================================================================

/// Registered tool name (e.g. `siac.validate_template`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolName(String);

impl ToolName {
    /// Parses a tool name: ASCII alphanumerics plus `.`, `_` and `-`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the name is empty, too long, or uses
    /// characters outside the tool-name alphabet.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if value.is_empty() {
            return Err(IdentifierError::Empty("tool name"));
        }
        if value.len() > MAX_TOOL_NAME_LENGTH {
            return Err(IdentifierError::TooLong {
                kind: "tool name",
                max: MAX_TOOL_NAME_LENGTH,
            });
        }
        if !value.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-')) {
            return Err(IdentifierError::InvalidCharacter("tool name"));
        }
        Ok(Self(value))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for ToolName {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ToolName> for String {
    fn from(value: ToolName) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Subject Identifier
// ============================================================================

/// Business subject keying widget state (typically a campaign id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    /// Parses a subject identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the identifier is blank, longer than
    /// [`MAX_SUBJECT_ID_LENGTH`] characters, or contains control characters.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(IdentifierError::Empty("subject id"));
        }
        if value.chars().count() > MAX_SUBJECT_ID_LENGTH {
            return Err(IdentifierError::TooLong {
                kind: "subject id",
                max: MAX_SUBJECT_ID_LENGTH,
            });
        }
        if value.chars().any(char::is_control) {
            return Err(IdentifierError::InvalidCharacter("subject id"));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SubjectId> for String {
    fn from(value: SubjectId) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap for clarity."
    )]

    use super::*;

    #[test]
    fn tool_name_rejects_spaces() {
        assert_eq!(
            ToolName::parse("siac validate"),
            Err(IdentifierError::InvalidCharacter("tool name"))
        );
    }

    #[test]
    fn tool_name_accepts_dotted_names() {
        let name = ToolName::parse("siac.get_campaign_metrics").unwrap();
        assert_eq!(name.as_str(), "siac.get_campaign_metrics");
    }

    #[test]
    fn subject_id_rejects_control_characters() {
        assert!(SubjectId::parse("camp\n1").is_err());
        assert!(SubjectId::parse("   ").is_err());
    }

    #[test]
    fn subject_id_length_is_counted_in_characters() {
        let exact = "é".repeat(MAX_SUBJECT_ID_LENGTH);
        assert!(SubjectId::parse(exact).is_ok());
        let over = "a".repeat(MAX_SUBJECT_ID_LENGTH + 1);
        assert!(SubjectId::parse(over).is_err());
    }

    #[test]
    fn subject_id_deserializes_through_validation() {
        let err = serde_json::from_str::<SubjectId>("\"\"");
        assert!(err.is_err());
        let ok: SubjectId = serde_json::from_str("\"c1\"").unwrap();
        assert_eq!(ok.as_str(), "c1");
    }
}
