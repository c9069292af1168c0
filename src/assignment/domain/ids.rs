//! Identifier and validated scalar types for the assignment domain.

use super::AssignmentDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest identifier, name or label accepted, in characters. Matches the
/// `VARCHAR(255)` columns of the Postgres schema.
pub const MAX_TEXT_LEN: usize = 255;

/// Trims `raw` and rejects the result when it is empty or longer than
/// [`MAX_TEXT_LEN`] characters.
fn non_empty(
    raw: String,
    empty_error: AssignmentDomainError,
) -> Result<String, AssignmentDomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(empty_error);
    }
    let length = trimmed.chars().count();
    if length > MAX_TEXT_LEN {
        return Err(AssignmentDomainError::TooLong {
            field: empty_error.field(),
            length,
        });
    }
    if trimmed.len() == raw.len() {
        return Ok(raw);
    }
    Ok(trimmed.to_owned())
}

/// Externally supplied pull request identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullRequestId(String);

impl PullRequestId {
    /// Creates a validated pull request identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentDomainError::EmptyPullRequestId`] when the value is
    /// blank, or [`AssignmentDomainError::TooLong`] past [`MAX_TEXT_LEN`].
    pub fn new(value: impl Into<String>) -> Result<Self, AssignmentDomainError> {
        non_empty(value.into(), AssignmentDomainError::EmptyPullRequestId).map(Self)
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PullRequestId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PullRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Externally supplied user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a validated user identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentDomainError::EmptyUserId`] when the value is blank,
    /// or [`AssignmentDomainError::TooLong`] past [`MAX_TEXT_LEN`].
    pub fn new(value: impl Into<String>) -> Result<Self, AssignmentDomainError> {
        non_empty(value.into(), AssignmentDomainError::EmptyUserId).map(Self)
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique team name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamName(String);

impl TeamName {
    /// Creates a validated team name.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentDomainError::EmptyTeamName`] when the value is
    /// blank, or [`AssignmentDomainError::TooLong`] past [`MAX_TEXT_LEN`].
    pub fn new(value: impl Into<String>) -> Result<Self, AssignmentDomainError> {
        non_empty(value.into(), AssignmentDomainError::EmptyTeamName).map(Self)
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TeamName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TeamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable label; used for pull request titles and user display
/// names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    /// Creates a display name, reporting `empty_error` when it is blank.
    ///
    /// # Errors
    ///
    /// Returns `empty_error` when the value is blank after trimming, or
    /// [`AssignmentDomainError::TooLong`] past [`MAX_TEXT_LEN`].
    pub fn new(
        value: impl Into<String>,
        empty_error: AssignmentDomainError,
    ) -> Result<Self, AssignmentDomainError> {
        non_empty(value.into(), empty_error).map(Self)
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
