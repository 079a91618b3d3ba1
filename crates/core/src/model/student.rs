use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudentError {
    #[error("student name cannot be empty")]
    EmptyName,
}

//
// ─── STUDENT KEY ───────────────────────────────────────────────────────────────
//

/// Identity key for a student, normalized for case and whitespace.
///
/// "Ada  Lovelace " and "ada lovelace" must resolve to the same identity,
/// otherwise a student who retypes their name creates a duplicate record
/// and loses their recorded responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentKey(String);

impl StudentKey {
    /// Normalizes raw name input into an identity key.
    ///
    /// Lowercases, trims, and collapses runs of inner whitespace.
    ///
    /// # Errors
    ///
    /// Returns `StudentError::EmptyName` when nothing remains after
    /// normalization.
    pub fn parse(raw: &str) -> Result<Self, StudentError> {
        let normalized = raw
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        if normalized.is_empty() {
            return Err(StudentError::EmptyName);
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── STUDENT ───────────────────────────────────────────────────────────────────
//

/// An identity record for a joined student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    key: StudentKey,
    display_name: String,
    created_at: DateTime<Utc>,
}

impl Student {
    /// Creates a student record from raw name input.
    ///
    /// # Errors
    ///
    /// Returns `StudentError::EmptyName` for blank input.
    pub fn new(raw_name: &str, created_at: DateTime<Utc>) -> Result<Self, StudentError> {
        let key = StudentKey::parse(raw_name)?;
        Ok(Self {
            key,
            display_name: raw_name.trim().to_owned(),
            created_at,
        })
    }

    /// Rehydrates a student record from persisted storage.
    #[must_use]
    pub fn from_persisted(
        key: StudentKey,
        display_name: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            display_name,
            created_at,
        }
    }

    #[must_use]
    pub fn key(&self) -> &StudentKey {
        &self.key
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
