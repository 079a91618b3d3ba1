use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CaseStudyId, SessionId};
use crate::model::student::StudentKey;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum JoinCodeError {
    #[error("join code cannot be empty")]
    Empty,

    #[error("join code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session is no longer active")]
    Inactive,

    #[error("section {index} is beyond the case study ({sections} sections)")]
    SectionOutOfRange { index: usize, sections: usize },
}

//
// ─── JOIN CODE ─────────────────────────────────────────────────────────────────
//

/// Human-enterable token students type to join a session.
///
/// Normalized to uppercase with surrounding whitespace stripped so the
/// code a student types on a phone matches the one on the projector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JoinCode(String);

impl JoinCode {
    /// Normalizes and validates raw join-code input.
    ///
    /// # Errors
    ///
    /// Returns `JoinCodeError::Empty` for blank input and
    /// `JoinCodeError::InvalidCharacter` for anything outside ASCII
    /// letters and digits.
    pub fn parse(raw: &str) -> Result<Self, JoinCodeError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(JoinCodeError::Empty);
        }
        if let Some(bad) = normalized.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(JoinCodeError::InvalidCharacter(bad));
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── RELEASED SECTIONS ─────────────────────────────────────────────────────────
//

/// The set of section indices the instructor has made visible.
///
/// Guaranteed non-empty: legacy sessions persisted without a release set
/// normalize to `{0}`. Sections are treated as available up to the
/// maximum released index, even when the announced indices are not
/// contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasedSections(BTreeSet<usize>);

impl ReleasedSections {
    /// Builds a release set, normalizing the empty set to `{0}`.
    #[must_use]
    pub fn new(indices: BTreeSet<usize>) -> Self {
        if indices.is_empty() {
            Self::initial()
        } else {
            Self(indices)
        }
    }

    /// The release set every session starts with: only section 0.
    #[must_use]
    pub fn initial() -> Self {
        Self(BTreeSet::from([0]))
    }

    /// Highest released index; everything at or below it is available.
    #[must_use]
    pub fn max(&self) -> usize {
        // Non-empty by construction.
        *self.0.iter().next_back().unwrap_or(&0)
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    #[must_use]
    pub fn indices(&self) -> &BTreeSet<usize> {
        &self.0
    }

    /// Marks one more section as released.
    pub fn release(&mut self, index: usize) {
        self.0.insert(index);
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<usize> for ReleasedSections {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// A running instance of a case study.
///
/// Created by the instructor, mutated by instructor actions (release the
/// next section, end the session) and by students joining. Terminal once
/// `active` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    code: JoinCode,
    case_study_id: CaseStudyId,
    released_sections: ReleasedSections,
    active: bool,
    students_joined: BTreeSet<StudentKey>,
    created_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new(
        id: SessionId,
        code: JoinCode,
        case_study_id: CaseStudyId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code,
            case_study_id,
            released_sections: ReleasedSections::initial(),
            active: true,
            students_joined: BTreeSet::new(),
            created_at,
        }
    }

    /// Rehydrates a session from persisted storage.
    #[must_use]
    pub fn from_persisted(
        id: SessionId,
        code: JoinCode,
        case_study_id: CaseStudyId,
        released_sections: ReleasedSections,
        active: bool,
        students_joined: BTreeSet<StudentKey>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code,
            case_study_id,
            released_sections,
            active,
            students_joined,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn code(&self) -> &JoinCode {
        &self.code
    }

    #[must_use]
    pub fn case_study_id(&self) -> CaseStudyId {
        self.case_study_id
    }

    #[must_use]
    pub fn released_sections(&self) -> &ReleasedSections {
        &self.released_sections
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn students_joined(&self) -> &BTreeSet<StudentKey> {
        &self.students_joined
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Releases the next unreleased section.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Inactive` on an ended session and
    /// `SessionError::SectionOutOfRange` when every section of the case
    /// study (of `section_count` sections) is already released.
    pub fn release_next_section(&mut self, section_count: usize) -> Result<usize, SessionError> {
        if !self.active {
            return Err(SessionError::Inactive);
        }
        let next = self.released_sections.max() + 1;
        if next >= section_count {
            return Err(SessionError::SectionOutOfRange {
                index: next,
                sections: section_count,
            });
        }
        self.released_sections.release(next);
        Ok(next)
    }

    /// Records a student as joined. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Inactive` on an ended session.
    pub fn join(&mut self, student: StudentKey) -> Result<(), SessionError> {
        if !self.active {
            return Err(SessionError::Inactive);
        }
        self.students_joined.insert(student);
        Ok(())
    }

    /// Ends the session. Idempotent; ended sessions stay ended.
    pub fn end(&mut self) {
        self.active = false;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
