//! Shared error types for the services crate.

use thiserror::Error;

use casebook_core::model::{
    CaseStudyError, JoinCodeError, QuestionId, SessionError, StudentError,
};
use storage::repository::StorageError;

/// Errors emitted while a student joins a session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JoinError {
    /// No session holds the entered code. Terminal; the student needs a
    /// different code, retrying the same one will not help.
    #[error("no session found for that code")]
    UnknownCode,

    /// The session exists but the instructor has ended it.
    #[error("session is no longer active")]
    Inactive,

    /// The session references a case study the store no longer has.
    #[error("case study for this session is missing")]
    MissingCaseStudy,

    #[error(transparent)]
    Code(#[from] JoinCodeError),

    #[error(transparent)]
    Student(#[from] StudentError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while submitting an answer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    #[error("session has ended")]
    Ended,

    #[error("question {0} is not part of the current section")]
    UnknownQuestion(QuestionId),

    #[error("question {0} was already answered")]
    AlreadyAnswered(QuestionId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by in-session navigation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("session has ended")]
    Ended,

    #[error("section {0} is not currently reachable")]
    Blocked(usize),
}

/// Errors emitted by instructor operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstructorError {
    /// Could not find an unused join code in a reasonable number of draws.
    #[error("could not allocate a unique join code")]
    CodeExhausted,

    #[error(transparent)]
    CaseStudy(#[from] CaseStudyError),

    #[error(transparent)]
    Code(#[from] JoinCodeError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
