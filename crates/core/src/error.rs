use thiserror::Error;

use crate::model::{CaseStudyError, JoinCodeError, SessionError, StudentError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    CaseStudy(#[from] CaseStudyError),
    #[error(transparent)]
    JoinCode(#[from] JoinCodeError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Student(#[from] StudentError),
}
