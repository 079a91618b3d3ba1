#![forbid(unsafe_code)]

pub mod error;
pub mod instructor_service;
pub mod sessions;

pub use casebook_core::Clock;

pub use error::{InstructorError, JoinError, NavigationError, SubmitError};
pub use instructor_service::InstructorService;
pub use sessions::{
    SessionFlowService, StudentProgress, StudentSession, SubmitAnswerResult, WorkflowStep,
};
