mod progress;
mod queries;
mod service;
mod workflow;

// Public API of the student session subsystem.
pub use progress::StudentProgress;
pub use service::{StudentSession, WorkflowStep};
pub use workflow::{SessionFlowService, SubmitAnswerResult};
