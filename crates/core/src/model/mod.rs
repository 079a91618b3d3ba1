mod case_study;
mod ids;
mod response;
mod session;
mod student;

pub use case_study::{CaseStudy, CaseStudyError, Question, QuestionKind, Section, SectionKind};
pub use ids::{CaseStudyId, ParseIdError, QuestionId, ResponseId, SessionId};

pub use response::{Answer, Response};
pub use session::{JoinCode, JoinCodeError, ReleasedSections, Session, SessionError};
pub use student::{Student, StudentError, StudentKey};
