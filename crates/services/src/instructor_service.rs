use std::sync::Arc;

use rand::Rng;

use casebook_core::model::{
    CaseStudyId, JoinCode, Response, ResponseId, Session, SessionId, StudentKey,
};
use storage::live::{LiveStatus, LiveStatusChannel};
use storage::repository::{
    CaseStudyRepository, ResponseRepository, SessionRepository, StorageError,
};

use crate::Clock;
use crate::error::InstructorError;

// Unambiguous alphabet: no 0/O, 1/I/L so codes survive a projector.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;
const MAX_CODE_ATTEMPTS: usize = 32;

/// Instructor-side operations: starting sessions, pacing releases,
/// ending sessions, and grading open-ended responses.
#[derive(Clone)]
pub struct InstructorService {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    case_studies: Arc<dyn CaseStudyRepository>,
    responses: Arc<dyn ResponseRepository>,
    live: Arc<dyn LiveStatusChannel>,
}

impl InstructorService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        case_studies: Arc<dyn CaseStudyRepository>,
        responses: Arc<dyn ResponseRepository>,
        live: Arc<dyn LiveStatusChannel>,
    ) -> Self {
        Self {
            clock,
            sessions,
            case_studies,
            responses,
            live,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn generate_code() -> Result<JoinCode, InstructorError> {
        let mut rng = rand::rng();
        let raw: String = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Ok(JoinCode::parse(&raw)?)
    }

    /// Starts a new session for a case study with a fresh join code.
    /// Only section 0 is released.
    ///
    /// # Errors
    ///
    /// Returns `InstructorError::Storage` when the case study is missing
    /// or the backend fails, and `InstructorError::CodeExhausted` when no
    /// unique join code could be drawn.
    pub async fn create_session(
        &self,
        case_study_id: CaseStudyId,
    ) -> Result<Session, InstructorError> {
        // Fail before allocating anything if the study does not exist.
        self.case_studies.get_case_study(case_study_id).await?;
        let id = self.sessions.next_session_id().await?;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = Self::generate_code()?;
            let session = Session::new(id, code, case_study_id, self.clock.now());
            match self.sessions.upsert_session(&session).await {
                Ok(()) => {
                    tracing::info!(
                        session = %session.id(),
                        code = %session.code(),
                        case_study = %case_study_id,
                        "session created"
                    );
                    return Ok(session);
                }
                Err(StorageError::Conflict) => continue,
                Err(other) => return Err(other.into()),
            }
        }
        Err(InstructorError::CodeExhausted)
    }

    /// Releases the next section and pushes the new release set to all
    /// subscribed students.
    ///
    /// # Errors
    ///
    /// Returns `InstructorError::Session` when the session has ended or
    /// every section is already out, and `InstructorError::Storage` on
    /// backend failures.
    pub async fn release_next_section(
        &self,
        session_id: SessionId,
    ) -> Result<usize, InstructorError> {
        let mut session = self.sessions.get_session_by_id(session_id).await?;
        let study = self
            .case_studies
            .get_case_study(session.case_study_id())
            .await?;

        let index = session.release_next_section(study.len())?;
        self.sessions
            .set_released_sections(session_id, session.released_sections())
            .await?;

        let status = LiveStatus {
            released_sections: session.released_sections().clone(),
            current_section: index,
        };
        self.live.publish(session_id, status).await?;

        tracing::info!(session = %session_id, section = index, "section released");
        Ok(index)
    }

    /// Ends a session. Students can no longer join or submit.
    ///
    /// # Errors
    ///
    /// Returns `InstructorError::Storage` when the session is missing or
    /// the backend fails.
    pub async fn end_session(&self, session_id: SessionId) -> Result<(), InstructorError> {
        self.sessions.set_active(session_id, false).await?;
        tracing::info!(session = %session_id, "session ended");
        Ok(())
    }

    /// One student's responses, in submission order, for review and
    /// grading.
    ///
    /// # Errors
    ///
    /// Returns `InstructorError::Storage` on backend failures.
    pub async fn student_responses(
        &self,
        session_id: SessionId,
        student: &StudentKey,
    ) -> Result<Vec<Response>, InstructorError> {
        let responses = self.responses.list_responses(student, session_id).await?;
        Ok(responses)
    }

    /// Awards points for a response that was pending manual grading.
    ///
    /// # Errors
    ///
    /// Returns `InstructorError::Storage` when the response is missing or
    /// the backend fails.
    pub async fn grade_response(
        &self,
        response_id: ResponseId,
        points: u32,
    ) -> Result<(), InstructorError> {
        self.responses.set_points(response_id, points).await?;
        tracing::info!(response = %response_id, points, "response graded");
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
