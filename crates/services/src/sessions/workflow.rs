use std::sync::Arc;

use casebook_core::model::{Answer, JoinCode, QuestionId, Response, ResponseId, Student};
use casebook_core::release::ReleaseOutcome;
use storage::live::{LiveStatus, LiveStatusChannel, LiveStatusUpdates};
use storage::repository::{
    CaseStudyRepository, ResponseRepository, SessionRepository, StorageError, StudentRepository,
};

use super::queries::SessionQueries;
use super::service::{StudentSession, WorkflowStep};
use crate::Clock;
use crate::error::{JoinError, SubmitError};

/// Result of submitting one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitAnswerResult {
    /// Points awarded immediately; `None` means grading is pending.
    pub points: Option<u32>,
    pub section_complete: bool,
    pub step: WorkflowStep,
}

/// Orchestrates the student side of a live session: joining, answering,
/// and reacting to instructor releases.
#[derive(Clone)]
pub struct SessionFlowService {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    case_studies: Arc<dyn CaseStudyRepository>,
    students: Arc<dyn StudentRepository>,
    responses: Arc<dyn ResponseRepository>,
    live: Arc<dyn LiveStatusChannel>,
}

impl SessionFlowService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        case_studies: Arc<dyn CaseStudyRepository>,
        students: Arc<dyn StudentRepository>,
        responses: Arc<dyn ResponseRepository>,
        live: Arc<dyn LiveStatusChannel>,
    ) -> Self {
        Self {
            clock,
            sessions,
            case_studies,
            students,
            responses,
            live,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Joins (or rejoins) a session by code and name, returning the
    /// student's in-memory session state positioned at their resume
    /// section.
    ///
    /// # Errors
    ///
    /// Returns `JoinError` for bad input, unknown codes, ended sessions,
    /// missing case studies, or storage failures.
    pub async fn join(&self, raw_code: &str, raw_name: &str) -> Result<StudentSession, JoinError> {
        let code = JoinCode::parse(raw_code)?;
        let session = SessionQueries::session_for_code(&code, self.sessions.as_ref()).await?;
        if !session.is_active() {
            return Err(JoinError::Inactive);
        }
        let case_study =
            SessionQueries::case_study_for_session(&session, self.case_studies.as_ref()).await?;

        let student = Student::new(raw_name, self.clock.now())?;
        self.students.upsert_student(&student).await?;
        self.sessions
            .add_joined_student(session.id(), student.key())
            .await?;

        let prior =
            SessionQueries::prior_responses(student.key(), session.id(), self.responses.as_ref())
                .await?;

        tracing::info!(
            session = %session.id(),
            student = %student.key(),
            prior_responses = prior.len(),
            "student joined session"
        );

        Ok(StudentSession::new(
            &session,
            case_study,
            student.key().clone(),
            prior,
        ))
    }

    /// Grades and persists an answer to a question in the student's
    /// current section, then folds it into their local state.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::UnknownQuestion` for questions outside the
    /// current section, `SubmitError::AlreadyAnswered` on resubmission
    /// (locally or detected by the store), `SubmitError::Ended` after the
    /// session ended, or `SubmitError::Storage` on backend failures.
    pub async fn submit_answer(
        &self,
        state: &mut StudentSession,
        question_id: QuestionId,
        answer: Answer,
    ) -> Result<SubmitAnswerResult, SubmitError> {
        if state.step() == WorkflowStep::Ended {
            return Err(SubmitError::Ended);
        }
        let Some(question) = state
            .current_section_content()
            .and_then(|section| section.question(question_id))
        else {
            return Err(SubmitError::UnknownQuestion(question_id));
        };
        if state.has_answered(question_id) {
            return Err(SubmitError::AlreadyAnswered(question_id));
        }

        let points = question.grade(&answer);
        let response = Response::new(
            ResponseId::generate(),
            state.session_id(),
            state.student().clone(),
            state.current_section(),
            question_id,
            answer,
            points,
            self.clock.now(),
        );

        match self.responses.append_response(&response).await {
            Ok(_) => {}
            // Another tab of the same student got there first.
            Err(StorageError::Conflict) => return Err(SubmitError::AlreadyAnswered(question_id)),
            Err(other) => return Err(SubmitError::Storage(other)),
        }

        state.record_response(response);
        let section_complete = state.is_current_section_complete();

        tracing::debug!(
            session = %state.session_id(),
            question = %question_id,
            points = ?points,
            section_complete,
            "answer recorded"
        );

        Ok(SubmitAnswerResult {
            points,
            section_complete,
            step: state.step(),
        })
    }

    /// Subscribes to release pushes for a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` on transport failures.
    pub async fn subscribe(
        &self,
        state: &StudentSession,
    ) -> Result<LiveStatusUpdates, StorageError> {
        self.live.subscribe(state.session_id()).await
    }

    /// Applies a live-status push to the student's state and logs what
    /// happened.
    pub fn apply_live_status(
        &self,
        state: &mut StudentSession,
        status: &LiveStatus,
    ) -> ReleaseOutcome {
        let outcome = state.apply_live_status(status);
        if let Some(index) = outcome.auto_advance_to {
            tracing::info!(
                session = %state.session_id(),
                section = index,
                "waiting student advanced to newly released section"
            );
        } else if let Some(index) = outcome.notify {
            tracing::info!(
                session = %state.session_id(),
                section = index,
                "notifying student about newly released section"
            );
        }
        outcome
    }
}
