use std::collections::BTreeSet;
use std::fmt;

use casebook_core::model::{
    CaseStudy, ReleasedSections, Response, Section, Session, SessionId, StudentKey,
};
use casebook_core::progress::{ProgressView, derive_progress};
use casebook_core::release::{ReleaseOutcome, ReleaseReconciler, StudentStep};
use storage::live::LiveStatus;

use super::progress::StudentProgress;
use crate::error::NavigationError;

//
// ─── WORKFLOW STEP ─────────────────────────────────────────────────────────────
//

/// Where the student is in the session flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    /// Working through the current section.
    Reading,
    /// Finished the current section's questions, looking over feedback.
    Review,
    /// Everything released is done; parked until the instructor releases
    /// more.
    Waiting,
    /// The session was ended by the instructor.
    Ended,
}

impl WorkflowStep {
    fn as_student_step(self) -> Option<StudentStep> {
        match self {
            WorkflowStep::Reading => Some(StudentStep::Reading),
            WorkflowStep::Review => Some(StudentStep::Review),
            WorkflowStep::Waiting => Some(StudentStep::Waiting),
            WorkflowStep::Ended => None,
        }
    }
}

//
// ─── STUDENT SESSION ───────────────────────────────────────────────────────────
//

/// In-memory state for one student working through one live session.
///
/// Owns the release baseline and the current position; one instance per
/// browser-tab equivalent. Two instances for the same student each keep
/// their own baseline, an accepted inconsistency of the design.
pub struct StudentSession {
    session_id: SessionId,
    student: StudentKey,
    case_study: CaseStudy,
    released: ReleasedSections,
    responses: Vec<Response>,
    visited: BTreeSet<usize>,
    current_section: usize,
    step: WorkflowStep,
    reconciler: ReleaseReconciler,
}

impl StudentSession {
    /// Builds the session state for a student who just joined (or
    /// rejoined), placing them at their resume section.
    #[must_use]
    pub fn new(
        session: &Session,
        case_study: CaseStudy,
        student: StudentKey,
        responses: Vec<Response>,
    ) -> Self {
        let released = session.released_sections().clone();
        let reconciler = ReleaseReconciler::new(&released);

        let mut state = Self {
            session_id: session.id(),
            student,
            case_study,
            released,
            responses,
            visited: BTreeSet::new(),
            current_section: 0,
            step: WorkflowStep::Reading,
            reconciler,
        };

        let view = state.derive();
        state.enter_section(view.resume_index);
        // A returning student who already finished everything released
        // goes straight to the waiting screen.
        let view = state.derive();
        if view.completed.contains(&state.current_section) && !view.can_advance {
            state.step = WorkflowStep::Waiting;
        }
        state
    }

    fn derive(&self) -> ProgressView {
        derive_progress(
            self.case_study.sections(),
            &self.responses,
            &self.visited,
            &self.released,
        )
    }

    /// Entering a section marks it visited; that is what completes a
    /// question-free section.
    fn enter_section(&mut self, index: usize) {
        self.current_section = index;
        self.visited.insert(index);
        self.step = WorkflowStep::Reading;
        // Reaching the advertised section makes its notification moot.
        if self.reconciler.pending().is_some_and(|p| index >= p) {
            self.reconciler.dismiss();
        }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn student(&self) -> &StudentKey {
        &self.student
    }

    #[must_use]
    pub fn case_study(&self) -> &CaseStudy {
        &self.case_study
    }

    #[must_use]
    pub fn released(&self) -> &ReleasedSections {
        &self.released
    }

    #[must_use]
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    #[must_use]
    pub fn current_section(&self) -> usize {
        self.current_section
    }

    /// Content of the section the student is on. `None` only if the case
    /// study was edited out from under a live session.
    #[must_use]
    pub fn current_section_content(&self) -> Option<&Section> {
        self.case_study.section(self.current_section)
    }

    #[must_use]
    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    /// The section a pending "new section available" notification points
    /// at, if any.
    #[must_use]
    pub fn notification(&self) -> Option<usize> {
        self.reconciler.pending()
    }

    /// Returns a summary of the student's current progress.
    #[must_use]
    pub fn progress(&self) -> StudentProgress {
        let view = self.derive();
        StudentProgress {
            total_sections: self.case_study.len(),
            completed_sections: view.completed.len(),
            current_section: self.current_section,
            resume_index: view.resume_index,
            can_advance: view.can_advance,
            can_retreat: view.can_retreat,
        }
    }

    /// Whether this student already answered the given question.
    #[must_use]
    pub fn has_answered(&self, question_id: casebook_core::model::QuestionId) -> bool {
        self.responses
            .iter()
            .any(|r| r.question_id() == question_id)
    }

    /// Whether the section the student is on counts as complete.
    #[must_use]
    pub fn is_current_section_complete(&self) -> bool {
        self.derive().completed.contains(&self.current_section)
    }

    pub(crate) fn record_response(&mut self, response: Response) {
        self.responses.push(response);
        let view = self.derive();
        if view.completed.contains(&self.current_section) {
            self.step = WorkflowStep::Review;
        }
    }

    /// Leaves the review screen: advances when the next section is
    /// available, otherwise parks the student on the waiting screen.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::Ended` after the session has ended.
    pub fn continue_from_review(&mut self) -> Result<WorkflowStep, NavigationError> {
        if self.step == WorkflowStep::Ended {
            return Err(NavigationError::Ended);
        }
        let view = self.derive();
        if casebook_core::progress::can_advance_from(
            self.current_section,
            self.case_study.sections(),
            &view.completed,
            &self.released,
        ) {
            self.enter_section(self.current_section + 1);
        } else if view.completed.contains(&self.current_section) {
            self.step = WorkflowStep::Waiting;
        }
        Ok(self.step)
    }

    /// Steps forward to the next section.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::Ended` after the session has ended, or
    /// `NavigationError::Blocked` when the next section is unreleased,
    /// missing, or the current one is unfinished.
    pub fn advance(&mut self) -> Result<usize, NavigationError> {
        if self.step == WorkflowStep::Ended {
            return Err(NavigationError::Ended);
        }
        let view = self.derive();
        let next = self.current_section + 1;
        if !casebook_core::progress::can_advance_from(
            self.current_section,
            self.case_study.sections(),
            &view.completed,
            &self.released,
        ) {
            return Err(NavigationError::Blocked(next));
        }
        self.enter_section(next);
        Ok(next)
    }

    /// Steps back to the previous section.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::Ended` after the session has ended, or
    /// `NavigationError::Blocked` at section 0.
    pub fn retreat(&mut self) -> Result<usize, NavigationError> {
        if self.step == WorkflowStep::Ended {
            return Err(NavigationError::Ended);
        }
        if !casebook_core::progress::can_retreat_from(self.current_section, &self.released) {
            return Err(NavigationError::Blocked(
                self.current_section.saturating_sub(1),
            ));
        }
        let previous = self.current_section - 1;
        self.enter_section(previous);
        Ok(previous)
    }

    /// Jumps directly to a released section.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::Ended` after the session has ended, or
    /// `NavigationError::Blocked` for unreleased or missing sections.
    pub fn go_to(&mut self, index: usize) -> Result<(), NavigationError> {
        if self.step == WorkflowStep::Ended {
            return Err(NavigationError::Ended);
        }
        if !casebook_core::progress::can_navigate_to(index, &self.released)
            || index >= self.case_study.len()
        {
            return Err(NavigationError::Blocked(index));
        }
        self.enter_section(index);
        Ok(())
    }

    /// Feeds a live-status push through the reconciler and applies
    /// whatever it decides: waiting students move on automatically,
    /// active students may get a pending notification.
    pub fn apply_live_status(&mut self, status: &LiveStatus) -> ReleaseOutcome {
        let Some(step) = self.step.as_student_step() else {
            return ReleaseOutcome::default();
        };

        let outcome =
            self.reconciler
                .on_live_update(&status.released_sections, step, self.current_section);

        // The baseline is the union of everything seen; adopt it as the
        // local release frontier.
        self.released = ReleasedSections::new(self.reconciler.known_released().clone());

        if let Some(index) = outcome.auto_advance_to {
            self.enter_section(index);
        }
        outcome
    }

    /// Clears a pending notification without moving the student.
    pub fn dismiss_notification(&mut self) {
        self.reconciler.dismiss();
    }

    /// Jumps to the section a pending notification advertises.
    pub fn accept_notification(&mut self) -> Option<usize> {
        let index = self.reconciler.accept()?;
        self.enter_section(index);
        Some(index)
    }

    /// Marks the session as ended for this student.
    pub fn end(&mut self) {
        self.step = WorkflowStep::Ended;
    }
}

impl fmt::Debug for StudentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudentSession")
            .field("session_id", &self.session_id)
            .field("student", &self.student)
            .field("current_section", &self.current_section)
            .field("step", &self.step)
            .field("responses_len", &self.responses.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
