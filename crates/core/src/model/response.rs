use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, ResponseId, SessionId};
use crate::model::student::StudentKey;

/// Payload a student submits for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// Index into a multiple-choice option list.
    Choice(usize),
    /// Free text for text/essay questions.
    Text(String),
}

/// One student's recorded answer to one question within one session.
///
/// `points` is `None` until grading happens: multiple-choice answers are
/// graded synchronously at submit time, open-ended answers wait for an
/// external grading actor. "Answered" for progress purposes only means
/// this record exists, graded or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    id: ResponseId,
    session_id: SessionId,
    student: StudentKey,
    section_index: usize,
    question_id: QuestionId,
    answer: Answer,
    points: Option<u32>,
    submitted_at: DateTime<Utc>,
}

impl Response {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ResponseId,
        session_id: SessionId,
        student: StudentKey,
        section_index: usize,
        question_id: QuestionId,
        answer: Answer,
        points: Option<u32>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            session_id,
            student,
            section_index,
            question_id,
            answer,
            points,
            submitted_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> ResponseId {
        self.id
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
    pub fn section_index(&self) -> usize {
        self.section_index
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn answer(&self) -> &Answer {
        &self.answer
    }

    #[must_use]
    pub fn points(&self) -> Option<u32> {
        self.points
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// True once points have been awarded (synchronously or by the
    /// external grader).
    #[must_use]
    pub fn is_graded(&self) -> bool {
        self.points.is_some()
    }

    /// Applies points set by an external grading actor, moving an
    /// open-ended response out of the pending state.
    pub fn set_points(&mut self, points: u32) {
        self.points = Some(points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn build_response(points: Option<u32>) -> Response {
        Response::new(
            ResponseId::generate(),
            SessionId::new(1),
            StudentKey::parse("ada").unwrap(),
            0,
            QuestionId::new(5),
            Answer::Text("because".into()),
            points,
            fixed_now(),
        )
    }

    #[test]
    fn ungraded_response_is_pending() {
        let response = build_response(None);
        assert!(!response.is_graded());
    }

    #[test]
    fn external_grading_transitions_out_of_pending() {
        let mut response = build_response(None);
        response.set_points(15);
        assert!(response.is_graded());
        assert_eq!(response.points(), Some(15));
    }
}
