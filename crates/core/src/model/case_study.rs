use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CaseStudyId, QuestionId};
use crate::model::response::Answer;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CaseStudyError {
    #[error("case study title cannot be empty")]
    EmptyTitle,

    #[error("case study must contain at least one section")]
    NoSections,

    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("multiple choice question needs at least two options")]
    TooFewOptions,

    #[error("correct answer index {correct} is out of range for {options} options")]
    CorrectAnswerOutOfRange { correct: usize, options: usize },

    #[error("duplicate question id {0} within a case study")]
    DuplicateQuestionId(QuestionId),
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

/// Shape of a question, including whatever data its kind needs to grade itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    /// Graded at submit time against `correct`.
    MultipleChoice { options: Vec<String>, correct: usize },
    /// Collects an opinion; every selection earns full points.
    MultipleChoiceFeedback { options: Vec<String> },
    /// Short free-text answer, graded externally.
    Text,
    /// Long-form answer, graded externally.
    Essay,
}

/// One question inside a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    points: u32,
    kind: QuestionKind,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `CaseStudyError::EmptyPrompt` for a blank prompt,
    /// `CaseStudyError::TooFewOptions` or
    /// `CaseStudyError::CorrectAnswerOutOfRange` for malformed choice lists.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        points: u32,
        kind: QuestionKind,
    ) -> Result<Self, CaseStudyError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(CaseStudyError::EmptyPrompt);
        }
        match &kind {
            QuestionKind::MultipleChoice { options, correct } => {
                if options.len() < 2 {
                    return Err(CaseStudyError::TooFewOptions);
                }
                if *correct >= options.len() {
                    return Err(CaseStudyError::CorrectAnswerOutOfRange {
                        correct: *correct,
                        options: options.len(),
                    });
                }
            }
            QuestionKind::MultipleChoiceFeedback { options } => {
                if options.len() < 2 {
                    return Err(CaseStudyError::TooFewOptions);
                }
            }
            QuestionKind::Text | QuestionKind::Essay => {}
        }
        Ok(Self {
            id,
            prompt,
            points,
            kind,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    /// Points awarded at submit time, or `None` when grading is deferred
    /// to an external grader (text and essay answers).
    ///
    /// Multiple choice earns full points only for the correct option.
    /// Feedback questions collect opinion, so every selection earns full
    /// points. A choice answer to a text question (or vice versa) is
    /// treated like a wrong answer rather than rejected.
    #[must_use]
    pub fn grade(&self, answer: &Answer) -> Option<u32> {
        match (&self.kind, answer) {
            (QuestionKind::MultipleChoice { correct, .. }, Answer::Choice(selected)) => {
                Some(if selected == correct { self.points } else { 0 })
            }
            (QuestionKind::MultipleChoice { .. }, Answer::Text(_)) => Some(0),
            (QuestionKind::MultipleChoiceFeedback { .. }, _) => Some(self.points),
            (QuestionKind::Text | QuestionKind::Essay, _) => None,
        }
    }
}

//
// ─── SECTIONS ──────────────────────────────────────────────────────────────────
//

/// What a section asks of the student while it is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Reading,
    Discussion,
    Activity,
}

/// One unit of case-study content with zero or more questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    kind: SectionKind,
    title: String,
    body: String,
    questions: Vec<Question>,
}

impl Section {
    #[must_use]
    pub fn new(
        kind: SectionKind,
        title: impl Into<String>,
        body: impl Into<String>,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            questions,
        }
    }

    #[must_use]
    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn has_questions(&self) -> bool {
        !self.questions.is_empty()
    }
}

//
// ─── CASE STUDY ────────────────────────────────────────────────────────────────
//

/// An ordered sequence of sections an instructor releases one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseStudy {
    id: CaseStudyId,
    title: String,
    sections: Vec<Section>,
}

impl CaseStudy {
    /// Creates a validated case study.
    ///
    /// # Errors
    ///
    /// Returns `CaseStudyError::EmptyTitle` or `CaseStudyError::NoSections`
    /// for structurally empty input, and
    /// `CaseStudyError::DuplicateQuestionId` if two questions anywhere in
    /// the study share an id (responses are matched by question id, so ids
    /// must be unique study-wide).
    pub fn new(
        id: CaseStudyId,
        title: impl Into<String>,
        sections: Vec<Section>,
    ) -> Result<Self, CaseStudyError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CaseStudyError::EmptyTitle);
        }
        if sections.is_empty() {
            return Err(CaseStudyError::NoSections);
        }

        let mut seen = std::collections::HashSet::new();
        for section in &sections {
            for question in section.questions() {
                if !seen.insert(question.id()) {
                    return Err(CaseStudyError::DuplicateQuestionId(question.id()));
                }
            }
        }

        Ok(Self {
            id,
            title,
            sections,
        })
    }

    #[must_use]
    pub fn id(&self) -> CaseStudyId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn choice_question(id: u64, correct: usize) -> Question {
        Question::new(
            QuestionId::new(id),
            "Pick one",
            10,
            QuestionKind::MultipleChoice {
                options: vec!["a".into(), "b".into(), "c".into()],
                correct,
            },
        )
        .unwrap()
    }

    #[test]
    fn multiple_choice_grades_at_submit_time() {
        let q = choice_question(1, 1);
        assert_eq!(q.grade(&Answer::Choice(1)), Some(10));
        assert_eq!(q.grade(&Answer::Choice(0)), Some(0));
        assert_eq!(q.grade(&Answer::Choice(2)), Some(0));
    }

    #[test]
    fn feedback_choice_always_earns_full_points() {
        let q = Question::new(
            QuestionId::new(1),
            "How do you feel about this?",
            5,
            QuestionKind::MultipleChoiceFeedback {
                options: vec!["agree".into(), "disagree".into()],
            },
        )
        .unwrap();

        assert_eq!(q.grade(&Answer::Choice(0)), Some(5));
        assert_eq!(q.grade(&Answer::Choice(1)), Some(5));
    }

    #[test]
    fn open_ended_answers_stay_ungraded() {
        let text = Question::new(QuestionId::new(1), "Explain", 20, QuestionKind::Text).unwrap();
        let essay = Question::new(QuestionId::new(2), "Discuss", 30, QuestionKind::Essay).unwrap();

        assert_eq!(text.grade(&Answer::Text("because".into())), None);
        assert_eq!(essay.grade(&Answer::Text("therefore".into())), None);
    }

    #[test]
    fn correct_answer_must_index_options() {
        let err = Question::new(
            QuestionId::new(1),
            "Pick one",
            10,
            QuestionKind::MultipleChoice {
                options: vec!["a".into(), "b".into()],
                correct: 2,
            },
        )
        .unwrap_err();

        assert!(matches!(
            err,
            CaseStudyError::CorrectAnswerOutOfRange {
                correct: 2,
                options: 2
            }
        ));
    }

    #[test]
    fn case_study_rejects_duplicate_question_ids() {
        let sections = vec![
            Section::new(
                SectionKind::Reading,
                "One",
                "...",
                vec![choice_question(7, 0)],
            ),
            Section::new(
                SectionKind::Discussion,
                "Two",
                "...",
                vec![choice_question(7, 1)],
            ),
        ];

        let err = CaseStudy::new(CaseStudyId::new(1), "Study", sections).unwrap_err();
        assert!(matches!(err, CaseStudyError::DuplicateQuestionId(_)));
    }

    #[test]
    fn case_study_requires_sections() {
        let err = CaseStudy::new(CaseStudyId::new(1), "Study", Vec::new()).unwrap_err();
        assert!(matches!(err, CaseStudyError::NoSections));
    }
}
