//! Pure derivation of "where should this student be".
//!
//! The instructor controls which sections are released; the student's
//! recorded responses determine which of those are finished. Everything
//! here is a total function over its inputs: malformed responses that
//! match no question simply never count toward completion.

use std::collections::BTreeSet;

use crate::model::{ReleasedSections, Response, Section};

/// Aggregated progress view handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    /// Section indices the student has finished.
    pub completed: BTreeSet<usize>,
    /// The section a returning or continuing student should be placed at.
    pub resume_index: usize,
    /// Whether the student may step forward from `resume_index`.
    pub can_advance: bool,
    /// Whether the student may step back from `resume_index`.
    pub can_retreat: bool,
}

/// Section indices the student has completed.
///
/// A section counts as complete only while it is released (index at or
/// below the release frontier). A question-bearing section is complete
/// once every one of its questions has a matching response by question
/// id; a question-free section is complete once the caller says the
/// student has visited it (`visited` is a UI-level fact, not derivable
/// from responses).
#[must_use]
pub fn completed_sections(
    sections: &[Section],
    responses: &[Response],
    visited: &BTreeSet<usize>,
    released: &ReleasedSections,
) -> BTreeSet<usize> {
    let max_released = released.max();
    let answered: BTreeSet<_> = responses.iter().map(Response::question_id).collect();

    sections
        .iter()
        .enumerate()
        .filter(|(index, section)| {
            if *index > max_released {
                return false;
            }
            if section.has_questions() {
                section.questions().iter().all(|q| answered.contains(&q.id()))
            } else {
                visited.contains(index)
            }
        })
        .map(|(index, _)| index)
        .collect()
}

/// The first incomplete section within the released range, or the last
/// released section when everything available is finished.
///
/// Never exceeds the release frontier: a student who has finished all
/// released work stays parked on the last released section instead of
/// overflowing into unreleased content.
#[must_use]
pub fn resume_section(
    sections: &[Section],
    responses: &[Response],
    visited: &BTreeSet<usize>,
    released: &ReleasedSections,
) -> usize {
    let max_released = released.max();
    let completed = completed_sections(sections, responses, visited, released);
    (0..=max_released)
        .find(|index| !completed.contains(index))
        .unwrap_or(max_released)
}

/// Whether a student may be placed at `index` at all.
#[must_use]
pub fn can_navigate_to(index: usize, released: &ReleasedSections) -> bool {
    index <= released.max()
}

/// Whether the student may step forward from `current`.
///
/// Requires the next section to be released and to exist, and the
/// current one to be finished.
#[must_use]
pub fn can_advance_from(
    current: usize,
    sections: &[Section],
    completed: &BTreeSet<usize>,
    released: &ReleasedSections,
) -> bool {
    current + 1 <= released.max() && completed.contains(&current) && current + 1 < sections.len()
}

/// Whether the student may step back from `current`.
#[must_use]
pub fn can_retreat_from(current: usize, released: &ReleasedSections) -> bool {
    current > 0 && current - 1 <= released.max()
}

/// Computes the full progress view, with the navigation booleans
/// evaluated at the resume index.
#[must_use]
pub fn derive_progress(
    sections: &[Section],
    responses: &[Response],
    visited: &BTreeSet<usize>,
    released: &ReleasedSections,
) -> ProgressView {
    let completed = completed_sections(sections, responses, visited, released);
    let resume_index = resume_section(sections, responses, visited, released);
    let can_advance = can_advance_from(resume_index, sections, &completed, released);
    let can_retreat = can_retreat_from(resume_index, released);

    ProgressView {
        completed,
        resume_index,
        can_advance,
        can_retreat,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Answer, Question, QuestionId, QuestionKind, ResponseId, SectionKind, SessionId, StudentKey,
    };
    use crate::time::fixed_now;

    fn question(id: u64) -> Question {
        Question::new(QuestionId::new(id), "Explain", 10, QuestionKind::Text).unwrap()
    }

    fn section_with_questions(ids: &[u64]) -> Section {
        Section::new(
            SectionKind::Reading,
            "Section",
            "body",
            ids.iter().map(|id| question(*id)).collect(),
        )
    }

    fn empty_section() -> Section {
        Section::new(SectionKind::Discussion, "Discuss", "body", Vec::new())
    }

    fn response_for(question: u64) -> Response {
        Response::new(
            ResponseId::generate(),
            SessionId::new(1),
            StudentKey::parse("ada").unwrap(),
            0,
            QuestionId::new(question),
            Answer::Text("answer".into()),
            None,
            fixed_now(),
        )
    }

    fn released(indices: &[usize]) -> ReleasedSections {
        indices.iter().copied().collect()
    }

    // Only section 0 released, nothing answered yet.
    #[test]
    fn fresh_student_starts_at_section_zero() {
        let sections = vec![
            section_with_questions(&[1]),
            section_with_questions(&[2]),
            section_with_questions(&[3]),
        ];
        let rel = released(&[0]);
        let visited = BTreeSet::new();

        assert_eq!(resume_section(&sections, &[], &visited, &rel), 0);
        let completed = completed_sections(&sections, &[], &visited, &rel);
        assert!(completed.is_empty());
        assert!(!can_advance_from(0, &sections, &completed, &rel));
    }

    // Two sections released, first one answered.
    #[test]
    fn answered_section_moves_resume_forward() {
        let sections = vec![section_with_questions(&[1]), section_with_questions(&[2])];
        let rel = released(&[0, 1]);
        let visited = BTreeSet::new();
        let responses = vec![response_for(1)];

        let completed = completed_sections(&sections, &responses, &visited, &rel);
        assert_eq!(completed, BTreeSet::from([0]));
        assert_eq!(resume_section(&sections, &responses, &visited, &rel), 1);
        assert!(can_advance_from(0, &sections, &completed, &rel));
    }

    // Everything released is complete; resume stays put.
    #[test]
    fn resume_never_exceeds_release_frontier() {
        let sections = vec![
            section_with_questions(&[1]),
            section_with_questions(&[2]),
            section_with_questions(&[3]),
            section_with_questions(&[4]), // exists but unreleased
        ];
        let rel = released(&[0, 1, 2]);
        let visited = BTreeSet::new();
        let responses = vec![response_for(1), response_for(2), response_for(3)];

        assert_eq!(resume_section(&sections, &responses, &visited, &rel), 2);
    }

    #[test]
    fn resume_is_always_within_released_range() {
        let sections = vec![
            section_with_questions(&[1]),
            empty_section(),
            section_with_questions(&[2]),
        ];
        for max in 0..sections.len() {
            let rel = released(&[max]);
            let resume = resume_section(&sections, &[], &BTreeSet::new(), &rel);
            assert!(resume <= rel.max());
        }
    }

    #[test]
    fn empty_section_completes_only_when_visited() {
        let sections = vec![empty_section(), section_with_questions(&[1])];
        let rel = released(&[0, 1]);

        let unvisited = completed_sections(&sections, &[], &BTreeSet::new(), &rel);
        assert!(unvisited.is_empty());

        let visited = BTreeSet::from([0]);
        let completed = completed_sections(&sections, &[], &visited, &rel);
        assert_eq!(completed, BTreeSet::from([0]));
        assert_eq!(resume_section(&sections, &[], &visited, &rel), 1);
    }

    #[test]
    fn unreleased_section_never_counts_as_completed() {
        // Section 1 is fully answered but sits beyond the frontier.
        let sections = vec![section_with_questions(&[1]), section_with_questions(&[2])];
        let rel = released(&[0]);
        let responses = vec![response_for(2)];

        let completed = completed_sections(&sections, &responses, &BTreeSet::new(), &rel);
        assert!(!completed.contains(&1));
    }

    #[test]
    fn responses_matching_no_question_are_ignored() {
        let sections = vec![section_with_questions(&[1])];
        let rel = released(&[0]);
        let responses = vec![response_for(999)];

        let completed = completed_sections(&sections, &responses, &BTreeSet::new(), &rel);
        assert!(completed.is_empty());
    }

    #[test]
    fn completion_requires_every_question_answered() {
        let sections = vec![section_with_questions(&[1, 2, 3])];
        let rel = released(&[0]);

        let partial = vec![response_for(1), response_for(3)];
        assert!(completed_sections(&sections, &partial, &BTreeSet::new(), &rel).is_empty());

        let full = vec![response_for(1), response_for(2), response_for(3)];
        assert_eq!(
            completed_sections(&sections, &full, &BTreeSet::new(), &rel),
            BTreeSet::from([0])
        );
    }

    #[test]
    fn derivation_is_idempotent() {
        let sections = vec![section_with_questions(&[1]), section_with_questions(&[2])];
        let rel = released(&[0, 1]);
        let visited = BTreeSet::new();
        let responses = vec![response_for(1)];

        let first = derive_progress(&sections, &responses, &visited, &rel);
        let second = derive_progress(&sections, &responses, &visited, &rel);
        assert_eq!(first, second);
    }

    #[test]
    fn advance_requires_existing_next_section() {
        // Release frontier points past the end of the study.
        let sections = vec![section_with_questions(&[1])];
        let rel = released(&[0, 1]);
        let completed = BTreeSet::from([0]);

        assert!(!can_advance_from(0, &sections, &completed, &rel));
    }

    #[test]
    fn retreat_only_from_nonzero_sections() {
        let rel = released(&[0, 1]);
        assert!(!can_retreat_from(0, &rel));
        assert!(can_retreat_from(1, &rel));
    }

    #[test]
    fn navigation_is_bounded_by_frontier() {
        let rel = released(&[0, 2]);
        assert!(can_navigate_to(0, &rel));
        assert!(can_navigate_to(1, &rel)); // gap below the frontier is navigable
        assert!(can_navigate_to(2, &rel));
        assert!(!can_navigate_to(3, &rel));
    }

    #[test]
    fn progress_view_reflects_resume_position() {
        let sections = vec![
            section_with_questions(&[1]),
            section_with_questions(&[2]),
            section_with_questions(&[3]),
        ];
        let rel = released(&[0, 1]);
        let responses = vec![response_for(1)];

        let view = derive_progress(&sections, &responses, &BTreeSet::new(), &rel);
        assert_eq!(view.resume_index, 1);
        assert!(!view.can_advance); // section 1 not yet complete
        assert!(view.can_retreat);
    }
}
