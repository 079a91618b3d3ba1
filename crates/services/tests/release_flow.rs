use std::sync::Arc;

use casebook_core::model::{
    CaseStudy, CaseStudyId, Question, QuestionId, QuestionKind, Section, SectionKind,
};
use casebook_core::time::fixed_clock;
use services::{InstructorService, SessionFlowService};
use storage::live::{InMemoryLiveStatus, LiveStatus};
use storage::repository::Storage;

fn build_case_study() -> CaseStudy {
    let sections = (0..4)
        .map(|i| {
            let question = Question::new(
                QuestionId::new(i + 1),
                "Discuss",
                10,
                QuestionKind::Text,
            )
            .unwrap();
            Section::new(SectionKind::Reading, "Section", "...", vec![question])
        })
        .collect();
    CaseStudy::new(CaseStudyId::new(1), "Study", sections).unwrap()
}

async fn build_services() -> (InstructorService, SessionFlowService) {
    let storage = Storage::in_memory();
    let live: Arc<InMemoryLiveStatus> = Arc::new(InMemoryLiveStatus::new());

    storage
        .case_studies
        .upsert_case_study(&build_case_study())
        .await
        .unwrap();

    let instructor = InstructorService::new(
        fixed_clock(),
        storage.sessions.clone(),
        storage.case_studies.clone(),
        storage.responses.clone(),
        live.clone(),
    );
    let flow = SessionFlowService::new(
        fixed_clock(),
        storage.sessions.clone(),
        storage.case_studies.clone(),
        storage.students.clone(),
        storage.responses.clone(),
        live,
    );
    (instructor, flow)
}

fn status(indices: &[usize], current: usize) -> LiveStatus {
    LiveStatus {
        released_sections: indices.iter().copied().collect(),
        current_section: current,
    }
}

#[tokio::test]
async fn late_joiner_sees_no_stale_notifications() {
    let (instructor, flow) = build_services().await;
    let session = instructor.create_session(CaseStudyId::new(1)).await.unwrap();
    instructor.release_next_section(session.id()).await.unwrap();
    instructor.release_next_section(session.id()).await.unwrap();

    // Sections 0..=2 were out before this student arrived.
    let mut state = flow
        .join(session.code().as_str(), "Grace Hopper")
        .await
        .unwrap();
    assert_eq!(state.released().max(), 2);

    // A retransmission of the already-known set changes nothing.
    let outcome = flow.apply_live_status(&mut state, &status(&[0, 1, 2], 2));
    assert!(outcome.is_noop());
    assert_eq!(state.notification(), None);
}

#[tokio::test]
async fn mid_section_student_is_notified_once() {
    let (instructor, flow) = build_services().await;
    let session = instructor.create_session(CaseStudyId::new(1)).await.unwrap();
    let mut state = flow
        .join(session.code().as_str(), "Grace Hopper")
        .await
        .unwrap();

    let mut updates = flow.subscribe(&state).await.unwrap();
    instructor.release_next_section(session.id()).await.unwrap();
    let pushed = updates.recv().await.unwrap();

    let outcome = flow.apply_live_status(&mut state, &pushed);
    assert_eq!(outcome.notify, Some(1));
    assert_eq!(outcome.auto_advance_to, None);
    assert_eq!(state.current_section(), 0);

    state.dismiss_notification();
    let again = flow.apply_live_status(&mut state, &pushed);
    assert!(again.is_noop());
    assert_eq!(state.notification(), None);
}

#[tokio::test]
async fn burst_release_advertises_only_the_next_section() {
    let (instructor, flow) = build_services().await;
    let session = instructor.create_session(CaseStudyId::new(1)).await.unwrap();
    let mut state = flow
        .join(session.code().as_str(), "Grace Hopper")
        .await
        .unwrap();

    // Instructor releases three sections in quick succession; the
    // student on section 0 is pointed at section 1, not section 3.
    let outcome = flow.apply_live_status(&mut state, &status(&[0, 1, 2, 3], 3));
    assert_eq!(outcome.notify, Some(1));

    // Accepting moves the student; the frontier already covers the rest.
    assert_eq!(state.accept_notification(), Some(1));
    assert_eq!(state.current_section(), 1);
    assert_eq!(state.released().max(), 3);
}

#[tokio::test]
async fn out_of_order_pushes_converge() {
    let (instructor, flow) = build_services().await;
    let session = instructor.create_session(CaseStudyId::new(1)).await.unwrap();
    let mut state = flow
        .join(session.code().as_str(), "Grace Hopper")
        .await
        .unwrap();

    flow.apply_live_status(&mut state, &status(&[0, 1, 2], 2));
    // An older push arriving late must not shrink what is available.
    flow.apply_live_status(&mut state, &status(&[0, 1], 1));
    assert_eq!(state.released().max(), 2);
}
