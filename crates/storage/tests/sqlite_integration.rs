use casebook_core::model::{
    Answer, CaseStudy, CaseStudyId, JoinCode, Question, QuestionId, QuestionKind, ReleasedSections,
    Response, ResponseId, Section, SectionKind, Session, SessionId, Student, StudentKey,
};
use casebook_core::time::fixed_now;
use chrono::Duration;
use storage::repository::{
    CaseStudyRepository, ResponseRepository, SessionRepository, StorageError, StudentRepository,
};
use storage::sqlite::SqliteRepository;

fn build_case_study() -> CaseStudy {
    let q1 = Question::new(
        QuestionId::new(1),
        "Pick one",
        10,
        QuestionKind::MultipleChoice {
            options: vec!["a".into(), "b".into()],
            correct: 0,
        },
    )
    .unwrap();
    let q2 = Question::new(QuestionId::new(2), "Explain", 20, QuestionKind::Essay).unwrap();

    CaseStudy::new(
        CaseStudyId::new(1),
        "Outbreak at Westfield High",
        vec![
            Section::new(SectionKind::Reading, "Background", "...", vec![q1]),
            Section::new(SectionKind::Discussion, "Debrief", "...", vec![q2]),
        ],
    )
    .unwrap()
}

fn build_session(id: u64, code: &str) -> Session {
    Session::new(
        SessionId::new(id),
        JoinCode::parse(code).unwrap(),
        CaseStudyId::new(1),
        fixed_now(),
    )
}

fn build_response(session: SessionId, question: u64, offset_mins: i64) -> Response {
    Response::new(
        ResponseId::generate(),
        session,
        StudentKey::parse("ada lovelace").unwrap(),
        0,
        QuestionId::new(question),
        Answer::Choice(0),
        Some(10),
        fixed_now() + Duration::minutes(offset_mins),
    )
}

#[tokio::test]
async fn sqlite_roundtrip_persists_sessions_and_releases() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_sessions?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let mut session = build_session(1, "ABC123");
    session.join(StudentKey::parse("Ada Lovelace").unwrap()).unwrap();
    repo.upsert_session(&session).await.unwrap();

    let fetched = repo
        .get_session(&JoinCode::parse(" abc123 ").unwrap())
        .await
        .expect("fetch by code");
    assert_eq!(fetched.id(), session.id());
    assert!(fetched.is_active());
    assert_eq!(fetched.students_joined().len(), 1);

    let released: ReleasedSections = [0, 1].into_iter().collect();
    repo.set_released_sections(session.id(), &released)
        .await
        .unwrap();
    repo.set_active(session.id(), false).await.unwrap();

    let updated = repo.get_session_by_id(session.id()).await.unwrap();
    assert_eq!(updated.released_sections(), &released);
    assert!(!updated.is_active());
}

#[tokio::test]
async fn sqlite_rejects_duplicate_join_codes() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_codes?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.upsert_session(&build_session(1, "ABC123")).await.unwrap();
    let err = repo
        .upsert_session(&build_session(2, "ABC123"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_roundtrip_persists_case_study_structure() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_studies?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let study = build_case_study();
    repo.upsert_case_study(&study).await.unwrap();

    let fetched = repo.get_case_study(study.id()).await.expect("fetch");
    assert_eq!(fetched, study);
    assert_eq!(fetched.sections().len(), 2);
    assert_eq!(fetched.section(0).unwrap().questions().len(), 1);

    let err = repo.get_case_study(CaseStudyId::new(99)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_lists_responses_in_submission_order() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_responses?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let session = build_session(1, "ABC123");
    repo.upsert_session(&session).await.unwrap();

    repo.append_response(&build_response(session.id(), 2, 5))
        .await
        .unwrap();
    repo.append_response(&build_response(session.id(), 1, 0))
        .await
        .unwrap();

    let listed = repo
        .list_responses(&StudentKey::parse("ada lovelace").unwrap(), session.id())
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].question_id(), QuestionId::new(1));
    assert_eq!(listed[1].question_id(), QuestionId::new(2));

    // Same student answering the same question twice is a conflict.
    let err = repo
        .append_response(&build_response(session.id(), 1, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_external_grading_updates_points() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_grading?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let session = build_session(1, "ABC123");
    repo.upsert_session(&session).await.unwrap();

    let pending = Response::new(
        ResponseId::generate(),
        session.id(),
        StudentKey::parse("ada").unwrap(),
        1,
        QuestionId::new(2),
        Answer::Text("an essay".into()),
        None,
        fixed_now(),
    );
    repo.append_response(&pending).await.unwrap();

    repo.set_points(pending.id(), 17).await.unwrap();

    let listed = repo
        .list_responses(&StudentKey::parse("ada").unwrap(), session.id())
        .await
        .unwrap();
    assert_eq!(listed[0].points(), Some(17));
    assert!(listed[0].is_graded());
}

#[tokio::test]
async fn sqlite_student_identity_round_trips() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_students?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let student = Student::new(" Ada  Lovelace", fixed_now()).unwrap();
    repo.upsert_student(&student).await.unwrap();

    let fetched = repo
        .get_student(&StudentKey::parse("ADA LOVELACE").unwrap())
        .await
        .unwrap()
        .expect("student exists");
    assert_eq!(fetched.display_name(), "Ada  Lovelace");

    let missing = repo
        .get_student(&StudentKey::parse("grace").unwrap())
        .await
        .unwrap();
    assert!(missing.is_none());
}
