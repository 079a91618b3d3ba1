use casebook_core::model::{CaseStudy, JoinCode, Response, Session, SessionId, StudentKey};
use storage::repository::{
    CaseStudyRepository, ResponseRepository, SessionRepository, StorageError,
};

use crate::error::JoinError;

/// Storage-backed lookups for the join flow.
pub(crate) struct SessionQueries;

impl SessionQueries {
    /// Resolve a join code to its session.
    ///
    /// # Errors
    ///
    /// Returns `JoinError::UnknownCode` when no session holds the code,
    /// or `JoinError::Storage` on backend failures.
    pub async fn session_for_code(
        code: &JoinCode,
        sessions: &dyn SessionRepository,
    ) -> Result<Session, JoinError> {
        match sessions.get_session(code).await {
            Ok(session) => Ok(session),
            Err(StorageError::NotFound) => Err(JoinError::UnknownCode),
            Err(other) => Err(JoinError::Storage(other)),
        }
    }

    /// Load the case study a session runs.
    ///
    /// # Errors
    ///
    /// Returns `JoinError::MissingCaseStudy` when the referenced study is
    /// gone, or `JoinError::Storage` on backend failures.
    pub async fn case_study_for_session(
        session: &Session,
        case_studies: &dyn CaseStudyRepository,
    ) -> Result<CaseStudy, JoinError> {
        match case_studies.get_case_study(session.case_study_id()).await {
            Ok(study) => Ok(study),
            Err(StorageError::NotFound) => Err(JoinError::MissingCaseStudy),
            Err(other) => Err(JoinError::Storage(other)),
        }
    }

    /// Load a student's earlier responses for resume-on-rejoin.
    ///
    /// # Errors
    ///
    /// Returns `JoinError::Storage` on backend failures.
    pub async fn prior_responses(
        student: &StudentKey,
        session_id: SessionId,
        responses: &dyn ResponseRepository,
    ) -> Result<Vec<Response>, JoinError> {
        let found = responses.list_responses(student, session_id).await?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use casebook_core::model::{CaseStudyId, Question, QuestionId, QuestionKind, Section, SectionKind};
    use casebook_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn build_case_study() -> CaseStudy {
        let question =
            Question::new(QuestionId::new(1), "Explain", 10, QuestionKind::Text).unwrap();
        CaseStudy::new(
            CaseStudyId::new(1),
            "Study",
            vec![Section::new(
                SectionKind::Reading,
                "Background",
                "...",
                vec![question],
            )],
        )
        .unwrap()
    }

    fn build_session() -> Session {
        Session::new(
            casebook_core::model::SessionId::new(1),
            JoinCode::parse("ABC123").unwrap(),
            CaseStudyId::new(1),
            fixed_now(),
        )
    }

    #[tokio::test]
    async fn unknown_code_maps_to_join_error() {
        let repo = InMemoryRepository::new();
        let err = SessionQueries::session_for_code(&JoinCode::parse("NOPE").unwrap(), &repo)
            .await
            .unwrap_err();
        assert!(matches!(err, JoinError::UnknownCode));
    }

    #[tokio::test]
    async fn missing_case_study_maps_to_join_error() {
        let repo = InMemoryRepository::new();
        let session = build_session();
        repo.upsert_session(&session).await.unwrap();

        let err = SessionQueries::case_study_for_session(&session, &repo)
            .await
            .unwrap_err();
        assert!(matches!(err, JoinError::MissingCaseStudy));
    }

    #[tokio::test]
    async fn session_and_study_resolve_together() {
        let repo = InMemoryRepository::new();
        let session = build_session();
        repo.upsert_session(&session).await.unwrap();
        repo.upsert_case_study(&build_case_study()).await.unwrap();

        let found = SessionQueries::session_for_code(session.code(), &repo)
            .await
            .unwrap();
        let study = SessionQueries::case_study_for_session(&found, &repo)
            .await
            .unwrap();
        assert_eq!(study.id(), found.case_study_id());
    }
}
