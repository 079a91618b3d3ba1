use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use casebook_core::model::{
    CaseStudy, CaseStudyId, JoinCode, ReleasedSections, Response, ResponseId, Session, SessionId,
    Student, StudentKey,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Allocate an id for a new session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    async fn next_session_id(&self) -> Result<SessionId, StorageError>;

    /// Persist or update a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if another session already holds
    /// the join code, or other storage errors.
    async fn upsert_session(&self, session: &Session) -> Result<(), StorageError>;

    /// Fetch a session by its join code.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no session has the code.
    async fn get_session(&self, code: &JoinCode) -> Result<Session, StorageError>;

    /// Fetch a session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_session_by_id(&self, id: SessionId) -> Result<Session, StorageError>;

    /// Replace the released-section set for a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn set_released_sections(
        &self,
        id: SessionId,
        released: &ReleasedSections,
    ) -> Result<(), StorageError>;

    /// Flip the active flag for a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn set_active(&self, id: SessionId, active: bool) -> Result<(), StorageError>;

    /// Record a student as joined. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn add_joined_student(
        &self,
        id: SessionId,
        student: &StudentKey,
    ) -> Result<(), StorageError>;
}

/// Repository contract for case studies.
#[async_trait]
pub trait CaseStudyRepository: Send + Sync {
    /// Persist or update a case study.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the case study cannot be stored.
    async fn upsert_case_study(&self, case_study: &CaseStudy) -> Result<(), StorageError>;

    /// Fetch a case study by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_case_study(&self, id: CaseStudyId) -> Result<CaseStudy, StorageError>;
}

/// Repository contract for students.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Persist or update a student identity record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the student cannot be stored.
    async fn upsert_student(&self, student: &Student) -> Result<(), StorageError>;

    /// Fetch a student by normalized key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing student is
    /// `Ok(None)` because joining creates the record on first sight.
    async fn get_student(&self, key: &StudentKey) -> Result<Option<Student>, StorageError>;
}

/// Repository contract for responses.
#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// Append a submitted response.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a response by the same student
    /// for the same question already exists in the session.
    async fn append_response(&self, response: &Response) -> Result<ResponseId, StorageError>;

    /// List one student's responses for a session, ascending by
    /// submission time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_responses(
        &self,
        student: &StudentKey,
        session_id: SessionId,
    ) -> Result<Vec<Response>, StorageError>;

    /// Record points awarded by an external grading actor.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the response does not exist.
    async fn set_points(&self, id: ResponseId, points: u32) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    case_studies: Arc<Mutex<HashMap<CaseStudyId, CaseStudy>>>,
    students: Arc<Mutex<HashMap<StudentKey, Student>>>,
    responses: Arc<Mutex<Vec<Response>>>,
    next_session_id: Arc<Mutex<u64>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_session<T>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut Session) -> T,
    ) -> Result<T, StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let session = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        Ok(f(session))
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn next_session_id(&self) -> Result<SessionId, StorageError> {
        let mut guard = self
            .next_session_id
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard += 1;
        Ok(SessionId::new(*guard))
    }

    async fn upsert_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let code_taken = guard
            .values()
            .any(|s| s.code() == session.code() && s.id() != session.id());
        if code_taken {
            return Err(StorageError::Conflict);
        }
        guard.insert(session.id(), session.clone());
        Ok(())
    }

    async fn get_session(&self, code: &JoinCode) -> Result<Session, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .values()
            .find(|s| s.code() == code)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_session_by_id(&self, id: SessionId) -> Result<Session, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn set_released_sections(
        &self,
        id: SessionId,
        released: &ReleasedSections,
    ) -> Result<(), StorageError> {
        self.with_session(id, |session| {
            let mut updated = Session::from_persisted(
                session.id(),
                session.code().clone(),
                session.case_study_id(),
                released.clone(),
                session.is_active(),
                session.students_joined().clone(),
                session.created_at(),
            );
            std::mem::swap(session, &mut updated);
        })
    }

    async fn set_active(&self, id: SessionId, active: bool) -> Result<(), StorageError> {
        self.with_session(id, |session| {
            if !active {
                session.end();
            }
        })
    }

    async fn add_joined_student(
        &self,
        id: SessionId,
        student: &StudentKey,
    ) -> Result<(), StorageError> {
        self.with_session(id, |session| session.join(student.clone()))?
            .map_err(|_| StorageError::Conflict)
    }
}

#[async_trait]
impl CaseStudyRepository for InMemoryRepository {
    async fn upsert_case_study(&self, case_study: &CaseStudy) -> Result<(), StorageError> {
        let mut guard = self
            .case_studies
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(case_study.id(), case_study.clone());
        Ok(())
    }

    async fn get_case_study(&self, id: CaseStudyId) -> Result<CaseStudy, StorageError> {
        let guard = self
            .case_studies
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl StudentRepository for InMemoryRepository {
    async fn upsert_student(&self, student: &Student) -> Result<(), StorageError> {
        let mut guard = self
            .students
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(student.key().clone(), student.clone());
        Ok(())
    }

    async fn get_student(&self, key: &StudentKey) -> Result<Option<Student>, StorageError> {
        let guard = self
            .students
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }
}

#[async_trait]
impl ResponseRepository for InMemoryRepository {
    async fn append_response(&self, response: &Response) -> Result<ResponseId, StorageError> {
        let mut guard = self
            .responses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let duplicate = guard.iter().any(|r| {
            r.session_id() == response.session_id()
                && r.student() == response.student()
                && r.question_id() == response.question_id()
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }
        guard.push(response.clone());
        Ok(response.id())
    }

    async fn list_responses(
        &self,
        student: &StudentKey,
        session_id: SessionId,
    ) -> Result<Vec<Response>, StorageError> {
        let guard = self
            .responses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<Response> = guard
            .iter()
            .filter(|r| r.student() == student && r.session_id() == session_id)
            .cloned()
            .collect();
        found.sort_by_key(Response::submitted_at);
        Ok(found)
    }

    async fn set_points(&self, id: ResponseId, points: u32) -> Result<(), StorageError> {
        let mut guard = self
            .responses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let response = guard
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(StorageError::NotFound)?;
        response.set_points(points);
        Ok(())
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
    pub case_studies: Arc<dyn CaseStudyRepository>,
    pub students: Arc<dyn StudentRepository>,
    pub responses: Arc<dyn ResponseRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let case_studies: Arc<dyn CaseStudyRepository> = Arc::new(repo.clone());
        let students: Arc<dyn StudentRepository> = Arc::new(repo.clone());
        let responses: Arc<dyn ResponseRepository> = Arc::new(repo);
        Self {
            sessions,
            case_studies,
            students,
            responses,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
