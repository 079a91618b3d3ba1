use std::collections::BTreeSet;

use casebook_core::model::{JoinCode, ReleasedSections, Session, SessionId, StudentKey};

use super::{
    SqliteRepository,
    mapping::{map_session_row, released_sections_to_json, session_id_from_i64, session_id_to_i64},
};
use crate::repository::{SessionRepository, StorageError};

fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

impl SqliteRepository {
    async fn joined_students(&self, id: SessionId) -> Result<BTreeSet<StudentKey>, StorageError> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT student_key FROM session_students WHERE session_id = ?1",
        )
        .bind(session_id_to_i64(id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|key| {
                StudentKey::parse(key).map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn next_session_id(&self) -> Result<SessionId, StorageError> {
        let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        session_id_from_i64(next)
    }

    async fn upsert_session(&self, session: &Session) -> Result<(), StorageError> {
        let id = session_id_to_i64(session.id())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
            INSERT INTO sessions (id, code, case_study_id, released_sections, active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                -- keep created_at from the original insert; only update mutable fields
                code = excluded.code,
                case_study_id = excluded.case_study_id,
                released_sections = excluded.released_sections,
                active = excluded.active
            ",
        )
        .bind(id)
        .bind(session.code().as_str())
        .bind(super::mapping::case_study_id_to_i64(session.case_study_id())?)
        .bind(released_sections_to_json(session.released_sections())?)
        .bind(i64::from(session.is_active()))
        .bind(session.created_at())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query("DELETE FROM session_students WHERE session_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for student in session.students_joined() {
            sqlx::query("INSERT INTO session_students (session_id, student_key) VALUES (?1, ?2)")
                .bind(id)
                .bind(student.as_str())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_session(&self, code: &JoinCode) -> Result<Session, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, code, case_study_id, released_sections, active, created_at
            FROM sessions WHERE code = ?1
            ",
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        let id = session_id_from_i64(
            sqlx::Row::try_get::<i64, _>(&row, "id")
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
        )?;
        let students = self.joined_students(id).await?;
        map_session_row(&row, students)
    }

    async fn get_session_by_id(&self, id: SessionId) -> Result<Session, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, code, case_study_id, released_sections, active, created_at
            FROM sessions WHERE id = ?1
            ",
        )
        .bind(session_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        let students = self.joined_students(id).await?;
        map_session_row(&row, students)
    }

    async fn set_released_sections(
        &self,
        id: SessionId,
        released: &ReleasedSections,
    ) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE sessions SET released_sections = ?2 WHERE id = ?1")
            .bind(session_id_to_i64(id)?)
            .bind(released_sections_to_json(released)?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn set_active(&self, id: SessionId, active: bool) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE sessions SET active = ?2 WHERE id = ?1")
            .bind(session_id_to_i64(id)?)
            .bind(i64::from(active))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn add_joined_student(
        &self,
        id: SessionId,
        student: &StudentKey,
    ) -> Result<(), StorageError> {
        let session_id = session_id_to_i64(id)?;
        let exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM sessions WHERE id = ?1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            "INSERT OR IGNORE INTO session_students (session_id, student_key) VALUES (?1, ?2)",
        )
        .bind(session_id)
        .bind(student.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
