use casebook_core::model::{Response, ResponseId, SessionId, StudentKey};

use super::{
    SqliteRepository,
    mapping::{map_response_row, question_id_to_i64, section_index_to_i64, session_id_to_i64},
};
use crate::repository::{ResponseRepository, StorageError};

fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ResponseRepository for SqliteRepository {
    async fn append_response(&self, response: &Response) -> Result<ResponseId, StorageError> {
        let answer = serde_json::to_string(response.answer())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO responses (
                id, session_id, student_key, section_index, question_id,
                answer, points, submitted_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(response.id().value().to_string())
        .bind(session_id_to_i64(response.session_id())?)
        .bind(response.student().as_str())
        .bind(section_index_to_i64(response.section_index())?)
        .bind(question_id_to_i64(response.question_id())?)
        .bind(answer)
        .bind(response.points().map(i64::from))
        .bind(response.submitted_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(response.id())
    }

    async fn list_responses(
        &self,
        student: &StudentKey,
        session_id: SessionId,
    ) -> Result<Vec<Response>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, session_id, student_key, section_index, question_id,
                   answer, points, submitted_at
            FROM responses
            WHERE session_id = ?1 AND student_key = ?2
            ORDER BY submitted_at ASC, id ASC
            ",
        )
        .bind(session_id_to_i64(session_id)?)
        .bind(student.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_response_row).collect()
    }

    async fn set_points(&self, id: ResponseId, points: u32) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE responses SET points = ?2 WHERE id = ?1")
            .bind(id.value().to_string())
            .bind(i64::from(points))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
