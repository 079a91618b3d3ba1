use casebook_core::model::{Student, StudentKey};

use super::{SqliteRepository, mapping::map_student_row};
use crate::repository::{StorageError, StudentRepository};

#[async_trait::async_trait]
impl StudentRepository for SqliteRepository {
    async fn upsert_student(&self, student: &Student) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO students (key, display_name, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                -- keep created_at from the original insert
                display_name = excluded.display_name
            ",
        )
        .bind(student.key().as_str())
        .bind(student.display_name())
        .bind(student.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_student(&self, key: &StudentKey) -> Result<Option<Student>, StorageError> {
        let row = sqlx::query("SELECT key, display_name, created_at FROM students WHERE key = ?1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_student_row).transpose()
    }
}
