use casebook_core::model::{CaseStudy, CaseStudyId, Section};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{case_study_id_from_i64, case_study_id_to_i64},
};
use crate::repository::{CaseStudyRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait::async_trait]
impl CaseStudyRepository for SqliteRepository {
    async fn upsert_case_study(&self, case_study: &CaseStudy) -> Result<(), StorageError> {
        let sections = serde_json::to_string(case_study.sections()).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO case_studies (id, title, sections)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                sections = excluded.sections
            ",
        )
        .bind(case_study_id_to_i64(case_study.id())?)
        .bind(case_study.title())
        .bind(sections)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_case_study(&self, id: CaseStudyId) -> Result<CaseStudy, StorageError> {
        let row = sqlx::query("SELECT id, title, sections FROM case_studies WHERE id = ?1")
            .bind(case_study_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        let sections: Vec<Section> =
            serde_json::from_str(&row.try_get::<String, _>("sections").map_err(ser)?)
                .map_err(ser)?;

        CaseStudy::new(
            case_study_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
            row.try_get::<String, _>("title").map_err(ser)?,
            sections,
        )
        .map_err(ser)
    }
}
