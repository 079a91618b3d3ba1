use std::collections::BTreeSet;

use sqlx::Row;
use uuid::Uuid;

use casebook_core::model::{
    Answer, CaseStudyId, JoinCode, QuestionId, ReleasedSections, Response, ResponseId, Session,
    SessionId, Student, StudentKey,
};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    Ok(SessionId::new(i64_to_u64("session_id", v)?))
}

pub(crate) fn session_id_to_i64(id: SessionId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("session_id overflow".into()))
}

pub(crate) fn case_study_id_from_i64(v: i64) -> Result<CaseStudyId, StorageError> {
    Ok(CaseStudyId::new(i64_to_u64("case_study_id", v)?))
}

pub(crate) fn case_study_id_to_i64(id: CaseStudyId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("case_study_id overflow".into()))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("question_id overflow".into()))
}

pub(crate) fn section_index_from_i64(v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid section index: {v}")))
}

pub(crate) fn section_index_to_i64(index: usize) -> Result<i64, StorageError> {
    i64::try_from(index).map_err(|_| StorageError::Serialization("section index overflow".into()))
}

/// Released sections persist as a JSON array of indices. An empty or
/// legacy array normalizes to `{0}` through `ReleasedSections::new`.
pub(crate) fn released_sections_to_json(released: &ReleasedSections) -> Result<String, StorageError> {
    let indices: Vec<usize> = released.iter().collect();
    serde_json::to_string(&indices).map_err(ser)
}

pub(crate) fn released_sections_from_json(json: &str) -> Result<ReleasedSections, StorageError> {
    let indices: BTreeSet<usize> = serde_json::from_str(json).map_err(ser)?;
    Ok(ReleasedSections::new(indices))
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
    students_joined: BTreeSet<StudentKey>,
) -> Result<Session, StorageError> {
    let code: String = row.try_get("code").map_err(ser)?;
    let released: String = row.try_get("released_sections").map_err(ser)?;

    Ok(Session::from_persisted(
        session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        JoinCode::parse(&code).map_err(ser)?,
        case_study_id_from_i64(row.try_get::<i64, _>("case_study_id").map_err(ser)?)?,
        released_sections_from_json(&released)?,
        row.try_get::<i64, _>("active").map_err(ser)? != 0,
        students_joined,
        row.try_get("created_at").map_err(ser)?,
    ))
}

pub(crate) fn map_student_row(row: &sqlx::sqlite::SqliteRow) -> Result<Student, StorageError> {
    let key: String = row.try_get("key").map_err(ser)?;
    Ok(Student::from_persisted(
        StudentKey::parse(&key).map_err(ser)?,
        row.try_get("display_name").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    ))
}

pub(crate) fn map_response_row(row: &sqlx::sqlite::SqliteRow) -> Result<Response, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let student_key: String = row.try_get("student_key").map_err(ser)?;
    let answer_json: String = row.try_get("answer").map_err(ser)?;
    let answer: Answer = serde_json::from_str(&answer_json).map_err(ser)?;

    let points = row
        .try_get::<Option<i64>, _>("points")
        .map_err(ser)?
        .map(|v| u32::try_from(v).map_err(|_| ser(format!("invalid points: {v}"))))
        .transpose()?;

    Ok(Response::new(
        ResponseId::from_uuid(Uuid::parse_str(&id).map_err(ser)?),
        session_id_from_i64(row.try_get::<i64, _>("session_id").map_err(ser)?)?,
        StudentKey::parse(&student_key).map_err(ser)?,
        section_index_from_i64(row.try_get::<i64, _>("section_index").map_err(ser)?)?,
        question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        answer,
        points,
        row.try_get("submitted_at").map_err(ser)?,
    ))
}
