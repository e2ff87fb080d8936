use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A finished exam attempt. Rows are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: i64,
    pub participant_id: i64,
    pub exam_name: String,
    pub score: f64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub wrong_answers: i64,
    /// Minutes spent on the exam.
    pub duration: i64,
    pub completed_at: NaiveDateTime,
}
