use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;

use crate::dto::exam_result::CreateExamResultRequest;
use crate::error::{Result, StorageError};
use crate::models::ExamResult;

pub struct ExamResultRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ExamResultRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_for_participant(&self, participant_id: i64) -> Result<Vec<ExamResult>> {
        let results = sqlx::query_as::<_, ExamResult>(
            r#"
            SELECT id, participant_id, exam_name, score, total_questions,
                   correct_answers, wrong_answers, duration, completed_at
            FROM exam_results
            WHERE participant_id = ?
            ORDER BY completed_at DESC, id DESC
            "#,
        )
        .bind(participant_id)
        .fetch_all(self.pool)
        .await?;

        Ok(results)
    }

    /// Append a result. An unknown participant surfaces as
    /// [`StorageError::NotFound`] through the foreign key.
    pub async fn create(
        &self,
        participant_id: i64,
        req: &CreateExamResultRequest,
    ) -> Result<ExamResult> {
        let completed_at: NaiveDateTime = req
            .completed_at
            .unwrap_or_else(|| Utc::now().naive_utc());

        let result = sqlx::query_as::<_, ExamResult>(
            r#"
            INSERT INTO exam_results
                (participant_id, exam_name, score, total_questions,
                 correct_answers, wrong_answers, duration, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, participant_id, exam_name, score, total_questions,
                      correct_answers, wrong_answers, duration, completed_at
            "#,
        )
        .bind(participant_id)
        .bind(req.exam_name.trim())
        .bind(req.score)
        .bind(req.total_questions)
        .bind(req.correct_answers)
        .bind(req.wrong_answers)
        .bind(req.duration)
        .bind(completed_at)
        .fetch_one(self.pool)
        .await
        .map_err(StorageError::from)
        .map_err(|e| {
            if e.is_foreign_key_violation() {
                StorageError::NotFound
            } else {
                e
            }
        })?;

        Ok(result)
    }
}
