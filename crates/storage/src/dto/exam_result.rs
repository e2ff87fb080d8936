use std::borrow::Cow;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

/// Request payload for recording a finished exam.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamResultRequest {
    #[validate(length(min = 1, max = 255, message = "Exam name is required"))]
    #[schema(example = "TKA13 2025 - Simulasi 1")]
    pub exam_name: String,

    #[validate(range(min = 0.0, max = 100.0, message = "Score must be between 0 and 100"))]
    pub score: f64,

    #[validate(range(min = 1, message = "Total questions must be at least 1"))]
    pub total_questions: i64,

    #[validate(range(min = 0, message = "Correct answers cannot be negative"))]
    pub correct_answers: i64,

    #[validate(range(min = 0, message = "Wrong answers cannot be negative"))]
    pub wrong_answers: i64,

    /// Minutes spent on the exam
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration: i64,

    /// Defaults to the time the result is recorded
    pub completed_at: Option<NaiveDateTime>,
}

impl CreateExamResultRequest {
    pub fn validate_request(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        let answered = self.correct_answers.checked_add(self.wrong_answers);
        if answered.is_none_or(|answered| answered > self.total_questions) {
            let mut error = ValidationError::new("answer_count");
            error.message = Some(Cow::Borrowed(
                "Correct and wrong answers cannot exceed total questions",
            ));
            errors.add("correct_answers", error);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateExamResultRequest {
        CreateExamResultRequest {
            exam_name: "TKA13 2025 - Simulasi 1".to_string(),
            score: 85.0,
            total_questions: 100,
            correct_answers: 85,
            wrong_answers: 15,
            duration: 120,
            completed_at: None,
        }
    }

    #[test]
    fn test_valid_result() {
        assert!(request().validate_request().is_ok());
    }

    #[test]
    fn test_answers_cannot_exceed_questions() {
        let request = CreateExamResultRequest {
            wrong_answers: 16,
            ..request()
        };
        let errors = request.validate_request().unwrap_err();
        assert!(errors.field_errors().contains_key("correct_answers"));
    }

    #[test]
    fn test_answer_count_overflow_is_rejected() {
        let request = CreateExamResultRequest {
            total_questions: i64::MAX,
            correct_answers: i64::MAX,
            wrong_answers: i64::MAX,
            ..request()
        };
        let errors = request.validate_request().unwrap_err();
        assert!(errors.field_errors().contains_key("correct_answers"));
    }

    #[test]
    fn test_score_range() {
        let request = CreateExamResultRequest {
            score: 100.5,
            ..request()
        };
        let errors = request.validate_request().unwrap_err();
        assert!(errors.field_errors().contains_key("score"));
    }
}
