use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use storage::dto::common::{ErrorResponse, FieldError};
use storage::error::StorageError;
use validator::ValidationErrors;

/// Web layer errors
#[derive(Debug)]
pub enum WebError {
    Storage(StorageError),
    Validation(ValidationErrors),
    BadRequest(String),
    Unauthorized(String),
    Forbidden,
    NotFound,
    TooManyRequests(String),
    InternalServerError(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Validation(e) => write!(f, "Validation error: {}", e),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::Forbidden => write!(f, "Forbidden"),
            Self::NotFound => write!(f, "Resource not found"),
            Self::TooManyRequests(msg) => write!(f, "Too many requests: {}", msg),
            Self::InternalServerError(msg) => write!(f, "Internal server error: {}", msg),
        }
    }
}

impl WebError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Storage(StorageError::NotFound) => StatusCode::NOT_FOUND,
            Self::Storage(StorageError::Duplicate(_)) => StatusCode::BAD_REQUEST,
            Self::Storage(StorageError::ConstraintViolation(_)) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal failures are logged and replaced by a
    /// generic text so driver errors never leak.
    pub fn message(&self) -> String {
        match self {
            Self::Storage(StorageError::NotFound) | Self::NotFound => {
                "Resource not found".to_string()
            }
            Self::Storage(StorageError::Duplicate(field)) => field.message().to_string(),
            Self::Storage(StorageError::ConstraintViolation(msg)) => {
                tracing::warn!("Constraint violation: {}", msg);
                "Conflicting data".to_string()
            }
            Self::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                "An internal error occurred".to_string()
            }
            Self::Validation(_) => "Validation failed".to_string(),
            Self::BadRequest(msg) | Self::Unauthorized(msg) | Self::TooManyRequests(msg) => {
                msg.clone()
            }
            Self::Forbidden => "Insufficient role for this operation".to_string(),
            Self::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                "An internal error occurred".to_string()
            }
        }
    }

    /// Per-field details for validation failures and duplicate conflicts.
    pub fn field_errors(&self) -> Option<Vec<FieldError>> {
        match self {
            Self::Validation(errors) => {
                let mut field_errors: Vec<FieldError> = errors
                    .field_errors()
                    .into_iter()
                    .flat_map(|(field, errors)| {
                        errors.iter().map(move |e| FieldError {
                            field: to_camel_case(field),
                            message: e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string()),
                        })
                    })
                    .collect();
                field_errors.sort_by(|a, b| a.field.cmp(&b.field));
                Some(field_errors)
            }
            Self::Storage(StorageError::Duplicate(field)) => Some(vec![FieldError {
                field: field.as_str().to_string(),
                message: field.message().to_string(),
            }]),
            _ => None,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let body = ErrorResponse {
            success: false,
            message: self.message(),
            errors: self.field_errors(),
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<StorageError> for WebError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error)
    }
}

impl From<ValidationErrors> for WebError {
    fn from(error: ValidationErrors) -> Self {
        Self::Validation(error)
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for WebError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for WebError {
    fn from(error: MultipartError) -> Self {
        Self::BadRequest(error.body_text())
    }
}

impl From<QueryRejection> for WebError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// `birth_date` -> `birthDate`, matching the JSON field names.
fn to_camel_case(field: &str) -> String {
    let mut camel = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            camel.extend(c.to_uppercase());
            upper_next = false;
        } else {
            camel.push(c);
        }
    }
    camel
}

pub type WebResult<T> = Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;
    use storage::error::DuplicateField;
    use validator::ValidationError;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("birth_date"), "birthDate");
        assert_eq!(to_camel_case("participant_id"), "participantId");
        assert_eq!(to_camel_case("nisn"), "nisn");
    }

    #[test]
    fn test_validation_errors_are_listed_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("nisn", ValidationError::new("nisn"));
        errors.add("full_name", ValidationError::new("full_name_length"));

        let err = WebError::from(errors);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let fields: Vec<String> = err
            .field_errors()
            .unwrap()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["fullName", "nisn"]);
    }

    #[test]
    fn test_duplicate_names_the_field() {
        let err = WebError::from(StorageError::Duplicate(DuplicateField::Nisn));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "NISN is already registered");
        assert_eq!(err.field_errors().unwrap()[0].field, "nisn");
    }

    #[test]
    fn test_internal_errors_are_sanitized() {
        let err = WebError::from(StorageError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "An internal error occurred");
        assert!(err.field_errors().is_none());
    }

    #[test]
    fn test_not_found() {
        assert_eq!(
            WebError::from(StorageError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
