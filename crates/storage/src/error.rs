use serde::Serialize;
use thiserror::Error;

/// Column guarded by a unique index on `participants`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateField {
    Nisn,
    Username,
}

impl DuplicateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nisn => "nisn",
            Self::Username => "username",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Nisn => "NISN is already registered",
            Self::Username => "Username is already taken",
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found")]
    NotFound,

    #[error("{}", .0.message())]
    Duplicate(DuplicateField),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(sqlx::Error::Database(e)) if e.is_unique_violation()
        )
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(sqlx::Error::Database(e)) if e.is_foreign_key_violation()
        )
    }

    /// Which participant column a unique violation fired on, judged from the
    /// SQLite message (`UNIQUE constraint failed: participants.nisn`).
    pub fn duplicate_field(&self) -> Option<DuplicateField> {
        let StorageError::Database(sqlx::Error::Database(e)) = self else {
            return None;
        };
        if !e.is_unique_violation() {
            return None;
        }

        let message = e.message();
        if message.contains("participants.nisn") {
            Some(DuplicateField::Nisn)
        } else if message.contains("participants.username") {
            Some(DuplicateField::Username)
        } else {
            None
        }
    }

    /// Folds raw unique violations into the typed variants callers match on.
    pub(crate) fn classify(self) -> Self {
        if let Some(field) = self.duplicate_field() {
            return StorageError::Duplicate(field);
        }
        if self.is_unique_violation() {
            return StorageError::ConstraintViolation(self.to_string());
        }
        self
    }
}
