use std::borrow::Cow;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError, ValidationErrors};

use super::common::{DEFAULT_LIMIT, DEFAULT_PAGE, FieldError, PaginationParams};
use crate::models::{ExamResult, Participant, ParticipantStatus};

pub const NISN_LENGTH: usize = 10;
pub const MIN_FULL_NAME_LENGTH: usize = 3;
pub const MIN_USERNAME_LENGTH: usize = 5;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Request payload for registering a participant.
///
/// Serves both the single-create endpoint and every row of a batch import.
/// Credentials are generated unless `autoGenerate` is `false`; when the flag
/// is omitted, supplying a username or password selects manual mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateParticipantRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_full_name"))]
    #[schema(example = "Ahmad Wijaya")]
    pub full_name: String,

    #[serde(default)]
    #[validate(custom(function = "validate_nisn"))]
    #[schema(example = "1234567890")]
    pub nisn: String,

    #[serde(default)]
    #[validate(custom(function = "validate_birth_date"))]
    #[schema(example = "2005-03-15")]
    pub birth_date: String,

    #[serde(default)]
    #[validate(custom(function = "validate_participant_id"))]
    #[schema(example = "TKA13-001")]
    pub participant_id: String,

    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,

    pub auto_generate: Option<bool>,

    pub username: Option<String>,

    pub password: Option<String>,
}

/// How the credentials of a new participant are obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialMode {
    Auto,
    Manual { username: String, password: String },
}

/// A create request that passed shape validation, with typed fields.
#[derive(Debug, Clone)]
pub struct ParticipantInput {
    pub full_name: String,
    pub nisn: String,
    pub birth_date: NaiveDate,
    pub participant_id: String,
    pub status: ParticipantStatus,
    pub credentials: CredentialMode,
}

/// Row about to be inserted into `participants`.
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub full_name: String,
    pub nisn: String,
    pub birth_date: NaiveDate,
    pub username: String,
    pub password_hash: String,
    pub participant_id: String,
    pub status: ParticipantStatus,
}

impl CreateParticipantRequest {
    pub fn is_auto_generate(&self) -> bool {
        self.auto_generate
            .unwrap_or(self.username.is_none() && self.password.is_none())
    }

    /// Runs every shape rule and collects one entry per offending field.
    pub fn validated(&self) -> Result<ParticipantInput, ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        let credentials = if self.is_auto_generate() {
            CredentialMode::Auto
        } else {
            let username = self.username.as_deref().map(str::trim).unwrap_or_default();
            if username.chars().count() < MIN_USERNAME_LENGTH {
                errors.add(
                    "username",
                    invalid("username_length", "Username must be at least 5 characters"),
                );
            }

            let password = self.password.as_deref().unwrap_or_default();
            if password.chars().count() < MIN_PASSWORD_LENGTH {
                errors.add(
                    "password",
                    invalid("password_length", "Password must be at least 8 characters"),
                );
            }

            CredentialMode::Manual {
                username: username.to_string(),
                password: password.to_string(),
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let birth_date = parse_birth_date(&self.birth_date).map_err(|e| single("birth_date", e))?;
        let status = match self.status.as_deref() {
            Some(status) => parse_status(status).map_err(|e| single("status", e))?,
            None => ParticipantStatus::default(),
        };

        Ok(ParticipantInput {
            full_name: self.full_name.trim().to_string(),
            nisn: self.nisn.clone(),
            birth_date,
            participant_id: self.participant_id.trim().to_string(),
            status,
            credentials,
        })
    }
}

impl ParticipantInput {
    pub fn to_new_participant(&self, username: String, password_hash: String) -> NewParticipant {
        NewParticipant {
            full_name: self.full_name.clone(),
            nisn: self.nisn.clone(),
            birth_date: self.birth_date,
            username,
            password_hash,
            participant_id: self.participant_id.clone(),
            status: self.status,
        }
    }
}

/// Request payload for a partial participant update. Only the fields that are
/// present are validated and written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParticipantRequest {
    #[validate(custom(function = "validate_full_name"))]
    pub full_name: Option<String>,

    #[validate(custom(function = "validate_birth_date"))]
    pub birth_date: Option<String>,

    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,

    #[validate(custom(function = "validate_participant_id"))]
    pub participant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantChanges {
    pub full_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub status: Option<ParticipantStatus>,
    pub participant_id: Option<String>,
}

impl UpdateParticipantRequest {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.birth_date.is_none()
            && self.status.is_none()
            && self.participant_id.is_none()
    }

    pub fn to_changes(&self) -> Result<ParticipantChanges, ValidationErrors> {
        self.validate()?;

        let birth_date = self
            .birth_date
            .as_deref()
            .map(parse_birth_date)
            .transpose()
            .map_err(|e| single("birth_date", e))?;
        let status = self
            .status
            .as_deref()
            .map(parse_status)
            .transpose()
            .map_err(|e| single("status", e))?;

        Ok(ParticipantChanges {
            full_name: self.full_name.as_deref().map(|name| name.trim().to_string()),
            birth_date,
            status,
            participant_id: self.participant_id.as_deref().map(|id| id.trim().to_string()),
        })
    }
}

impl ParticipantChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Query string of the participant listing.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ParticipantFilter {
    /// 1-based page number
    #[serde(default = "default_page")]
    #[param(default = 1, minimum = 1)]
    pub page: u32,
    /// Items per page (1-100)
    #[serde(default = "default_limit")]
    #[param(default = 10, minimum = 1, maximum = 100)]
    pub limit: u32,
    /// Case-insensitive substring matched against full name, NISN and username
    pub search: Option<String>,
    /// Exact status filter: aktif, menunggu or terblokir
    pub status: Option<String>,
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Default for ParticipantFilter {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: None,
            status: None,
        }
    }
}

impl ParticipantFilter {
    pub fn validate(&self) -> Result<(), String> {
        self.pagination().validate()?;
        self.status_filter()?;
        Ok(())
    }

    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.limit)
    }

    /// Trimmed search term; blank input means no search.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// Parsed status filter; an empty value means no filter.
    pub fn status_filter(&self) -> Result<Option<ParticipantStatus>, String> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(status) => status.parse().map(Some),
        }
    }
}

/// Participant together with their exam history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipantDetailResponse {
    #[serde(flatten)]
    pub participant: Participant,
    pub exam_results: Vec<ExamResult>,
}

/// Plaintext credentials, returned exactly once at creation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GeneratedCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateParticipantResponse {
    pub success: bool,
    pub message: String,
    pub data: Participant,
    pub credentials: Option<GeneratedCredentials>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ImportParticipantsRequest {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Import must contain between 1 and 500 participants"
    ))]
    pub participants: Vec<CreateParticipantRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImportRowStatus {
    Created,
    Failed,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportRowResult {
    /// 1-based position of the row in the request
    pub row: usize,
    pub status: ImportRowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Participant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<GeneratedCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
    pub results: Vec<ImportRowResult>,
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn single(field: &'static str, error: ValidationError) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}

pub fn parse_birth_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| invalid("birth_date", "Birth date must be a valid date (YYYY-MM-DD)"))
}

fn parse_status(value: &str) -> Result<ParticipantStatus, ValidationError> {
    value
        .parse()
        .map_err(|_| invalid("status", "Status must be one of: aktif, menunggu, terblokir"))
}

fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
    if full_name.trim().chars().count() >= MIN_FULL_NAME_LENGTH {
        Ok(())
    } else {
        Err(invalid("full_name_length", "Full name must be at least 3 characters"))
    }
}

fn validate_nisn(nisn: &str) -> Result<(), ValidationError> {
    if nisn.len() == NISN_LENGTH && nisn.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("nisn", "NISN must be exactly 10 digits"))
    }
}

fn validate_birth_date(value: &str) -> Result<(), ValidationError> {
    parse_birth_date(value).map(|_| ())
}

fn validate_participant_id(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("participant_id", "Participant ID is required"))
    } else {
        Ok(())
    }
}

fn validate_status(value: &str) -> Result<(), ValidationError> {
    parse_status(value).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateParticipantRequest {
        CreateParticipantRequest {
            full_name: "Ahmad Wijaya".to_string(),
            nisn: "1234567890".to_string(),
            birth_date: "2005-03-15".to_string(),
            participant_id: "TKA13-001".to_string(),
            ..Default::default()
        }
    }

    fn failed_fields(errors: &ValidationErrors) -> Vec<&'static str> {
        let mut fields: Vec<_> = errors.field_errors().into_keys().collect();
        fields.sort_unstable();
        fields
    }

    #[test]
    fn test_valid_request_defaults_to_auto_mode() {
        let input = valid_request().validated().unwrap();
        assert_eq!(input.credentials, CredentialMode::Auto);
        assert_eq!(input.status, ParticipantStatus::Aktif);
        assert_eq!(input.birth_date, NaiveDate::from_ymd_opt(2005, 3, 15).unwrap());
    }

    #[test]
    fn test_supplied_credentials_select_manual_mode() {
        let request = CreateParticipantRequest {
            username: Some("  ahmadw  ".to_string()),
            password: Some("rahasia123".to_string()),
            ..valid_request()
        };

        let input = request.validated().unwrap();
        assert_eq!(
            input.credentials,
            CredentialMode::Manual {
                username: "ahmadw".to_string(),
                password: "rahasia123".to_string(),
            }
        );
    }

    #[test]
    fn test_explicit_flag_wins_over_supplied_credentials() {
        let request = CreateParticipantRequest {
            auto_generate: Some(true),
            username: Some("x".to_string()),
            ..valid_request()
        };
        assert_eq!(request.validated().unwrap().credentials, CredentialMode::Auto);
    }

    #[test]
    fn test_manual_mode_requires_credentials() {
        let request = CreateParticipantRequest {
            auto_generate: Some(false),
            ..valid_request()
        };

        let errors = request.validated().unwrap_err();
        assert_eq!(failed_fields(&errors), vec!["password", "username"]);
    }

    #[test]
    fn test_reports_every_offending_field() {
        let request = CreateParticipantRequest {
            full_name: " A ".to_string(),
            nisn: "12345abcde".to_string(),
            birth_date: "2005-02-30".to_string(),
            participant_id: "   ".to_string(),
            status: Some("active".to_string()),
            ..Default::default()
        };

        let errors = request.validated().unwrap_err();
        assert_eq!(
            failed_fields(&errors),
            vec!["birth_date", "full_name", "nisn", "participant_id", "status"]
        );
    }

    #[test]
    fn test_nisn_length_is_exact() {
        for nisn in ["123456789", "12345678901", ""] {
            let request = CreateParticipantRequest {
                nisn: nisn.to_string(),
                ..valid_request()
            };
            assert_eq!(failed_fields(&request.validated().unwrap_err()), vec!["nisn"]);
        }
    }

    #[test]
    fn test_full_name_is_trimmed() {
        let request = CreateParticipantRequest {
            full_name: "  Siti Nurhaliza ".to_string(),
            ..valid_request()
        };
        assert_eq!(request.validated().unwrap().full_name, "Siti Nurhaliza");
    }

    #[test]
    fn test_update_validates_only_present_fields() {
        let request = UpdateParticipantRequest {
            status: Some("terblokir".to_string()),
            ..Default::default()
        };
        let changes = request.to_changes().unwrap();
        assert_eq!(changes.status, Some(ParticipantStatus::Terblokir));
        assert!(changes.full_name.is_none());

        let request = UpdateParticipantRequest {
            full_name: Some("Budi Rahmad".to_string()),
            birth_date: Some("not-a-date".to_string()),
            status: Some("banned".to_string()),
            ..Default::default()
        };
        let errors = request.to_changes().unwrap_err();
        assert_eq!(failed_fields(&errors), vec!["birth_date", "status"]);
    }

    #[test]
    fn test_empty_update() {
        assert!(UpdateParticipantRequest::default().is_empty());
        assert!(ParticipantChanges::default().is_empty());
    }

    #[test]
    fn test_filter_normalizes_blank_values() {
        let filter = ParticipantFilter {
            search: Some("   ".to_string()),
            status: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(filter.search_term(), None);
        assert_eq!(filter.status_filter(), Ok(None));
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn test_filter_rejects_unknown_status() {
        let filter = ParticipantFilter {
            status: Some("deleted".to_string()),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
    }
}
