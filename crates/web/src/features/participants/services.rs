use csv::{ReaderBuilder, StringRecord, Trim};
use sqlx::SqlitePool;
use storage::{
    dto::{
        exam_result::CreateExamResultRequest,
        participant::{
            CreateParticipantRequest, CredentialMode, GeneratedCredentials, ImportRowResult,
            ImportRowStatus, ImportSummary, ParticipantDetailResponse, ParticipantFilter,
            UpdateParticipantRequest,
        },
    },
    error::{DuplicateField, StorageError},
    models::{ExamResult, Participant},
    repository::{exam_result::ExamResultRepository, participant::ParticipantRepository},
    services::credentials,
};

use crate::error::{WebError, WebResult};
use crate::features::auth::services::hash_password;

/// Column names understood in uploaded import files, in their JSON spelling.
const IMPORT_COLUMNS: [&str; 8] = [
    "fullName",
    "nisn",
    "birthDate",
    "participantId",
    "status",
    "autoGenerate",
    "username",
    "password",
];

/// How often a derived username is re-derived after losing an insert race.
const MAX_USERNAME_RETRIES: usize = 5;

#[derive(Debug)]
pub struct CreatedParticipant {
    pub participant: Participant,
    /// Present only when the service generated the credentials.
    pub credentials: Option<GeneratedCredentials>,
}

/// Register a participant: shape validation, then the NISN and username
/// duplicate checks, then the insert. The unique indexes stay authoritative
/// when a concurrent request wins between check and insert.
pub async fn create_participant(
    pool: &SqlitePool,
    req: &CreateParticipantRequest,
) -> WebResult<CreatedParticipant> {
    let input = req.validated()?;
    let repo = ParticipantRepository::new(pool);

    if repo.nisn_exists(&input.nisn).await? {
        return Err(StorageError::Duplicate(DuplicateField::Nisn).into());
    }

    match &input.credentials {
        CredentialMode::Manual { username, password } => {
            if repo.username_exists(username).await? {
                return Err(StorageError::Duplicate(DuplicateField::Username).into());
            }

            let password_hash = hash_password(password.clone()).await?;
            let participant = repo
                .insert(&input.to_new_participant(username.clone(), password_hash))
                .await?;

            Ok(CreatedParticipant {
                participant,
                credentials: None,
            })
        }
        CredentialMode::Auto => {
            let password = credentials::generate_password();
            let password_hash = hash_password(password.clone()).await?;

            let mut retries = 0;
            loop {
                let username = repo.generate_unique_username(&input.full_name).await?;
                let new_participant = input.to_new_participant(username.clone(), password_hash.clone());

                match repo.insert(&new_participant).await {
                    Ok(participant) => {
                        return Ok(CreatedParticipant {
                            participant,
                            credentials: Some(GeneratedCredentials { username, password }),
                        });
                    }
                    Err(StorageError::Duplicate(DuplicateField::Username))
                        if retries < MAX_USERNAME_RETRIES =>
                    {
                        retries += 1;
                        tracing::warn!(%username, retries, "Derived username taken concurrently, retrying");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}

pub async fn list_participants(
    pool: &SqlitePool,
    filter: &ParticipantFilter,
) -> WebResult<(Vec<Participant>, i64)> {
    let repo = ParticipantRepository::new(pool);
    Ok(repo.list(filter).await?)
}

pub async fn get_participant_detailed(
    pool: &SqlitePool,
    id: i64,
) -> WebResult<ParticipantDetailResponse> {
    let repo = ParticipantRepository::new(pool);
    Ok(repo.find_by_id_detailed(id).await?)
}

pub async fn list_nisn(pool: &SqlitePool) -> WebResult<Vec<String>> {
    let repo = ParticipantRepository::new(pool);
    Ok(repo.list_nisn().await?)
}

pub async fn update_participant(
    pool: &SqlitePool,
    id: i64,
    req: &UpdateParticipantRequest,
) -> WebResult<Participant> {
    let changes = req.to_changes()?;
    if changes.is_empty() {
        return Err(WebError::BadRequest("No fields to update".to_string()));
    }

    let repo = ParticipantRepository::new(pool);
    Ok(repo.update(id, &changes).await?)
}

pub async fn delete_participant(pool: &SqlitePool, id: i64) -> WebResult<()> {
    let repo = ParticipantRepository::new(pool);
    Ok(repo.delete(id).await?)
}

/// Run every row through [`create_participant`]. Rows are independent: a
/// failing row is reported and the rest carry on.
pub async fn import_participants(
    pool: &SqlitePool,
    rows: &[CreateParticipantRequest],
) -> ImportSummary {
    let mut results = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let result = match create_participant(pool, row).await {
            Ok(created) => ImportRowResult {
                row: index + 1,
                status: ImportRowStatus::Created,
                data: Some(created.participant),
                credentials: created.credentials,
                message: None,
                errors: None,
            },
            Err(e) => ImportRowResult {
                row: index + 1,
                status: ImportRowStatus::Failed,
                data: None,
                credentials: None,
                message: Some(e.message()),
                errors: e.field_errors(),
            },
        };
        results.push(result);
    }

    let imported = results
        .iter()
        .filter(|r| r.status == ImportRowStatus::Created)
        .count();

    ImportSummary {
        imported,
        failed: results.len() - imported,
        results,
    }
}

/// Read the rows of an uploaded CSV file. Header names are matched loosely,
/// so `fullName`, `full_name` and `Full Name` all map to the same column;
/// unknown columns are ignored.
pub fn parse_import_csv(data: &[u8]) -> WebResult<Vec<CreateParticipantRequest>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| WebError::BadRequest(format!("Invalid CSV header: {e}")))?
        .iter()
        .map(|header| import_column(header).unwrap_or(header))
        .collect::<StringRecord>();

    if !headers.iter().any(|header| header == "fullName") {
        return Err(WebError::BadRequest(
            "CSV header must contain a fullName column".to_string(),
        ));
    }
    reader.set_headers(headers);

    reader
        .deserialize::<CreateParticipantRequest>()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|e| WebError::BadRequest(format!("Row {}: {e}", index + 1)))
        })
        .collect()
}

fn import_column(header: &str) -> Option<&'static str> {
    let key: String = header
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    IMPORT_COLUMNS
        .into_iter()
        .find(|column| column.eq_ignore_ascii_case(&key))
}

pub async fn record_exam_result(
    pool: &SqlitePool,
    participant_id: i64,
    req: &CreateExamResultRequest,
) -> WebResult<ExamResult> {
    req.validate_request()?;

    let repo = ExamResultRepository::new(pool);
    Ok(repo.create(participant_id, req).await?)
}
