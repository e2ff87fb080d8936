use axum::{
    Extension, Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::{
    Database,
    dto::{
        common::{ApiResponse, ErrorResponse, MessageResponse, PaginatedResponse},
        exam_result::CreateExamResultRequest,
        participant::{
            CreateParticipantRequest, CreateParticipantResponse, ImportParticipantsRequest,
            ImportSummary, ParticipantDetailResponse, ParticipantFilter, UpdateParticipantRequest,
        },
    },
    models::{AdminRole, ExamResult, Participant, SessionAdmin},
};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::WebError;
use crate::middleware::auth::require_role;

use super::services;

#[utoipa::path(
    get,
    path = "/api/participants",
    params(ParticipantFilter),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "One page of participants", body = PaginatedResponse<Participant>),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "participants"
)]
pub async fn list_participants(
    State(db): State<Database>,
    query: Result<Query<ParticipantFilter>, QueryRejection>,
) -> Result<Response, WebError> {
    let Query(filter) = query?;
    filter.validate().map_err(WebError::BadRequest)?;

    let (participants, total_items) = services::list_participants(db.pool(), &filter).await?;

    let response = PaginatedResponse::new(participants, filter.page, filter.limit, total_items);

    Ok(Json(response).into_response())
}

#[utoipa::path(
    get,
    path = "/api/participants/{id}",
    params(
        ("id" = i64, Path, description = "Participant id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Participant with exam results", body = ApiResponse<ParticipantDetailResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Participant not found", body = ErrorResponse)
    ),
    tag = "participants"
)]
pub async fn get_participant(
    State(db): State<Database>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    let participant = services::get_participant_detailed(db.pool(), id).await?;

    Ok(Json(ApiResponse::ok(participant)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/participants/nisn-list",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Every registered NISN", body = ApiResponse<Vec<String>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "participants"
)]
pub async fn list_nisn(State(db): State<Database>) -> Result<Response, WebError> {
    let nisn = services::list_nisn(db.pool()).await?;

    Ok(Json(ApiResponse::ok(nisn)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/participants",
    request_body = CreateParticipantRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Participant created; generated credentials are only shown here", body = CreateParticipantResponse),
        (status = 400, description = "Validation error or duplicate NISN/username", body = ErrorResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "participants"
)]
pub async fn create_participant(
    State(db): State<Database>,
    payload: Result<Json<CreateParticipantRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(req) = payload?;

    let created = services::create_participant(db.pool(), &req).await?;
    tracing::info!(
        id = created.participant.id,
        username = %created.participant.username,
        generated = created.credentials.is_some(),
        "Participant created"
    );

    let response = CreateParticipantResponse {
        success: true,
        message: "Participant created successfully".to_string(),
        data: created.participant,
        credentials: created.credentials,
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/participants/import",
    request_body = ImportParticipantsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Per-row import outcome", body = ApiResponse<ImportSummary>),
        (status = 400, description = "Empty or oversized import", body = ErrorResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "participants"
)]
pub async fn import_participants(
    State(db): State<Database>,
    payload: Result<Json<ImportParticipantsRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(req) = payload?;
    req.validate()?;

    import_rows(&db, &req.participants).await
}

/// Multipart form accepted by the file import.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImportFileForm {
    /// CSV file with a header row: fullName, nisn, birthDate, participantId
    /// and optionally status, autoGenerate, username, password
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/api/participants/import/file",
    request_body(content = ImportFileForm, content_type = "multipart/form-data"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Per-row import outcome", body = ApiResponse<ImportSummary>),
        (status = 400, description = "Missing, unreadable or oversized file", body = ErrorResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "participants"
)]
pub async fn import_participants_file(
    State(db): State<Database>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, WebError> {
    let mut multipart = multipart?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_ascii_lowercase();
        if file_name.ends_with(".xlsx") || file_name.ends_with(".xls") {
            return Err(WebError::BadRequest(
                "Spreadsheet files must be exported as CSV before import".to_string(),
            ));
        }

        upload = Some(field.bytes().await?);
    }

    let data = upload.ok_or_else(|| WebError::BadRequest("No file uploaded".to_string()))?;
    let rows = services::parse_import_csv(&data)?;
    tracing::debug!(rows = rows.len(), "Parsed participant import file");

    let req = ImportParticipantsRequest { participants: rows };
    req.validate()?;

    import_rows(&db, &req.participants).await
}

async fn import_rows(db: &Database, rows: &[CreateParticipantRequest]) -> Result<Response, WebError> {
    let summary = services::import_participants(db.pool(), rows).await;
    tracing::info!(
        imported = summary.imported,
        failed = summary.failed,
        "Participant import finished"
    );

    let message = format!(
        "{} participants imported, {} failed",
        summary.imported, summary.failed
    );

    Ok(Json(ApiResponse::with_message(message, summary)).into_response())
}

#[utoipa::path(
    put,
    path = "/api/participants/{id}",
    params(
        ("id" = i64, Path, description = "Participant id")
    ),
    request_body = UpdateParticipantRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Participant updated successfully", body = ApiResponse<Participant>),
        (status = 400, description = "Validation error or nothing to update", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Participant not found", body = ErrorResponse)
    ),
    tag = "participants"
)]
pub async fn update_participant(
    State(db): State<Database>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateParticipantRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(update_req) = payload?;

    let updated = services::update_participant(db.pool(), id, &update_req).await?;
    tracing::info!(id, "Participant updated");

    Ok(Json(ApiResponse::with_message("Participant updated successfully", updated)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/participants/{id}",
    params(
        ("id" = i64, Path, description = "Participant id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Participant and their exam results deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Requires the manager role"),
        (status = 404, description = "Participant not found", body = ErrorResponse)
    ),
    tag = "participants"
)]
pub async fn delete_participant(
    State(db): State<Database>,
    Extension(admin): Extension<SessionAdmin>,
    Path(id): Path<i64>,
) -> Result<Response, WebError> {
    require_role(&admin, AdminRole::Manager)?;

    services::delete_participant(db.pool(), id).await?;
    tracing::info!(id, admin = %admin.username, "Participant deleted");

    Ok(Json(MessageResponse::new("Participant deleted successfully")).into_response())
}

#[utoipa::path(
    post,
    path = "/api/participants/{id}/exam-results",
    params(
        ("id" = i64, Path, description = "Participant id")
    ),
    request_body = CreateExamResultRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Exam result recorded", body = ApiResponse<ExamResult>),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Participant not found", body = ErrorResponse)
    ),
    tag = "participants"
)]
pub async fn record_exam_result(
    State(db): State<Database>,
    Path(id): Path<i64>,
    payload: Result<Json<CreateExamResultRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(req) = payload?;

    let result = services::record_exam_result(db.pool(), id, &req).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(result))).into_response())
}
