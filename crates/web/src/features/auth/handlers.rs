use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use storage::{
    Database,
    dto::{
        auth::{AdminInfo, LoginRequest, LoginResponse, SessionInfo},
        common::{ApiResponse, MessageResponse},
    },
    models::SessionAdmin,
};
use validator::Validate;

use crate::error::WebError;
use crate::state::SessionSettings;

use super::services;

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid username or password"),
        (status = 429, description = "Account temporarily locked")
    ),
    tag = "auth"
)]
pub async fn login(
    State(db): State<Database>,
    State(settings): State<SessionSettings>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(req) = payload?;
    req.validate()?;

    let session = services::login(db.pool(), &settings, &req, Utc::now().naive_utc()).await?;

    Ok(Json(ApiResponse::with_message("Login successful", session)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Session revoked", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth"
)]
pub async fn logout(
    State(db): State<Database>,
    Extension(admin): Extension<SessionAdmin>,
) -> Result<Response, WebError> {
    services::logout(db.pool(), &admin).await?;

    Ok(Json(MessageResponse::new("Logged out")).into_response())
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current admin session", body = ApiResponse<SessionInfo>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth"
)]
pub async fn me(Extension(admin): Extension<SessionAdmin>) -> Result<Response, WebError> {
    let info = SessionInfo {
        expires_at: admin.expires_at,
        admin: AdminInfo::from(&admin),
    };

    Ok(Json(ApiResponse::ok(info)).into_response())
}
