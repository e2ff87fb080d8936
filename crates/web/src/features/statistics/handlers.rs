use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use storage::{
    Database,
    dto::{common::ApiResponse, statistics::StatisticsResponse},
};

use crate::error::WebError;

use super::services;

#[utoipa::path(
    get,
    path = "/api/statistics",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Dashboard counters", body = ApiResponse<StatisticsResponse>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "statistics"
)]
pub async fn get_statistics(State(db): State<Database>) -> Result<Response, WebError> {
    let stats = services::get_statistics(db.pool(), Utc::now().date_naive()).await?;

    Ok(Json(ApiResponse::ok(stats)).into_response())
}
