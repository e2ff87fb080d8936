use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Dashboard counters, recomputed on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResponse {
    pub total_participants: i64,
    pub active_participants: i64,
    pub waiting_participants: i64,
    pub blocked_participants: i64,
    pub today_registrations: i64,
    /// Distinct participants with at least one exam result
    pub completed_exams: i64,
}
