use axum::{
    Router, middleware,
    routing::{get, post},
};

use super::handlers::{
    create_participant, delete_participant, get_participant, import_participants,
    import_participants_file, list_nisn, list_participants, record_exam_result, update_participant,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_participants).post(create_participant))
        .route("/nisn-list", get(list_nisn))
        .route("/import", post(import_participants))
        .route("/import/file", post(import_participants_file))
        .route(
            "/:id",
            get(get_participant)
                .put(update_participant)
                .delete(delete_participant),
        )
        .route("/:id/exam-results", post(record_exam_result))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
