use axum::{Router, middleware, routing::get};

use super::handlers::get_statistics;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_statistics))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
