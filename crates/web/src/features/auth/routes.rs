use axum::{
    Router, middleware,
    routing::{get, post},
};

use super::handlers::{login, logout, me};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new().route("/login", post(login)).merge(protected)
}
