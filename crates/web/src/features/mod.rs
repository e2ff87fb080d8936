pub mod auth;
pub mod health;
pub mod participants;
pub mod statistics;

use axum::Router;

use crate::state::AppState;

/// Every API route, mounted under `/api`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/health", health::routes::routes())
        .nest("/auth", auth::routes::routes(state.clone()))
        .nest("/participants", participants::routes::routes(state.clone()))
        .nest("/statistics", statistics::routes::routes(state.clone()));

    Router::new().nest("/api", api).with_state(state)
}
