use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use storage::{
    Database,
    models::{AdminRole, SessionAdmin},
};

use crate::error::WebError;
use crate::features::auth::services;

/// Resolves the bearer token to a live admin session and stores the
/// [`SessionAdmin`] in the request extensions.
pub async fn require_auth(
    State(db): State<Database>,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let token = bearer_token(req.headers())
        .map(str::to_owned)
        .ok_or_else(|| WebError::Unauthorized("Access token required".to_string()))?;

    let admin = services::authenticate(db.pool(), &token).await?;
    tracing::debug!(admin = %admin.username, role = %admin.role, "Authenticated request");

    req.extensions_mut().insert(admin);
    Ok(next.run(req).await)
}

pub fn require_role(admin: &SessionAdmin, required: AdminRole) -> Result<(), WebError> {
    if admin.role.satisfies(required) {
        Ok(())
    } else {
        tracing::warn!(
            admin = %admin.username,
            role = %admin.role,
            required = %required,
            "Rejected request with insufficient role"
        );
        Err(WebError::Forbidden)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }
}
