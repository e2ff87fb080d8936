use chrono::{NaiveDateTime, TimeDelta, Utc};
use sqlx::SqlitePool;
use storage::{
    dto::auth::{AdminInfo, LoginRequest, LoginResponse},
    models::{AdminRole, SessionAdmin},
    repository::admin::{AdminRepository, AdminSessionRepository},
    services::credentials,
};

use crate::error::{WebError, WebResult};
use crate::state::SessionSettings;

/// Consecutive failures that lock an account.
pub const MAX_FAILED_ATTEMPTS: i64 = 3;
pub const LOCKOUT_MINUTES: i64 = 5;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Argon2 runs off the async worker threads.
pub async fn hash_password(password: String) -> WebResult<String> {
    tokio::task::spawn_blocking(move || credentials::hash_password(&password))
        .await
        .map_err(|e| WebError::InternalServerError(format!("Password hashing task failed: {e}")))?
        .map_err(WebError::from)
}

async fn verify_password(password: String, password_hash: String) -> WebResult<bool> {
    tokio::task::spawn_blocking(move || credentials::verify_password(&password, &password_hash))
        .await
        .map_err(|e| WebError::InternalServerError(format!("Password check task failed: {e}")))
}

/// Check credentials and open a new server-side session.
pub async fn login(
    pool: &SqlitePool,
    settings: &SessionSettings,
    req: &LoginRequest,
    now: NaiveDateTime,
) -> WebResult<LoginResponse> {
    let admins = AdminRepository::new(pool);

    let Some(admin) = admins.find_by_username(req.username.trim()).await? else {
        tracing::warn!(username = %req.username, "Login attempt for unknown admin");
        return Err(WebError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if let Some(until) = admin.locked_until.filter(|until| *until > now) {
        return Err(WebError::TooManyRequests(format!(
            "Account is locked after too many failed attempts, try again after {} UTC",
            until.format("%Y-%m-%d %H:%M:%S")
        )));
    }

    if !verify_password(req.password.clone(), admin.password_hash.clone()).await? {
        let attempts = admins.record_failed_login(admin.id).await?;
        if attempts >= MAX_FAILED_ATTEMPTS {
            let until = now + TimeDelta::minutes(LOCKOUT_MINUTES);
            admins.lock(admin.id, until).await?;
            tracing::warn!(admin = %admin.username, %until, "Admin account locked");
            return Err(WebError::TooManyRequests(format!(
                "Too many failed login attempts, try again in {LOCKOUT_MINUTES} minutes"
            )));
        }

        tracing::warn!(admin = %admin.username, attempts, "Failed admin login");
        return Err(WebError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    admins.reset_failed_logins(admin.id).await?;

    let sessions = AdminSessionRepository::new(pool);
    let purged = sessions.purge_expired(now).await?;
    if purged > 0 {
        tracing::debug!(purged, "Removed expired admin sessions");
    }

    let token = credentials::generate_session_token();
    let expires_at = now + settings.lifetime(req.remember_me);
    sessions
        .create(&credentials::fingerprint_token(&token), admin.id, expires_at)
        .await?;

    tracing::info!(admin = %admin.username, %expires_at, "Admin logged in");

    Ok(LoginResponse {
        token,
        expires_at,
        admin: AdminInfo {
            username: admin.username,
            display_name: admin.display_name,
            role: admin.role,
        },
    })
}

/// Resolve a bearer token to the admin owning a live session.
pub async fn authenticate(pool: &SqlitePool, token: &str) -> WebResult<SessionAdmin> {
    AdminSessionRepository::new(pool)
        .find_active(&credentials::fingerprint_token(token), Utc::now().naive_utc())
        .await?
        .ok_or_else(|| WebError::Unauthorized("Invalid or expired token".to_string()))
}

pub async fn logout(pool: &SqlitePool, admin: &SessionAdmin) -> WebResult<()> {
    AdminSessionRepository::new(pool)
        .delete(&admin.token_hash)
        .await?;

    tracing::info!(admin = %admin.username, "Admin logged out");
    Ok(())
}

/// Creates the first super admin when the admin table is empty. Returns
/// whether an account was created.
pub async fn ensure_bootstrap_admin(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> WebResult<bool> {
    let admins = AdminRepository::new(pool);
    if admins.count().await? > 0 {
        return Ok(false);
    }

    let password_hash = hash_password(password.to_string()).await?;
    admins
        .create(username, &password_hash, "Administrator", AdminRole::SuperAdmin)
        .await?;

    tracing::info!(admin = %username, "Bootstrap super admin created");
    Ok(true)
}
