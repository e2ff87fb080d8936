use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{AdminRole, SessionAdmin};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Extends the session lifetime
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminInfo {
    pub username: String,
    pub display_name: String,
    pub role: AdminRole,
}

impl From<&SessionAdmin> for AdminInfo {
    fn from(admin: &SessionAdmin) -> Self {
        Self {
            username: admin.username.clone(),
            display_name: admin.display_name.clone(),
            role: admin.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: NaiveDateTime,
    pub admin: AdminInfo,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub expires_at: NaiveDateTime,
    pub admin: AdminInfo,
}
