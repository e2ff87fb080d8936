use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Account state of an exam participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ParticipantStatus {
    #[default]
    Aktif,
    Menunggu,
    Terblokir,
}

impl ParticipantStatus {
    pub const ALL: [ParticipantStatus; 3] = [Self::Aktif, Self::Menunggu, Self::Terblokir];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aktif => "aktif",
            Self::Menunggu => "menunggu",
            Self::Terblokir => "terblokir",
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("status must be one of: aktif, menunggu, terblokir (got '{s}')"))
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: i64,
    pub full_name: String,
    pub nisn: String,
    pub birth_date: NaiveDate,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub participant_id: String,
    pub status: ParticipantStatus,
    pub registration_date: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
