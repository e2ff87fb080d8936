use anyhow::{Context, Result};
use chrono::TimeDelta;

use crate::state::SessionSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub session_ttl_hours: i64,
    pub remember_me_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: match std::env::var("PORT") {
                Ok(port) => port.parse().context("PORT must be a number")?,
                Err(_) => 3000,
            },
            database_url: std::env::var("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            admin_username: non_empty_var("ADMIN_USERNAME"),
            admin_password: non_empty_var("ADMIN_PASSWORD"),
            session_ttl_hours: parse_or("SESSION_TTL_HOURS", 24)?,
            remember_me_ttl_days: parse_or("REMEMBER_ME_TTL_DAYS", 30)?,
        })
    }

    pub fn session_settings(&self) -> Result<SessionSettings> {
        Ok(SessionSettings {
            ttl: TimeDelta::try_hours(self.session_ttl_hours)
                .context("SESSION_TTL_HOURS is out of range")?,
            remember_me_ttl: TimeDelta::try_days(self.remember_me_ttl_days)
                .context("REMEMBER_ME_TTL_DAYS is out of range")?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or(name: &str, default: i64) -> Result<i64> {
    match std::env::var(name) {
        Ok(value) => {
            let parsed: i64 = value
                .parse()
                .with_context(|| format!("{name} must be a number"))?;
            anyhow::ensure!(parsed > 0, "{name} must be positive");
            Ok(parsed)
        }
        Err(_) => Ok(default),
    }
}
