use axum::extract::FromRef;
use chrono::TimeDelta;
use storage::Database;

/// Lifetimes of issued admin sessions.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub ttl: TimeDelta,
    pub remember_me_ttl: TimeDelta,
}

impl SessionSettings {
    pub fn lifetime(&self, remember_me: bool) -> TimeDelta {
        if remember_me {
            self.remember_me_ttl
        } else {
            self.ttl
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl: TimeDelta::hours(24),
            remember_me_ttl: TimeDelta::days(30),
        }
    }
}

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db: Database,
    pub sessions: SessionSettings,
}
