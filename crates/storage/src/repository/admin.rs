use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{Result, StorageError};
use crate::models::{Admin, AdminRole, SessionAdmin};

pub struct AdminRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AdminRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admins")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(
            r#"
            SELECT id, username, password_hash, display_name, role,
                   failed_attempts, locked_until, created_at
            FROM admins
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(admin)
    }

    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        display_name: &str,
        role: AdminRole,
    ) -> Result<Admin> {
        let admin = sqlx::query_as::<_, Admin>(
            r#"
            INSERT INTO admins (username, password_hash, display_name, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, username, password_hash, display_name, role,
                      failed_attempts, locked_until, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(display_name)
        .bind(role)
        .bind(Utc::now().naive_utc())
        .fetch_one(self.pool)
        .await
        .map_err(|e| StorageError::from(e).classify())?;

        Ok(admin)
    }

    /// Count one more failed login and return the new total. The increment
    /// happens in SQL so concurrent failures are all counted.
    pub async fn record_failed_login(&self, id: i64) -> Result<i64> {
        let failed_attempts = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE admins
            SET failed_attempts = failed_attempts + 1
            WHERE id = ?
            RETURNING failed_attempts
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(failed_attempts)
    }

    /// Lock the account until `until` and start a fresh failure count.
    pub async fn lock(&self, id: i64, until: NaiveDateTime) -> Result<()> {
        sqlx::query("UPDATE admins SET failed_attempts = 0, locked_until = ? WHERE id = ?")
            .bind(until)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    pub async fn reset_failed_logins(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE admins SET failed_attempts = 0, locked_until = NULL WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}

/// Server-side session store keyed by token fingerprint.
pub struct AdminSessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AdminSessionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        token_hash: &str,
        admin_id: i64,
        expires_at: NaiveDateTime,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO admin_sessions (token_hash, admin_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token_hash)
        .bind(admin_id)
        .bind(Utc::now().naive_utc())
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// The admin owning an unexpired session, if any.
    pub async fn find_active(
        &self,
        token_hash: &str,
        now: NaiveDateTime,
    ) -> Result<Option<SessionAdmin>> {
        let admin = sqlx::query_as::<_, SessionAdmin>(
            r#"
            SELECT a.id AS admin_id, a.username, a.display_name, a.role,
                   s.token_hash, s.expires_at
            FROM admin_sessions s
            JOIN admins a ON a.id = s.admin_id
            WHERE s.token_hash = ? AND s.expires_at > ?
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        Ok(admin)
    }

    pub async fn delete(&self, token_hash: &str) -> Result<()> {
        sqlx::query("DELETE FROM admin_sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    pub async fn purge_expired(&self, now: NaiveDateTime) -> Result<u64> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
