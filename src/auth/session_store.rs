//! Session Storage
//! Mission: Keep exactly one live session record per email
//!
//! The table is keyed by email, so `upsert` is a single
//! `INSERT .. ON CONFLICT(email) DO UPDATE` statement: concurrent logins for
//! the same account can never leave two rows behind.

use crate::auth::{
    clock::Clock,
    db::Database,
    error::{AuthError, StoreError},
    models::Session,
};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;
use tracing::{debug, info};

/// Session store collaborator
pub trait SessionStore: Send + Sync {
    /// Insert or replace the session for `email`. Never additive.
    fn upsert(
        &self,
        email: &str,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<Session, StoreError>;

    fn lookup_by_email(&self, email: &str) -> Result<Option<Session>, StoreError>;

    fn lookup_by_token(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Remove the row holding `token`; returns whether a row was removed
    fn delete(&self, token: &str) -> Result<bool, StoreError>;

    /// Current instant as seen by this store
    fn now(&self) -> DateTime<Utc>;

    /// A session is expired from its expiry instant onward
    fn is_expired(&self, session: &Session) -> bool {
        self.now() >= session.expiry
    }

    /// Administrative liveness check: the session holding `token` exists and
    /// has not expired. An expired row is deleted on the way out.
    fn token_validity(&self, token: &str) -> Result<Session, AuthError> {
        let session = self
            .lookup_by_token(token)?
            .ok_or(AuthError::NotFound("session"))?;

        if self.is_expired(&session) {
            self.delete(token)?;
            debug!(email = %session.email, "Removed expired session");
            return Err(AuthError::TokenExpired);
        }

        Ok(session)
    }
}

/// Session storage with SQLite backend
pub struct SqliteSessionStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl SqliteSessionStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Number of session rows for `email` (0 or 1)
    pub fn count_for_email(&self, email: &str) -> Result<i64, StoreError> {
        let conn = self.db.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Total number of session rows
    pub fn count(&self) -> Result<i64, StoreError> {
        let conn = self.db.lock();
        let count = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl SessionStore for SqliteSessionStore {
    fn upsert(
        &self,
        email: &str,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        let conn = self.db.lock();

        conn.execute(
            "INSERT INTO sessions (email, token, expires_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(email) DO UPDATE SET
                token = excluded.token,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
            params![
                email,
                token,
                expiry.timestamp(),
                self.clock.now().to_rfc3339()
            ],
        )?;

        info!(email = %email, expires_at = %expiry, "Session upserted");

        Ok(Session {
            token: token.to_string(),
            email: email.to_string(),
            expiry: truncate_to_second(expiry)?,
        })
    }

    fn lookup_by_email(&self, email: &str) -> Result<Option<Session>, StoreError> {
        let conn = self.db.lock();
        let raw = conn
            .query_row(
                "SELECT token, email, expires_at FROM sessions WHERE email = ?1",
                params![email],
                raw_session,
            )
            .optional()?;

        raw.map(RawSession::into_session).transpose()
    }

    fn lookup_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let conn = self.db.lock();
        let raw = conn
            .query_row(
                "SELECT token, email, expires_at FROM sessions WHERE token = ?1",
                params![token],
                raw_session,
            )
            .optional()?;

        raw.map(RawSession::into_session).transpose()
    }

    fn delete(&self, token: &str) -> Result<bool, StoreError> {
        let conn = self.db.lock();
        let rows_affected = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(rows_affected > 0)
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

struct RawSession {
    token: String,
    email: String,
    expires_at: i64,
}

fn raw_session(row: &Row<'_>) -> rusqlite::Result<RawSession> {
    Ok(RawSession {
        token: row.get(0)?,
        email: row.get(1)?,
        expires_at: row.get(2)?,
    })
}

impl RawSession {
    fn into_session(self) -> Result<Session, StoreError> {
        let expiry = Utc
            .timestamp_opt(self.expires_at, 0)
            .single()
            .ok_or_else(|| StoreError::Corrupt(format!("bad expiry {}", self.expires_at)))?;

        Ok(Session {
            token: self.token,
            email: self.email,
            expiry,
        })
    }
}

fn truncate_to_second(ts: DateTime<Utc>) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_opt(ts.timestamp(), 0)
        .single()
        .ok_or_else(|| StoreError::Corrupt(format!("bad expiry {ts}")))
}
