//! User Storage
//! Mission: Persist user accounts keyed by email

use crate::auth::{
    db::Database,
    error::StoreError,
    models::{NewUser, User},
};
use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, OptionalExtension, Row};
use tracing::info;

/// Outcome of inserting a user
#[derive(Debug)]
pub enum CreateOutcome {
    Created(User),
    /// The email is already taken (the unique index won a race, or a
    /// duplicate slipped past the caller's pre-check)
    EmailTaken,
}

/// User store collaborator
pub trait UserStore: Send + Sync {
    fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    fn create(&self, user: NewUser) -> Result<CreateOutcome, StoreError>;
}

/// User storage with SQLite backend
pub struct SqliteUserStore {
    db: Database,
}

impl SqliteUserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Number of users registered under `email`
    pub fn count_by_email(&self, email: &str) -> Result<i64, StoreError> {
        let conn = self.db.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl UserStore for SqliteUserStore {
    fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.db.lock();

        let raw = conn
            .query_row(
                "SELECT id, fullname, email, secret_hash, created_at, updated_at
                 FROM users WHERE email = ?1",
                params![email],
                raw_user,
            )
            .optional()?;

        raw.map(RawUser::into_user).transpose()
    }

    fn create(&self, user: NewUser) -> Result<CreateOutcome, StoreError> {
        let conn = self.db.lock();

        let created_at = user.created_at.to_rfc3339();
        let inserted = conn.execute(
            "INSERT INTO users (fullname, email, secret_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![user.fullname, user.email, user.secret_hash, created_at],
        );

        match inserted {
            Ok(_) => {}
            // Only the unique email index means "taken"; other constraint
            // failures are store errors
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                return Ok(CreateOutcome::EmailTaken);
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        info!(email = %user.email, id, "Created user");

        Ok(CreateOutcome::Created(User {
            id,
            fullname: user.fullname,
            email: user.email,
            secret_hash: user.secret_hash,
            created_at: user.created_at,
            updated_at: user.created_at,
        }))
    }
}

struct RawUser {
    id: i64,
    fullname: String,
    email: String,
    secret_hash: String,
    created_at: String,
    updated_at: String,
}

fn raw_user(row: &Row<'_>) -> rusqlite::Result<RawUser> {
    Ok(RawUser {
        id: row.get(0)?,
        fullname: row.get(1)?,
        email: row.get(2)?,
        secret_hash: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl RawUser {
    fn into_user(self) -> Result<User, StoreError> {
        Ok(User {
            id: self.id,
            fullname: self.fullname,
            email: self.email,
            secret_hash: self.secret_hash,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {raw:?}: {e}")))
}
