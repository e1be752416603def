//! Credential Service
//! Mission: Register users, check secrets, and hand out session tokens

use crate::auth::{
    clock::Clock,
    error::{AuthError, AuthResult},
    jwt::{IssuedToken, TokenIssuer},
    models::{NewUser, RegisterRequest, Session, User},
    password::{hash_secret, verify_secret},
    session_store::SessionStore,
    user_store::{CreateOutcome, UserStore},
};
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};

/// Default session lifetime
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 20;

/// Orchestrates registration and login. Sole owner of the decision to create
/// or replace a session.
pub struct CredentialService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    issuer: Arc<TokenIssuer>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
    bcrypt_cost: u32,
}

impl CredentialService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        issuer: Arc<TokenIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            sessions,
            issuer,
            clock,
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Register a new user. No session is created; the user logs in afterwards.
    pub fn register(&self, candidate: RegisterRequest) -> AuthResult<User> {
        if candidate.fullname.trim().is_empty()
            || candidate.email.trim().is_empty()
            || candidate.password.is_empty()
        {
            return Err(AuthError::Validation("register data is empty".to_string()));
        }

        if self.users.get_by_email(&candidate.email)?.is_some() {
            warn!(email = %candidate.email, "Registration rejected: email already exists");
            return Err(AuthError::DuplicateEmail);
        }

        let secret_hash = hash_secret(&candidate.password, self.bcrypt_cost)?;
        let new_user = NewUser {
            fullname: candidate.fullname,
            email: candidate.email,
            secret_hash,
            created_at: self.clock.now(),
        };

        match self.users.create(new_user)? {
            CreateOutcome::Created(user) => {
                info!(email = %user.email, "Registered user");
                Ok(user)
            }
            CreateOutcome::EmailTaken => Err(AuthError::DuplicateEmail),
        }
    }

    /// Check credentials, mint a token and upsert it as the email's session.
    /// On any failure the session store is left untouched.
    pub fn login(&self, email: &str, secret: &str) -> AuthResult<IssuedToken> {
        if email.trim().is_empty() || secret.is_empty() {
            return Err(AuthError::Validation("login data is empty".to_string()));
        }

        let user = self
            .users
            .get_by_email(email)?
            .ok_or(AuthError::NotFound("user"))?;

        if !verify_secret(secret, &user.secret_hash)? {
            warn!(email = %email, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.issuer.mint(&user.email, self.session_ttl)?;
        self.sessions
            .upsert(&user.email, &issued.token, issued.expires_at)?;

        info!(email = %user.email, expires_at = %issued.expires_at, "Login successful");
        Ok(issued)
    }

    /// Session currently recorded for `email`
    pub fn session_for(&self, email: &str) -> AuthResult<Session> {
        self.sessions
            .lookup_by_email(email)?
            .ok_or(AuthError::NotFound("session"))
    }

    /// Profile of an authenticated caller
    pub fn user_for(&self, email: &str) -> AuthResult<User> {
        self.users
            .get_by_email(email)?
            .ok_or(AuthError::NotFound("user"))
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }
}
