//! Authentication Models
//! Mission: Define user, session and token data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered user account. Identity is the email, case-sensitive as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub fullname: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub secret_hash: String, // bcrypt hash - never serialize
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User record handed to the user store for insertion
#[derive(Debug, Clone)]
pub struct NewUser {
    pub fullname: String,
    pub email: String,
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Server-side record of the currently issued token for an email.
/// At most one exists per email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub expiry: DateTime<Utc>,
}

/// JWT Claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub exp: i64, // expiration, unix seconds
    pub iat: i64, // issued at, unix seconds
    pub jti: String,
}

/// Identity attached to a request by the auth gate. Lives for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub email: String,
}

/// Registration request body (JSON or form)
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login request body (JSON or form)
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub message: String,
}

impl SuccessResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/// User response (sanitized)
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub fullname: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            fullname: user.fullname.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// Session metadata returned to its owner. The token itself stays in the cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
}
