//! Authentication Errors
//! Mission: One taxonomy for every failure the credential core can surface

use crate::auth::models::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

/// Collaborator (user/session store) failure. Opaque to the core: it is never
/// interpreted beyond "the request cannot complete".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Token verification outcome, as reported by the token issuer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Errors surfaced by the credential service and the auth gate
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("email already exists")]
    DuplicateEmail,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("wrong email or password")]
    InvalidCredentials,

    #[error("token is malformed")]
    TokenMalformed,

    #[error("token signature is invalid")]
    TokenInvalidSignature,

    #[error("token has expired")]
    TokenExpired,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => AuthError::TokenMalformed,
            TokenError::InvalidSignature => AuthError::TokenInvalidSignature,
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Signing(msg) => AuthError::Internal(msg),
        }
    }
}

impl AuthError {
    /// HTTP status exposed to callers
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::TokenMalformed => StatusCode::BAD_REQUEST,
            AuthError::DuplicateEmail => StatusCode::CONFLICT,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::InvalidCredentials
            | AuthError::TokenInvalidSignature
            | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::Store(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation_error",
            AuthError::DuplicateEmail => "duplicate_email",
            AuthError::NotFound(_) => "not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::TokenMalformed => "token_malformed",
            AuthError::TokenInvalidSignature => "token_invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::Store(_) => "store_error",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to show to the caller. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Store(_) | AuthError::Internal(_) => "error internal server".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "Request failed");
        }

        (status, Json(ErrorResponse::new(self.public_message()))).into_response()
    }
}
