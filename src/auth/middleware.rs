//! Authentication Middleware (auth gate)
//! Mission: Turn the session cookie into a verified identity or reject the request
//!
//! Per request the gate ends in exactly one of Pass or Reject:
//! 1. no `session_token` cookie            -> Unauthorized
//! 2. token fails verification             -> BadRequest (malformed) / Unauthorized
//! 3. otherwise the email is attached to the request extensions
//!
//! In the default [`GateMode::Stateless`] mode the session store is not
//! consulted, so a token superseded by a newer login keeps passing until its
//! own expiry. [`GateMode::SessionBound`] additionally requires the token to
//! be the email's current, unexpired session.
//!
//! How a rejection is rendered (JSON body or redirect) is decided by the
//! injected [`RejectionStrategy`], never by the gate itself.

use crate::auth::{
    cookie::extract_session_token,
    error::{AuthError, TokenError},
    jwt::TokenIssuer,
    models::{AuthenticatedIdentity, ErrorResponse},
    session_store::SessionStore,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::{
    extract::cookie::CookieJar,
    headers::{ContentType, HeaderMapExt},
};
use std::{str::FromStr, sync::Arc};
use tracing::{debug, error, info};

/// Whether the gate cross-checks the session store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateMode {
    /// Signature + expiry only
    #[default]
    Stateless,
    /// Signature + expiry, and the token must be the email's live session
    SessionBound,
}

impl FromStr for GateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stateless" => Ok(GateMode::Stateless),
            "session-bound" | "session_bound" => Ok(GateMode::SessionBound),
            other => Err(format!(
                "unknown gate mode {other:?} (expected stateless or session-bound)"
            )),
        }
    }
}

/// Why the gate rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    MissingToken,
    MalformedToken,
    InvalidSignature,
    Expired,
    /// Session-bound mode only: the token is no longer the email's session
    SessionNotLive,
    /// Session-bound mode only: the session store failed
    StoreUnavailable,
}

impl GateRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            GateRejection::MalformedToken => StatusCode::BAD_REQUEST,
            GateRejection::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            GateRejection::MissingToken
            | GateRejection::InvalidSignature
            | GateRejection::Expired
            | GateRejection::SessionNotLive => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn message(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::UNAUTHORIZED => "Unauthorized",
            _ => "error internal server",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            GateRejection::MissingToken => "missing_token",
            GateRejection::MalformedToken => "malformed_token",
            GateRejection::InvalidSignature => "invalid_signature",
            GateRejection::Expired => "expired",
            GateRejection::SessionNotLive => "session_not_live",
            GateRejection::StoreUnavailable => "store_unavailable",
        }
    }
}

impl From<TokenError> for GateRejection {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => GateRejection::MalformedToken,
            TokenError::InvalidSignature => GateRejection::InvalidSignature,
            TokenError::Expired => GateRejection::Expired,
            // Verification never signs; treat defensively as unusable input.
            TokenError::Signing(_) => GateRejection::MalformedToken,
        }
    }
}

/// Renders a gate rejection for the caller
pub trait RejectionStrategy: Send + Sync {
    fn respond(&self, headers: &HeaderMap, rejection: GateRejection) -> Response;
}

/// API callers: `{"error": "..."}` with the rejection's status
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRejection;

impl RejectionStrategy for JsonRejection {
    fn respond(&self, _headers: &HeaderMap, rejection: GateRejection) -> Response {
        (
            rejection.status(),
            Json(ErrorResponse::new(rejection.message())),
        )
            .into_response()
    }
}

/// Browser callers: 303 to the login page, or to the error surface for bad input
#[derive(Debug, Clone)]
pub struct RedirectRejection {
    pub login_path: String,
    pub error_path: String,
}

impl Default for RedirectRejection {
    fn default() -> Self {
        Self {
            login_path: "/client/login".to_string(),
            error_path: "/client/modal".to_string(),
        }
    }
}

impl RejectionStrategy for RedirectRejection {
    fn respond(&self, _headers: &HeaderMap, rejection: GateRejection) -> Response {
        match rejection.status() {
            StatusCode::UNAUTHORIZED => Redirect::to(&self.login_path).into_response(),
            _ => Redirect::to(&format!(
                "{}?status=error&message={}",
                self.error_path,
                rejection.reason()
            ))
            .into_response(),
        }
    }
}

/// Picks JSON for requests whose content type is on the API list, a redirect
/// for everything else
#[derive(Debug, Clone)]
pub struct NegotiatedRejection {
    pub api_content_types: Vec<String>,
    pub json: JsonRejection,
    pub redirect: RedirectRejection,
}

impl Default for NegotiatedRejection {
    fn default() -> Self {
        Self {
            api_content_types: vec!["application/json".to_string()],
            json: JsonRejection,
            redirect: RedirectRejection::default(),
        }
    }
}

impl NegotiatedRejection {
    pub fn is_api_request(&self, headers: &HeaderMap) -> bool {
        let Some(content_type) = headers.typed_get::<ContentType>() else {
            return false;
        };
        let content_type = content_type.to_string();
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();

        self.api_content_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(essence))
    }
}

impl RejectionStrategy for NegotiatedRejection {
    fn respond(&self, headers: &HeaderMap, rejection: GateRejection) -> Response {
        if self.is_api_request(headers) {
            self.json.respond(headers, rejection)
        } else {
            self.redirect.respond(headers, rejection)
        }
    }
}

/// Shared gate state handed to `from_fn_with_state`
#[derive(Clone)]
pub struct AuthGate {
    issuer: Arc<TokenIssuer>,
    sessions: Arc<dyn SessionStore>,
    mode: GateMode,
    strategy: Arc<dyn RejectionStrategy>,
}

impl AuthGate {
    pub fn new(
        issuer: Arc<TokenIssuer>,
        sessions: Arc<dyn SessionStore>,
        strategy: Arc<dyn RejectionStrategy>,
    ) -> Self {
        Self {
            issuer,
            sessions,
            mode: GateMode::default(),
            strategy,
        }
    }

    pub fn with_mode(mut self, mode: GateMode) -> Self {
        self.mode = mode;
        self
    }

    /// Same gate, different rendering of its rejections
    pub fn with_strategy(mut self, strategy: Arc<dyn RejectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }

    /// Decide Pass/Reject for a raw cookie value
    pub fn check(&self, token: Option<&str>) -> Result<AuthenticatedIdentity, GateRejection> {
        let token = token.ok_or(GateRejection::MissingToken)?;
        let claims = self.issuer.verify(token)?;

        if self.mode == GateMode::SessionBound {
            match self.sessions.token_validity(token) {
                Ok(session) if session.email == claims.email => {}
                Ok(_) | Err(AuthError::TokenExpired) | Err(AuthError::NotFound(_)) => {
                    return Err(GateRejection::SessionNotLive);
                }
                Err(e) => {
                    error!(error = %e, "Session lookup failed in auth gate");
                    return Err(GateRejection::StoreUnavailable);
                }
            }
        }

        Ok(AuthenticatedIdentity {
            email: claims.email,
        })
    }
}

/// Auth gate middleware
pub async fn auth_gate(
    State(gate): State<AuthGate>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let token = extract_session_token(&jar);

    match gate.check(token.as_deref()) {
        Ok(identity) => {
            debug!(email = %identity.email, path = %req.uri().path(), "Auth gate pass");
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(rejection) => {
            info!(
                reason = rejection.reason(),
                path = %req.uri().path(),
                "Auth gate reject"
            );
            gate.strategy.respond(req.headers(), rejection)
        }
    }
}

/// Extract the identity from a request (use after the auth gate)
pub fn extract_identity(req: &Request) -> Option<&AuthenticatedIdentity> {
    req.extensions().get::<AuthenticatedIdentity>()
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .ok_or_else(|| JsonRejection.respond(&parts.headers, GateRejection::MissingToken))
    }
}
