//! Authentication API Endpoints
//! Mission: Expose registration, login and session lookup over HTTP
//!
//! Two surfaces share the same credential service:
//! - JSON API under `/api/v1/user`
//! - browser form flow under `/client`, answering with redirects

use crate::auth::{
    cookie::CookiePolicy,
    error::{AuthError, AuthResult},
    models::{
        AuthenticatedIdentity, LoginRequest, RegisterRequest, SessionResponse, SuccessResponse,
        UserResponse,
    },
    service::CredentialService,
};
use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{info, warn};

/// Where the browser flow sends the user
#[derive(Debug, Clone)]
pub struct RedirectPaths {
    pub login: String,
    pub dashboard: String,
    pub error: String,
}

impl Default for RedirectPaths {
    fn default() -> Self {
        Self {
            login: "/client/login".to_string(),
            dashboard: "/client/dashboard".to_string(),
            error: "/client/modal".to_string(),
        }
    }
}

impl RedirectPaths {
    fn error_redirect(&self, err: &AuthError) -> Redirect {
        Redirect::to(&format!(
            "{}?status=error&message={}",
            self.error, err.kind()
        ))
    }
}

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<CredentialService>,
    pub cookies: CookiePolicy,
    pub redirects: RedirectPaths,
}

impl AuthState {
    pub fn new(service: Arc<CredentialService>, cookies: CookiePolicy) -> Self {
        Self {
            service,
            cookies,
            redirects: RedirectPaths::default(),
        }
    }

    pub fn with_redirects(mut self, redirects: RedirectPaths) -> Self {
        self.redirects = redirects;
        self
    }
}

/// bcrypt is deliberately slow; keep it off the async workers
async fn run_blocking<T, F>(f: F) -> AuthResult<T>
where
    F: FnOnce() -> AuthResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::Internal(format!("auth worker failed: {e}")))?
}

/// Register endpoint - POST /api/v1/user/register
pub async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SuccessResponse>), AuthError> {
    let Json(payload) =
        payload.map_err(|_| AuthError::Validation("invalid decode json".to_string()))?;

    let service = state.service.clone();
    run_blocking(move || service.register(payload)).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new("register success")),
    ))
}

/// Login endpoint - POST /api/v1/user/login
/// On success the token travels back only as the session cookie.
pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<SuccessResponse>), AuthError> {
    let Json(payload) =
        payload.map_err(|_| AuthError::Validation("invalid decode json".to_string()))?;

    let service = state.service.clone();
    let issued = run_blocking(move || service.login(&payload.email, &payload.password)).await?;

    let jar = jar.add(state.cookies.session_cookie(&issued.token));
    Ok((jar, Json(SuccessResponse::new("login success"))))
}

/// Current session metadata - GET /api/v1/user/session
pub async fn get_current_session(
    State(state): State<AuthState>,
    identity: AuthenticatedIdentity,
) -> Result<Json<SessionResponse>, AuthError> {
    let session = state.service.session_for(&identity.email)?;
    let expired = state.service.sessions().is_expired(&session);

    Ok(Json(SessionResponse {
        email: session.email,
        expires_at: session.expiry,
        expired,
    }))
}

/// Current user profile - GET /api/v1/user/me
pub async fn get_current_user(
    State(state): State<AuthState>,
    identity: AuthenticatedIdentity,
) -> Result<Json<UserResponse>, AuthError> {
    let user = state.service.user_for(&identity.email)?;
    Ok(Json(UserResponse::from_user(&user)))
}

/// Form login - POST /client/login/process
/// Logs in, then reads the stored session back for the cookie.
pub async fn login_process(
    State(state): State<AuthState>,
    jar: CookieJar,
    form: Result<Form<LoginRequest>, FormRejection>,
) -> Response {
    let Ok(Form(form)) = form else {
        return state
            .redirects
            .error_redirect(&AuthError::Validation("invalid form".to_string()))
            .into_response();
    };

    // The cookie carries whatever the store now holds for this email
    let service = state.service.clone();
    let stored = run_blocking(move || {
        service.login(&form.email, &form.password)?;
        service.session_for(&form.email)
    })
    .await;

    match stored {
        Ok(session) => {
            let jar = jar.add(state.cookies.session_cookie(&session.token));
            (jar, Redirect::to(&state.redirects.dashboard)).into_response()
        }
        Err(e) => {
            warn!(kind = e.kind(), "Form login failed");
            state.redirects.error_redirect(&e).into_response()
        }
    }
}

/// Form registration - POST /client/register/process
pub async fn register_process(
    State(state): State<AuthState>,
    form: Result<Form<RegisterRequest>, FormRejection>,
) -> Redirect {
    let Ok(Form(form)) = form else {
        return state
            .redirects
            .error_redirect(&AuthError::Validation("invalid form".to_string()));
    };

    let service = state.service.clone();
    match run_blocking(move || service.register(form)).await {
        Ok(_) => Redirect::to(&state.redirects.login),
        Err(e) => {
            warn!(kind = e.kind(), "Form registration failed");
            state.redirects.error_redirect(&e)
        }
    }
}

/// Landing page after login - GET /client/dashboard
pub async fn dashboard(identity: AuthenticatedIdentity) -> Json<SuccessResponse> {
    Json(SuccessResponse::new(format!("welcome {}", identity.email)))
}

/// Logout - GET /client/logout
/// Only the client-side cookie is cleared; the stored session and the token's
/// own validity are left to expire naturally.
pub async fn logout(
    State(state): State<AuthState>,
    identity: AuthenticatedIdentity,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    info!(email = %identity.email, "Logout");
    let jar = jar.add(state.cookies.clearing_cookie());
    (jar, Redirect::to(&state.redirects.dashboard))
}
