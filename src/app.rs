//! Application wiring
//! Mission: Assemble stores, issuer, service and gates into one router

use crate::{
    auth::{
        api::{self as auth_api, AuthState},
        clock::Clock,
        db::Database,
        jwt::TokenIssuer,
        middleware::{auth_gate, AuthGate, JsonRejection, NegotiatedRejection, RedirectRejection},
        service::CredentialService,
        session_store::{SessionStore, SqliteSessionStore},
        user_store::{SqliteUserStore, UserStore},
    },
    config::Config,
    middleware::request_logging,
};
use anyhow::Result;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Everything the routers need, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    /// Gate for `/api/v1/user`, answers with JSON
    pub api_gate: AuthGate,
    /// Gate for `/client`, JSON or redirect depending on the request
    pub client_gate: AuthGate,
}

impl AppState {
    pub fn build(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let db = Database::open(&config.db_path)?;
        Ok(Self::with_database(config, db, clock))
    }

    /// Same as [`AppState::build`] over an already opened database
    pub fn with_database(config: &Config, db: Database, clock: Arc<dyn Clock>) -> Self {
        let users: Arc<dyn UserStore> = Arc::new(SqliteUserStore::new(db.clone()));
        let sessions: Arc<dyn SessionStore> =
            Arc::new(SqliteSessionStore::new(db, clock.clone()));
        let issuer = Arc::new(TokenIssuer::new(config.signing_secret.clone(), clock.clone()));

        let service = CredentialService::new(users, sessions.clone(), issuer.clone(), clock)
            .with_session_ttl(config.session_ttl)
            .with_bcrypt_cost(config.bcrypt_cost);

        let auth = AuthState::new(Arc::new(service), config.cookies.clone())
            .with_redirects(config.redirects.clone());

        let api_gate = AuthGate::new(issuer, sessions, Arc::new(JsonRejection))
            .with_mode(config.gate_mode);
        let client_gate = api_gate
            .clone()
            .with_strategy(Arc::new(NegotiatedRejection {
                redirect: RedirectRejection {
                    login_path: config.redirects.login.clone(),
                    error_path: config.redirects.error.clone(),
                },
                ..Default::default()
            }));

        info!(
            gate_mode = ?config.gate_mode,
            session_ttl_minutes = config.session_ttl.num_minutes(),
            "Auth state ready"
        );

        Self {
            auth,
            api_gate,
            client_gate,
        }
    }
}

async fn health_check() -> &'static str {
    "ok"
}

pub fn build_router(state: AppState) -> Router {
    let api_public = Router::new()
        .route("/register", post(auth_api::register))
        .route("/login", post(auth_api::login));

    let api_protected = Router::new()
        .route("/session", get(auth_api::get_current_session))
        .route("/me", get(auth_api::get_current_user))
        .route_layer(middleware::from_fn_with_state(state.api_gate.clone(), auth_gate));

    let client_public = Router::new()
        .route("/login/process", post(auth_api::login_process))
        .route("/register/process", post(auth_api::register_process));

    let client_protected = Router::new()
        .route("/dashboard", get(auth_api::dashboard))
        .route("/logout", get(auth_api::logout))
        .route_layer(middleware::from_fn_with_state(
            state.client_gate.clone(),
            auth_gate,
        ));

    let auth_routes = Router::new()
        .nest("/api/v1/user", api_public.merge(api_protected))
        .nest("/client", client_public.merge(client_protected))
        .with_state(state.auth);

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}
