//! Session Gate Library
//!
//! Credential registration, session tokens and the auth gate, exposed for the
//! server binary and the integration tests.

pub mod app;
pub mod auth;
pub mod config;
pub mod middleware;

pub use app::{build_router, AppState};
pub use config::{Args, Config};
