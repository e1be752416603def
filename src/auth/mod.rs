//! Authentication Module
//! Mission: Register users, issue session tokens, and gate requests on them

pub mod api;
pub mod clock;
pub mod cookie;
pub mod db;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod session_store;
pub mod user_store;

pub use api::AuthState;
pub use clock::{Clock, ManualClock, SystemClock};
pub use db::Database;
pub use error::{AuthError, StoreError, TokenError};
pub use jwt::{IssuedToken, SigningSecret, TokenIssuer};
pub use middleware::{auth_gate, AuthGate, GateMode, GateRejection, RejectionStrategy};
pub use service::CredentialService;
pub use session_store::{SessionStore, SqliteSessionStore};
pub use user_store::{SqliteUserStore, UserStore};
