//! Runtime configuration
//!
//! Every flag can also be supplied through the environment (or a `.env` file).

use crate::auth::{
    api::RedirectPaths,
    cookie::{CookiePolicy, DEFAULT_COOKIE_MAX_AGE_SECS},
    jwt::{SigningSecret, DEV_SIGNING_SECRET},
    middleware::GateMode,
    password::{DEFAULT_COST, MAX_COST, MIN_COST},
    service::DEFAULT_SESSION_TTL_MINUTES,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use tracing::warn;

#[derive(Parser, Debug, Clone)]
#[command(name = "session-gate")]
#[command(about = "Credential and session service with a token gate for protected routes")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// SQLite database holding users and sessions
    #[arg(long, env = "AUTH_DB_PATH", default_value = "session_gate.db")]
    pub db_path: String,

    /// HS256 signing secret; a development secret is used when absent
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Lifetime of a freshly minted session token
    #[arg(long, env = "SESSION_TTL_MINUTES", default_value_t = DEFAULT_SESSION_TTL_MINUTES)]
    pub session_ttl_minutes: i64,

    /// Client-side lifetime of the session cookie
    #[arg(long, env = "COOKIE_MAX_AGE_SECS", default_value_t = DEFAULT_COOKIE_MAX_AGE_SECS)]
    pub cookie_max_age_secs: i64,

    /// Set the Secure flag on the session cookie
    #[arg(long, env = "COOKIE_SECURE", action = clap::ArgAction::Set, default_value_t = false)]
    pub cookie_secure: bool,

    /// bcrypt work factor
    #[arg(long, env = "BCRYPT_COST", default_value_t = DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// `stateless` or `session-bound`
    #[arg(long, env = "GATE_MODE", default_value = "stateless")]
    pub gate_mode: String,

    #[arg(long, env = "LOGIN_PATH", default_value = "/client/login")]
    pub login_path: String,

    #[arg(long, env = "DASHBOARD_PATH", default_value = "/client/dashboard")]
    pub dashboard_path: String,

    #[arg(long, env = "ERROR_PATH", default_value = "/client/modal")]
    pub error_path: String,
}

/// Validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub db_path: String,
    pub signing_secret: SigningSecret,
    pub session_ttl: chrono::Duration,
    pub cookies: CookiePolicy,
    pub bcrypt_cost: u32,
    pub gate_mode: GateMode,
    pub redirects: RedirectPaths,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let bind_addr: SocketAddr = args
            .bind_addr
            .parse()
            .with_context(|| format!("invalid BIND_ADDR {:?}", args.bind_addr))?;

        let signing_secret = match args.jwt_secret.filter(|s| !s.is_empty()) {
            Some(secret) => SigningSecret::new(secret)?,
            None => {
                warn!("JWT_SECRET not set, using the development signing secret");
                SigningSecret::new(DEV_SIGNING_SECRET)?
            }
        };

        if args.session_ttl_minutes <= 0 {
            bail!("SESSION_TTL_MINUTES must be positive");
        }
        if args.cookie_max_age_secs < 0 {
            bail!("COOKIE_MAX_AGE_SECS must not be negative");
        }
        if !(MIN_COST..=MAX_COST).contains(&args.bcrypt_cost) {
            bail!("BCRYPT_COST must be between {MIN_COST} and {MAX_COST}");
        }

        let gate_mode: GateMode = args.gate_mode.parse().map_err(anyhow::Error::msg)?;

        Ok(Self {
            bind_addr,
            db_path: args.db_path,
            signing_secret,
            session_ttl: chrono::Duration::minutes(args.session_ttl_minutes),
            cookies: CookiePolicy {
                secure: args.cookie_secure,
                max_age_secs: args.cookie_max_age_secs,
                ..Default::default()
            },
            bcrypt_cost: args.bcrypt_cost,
            gate_mode,
            redirects: RedirectPaths {
                login: args.login_path,
                dashboard: args.dashboard_path,
                error: args.error_path,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["session-gate", "--jwt-secret", "0123456789abcdef0123456789abcdef"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_args(args(&[])).unwrap();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.session_ttl, chrono::Duration::minutes(20));
        assert_eq!(config.cookies.max_age_secs, 31_536_000);
        assert!(!config.cookies.secure);
        assert_eq!(config.gate_mode, GateMode::Stateless);
        assert_eq!(config.redirects.login, "/client/login");
        assert!(!config.signing_secret.is_weak());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_args(args(&[
            "--session-ttl-minutes",
            "5",
            "--cookie-secure",
            "true",
            "--gate-mode",
            "session-bound",
            "--bcrypt-cost",
            "4",
        ]))
        .unwrap();

        assert_eq!(config.session_ttl, chrono::Duration::minutes(5));
        assert!(config.cookies.secure);
        assert_eq!(config.gate_mode, GateMode::SessionBound);
        assert_eq!(config.bcrypt_cost, 4);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_args(args(&["--bind-addr", "nowhere"])).is_err());
        assert!(Config::from_args(args(&["--session-ttl-minutes", "0"])).is_err());
        assert!(Config::from_args(args(&["--bcrypt-cost", "99"])).is_err());
        assert!(Config::from_args(args(&["--bcrypt-cost", "3"])).is_err());
        assert!(Config::from_args(args(&["--bcrypt-cost", "31"])).is_ok());
        assert!(Config::from_args(args(&["--gate-mode", "sometimes"])).is_err());
    }
}
