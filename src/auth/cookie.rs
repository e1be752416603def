//! Session Cookie
//! Mission: Carry the session token between browser and gate
//!
//! The cookie's client-side lifetime is independent of the token's own
//! expiry: a year-old cookie can still be present while the token inside it
//! has long stopped verifying.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Cookie name for the session token
pub const SESSION_COOKIE_NAME: &str = "session_token";

/// One year
pub const DEFAULT_COOKIE_MAX_AGE_SECS: i64 = 31_536_000;

/// Configuration for session cookies
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    /// Whether to set the Secure flag (should be true behind HTTPS)
    pub secure: bool,
    pub path: String,
    pub same_site: SameSite,
    pub max_age_secs: i64,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            secure: false,
            path: "/".to_string(),
            same_site: SameSite::Lax,
            max_age_secs: DEFAULT_COOKIE_MAX_AGE_SECS,
        }
    }
}

impl CookiePolicy {
    /// HttpOnly cookie carrying `token`
    pub fn session_cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE_NAME, token.to_string()))
            .path(self.path.clone())
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .max_age(time::Duration::seconds(self.max_age_secs))
            .build()
    }

    /// Cookie that makes the browser drop the session cookie
    pub fn clearing_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
            .path(self.path.clone())
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .build();
        cookie.make_removal();
        cookie
    }
}

/// Session token carried by the request, if any
pub fn extract_session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
