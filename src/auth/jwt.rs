//! JWT Token Issuer
//! Mission: Mint and verify HS256 session tokens with a single process-wide secret

use crate::auth::{clock::Clock, error::TokenError, models::Claims};
use anyhow::{bail, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    crypto, decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Development fallback used when no secret is configured
pub const DEV_SIGNING_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

/// Secrets shorter than this are accepted but flagged at startup
pub const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// HMAC signing secret.
///
/// Built once from configuration at startup and moved into the
/// [`TokenIssuer`]; it is never persisted and never printed.
#[derive(Clone)]
pub struct SigningSecret {
    bytes: Vec<u8>,
}

impl SigningSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = secret.into();
        if bytes.is_empty() {
            bail!("signing secret must not be empty");
        }
        Ok(Self { bytes })
    }

    /// True for the development default or anything shorter than 32 bytes
    pub fn is_weak(&self) -> bool {
        self.bytes.len() < MIN_RECOMMENDED_SECRET_LEN || self.bytes == DEV_SIGNING_SECRET.as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Freshly minted token together with the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub expires_at: DateTime<Utc>,
}

/// Token issuer: the only component able to produce or check a signature
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(secret: SigningSecret, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked against the injected clock in `verify`.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(&secret.bytes),
            decoding_key: DecodingKey::from_secret(&secret.bytes),
            validation,
            clock,
        }
    }

    /// Mint a token for `email` valid until `now + ttl` (second resolution)
    pub fn mint(&self, email: &str, ttl: Duration) -> Result<IssuedToken, TokenError> {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Signing("token expiry out of range".to_string()))?;

        let claims = Claims {
            email: email.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| TokenError::Signing("token expiry out of range".to_string()))?;

        debug!(email = %email, exp = claims.exp, "Minted session token");

        Ok(IssuedToken {
            token,
            claims,
            expires_at,
        })
    }

    /// Verify a token and return its claims.
    ///
    /// The signature is checked over the raw `header.payload` bytes before
    /// anything is decoded, so any edit inside a segment is reported as
    /// [`TokenError::InvalidSignature`]. [`TokenError::Malformed`] is reserved
    /// for input that is not three non-empty segments, or whose signed payload
    /// does not decode into claims. A token is expired from its `exp` second
    /// onward.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if !is_well_formed(token) {
            return Err(TokenError::Malformed);
        }

        let (message, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        match crypto::verify(signature, message.as_bytes(), &self.decoding_key, ALGORITHM) {
            Ok(true) => {}
            Ok(false) | Err(_) => return Err(TokenError::InvalidSignature),
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            }
        })?;

        let claims = data.claims;
        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Three non-empty dot-separated segments. Segment contents are left to the
/// signature check.
fn is_well_formed(token: &str) -> bool {
    let mut segments = 0;
    for segment in token.split('.') {
        segments += 1;
        if segment.is_empty() {
            return false;
        }
    }
    segments == 3
}
