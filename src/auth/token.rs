//! Token issuance and verification.
//!
//! Tokens are HS256 (HMAC-SHA256) signed JWTs carrying the caller's username,
//! role, and expiration. The signing secret is held only by the authority and
//! fixed at construction; any tampering with the payload invalidates the
//! signature.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MIN_SECRET_BYTES: usize = 32;

/// Caller role carried inside a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including catalog mutation.
    Admin,
    /// Read and rate access only.
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

/// Identity payload embedded in a token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated username.
    pub username: String,
    /// Granted role.
    pub role: Role,
    /// Expiration as seconds since the UNIX epoch.
    pub exp: u64,
}

/// Issues and verifies signed identity tokens.
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenAuthority {
    /// Creates an authority over a symmetric secret and token lifetime.
    ///
    /// Returns an error if the secret is shorter than 32 bytes.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(Error::InvalidArgument(format!(
                "token secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    /// Issues a signed token for the user expiring `ttl` from now.
    pub fn issue(&self, username: &str, role: Role) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Internal(format!("system clock before UNIX epoch: {e}")))?
            .as_secs();

        let claims = Claims {
            username: username.to_string(),
            role,
            exp: now.saturating_add(self.ttl.as_secs()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("failed to sign token: {e}")))
    }

    /// Verifies a token and returns the embedded claims unchanged.
    ///
    /// Verification never extends or refreshes expiration. Failures are
    /// terminal: `InvalidSignature` on signature mismatch, `Expired` when the
    /// expiration is not in the future, `MalformedToken` otherwise.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => Error::Expired,
                ErrorKind::InvalidSignature => Error::InvalidSignature,
                _ => Error::MalformedToken(e.to_string()),
            })?;

        // The decoder only rejects exp < now; expiration must lie strictly
        // in the future, so exp == now is already expired.
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Internal(format!("system clock before UNIX epoch: {e}")))?
            .as_secs();
        if claims.exp <= now {
            return Err(Error::Expired);
        }

        Ok(claims)
    }
}
