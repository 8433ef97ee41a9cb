//! Signed session tokens.
//!
//! A token is `<user_id>.<expires_unix>.<signature>`, where the signature is
//! unpadded base64url HMAC-SHA256 over `<user_id>.<expires_unix>`. Tokens
//! carry no server-side state: verification needs only the secret and the
//! current time.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use marketstall_core::UserId;

type HmacSha256 = Hmac<Sha256>;

/// How long an issued token stays valid.
pub const SESSION_TTL_DAYS: i64 = 7;

/// Why a token was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed session token")]
    Malformed,

    #[error("session token signature mismatch")]
    BadSignature,

    #[error("session token expired")]
    Expired,

    #[error("invalid signing key")]
    InvalidKey,
}

/// Issues and verifies session tokens with one secret.
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner").finish_non_exhaustive()
    }
}

impl SessionSigner {
    /// Create a signer keyed with `secret`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidKey` if the MAC rejects the key.
    pub fn new(secret: &SecretString) -> Result<Self, TokenError> {
        let mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::InvalidKey)?;
        Ok(Self { mac })
    }

    /// Issue a token for `user_id` that expires [`SESSION_TTL_DAYS`] after `now`.
    #[must_use]
    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> String {
        let expires = (now + Duration::days(SESSION_TTL_DAYS)).timestamp();
        let payload = format!("{user_id}.{expires}");
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&payload));
        format!("{payload}.{signature}")
    }

    /// Verify `token` and return the user it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the token is malformed, its signature does not
    /// match, or it has expired at `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError> {
        let mut parts = token.splitn(3, '.');
        let (Some(user_id), Some(expires), Some(signature)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let user_id: i32 = user_id.parse().map_err(|_| TokenError::Malformed)?;
        let expires: i64 = expires.parse().map_err(|_| TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        // Re-derive the canonical payload so non-canonical numbers never verify.
        let mut mac = self.mac.clone();
        mac.update(format!("{user_id}.{expires}").as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        if expires <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(UserId::new(user_id))
    }

    fn sign(&self, payload: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}
