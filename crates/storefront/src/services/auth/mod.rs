//! Authentication service.
//!
//! Provides password registration and login, plus resolution of session
//! tokens back to users.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{SESSION_TTL_DAYS, SessionSigner, TokenError};

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;

use marketstall_core::Email;

use crate::db::{RepositoryError, Store};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash verified when the email is unknown, so both login failures cost
/// one Argon2 verification.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("marketstall-dummy-password").ok());

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    signer: &'a SessionSigner,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, signer: &'a SessionSigner) -> Self {
        Self { store, signer }
    }

    /// Register a new user and issue their session token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .store
            .create_user(&email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        let token = self.signer.issue(user.id, Utc::now());
        Ok((user, token))
    }

    /// Login with email and password and issue a session token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is malformed or
    /// unknown, or the password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let Ok(email) = Email::parse(email) else {
            burn_verification(password);
            return Err(AuthError::InvalidCredentials);
        };

        let Some((user, password_hash)) = self.store.get_password_hash(&email).await? else {
            burn_verification(password);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;

        let token = self.signer.issue(user.id, Utc::now());
        Ok((user, token))
    }

    /// Resolve a raw session token to its current user.
    ///
    /// Returns `None` for any invalid token or a user that no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the user lookup fails.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<User>, AuthError> {
        let user_id = match self.signer.verify(token, Utc::now()) {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring session token");
                return Ok(None);
            }
        };

        Ok(self.store.get_user(user_id).await?)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

fn burn_verification(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}
