//! Account route handlers.
//!
//! Register and login answer with the user and set the `auth` session
//! cookie; logout clears it unconditionally.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::extract::ApiJson;
use crate::middleware::{OptionalAuth, removal_cookie, session_cookie};
use crate::models::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Credentials for register and login.
#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// `{"user": ...}` body shared by the account endpoints.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: Option<User>,
}

fn signed_in(
    state: &AppState,
    status: StatusCode,
    user: User,
    token: String,
) -> impl IntoResponse + use<> {
    set_sentry_user(&user.id);
    let cookie = session_cookie(token, state.config().secure_cookies());
    (
        status,
        AppendHeaders([(SET_COOKIE, cookie.to_string())]),
        Json(UserResponse { user: Some(user) }),
    )
}

/// `POST /api/v1/auth/register`
pub async fn register(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<impl IntoResponse> {
    let (user, token) = AuthService::new(state.store(), state.signer())
        .register(&credentials.email, &credentials.password)
        .await?;
    Ok(signed_in(&state, StatusCode::CREATED, user, token))
}

/// `POST /api/v1/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<impl IntoResponse> {
    let (user, token) = AuthService::new(state.store(), state.signer())
        .login(&credentials.email, &credentials.password)
        .await?;
    tracing::info!(user_id = %user.id, "User signed in");
    Ok(signed_in(&state, StatusCode::OK, user, token))
}

/// `GET /api/v1/auth/me`
///
/// Never fails for a missing session: answers `{"user": null}`.
pub async fn me(OptionalAuth(user): OptionalAuth) -> Json<UserResponse> {
    Json(UserResponse { user })
}

/// `POST /api/v1/auth/logout`
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    clear_sentry_user();
    let cookie = removal_cookie(state.config().secure_cookies());
    (
        AppendHeaders([(SET_COOKIE, cookie.to_string())]),
        Json(serde_json::json!({ "ok": true })),
    )
}
