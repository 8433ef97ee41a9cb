//! Session cookie extractors.
//!
//! The `auth` cookie carries a signed token (see
//! [`crate::services::auth::token`]). Extraction never fails hard on a bad
//! token: a missing, malformed, expired, or forged cookie is simply no user.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use cookie::{Cookie, SameSite, time::Duration};

use crate::error::AppError;
use crate::models::User;
use crate::services::auth::{AuthService, SESSION_TTL_DAYS};
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "auth";

/// Raw token from the request's `auth` cookie, if any.
fn session_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
}

async fn current_user(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let Some(token) = session_token(parts) else {
        return Ok(None);
    };

    Ok(AuthService::new(state.store(), state.signer())
        .resolve_session(&token)
        .await?)
}

/// Extractor that requires a signed-in user.
///
/// Rejects with `401 {"error": ...}` when there is no valid session.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_orders(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        current_user(parts, state)
            .await?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("not signed in".to_owned()))
    }
}

/// Extractor that optionally gets the signed-in user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is
/// signed in.
pub struct OptionalAuth(pub Option<User>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts, state).await?))
    }
}

/// `Set-Cookie` value for a freshly issued session token.
#[must_use]
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// `Set-Cookie` value that clears the session cookie.
#[must_use]
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(String::new(), secure);
    cookie.make_removal();
    cookie
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(cookie: &str) -> Parts {
        let (parts, ()) = Request::builder()
            .header(header::COOKIE, cookie)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_session_token_found_among_other_cookies() {
        let parts = parts("theme=dark; auth=1.2.sig; lang=en");
        assert_eq!(session_token(&parts).as_deref(), Some("1.2.sig"));
    }

    #[test]
    fn test_session_token_absent() {
        assert_eq!(session_token(&parts("theme=dark")), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let rendered = session_cookie("tok".to_owned(), false).to_string();
        assert!(rendered.starts_with("auth=tok"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=604800"));
        assert!(!rendered.contains("Secure"));

        assert!(session_cookie("tok".to_owned(), true).to_string().contains("Secure"));
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let rendered = removal_cookie(false).to_string();
        assert!(rendered.starts_with("auth=;"));
        assert!(rendered.contains("Max-Age=0"));
    }
}
