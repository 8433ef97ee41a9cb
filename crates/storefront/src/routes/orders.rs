//! Order history route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use marketstall_core::Email;

use crate::error::{AppError, Result};
use crate::extract::ApiPath;
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::state::AppState;

/// Query form of the by-email lookup.
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

async fn orders_for_email(state: &AppState, raw: &str) -> Result<Json<Vec<Order>>> {
    let email =
        Email::parse(raw).map_err(|_| AppError::BadRequest("Invalid email address".to_owned()))?;
    Ok(Json(state.store().orders_by_email(&email).await?))
}

/// `GET /api/v1/orders/by-email/{email}`
pub async fn by_email_path(
    State(state): State<AppState>,
    ApiPath(email): ApiPath<String>,
) -> Result<Json<Vec<Order>>> {
    orders_for_email(&state, &email).await
}

/// `GET /api/v1/orders/by-email?email=`
pub async fn by_email_query(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<Order>>> {
    let email = query
        .email
        .ok_or_else(|| AppError::BadRequest("email is required".to_owned()))?;
    orders_for_email(&state, &email).await
}

/// `GET /api/v1/orders/my`
///
/// Orders placed by the signed-in user, including guest orders made with
/// the same email before registering.
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.store().orders_for_user(&user).await?))
}
