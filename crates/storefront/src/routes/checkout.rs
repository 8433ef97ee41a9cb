//! Checkout route handler.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::OptionalAuth;
use crate::models::{CartLine, Order};
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

/// Body of `POST /api/v1/checkout`.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Guest email. Falls back to the signed-in user's email.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub items: Vec<CartLine>,
}

/// `POST /api/v1/checkout`
///
/// Returns `201` with the placed order.
pub async fn place(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = CheckoutService::new(state.store())
        .checkout(request.email.as_deref(), request.items, user.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}
