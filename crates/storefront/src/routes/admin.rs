//! Admin API handlers. Every handler takes `RequireAdmin` first, so an
//! unauthenticated request is rejected before its body is read.

use axum::{Json, extract::State, http::StatusCode};

use marketstall_core::{OrderId, ProductId};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAdmin;
use crate::models::{Category, Order, Product};
use crate::services::admin::{
    AdminService, CreateCategoryRequest, CreateProductRequest, UpdateOrderStatusRequest,
    UpdateProductRequest,
};
use crate::state::AppState;

/// `POST /api/v1/admin/categories`
pub async fn create_category(
    _: RequireAdmin,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = AdminService::new(state.store()).create_category(request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `GET /api/v1/admin/products`
pub async fn list_products(
    _: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(AdminService::new(state.store()).list_products().await?))
}

/// `POST /api/v1/admin/products`
pub async fn create_product(
    _: RequireAdmin,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = AdminService::new(state.store()).create_product(request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PATCH /api/v1/admin/products/{id}`
pub async fn update_product(
    _: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(request): ApiJson<UpdateProductRequest>,
) -> Result<Json<Product>> {
    Ok(Json(
        AdminService::new(state.store())
            .update_product(id, request)
            .await?,
    ))
}

/// `DELETE /api/v1/admin/products/{id}`
pub async fn delete_product(
    _: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<StatusCode> {
    AdminService::new(state.store()).delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/admin/orders`
pub async fn list_orders(
    _: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(AdminService::new(state.store()).list_orders().await?))
}

/// `PATCH /api/v1/admin/orders/{id}`
pub async fn update_order_status(
    _: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(request): ApiJson<UpdateOrderStatusRequest>,
) -> Result<Json<Order>> {
    Ok(Json(
        AdminService::new(state.store())
            .update_order_status(id, request)
            .await?,
    ))
}
