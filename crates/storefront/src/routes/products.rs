//! Public catalog route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::extract::ApiPath;
use crate::models::{Category, Product};
use crate::services::catalog::{CatalogService, PageRequest, ProductFilter, ProductPage};
use crate::state::AppState;

/// Query parameters for the product listing.
///
/// `page` and `limit` arrive as raw strings so a junk value falls back to
/// the default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn lenient_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse().ok())
}

impl ProductQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter::new(self.q.as_deref(), self.category.as_deref())
    }

    fn page_request(&self) -> PageRequest {
        PageRequest::new(
            lenient_int(self.page.as_deref()),
            lenient_int(self.limit.as_deref()),
        )
    }
}

/// `GET /api/v1/products`
#[tracing::instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductPage>> {
    let page = CatalogService::new(state.store())
        .search(&query.filter(), query.page_request())
        .await?;
    Ok(Json(page))
}

/// `GET /api/v1/products/{slug}`
#[tracing::instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<Product>> {
    CatalogService::new(state.store())
        .product(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))
}

/// `GET /api/v1/categories`
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(CatalogService::new(state.store()).categories().await?))
}
