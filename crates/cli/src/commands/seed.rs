//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Coffee Beans
//!     products:
//!       - name: House Blend
//!         priceCents: 1400
//!         stock: 40
//! ```
//!
//! Rows go through the same validation as the admin API. A category whose
//! slug already exists is reused; a product whose slug already exists is
//! skipped and reported.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use marketstall_core::CategoryId;
use marketstall_storefront::db::{self, PgStore, RepositoryError, Store};
use marketstall_storefront::models::Category;
use marketstall_storefront::services::admin::{
    AdminError, AdminService, CreateCategoryRequest, CreateProductRequest,
};

use super::{CommandError, database_url};

/// Errors that abort a seed run.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Failed to read {0}: {1}")]
    Read(String, std::io::Error),

    #[error("Invalid catalog file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Admin(#[from] AdminError),

    #[error("category slug {0} conflicts but no such category exists")]
    MissingCategory(String),
}

/// Top-level document.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub stock: i32,
}

impl SeedProduct {
    fn into_request(self, category_id: CategoryId) -> CreateProductRequest {
        CreateProductRequest {
            name: self.name,
            slug: self.slug,
            description: self.description,
            price_cents: self.price_cents,
            image_url: self.image_url,
            stock: self.stock,
            category_id,
        }
    }
}

/// What a seed run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_created: usize,
    pub products_created: usize,
    /// Names of products skipped because their slug already exists.
    pub skipped: Vec<String>,
}

impl SeedReport {
    /// Print the summary through tracing.
    pub fn log(&self) {
        info!("Seeding complete!");
        info!("  Categories created: {}", self.categories_created);
        info!("  Products created: {}", self.products_created);
        info!("  Products skipped (slug exists): {}", self.skipped.len());
        for name in &self.skipped {
            info!("    - {name}");
        }
    }
}

const fn is_conflict(err: &AdminError) -> bool {
    matches!(err, AdminError::Repository(RepositoryError::Conflict(_)))
}

/// Seed from a YAML file into the configured storefront database.
///
/// # Errors
///
/// Returns `SeedError` if the file cannot be read or parsed, the database
/// is unreachable, or a row fails validation.
pub async fn catalog(path: &Path) -> Result<SeedReport, SeedError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SeedError::Read(path.display().to_string(), e))?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;
    info!(categories = file.categories.len(), "Parsed catalog file");

    let pool = db::create_pool(&database_url()?).await?;
    info!("Connected to database");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    seed(store.as_ref(), file).await
}

/// Insert a parsed catalog through `store`.
///
/// # Errors
///
/// Returns `SeedError` on the first non-conflict failure. Rows written
/// before the failure stay written.
pub async fn seed(store: &dyn Store, file: CatalogFile) -> Result<SeedReport, SeedError> {
    let admin = AdminService::new(store);
    let mut report = SeedReport::default();

    for entry in file.categories {
        let category = match admin
            .create_category(CreateCategoryRequest {
                name: entry.name.clone(),
                slug: entry.slug.clone(),
            })
            .await
        {
            Ok(category) => {
                report.categories_created += 1;
                category
            }
            Err(e) if is_conflict(&e) => existing_category(store, &entry).await?,
            Err(e) => return Err(e.into()),
        };

        for product in entry.products {
            let name = product.name.clone();
            match admin.create_product(product.into_request(category.id)).await {
                Ok(_) => report.products_created += 1,
                Err(e) if is_conflict(&e) => {
                    warn!(product = %name, "Skipping product: slug already exists");
                    report.skipped.push(name);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(report)
}

/// The stored category a conflicting seed entry refers to.
async fn existing_category(store: &dyn Store, entry: &SeedCategory) -> Result<Category, SeedError> {
    let wanted = entry.slug.as_deref().unwrap_or(&entry.name);
    let slug = marketstall_core::Slug::normalize(wanted)
        .map_err(|e| AdminError::Validation(e.to_string()))?;

    store
        .list_categories()
        .await
        .map_err(AdminError::from)?
        .into_iter()
        .find(|c| c.slug == slug)
        .ok_or_else(|| SeedError::MissingCategory(slug.as_str().to_owned()))
}
