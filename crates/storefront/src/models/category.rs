//! Category domain types.

use serde::Serialize;

use marketstall_core::{CategoryId, Slug};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
}

impl Category {
    /// Whether `needle` names this category by slug or display name,
    /// ignoring case.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.slug.as_str().to_lowercase() == needle || self.name.to_lowercase() == needle
    }
}

/// A validated category ready to insert.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: Slug,
}
