//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketstall_core::{Email, UserId, UserRole};

/// A storefront account. The password hash never leaves the store layer
/// except through the login lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Case-folded email address.
    pub email: Email,
    /// Account role. Fixed at registration.
    pub role: UserRole,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}
