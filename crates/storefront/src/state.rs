//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Store;
use crate::services::auth::{SessionSigner, TokenError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn Store>,
    signer: SessionSigner,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `store` - Storage backend (`PgStore` in production)
    ///
    /// # Errors
    ///
    /// Returns an error if the session secret cannot key the signer.
    pub fn new(config: StorefrontConfig, store: Arc<dyn Store>) -> Result<Self, TokenError> {
        let signer = SessionSigner::new(&config.session_secret)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                signer,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the session token signer.
    #[must_use]
    pub fn signer(&self) -> &SessionSigner {
        &self.inner.signer
    }
}
