//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Repositories;
use crate::services::{
    AuthService, CartService, CatalogService, CheckoutService, OAuthService, StockService,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like repositories and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    repos: Repositories,
    oauth: OAuthService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `repos` - Repositories wired to one storage backend
    #[must_use]
    pub fn new(config: StorefrontConfig, repos: Repositories) -> Self {
        let oauth = OAuthService::new(&config);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                repos,
                oauth,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the repositories.
    #[must_use]
    pub fn repos(&self) -> &Repositories {
        &self.inner.repos
    }

    /// Get a reference to the OAuth client.
    #[must_use]
    pub fn oauth(&self) -> &OAuthService {
        &self.inner.oauth
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.inner.repos.users.as_ref())
    }

    #[must_use]
    pub fn carts(&self) -> CartService<'_> {
        CartService::new(
            self.inner.repos.carts.as_ref(),
            self.inner.repos.products.as_ref(),
        )
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.inner.repos.products.as_ref())
    }

    #[must_use]
    pub fn checkout(&self) -> CheckoutService<'_> {
        CheckoutService::new(self.inner.repos.checkout.as_ref())
    }

    #[must_use]
    pub fn stock(&self) -> StockService<'_> {
        StockService::new(self.inner.repos.products.as_ref())
    }
}
