//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::auth::JwtKeys;
use crate::services::media::MediaStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    jwt: JwtKeys,
    media: MediaStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let jwt = JwtKeys::new(&config.jwt);
        let media = MediaStore::new(config.media_root.clone(), config.base_url.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                media,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the token signing keys.
    #[must_use]
    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }

    /// Get a reference to the media store.
    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }
}
