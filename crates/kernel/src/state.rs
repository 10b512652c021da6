//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::catalog::CatalogService;
use crate::config::Config;
use crate::db;
use crate::stac::StacPresenter;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,

    /// Catalog query service (owns the pool and lookup cache).
    catalog: Arc<CatalogService>,

    /// Document assembly over the catalog service.
    presenter: StacPresenter,
}

impl AppState {
    /// Create application state with a connected pool.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        Ok(Self::with_pool(config, pool))
    }

    /// Create application state over an existing pool.
    pub fn with_pool(config: &Config, pool: PgPool) -> Self {
        let catalog = Arc::new(CatalogService::new(pool, config.catalog_settings()));
        let presenter = StacPresenter::new(catalog.clone(), config.stac_settings());

        Self {
            inner: Arc::new(AppStateInner {
                config: config.clone(),
                catalog,
                presenter,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn catalog(&self) -> &Arc<CatalogService> {
        &self.inner.catalog
    }

    pub fn presenter(&self) -> &StacPresenter {
        &self.inner.presenter
    }

    /// Whether the catalog store is reachable.
    pub async fn postgres_healthy(&self) -> bool {
        self.inner.catalog.is_healthy().await
    }
}
