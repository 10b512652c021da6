//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::catalog::{CatalogSettings, GeometryField};
use crate::stac::{ExtensionRegistry, StacSettings};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 5000).
    pub port: u16,

    /// PostgreSQL/PostGIS catalog URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Statement timeout for search queries, in seconds (default: 10).
    pub statement_timeout_secs: u64,

    /// Default STAC base URL (default: http://localhost:5000).
    pub base_url: String,

    /// `stac_version` of produced documents (default: 1.0.0).
    pub api_version: String,

    /// Default asset file root (default: http://localhost:5001).
    pub file_root: String,

    /// Largest page size (default: 1000).
    pub max_limit: u32,

    /// Page size when the caller gives none (default: 10).
    pub default_limit: u32,

    /// Intersect footprints instead of bounding boxes (default: false).
    pub use_footprint: bool,

    pub catalog_id: String,
    pub catalog_title: String,
    pub catalog_description: String,

    /// Extension URI overrides (`name=uri`, comma-separated).
    pub extensions: Vec<(String, String)>,

    /// Query parameters copied onto produced links (default: access_token).
    pub preserved_query: Vec<String>,

    /// Honour the `X-Stac-Roles` header (default: false).
    pub trust_role_header: bool,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("PORT", "5000")
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            lookup("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let statement_timeout_secs = var("DATABASE_STATEMENT_TIMEOUT_SECS", "10")
            .parse()
            .context("DATABASE_STATEMENT_TIMEOUT_SECS must be a valid u64")?;

        let base_url = var("BDC_STAC_BASE_URL", "http://localhost:5000")
            .trim_end_matches('/')
            .to_string();
        let api_version = var("BDC_STAC_API_VERSION", "1.0.0");
        let file_root = var("BDC_STAC_FILE_ROOT", "http://localhost:5001");

        let max_limit: u32 = var("BDC_STAC_MAX_LIMIT", "1000")
            .parse()
            .context("BDC_STAC_MAX_LIMIT must be a valid u32")?;
        let default_limit: u32 = var("BDC_STAC_DEFAULT_LIMIT", "10")
            .parse()
            .context("BDC_STAC_DEFAULT_LIMIT must be a valid u32")?;

        if max_limit == 0 {
            bail!("BDC_STAC_MAX_LIMIT must be at least 1");
        }
        if default_limit == 0 || default_limit > max_limit {
            bail!("BDC_STAC_DEFAULT_LIMIT must be between 1 and BDC_STAC_MAX_LIMIT ({max_limit})");
        }

        let use_footprint = parse_flag(lookup("BDC_STAC_USE_FOOTPRINT").as_deref());
        let trust_role_header = parse_flag(lookup("BDC_STAC_TRUST_ROLE_HEADER").as_deref());

        let defaults = StacSettings::default();
        let catalog_id = var("BDC_STAC_ID", &defaults.catalog_id);
        let catalog_title = var("BDC_STAC_TITLE", &defaults.catalog_title);
        let catalog_description = var("BDC_STAC_DESCRIPTION", &defaults.catalog_description);

        let extensions = lookup("BDC_STAC_EXTENSIONS")
            .map(|v| parse_extensions(&v))
            .transpose()?
            .unwrap_or_default();

        let preserved_query = split_list(&var("BDC_STAC_PRESERVED_QUERY", "access_token"));

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|| vec!["*".to_string()]);

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            statement_timeout_secs,
            base_url,
            api_version,
            file_root,
            max_limit,
            default_limit,
            use_footprint,
            catalog_id,
            catalog_title,
            catalog_description,
            extensions,
            preserved_query,
            trust_role_header,
            cors_allowed_origins,
        })
    }

    /// Search tuning for the catalog service.
    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            max_limit: self.max_limit,
            geometry: GeometryField::from_footprint_flag(self.use_footprint),
            statement_timeout: Duration::from_secs(self.statement_timeout_secs),
        }
    }

    /// Presentation settings for document assembly.
    pub fn stac_settings(&self) -> StacSettings {
        StacSettings {
            stac_version: self.api_version.clone(),
            base_url: self.base_url.clone(),
            file_root: self.file_root.clone(),
            preserved_query: self.preserved_query.clone(),
            extensions: ExtensionRegistry::with_overrides(self.extensions.iter().cloned()),
            catalog_id: self.catalog_id.clone(),
            catalog_title: self.catalog_title.clone(),
            catalog_description: self.catalog_description.clone(),
        }
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_extensions(value: &str) -> Result<Vec<(String, String)>> {
    split_list(value)
        .into_iter()
        .map(|entry| {
            let (name, uri) = entry
                .split_once('=')
                .with_context(|| format!("BDC_STAC_EXTENSIONS entry '{entry}' must be name=uri"))?;
            Ok((name.trim().to_string(), uri.trim().to_string()))
        })
        .collect()
}
