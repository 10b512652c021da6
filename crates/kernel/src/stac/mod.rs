//! STAC document assembly.
//!
//! Turns catalog rows into Collection and Feature documents: extensions,
//! links, per-category enrichment and asset URL rewriting. Request-derived
//! values (base URL, file root, preserved query) travel in a
//! [`RequestContext`].

pub mod collection;
pub mod context;
pub mod extensions;
pub mod fields;
pub mod geometry;
pub mod item;
pub mod presenter;

pub use collection::{CollectionAux, CollectionDocument, CollectionEnricher};
pub use context::RequestContext;
pub use extensions::ExtensionRegistry;
pub use fields::{ExcludedField, FieldSelection};
pub use item::{ItemAux, ItemEnricher};
pub use presenter::StacPresenter;

/// Presentation settings shared by every request.
#[derive(Debug, Clone)]
pub struct StacSettings {
    /// `stac_version` emitted in documents.
    pub stac_version: String,
    /// Default STAC base URL, without trailing slash.
    pub base_url: String,
    /// Default asset file-root URL.
    pub file_root: String,
    /// Query parameters copied onto produced links and asset hrefs.
    pub preserved_query: Vec<String>,
    pub extensions: ExtensionRegistry,
    /// Landing page id.
    pub catalog_id: String,
    pub catalog_title: String,
    pub catalog_description: String,
}

impl Default for StacSettings {
    fn default() -> Self {
        Self {
            stac_version: "1.0.0".to_string(),
            base_url: "http://localhost:5000".to_string(),
            file_root: "http://localhost:5001".to_string(),
            preserved_query: vec!["access_token".to_string()],
            extensions: ExtensionRegistry::default(),
            catalog_id: "bdc".to_string(),
            catalog_title: "Brazil Data Cube Catalog".to_string(),
            catalog_description: "Earth observation data cubes and analysis ready data"
                .to_string(),
        }
    }
}
