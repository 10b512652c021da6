//! Catalog search engine.
//!
//! Compiles search parameters into SQL predicates, applies role visibility
//! and executes paginated reads against the catalog store.

pub mod access;
pub mod cache;
pub mod error;
pub mod filter;
pub mod query;
pub mod service;
pub mod temporal;
pub mod types;

pub use access::AccessPolicy;
pub use error::{CatalogError, CatalogResult};
pub use filter::{FilterCompiler, GeometryField, SearchPlan};
pub use service::{CatalogService, CatalogSettings, CollectionListing};
pub use temporal::TemporalFilter;
pub use types::{BboxParam, BoundingBox, ItemPage, PageRequest, PropertyQuery, SearchParams};
