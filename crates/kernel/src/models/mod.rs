//! Catalog row models.
//!
//! Rows are read-only; they are produced by the ingestion system and only
//! looked up here.

pub mod band;
pub mod collection;
pub mod item;
pub mod processor;
pub mod timestamp;

pub use band::{Band, CollectionEo};
pub use collection::{CatalogEntry, CollectionRef, CollectionRow, format_timeline};
pub use item::ItemRow;
pub use processor::{ProcessingLineage, ProcessorRecord};
