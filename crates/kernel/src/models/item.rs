//! Item rows as returned by the search query.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// One search result row.
///
/// Field names follow the column aliases of the item search query.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRow {
    /// Internal item id.
    pub id: i64,

    /// Item name, unique within its collection.
    pub item: String,

    /// Owning collection identifier.
    pub collection: String,

    /// Owning collection internal id.
    pub collection_id: i64,

    pub collection_type: String,

    pub category: Option<String>,

    /// Free-form item metadata.
    #[serde(default)]
    pub item_meta: Option<Map<String, Value>>,

    #[serde(with = "super::timestamp")]
    pub start: DateTime<Utc>,

    #[serde(with = "super::timestamp")]
    pub end: DateTime<Utc>,

    #[serde(with = "super::timestamp")]
    pub created: DateTime<Utc>,

    #[serde(with = "super::timestamp")]
    pub updated: DateTime<Utc>,

    #[serde(default)]
    pub cloud_cover: Option<f64>,

    /// Footprint as a GeoJSON geometry.
    #[serde(default)]
    pub footprint: Option<Value>,

    /// Bounding box as a GeoJSON geometry.
    #[serde(default)]
    pub bbox: Option<Value>,

    /// Joined tile name.
    #[serde(default)]
    pub tile: Option<String>,

    /// Asset key -> descriptor. Absent when the assets column was skipped.
    #[serde(default)]
    pub assets: Option<Map<String, Value>>,
}

impl ItemRow {
    pub fn has_category(&self, category: &str) -> bool {
        self.category.as_deref() == Some(category)
    }

    /// Whether any metadata key belongs to the storage extension.
    pub fn has_storage_metadata(&self) -> bool {
        self.item_meta
            .as_ref()
            .is_some_and(|meta| meta.keys().any(|key| key.starts_with("storage:")))
    }
}
