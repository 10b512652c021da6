//! Collection rows.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collection row with its joined composite function, grid and providers.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionRow {
    /// Internal id.
    pub id: i64,

    /// Public identifier, `name-version`.
    pub identifier: String,

    pub name: String,

    /// Version as stored (text or number).
    pub version: Value,

    pub title: Option<String>,

    pub description: Option<String>,

    /// `cube`, `datacube`, `collection`, ...
    pub collection_type: String,

    /// `eo`, `sar`, ...
    pub category: Option<String>,

    pub is_public: bool,

    #[serde(default)]
    pub keywords: Option<Vec<String>>,

    #[serde(default)]
    pub properties: Option<Map<String, Value>>,

    #[serde(default)]
    pub summaries: Option<Value>,

    #[serde(default)]
    pub item_assets: Option<Value>,

    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,

    #[serde(default)]
    pub temporal_composition_schema: Option<Value>,

    /// Internal id of the previous version, if any.
    pub version_predecessor: Option<i64>,

    /// Internal id of the next version, if any.
    pub version_successor: Option<i64>,

    #[serde(default, with = "super::timestamp::option")]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default, with = "super::timestamp::option")]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(with = "super::timestamp")]
    pub created: DateTime<Utc>,

    #[serde(with = "super::timestamp")]
    pub updated: DateTime<Utc>,

    /// Spatial extent as a GeoJSON geometry.
    #[serde(default)]
    pub spatial_extent: Option<Value>,

    /// Composite function name.
    #[serde(default)]
    pub composite_function: Option<String>,

    /// Grid reference system name.
    #[serde(default)]
    pub grid_ref_sys: Option<String>,

    /// Grid reference system CRS.
    #[serde(default)]
    pub grs_crs: Option<String>,

    #[serde(default)]
    pub providers: Vec<Value>,
}

impl CollectionRow {
    /// Whether the collection is a data cube (`cube` or `datacube`).
    pub fn is_cube(&self) -> bool {
        matches!(self.collection_type.as_str(), "cube" | "datacube")
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.category.as_deref() == Some(category)
    }

    /// CRS from the grid reference system, falling back to the `bdc:crs`
    /// collection property.
    pub fn crs(&self) -> Option<String> {
        if self.grid_ref_sys.is_some() {
            return self.grs_crs.clone();
        }

        self.properties
            .as_ref()
            .and_then(|props| props.get("bdc:crs"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Whether the metadata explicitly marks the collection deprecated.
    pub fn marked_deprecated(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.get("deprecated"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Lightweight projection used to resolve version links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRef {
    pub id: i64,
    pub identifier: String,
    pub title: Option<String>,
}

impl From<&CollectionRow> for CollectionRef {
    fn from(row: &CollectionRow) -> Self {
        Self {
            id: row.id,
            identifier: row.identifier.clone(),
            title: row.title.clone(),
        }
    }
}

/// Landing page entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    /// Display name, `name-version`.
    pub name: String,
    pub title: Option<String>,
}

/// Sorted, distinct acquisition dates formatted as `YYYY-MM-DD`.
pub fn format_timeline(instants: &[NaiveDateTime]) -> Vec<String> {
    let mut dates: Vec<_> = instants.iter().map(NaiveDateTime::date).collect();
    dates.sort_unstable();
    dates.dedup();
    dates
        .into_iter()
        .map(|date| date.format("%Y-%m-%d").to_string())
        .collect()
}
