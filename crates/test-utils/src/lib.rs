//! STAC kernel test utilities.
//!
//! Fixture builders producing catalog rows in the JSON shape the store
//! returns from `row_to_json`, so tests can decode them into the kernel's
//! row types without a database.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value as JsonValue, json};

/// Timestamp in the store's `timestamp` rendering (no offset).
pub fn store_timestamp(date: NaiveDate) -> String {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Timestamp in the store's `timestamptz` rendering.
pub fn store_timestamptz(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Polygon covering a bounding box.
pub fn box_polygon(west: f64, south: f64, east: f64, north: f64) -> JsonValue {
    json!({
        "type": "Polygon",
        "coordinates": [[
            [west, south],
            [east, south],
            [east, north],
            [west, north],
            [west, south],
        ]],
    })
}

/// Create a test collection row with default values.
pub fn test_collection(name: &str, version: i64) -> TestCollection {
    TestCollection {
        id: 1,
        name: name.to_string(),
        version,
        title: format!("{name} collection"),
        collection_type: "collection".to_string(),
        category: Some("eo".to_string()),
        is_public: true,
        properties: Map::new(),
        metadata: Map::new(),
        version_predecessor: None,
        version_successor: None,
        start_date: NaiveDate::from_ymd_opt(2017, 1, 1),
        end_date: NaiveDate::from_ymd_opt(2021, 12, 31),
        grid_ref_sys: None,
        grs_crs: None,
    }
}

/// A collection row builder.
#[derive(Debug, Clone)]
pub struct TestCollection {
    pub id: i64,
    pub name: String,
    pub version: i64,
    pub title: String,
    pub collection_type: String,
    pub category: Option<String>,
    pub is_public: bool,
    pub properties: Map<String, JsonValue>,
    pub metadata: Map<String, JsonValue>,
    pub version_predecessor: Option<i64>,
    pub version_successor: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub grid_ref_sys: Option<String>,
    pub grs_crs: Option<String>,
}

impl TestCollection {
    /// Set the internal id.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Make this a data cube on the given grid.
    pub fn as_cube(mut self, grid: &str, crs: &str) -> Self {
        self.collection_type = "cube".to_string();
        self.grid_ref_sys = Some(grid.to_string());
        self.grs_crs = Some(crs.to_string());
        self
    }

    /// Set the category (`eo`, `sar`, ...).
    pub fn with_category(mut self, category: Option<&str>) -> Self {
        self.category = category.map(str::to_string);
        self
    }

    /// Hide the collection from anonymous callers.
    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }

    /// Add a free-form property.
    pub fn with_property(mut self, key: &str, value: JsonValue) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: &str, value: JsonValue) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Link to the previous and next versions by internal id.
    pub fn with_versions(mut self, predecessor: Option<i64>, successor: Option<i64>) -> Self {
        self.version_predecessor = predecessor;
        self.version_successor = successor;
        self
    }

    /// Set the temporal extent.
    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// `name-version`.
    pub fn identifier(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Render as a store row.
    pub fn to_row(&self) -> JsonValue {
        let created = store_timestamptz(DateTime::<Utc>::UNIX_EPOCH);
        json!({
            "id": self.id,
            "identifier": self.identifier(),
            "name": self.name,
            "version": self.version,
            "title": self.title,
            "description": format!("{} description", self.title),
            "collection_type": self.collection_type,
            "category": self.category,
            "is_public": self.is_public,
            "keywords": ["brazil", "data cube"],
            "properties": self.properties,
            "summaries": null,
            "item_assets": null,
            "metadata": self.metadata,
            "temporal_composition_schema": if self.collection_type == "cube" {
                json!({"schema": "Continuous", "step": 16, "unit": "day"})
            } else {
                JsonValue::Null
            },
            "version_predecessor": self.version_predecessor,
            "version_successor": self.version_successor,
            "start_date": self.start_date.map(store_timestamp),
            "end_date": self.end_date.map(store_timestamp),
            "created": created,
            "updated": created,
            "spatial_extent": box_polygon(-73.9, -33.7, -34.8, 5.3),
            "composite_function": if self.collection_type == "cube" { Some("LCF") } else { None },
            "grid_ref_sys": self.grid_ref_sys,
            "grs_crs": self.grs_crs,
            "providers": [
                {"name": "INPE", "roles": ["producer", "processor"], "url": "https://www.gov.br/inpe"},
            ],
        })
    }
}

/// Create a test item row with default values.
pub fn test_item(collection: &TestCollection, name: &str) -> TestItem {
    TestItem {
        id: 1,
        name: name.to_string(),
        collection: collection.identifier(),
        collection_id: collection.id,
        collection_type: collection.collection_type.clone(),
        category: collection.category.clone(),
        date: NaiveDate::from_ymd_opt(2020, 6, 1).unwrap_or_default(),
        cloud_cover: Some(12.5),
        footprint: None,
        bbox: Some(box_polygon(-46.0, -13.0, -45.0, -12.0)),
        tile: Some("007004".to_string()),
        metadata: Map::new(),
        assets: Some(Map::new()),
    }
}

/// An item row builder.
#[derive(Debug, Clone)]
pub struct TestItem {
    pub id: i64,
    pub name: String,
    pub collection: String,
    pub collection_id: i64,
    pub collection_type: String,
    pub category: Option<String>,
    pub date: NaiveDate,
    pub cloud_cover: Option<f64>,
    pub footprint: Option<JsonValue>,
    pub bbox: Option<JsonValue>,
    pub tile: Option<String>,
    pub metadata: Map<String, JsonValue>,
    pub assets: Option<Map<String, JsonValue>>,
}

impl TestItem {
    /// Set the internal id.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Add an asset with the given relative href.
    pub fn with_asset(mut self, key: &str, href: &str) -> Self {
        self.assets.get_or_insert_with(Map::new).insert(
            key.to_string(),
            json!({"href": href, "type": "image/tiff; application=geotiff", "roles": ["data"]}),
        );
        self
    }

    /// Drop the assets column, as when assets are excluded from a search.
    pub fn without_assets(mut self) -> Self {
        self.assets = None;
        self
    }

    /// Add an item metadata entry.
    pub fn with_metadata(mut self, key: &str, value: JsonValue) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_footprint(mut self, footprint: JsonValue) -> Self {
        self.footprint = Some(footprint);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Render as a store row.
    pub fn to_row(&self) -> JsonValue {
        let at = store_timestamp(self.date);
        let created = store_timestamptz(DateTime::<Utc>::UNIX_EPOCH);
        json!({
            "id": self.id,
            "item": self.name,
            "collection": self.collection,
            "collection_id": self.collection_id,
            "collection_type": self.collection_type,
            "category": self.category,
            "item_meta": self.metadata,
            "start": at,
            "end": at,
            "created": created,
            "updated": created,
            "cloud_cover": self.cloud_cover,
            "footprint": self.footprint,
            "bbox": self.bbox,
            "tile": self.tile,
            "assets": self.assets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_identifier() {
        let collection = test_collection("S2-16D", 2);
        assert_eq!(collection.identifier(), "S2-16D-2");
        assert_eq!(collection.to_row()["identifier"], "S2-16D-2");
    }

    #[test]
    fn item_row_references_collection() {
        let collection = test_collection("S2-16D", 2).with_id(7);
        let row = test_item(&collection, "S2-16D_V2_007004_20200601")
            .with_asset("B04", "/s2/B04.tif")
            .to_row();

        assert_eq!(row["collection_id"], 7);
        assert_eq!(row["collection"], "S2-16D-2");
        assert_eq!(row["start"], "2020-06-01T00:00:00");
        assert_eq!(row["assets"]["B04"]["href"], "/s2/B04.tif");
    }
}
