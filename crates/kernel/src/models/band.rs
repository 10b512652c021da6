//! Band rows and electro-optical summaries.

use serde_json::{Map, Value, json};
use tracing::warn;

/// Band of a collection.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Band {
    pub name: String,
    pub common_name: Option<String>,
    pub description: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub nodata: Option<f64>,
    pub scale_mult: Option<f64>,
    pub scale_add: Option<f64>,
    pub data_type: Option<String>,
    pub resolution_x: Option<f64>,
    pub resolution_y: Option<f64>,
    /// Extra free-form properties merged into the band entry.
    pub properties: Value,
}

impl Band {
    /// `[x, y]` resolution, or `None` when not configured.
    pub fn resolutions(&self) -> Option<[f64; 2]> {
        let x = self.resolution_x?;
        Some([x, self.resolution_y.unwrap_or(x)])
    }

    /// `eo:bands` entry: typed attributes, then extra properties.
    pub fn to_eo_entry(&self) -> Map<String, Value> {
        let mut entry = Map::new();
        entry.insert("name".into(), json!(self.name));
        entry.insert("common_name".into(), json!(self.common_name));
        entry.insert("description".into(), json!(self.description));
        entry.insert("min".into(), json!(self.min_value));
        entry.insert("max".into(), json!(self.max_value));
        entry.insert("nodata".into(), json!(self.nodata));
        entry.insert("scale".into(), json!(self.scale_mult));
        entry.insert("scale_add".into(), json!(self.scale_add));
        entry.insert("data_type".into(), json!(self.data_type));

        if let Value::Object(extra) = &self.properties {
            entry.extend(extra.clone());
        }
        entry
    }
}

/// Electro-optical summary of a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionEo {
    /// Ground sample distance: largest first resolution across bands.
    pub gsd: f64,
    /// Band entries, bands without resolution excluded.
    pub bands: Vec<Map<String, Value>>,
}

impl CollectionEo {
    /// Summarize bands; bands without a resolution are logged and skipped.
    pub fn from_bands(collection_id: i64, bands: &[Band]) -> Self {
        let mut eo = CollectionEo::default();

        for band in bands {
            let Some([resolution, _]) = band.resolutions() else {
                warn!(collection_id, band = %band.name, "no resolution configured for band");
                continue;
            };

            eo.bands.push(band.to_eo_entry());
            if resolution > eo.gsd {
                eo.gsd = resolution;
            }
        }

        eo
    }

    /// Entry for the band named `name`.
    pub fn band(&self, name: &str) -> Option<&Map<String, Value>> {
        self.bands
            .iter()
            .find(|band| band.get("name").and_then(Value::as_str) == Some(name))
    }

    pub fn band_names(&self) -> Vec<Value> {
        self.bands
            .iter()
            .filter_map(|band| band.get("name").cloned())
            .collect()
    }

    /// Write `eo:gsd` and `eo:bands` into a properties map.
    pub fn write_to(&self, properties: &mut Map<String, Value>) {
        properties.insert("eo:gsd".into(), json!(self.gsd));
        properties.insert(
            "eo:bands".into(),
            Value::Array(self.bands.iter().cloned().map(Value::Object).collect()),
        );
    }
}
