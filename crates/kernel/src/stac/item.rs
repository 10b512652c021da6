//! Item enrichment.
//!
//! Builds Feature documents from item rows: geometry, extensions,
//! processing lineage, asset href resolution and per-band asset metadata.

use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

use super::context::RequestContext;
use super::geometry;
use super::StacSettings;
use crate::models::{timestamp, CollectionEo, ItemRow, ProcessingLineage};

/// Per-item lookups resolved before enrichment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemAux<'a> {
    /// Processing lineage, when the item has processors.
    pub lineage: Option<&'a ProcessingLineage>,
    /// Band summary of the owning collection, for `eo` items.
    pub eo: Option<&'a CollectionEo>,
}

/// Builds feature documents.
pub struct ItemEnricher<'a> {
    settings: &'a StacSettings,
    ctx: &'a RequestContext,
}

impl<'a> ItemEnricher<'a> {
    pub fn new(settings: &'a StacSettings, ctx: &'a RequestContext) -> Self {
        Self { settings, ctx }
    }

    /// Build the feature for `row`, dropping the `exclude`d top-level keys.
    pub fn build(&self, row: &ItemRow, aux: ItemAux<'_>, exclude: &[&str]) -> Map<String, Value> {
        let ctx = self.ctx;
        let is_eo = row.has_category("eo");

        let geometry = row
            .footprint
            .clone()
            .or_else(|| row.bbox.clone())
            .unwrap_or(Value::Null);

        let bbox = row
            .bbox
            .as_ref()
            .and_then(geometry::bounds)
            .map_or_else(|| json!([]), |b| json!(b));

        let mut properties = Map::new();
        let start = timestamp::format(&row.start);
        properties.insert("datetime".into(), json!(start));
        properties.insert("start_datetime".into(), json!(start));
        properties.insert("end_datetime".into(), json!(timestamp::format(&row.end)));
        properties.insert("created".into(), json!(timestamp::format(&row.created)));
        properties.insert("updated".into(), json!(timestamp::format(&row.updated)));

        if let Some(meta) = &row.item_meta {
            properties.extend(meta.clone());
        }
        if let Some(lineage) = aux.lineage {
            lineage.write_to(&mut properties);
        }
        if let Some(tile) = &row.tile {
            properties.insert("bdc:tiles".into(), json!([tile]));
        }
        if is_eo {
            properties.insert("eo:cloud_cover".into(), json!(row.cloud_cover));
        }

        let mut extensions: Vec<&str> = row
            .category
            .as_deref()
            .filter(|category| matches!(*category, "eo" | "sar"))
            .into_iter()
            .collect();
        if aux.lineage.is_some() {
            extensions.push("processing");
        }
        if has_storage_platform(&properties) {
            extensions.push("storage");
        }

        let base = if row.has_storage_metadata() {
            ""
        } else {
            ctx.file_root.as_str()
        };
        let band_eo = aux.eo.filter(|_| is_eo);
        let assets = row
            .assets
            .as_ref()
            .map(|assets| self.resolve_assets(assets, base, band_eo));

        let collection = &row.collection;
        let item = &row.item;

        let mut feature = Map::new();
        feature.insert("type".into(), json!("Feature"));
        feature.insert("id".into(), json!(item));
        feature.insert("collection".into(), json!(collection));
        feature.insert("stac_version".into(), json!(self.settings.stac_version));
        feature.insert(
            "stac_extensions".into(),
            json!(self.settings.extensions.resolve(extensions)),
        );
        feature.insert("geometry".into(), geometry);
        feature.insert(
            "links".into(),
            json!([
                {"href": ctx.href(&format!("/collections/{collection}/items/{item}")), "rel": "self"},
                {"href": ctx.href(&format!("/collections/{collection}")), "rel": "parent"},
                {"href": ctx.href(&format!("/collections/{collection}")), "rel": "collection"},
                {"href": ctx.root(), "rel": "root"},
            ]),
        );
        feature.insert("bbox".into(), bbox);
        if let Some(assets) = assets {
            feature.insert("assets".into(), Value::Object(assets));
        }
        feature.insert("properties".into(), Value::Object(properties));

        for key in exclude {
            feature.remove(*key);
        }

        feature
    }

    fn resolve_assets(
        &self,
        assets: &Map<String, Value>,
        base: &str,
        eo: Option<&CollectionEo>,
    ) -> Map<String, Value> {
        let mut resolved = assets.clone();

        for (key, asset) in resolved.iter_mut() {
            let Value::Object(asset) = asset else {
                continue;
            };

            if let Some(href) = asset.get("href").and_then(Value::as_str) {
                let href = join_href(base, &format!("{href}{}", self.ctx.query_suffix));
                asset.insert("href".into(), json!(href));
            }

            if let Some(band) = eo.and_then(|eo| eo.band(key)) {
                asset.insert("eo:bands".into(), json!([band]));
            }
        }

        resolved
    }
}

fn has_storage_platform(properties: &Map<String, Value>) -> bool {
    match properties.get("storage:platform") {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Resolve `href` against `base` like a browser would. An empty base leaves
/// the href untouched.
///
/// Joined hrefs come back in normalized URL form, so characters such as
/// spaces are percent-encoded.
fn join_href(base: &str, href: &str) -> String {
    if base.is_empty() {
        return href.to_string();
    }

    match Url::parse(base).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(e) => {
            debug!(base, href, error = %e, "file root is not an absolute URL");
            format!(
                "{}/{}",
                base.trim_end_matches('/'),
                href.trim_start_matches('/')
            )
        }
    }
}
