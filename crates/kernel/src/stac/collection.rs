//! Collection enrichment.
//!
//! Builds a Collection document from a catalog row and its auxiliary
//! lookups (band summary, quicklook bands, CRS, timeline). Version links are
//! resolved against the relation map of the listing call.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value, json};

use super::context::RequestContext;
use super::geometry;
use super::StacSettings;
use crate::models::{timestamp, CollectionEo, CollectionRef, CollectionRow};

/// Extensions every collection declares.
const BASE_EXTENSIONS: [&str; 3] = ["version", "processing", "item-assets"];

/// Per-collection lookups resolved before enrichment.
#[derive(Debug, Clone, Default)]
pub struct CollectionAux {
    /// Band summary, for `eo` collections.
    pub eo: Option<CollectionEo>,
    /// Quicklook red/green/blue band names.
    pub quicklook: Option<Vec<String>>,
    /// Resolved CRS, for cube collections.
    pub crs: Option<String>,
    /// Distinct acquisition dates, for cube collections.
    pub timeline: Vec<String>,
}

/// Collection document.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub stac_version: String,
    pub stac_extensions: Vec<String>,
    pub title: Option<String>,
    pub version: Value,
    pub deprecated: bool,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub providers: Vec<Value>,
    pub summaries: Option<Value>,
    pub item_assets: Option<Value>,
    pub properties: Map<String, Value>,
    #[serde(rename = "bdc:type")]
    pub collection_type: String,
    #[serde(rename = "bdc:grs", skip_serializing_if = "Option::is_none")]
    pub grs: Option<String>,
    #[serde(
        rename = "bdc:composite_function",
        skip_serializing_if = "Option::is_none"
    )]
    pub composite_function: Option<String>,
    pub license: Value,
    pub extent: Value,
    #[serde(rename = "bdc:bands_quicklook", skip_serializing_if = "Option::is_none")]
    pub quicklook: Option<Vec<String>>,
    #[serde(rename = "bdc:metadata", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(rename = "cube:dimensions", skip_serializing_if = "Option::is_none")]
    pub cube_dimensions: Option<Value>,
    #[serde(rename = "bdc:crs", skip_serializing_if = "Option::is_none")]
    pub crs: Option<Value>,
    #[serde(
        rename = "bdc:temporal_composition",
        skip_serializing_if = "Option::is_none"
    )]
    pub temporal_composition: Option<Value>,
    pub links: Vec<Value>,
}

/// Builds collection documents for one listing call.
pub struct CollectionEnricher<'a> {
    settings: &'a StacSettings,
    ctx: &'a RequestContext,
    relations: &'a HashMap<i64, CollectionRef>,
}

impl<'a> CollectionEnricher<'a> {
    pub fn new(
        settings: &'a StacSettings,
        ctx: &'a RequestContext,
        relations: &'a HashMap<i64, CollectionRef>,
    ) -> Self {
        Self {
            settings,
            ctx,
            relations,
        }
    }

    /// Build the document for `row`.
    pub fn build(&self, row: &CollectionRow, aux: CollectionAux) -> CollectionDocument {
        let successor = row.version_successor.and_then(|id| self.relations.get(&id));
        let predecessor = row
            .version_predecessor
            .and_then(|id| self.relations.get(&id));

        let mut extra_links = Vec::new();
        if let Some(successor) = successor {
            extra_links.push(self.version_link(successor, "successor-version"));
        }
        if let Some(predecessor) = predecessor {
            extra_links.push(self.version_link(predecessor, "predecessor-version"));
        }

        let mut properties = row.properties.clone().unwrap_or_default();
        properties.insert("created".into(), json!(timestamp::format(&row.created)));
        properties.insert("updated".into(), json!(timestamp::format(&row.updated)));

        let license = properties
            .remove("license")
            .unwrap_or_else(|| json!(""));
        if let Some(Value::Array(links)) = properties.remove("links") {
            extra_links.extend(links);
        }

        let bbox = row.spatial_extent.as_ref().and_then(geometry::bounds);
        let start = row.start_date.as_ref().map(timestamp::format);
        let end = start
            .as_ref()
            .and(row.end_date.as_ref())
            .map(timestamp::format);

        let eo = aux.eo.filter(|_| row.has_category("eo"));
        if let Some(eo) = &eo {
            eo.write_to(&mut properties);
        }

        let mut doc = CollectionDocument {
            id: row.identifier.clone(),
            kind: "Collection",
            stac_version: self.settings.stac_version.clone(),
            stac_extensions: self.settings.extensions.resolve(self.extension_names(row)),
            title: row.title.clone(),
            version: row.version.clone(),
            deprecated: successor.is_some() || row.marked_deprecated(),
            description: row.description.clone(),
            keywords: row.keywords.clone(),
            providers: row.providers.clone(),
            summaries: row.summaries.clone(),
            item_assets: row.item_assets.clone(),
            properties,
            collection_type: row.collection_type.clone(),
            grs: row.grid_ref_sys.clone(),
            composite_function: row.composite_function.clone(),
            license,
            extent: json!({
                "spatial": {"bbox": [bbox.map_or([None; 4], |b| b.map(Some))]},
                "temporal": {"interval": [[start, end]]},
            }),
            quicklook: aux.quicklook,
            metadata: row.metadata.clone().filter(|meta| !meta.is_empty()),
            cube_dimensions: None,
            crs: None,
            temporal_composition: None,
            links: Vec::new(),
        };

        if row.is_cube() {
            let [min_x, min_y, max_x, max_y] = bbox.map_or([None; 4], |b| b.map(Some));
            let mut dimensions = json!({
                "x": {
                    "type": "spatial",
                    "axis": "x",
                    "extent": [min_x, max_x],
                    "reference_system": aux.crs,
                },
                "y": {
                    "type": "spatial",
                    "axis": "y",
                    "extent": [min_y, max_y],
                    "reference_system": aux.crs,
                },
                "temporal": {
                    "type": "temporal",
                    "extent": [start, end],
                    "values": aux.timeline,
                },
            });
            if let Some(eo) = &eo {
                dimensions["bands"] = json!({"type": "bands", "values": eo.band_names()});
            }

            doc.cube_dimensions = Some(dimensions);
            doc.crs = Some(json!(aux.crs));
            doc.temporal_composition = Some(
                row.temporal_composition_schema
                    .clone()
                    .unwrap_or(Value::Null),
            );
        }

        doc.links = self.links(&row.identifier, extra_links);
        doc
    }

    fn extension_names<'r>(&self, row: &'r CollectionRow) -> Vec<&'r str> {
        let mut names: Vec<&str> = BASE_EXTENSIONS.to_vec();
        if row.is_cube() {
            names.push("datacube");
        }
        if let Some(category @ ("eo" | "sar")) = row.category.as_deref() {
            names.push(category);
        }
        names
    }

    fn links(&self, identifier: &str, extra: Vec<Value>) -> Vec<Value> {
        let ctx = self.ctx;
        let mut links = vec![
            json!({
                "href": ctx.href(&format!("/collections/{identifier}")),
                "rel": "self",
                "type": "application/json",
                "title": "Link to this document",
            }),
            json!({
                "href": ctx.href(&format!("/collections/{identifier}/items")),
                "rel": "items",
                "type": "application/json",
                "title": format!("Items of the collection {identifier}"),
            }),
            json!({
                "href": ctx.href("/collections"),
                "rel": "parent",
                "type": "application/json",
                "title": "Link to catalog collections",
            }),
            json!({
                "href": ctx.href("/"),
                "rel": "root",
                "type": "application/json",
                "title": "API landing page (root catalog)",
            }),
        ];
        links.extend(extra);
        links
    }

    fn version_link(&self, target: &CollectionRef, rel: &str) -> Value {
        json!({
            "href": self.ctx.href(&format!("/collections/{}", target.identifier)),
            "rel": rel,
            "type": "application/json",
            "title": target.title,
        })
    }
}
