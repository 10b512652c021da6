//! Document assembly over the catalog service.
//!
//! Resolves the auxiliary lookups each enrichment pipeline needs, then
//! builds landing, collection and feature documents.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{Map, Value, json};

use super::collection::{CollectionAux, CollectionDocument, CollectionEnricher};
use super::context::RequestContext;
use super::item::{ItemAux, ItemEnricher};
use super::StacSettings;
use crate::catalog::{AccessPolicy, CatalogResult, CatalogService, ItemPage};
use crate::models::{CollectionEo, CollectionRow, ItemRow};

/// Conformance classes of the API.
pub const CONFORMANCE: &[&str] = &[
    "https://api.stacspec.org/v1.0.0/core",
    "https://api.stacspec.org/v1.0.0/collections",
    "https://api.stacspec.org/v1.0.0/ogcapi-features",
    "https://api.stacspec.org/v1.0.0/item-search",
    "https://api.stacspec.org/v1.0.0/item-search#fields",
    "https://api.stacspec.org/v1.0.0/item-search#query",
    "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/core",
    "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/geojson",
];

/// Builds STAC documents for the HTTP layer.
pub struct StacPresenter {
    catalog: Arc<CatalogService>,
    settings: StacSettings,
}

impl StacPresenter {
    pub fn new(catalog: Arc<CatalogService>, settings: StacSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn settings(&self) -> &StacSettings {
        &self.settings
    }

    /// Landing page: catalog document with one `child` link per visible
    /// collection.
    pub async fn landing(&self, policy: &AccessPolicy, ctx: &RequestContext) -> CatalogResult<Value> {
        let entries = self.catalog.get_catalog(policy).await?;

        let mut links = vec![
            json!({"href": ctx.root(), "rel": "self", "type": "application/json", "title": "Link to this document"}),
            json!({"href": ctx.root(), "rel": "root", "type": "application/json", "title": "API landing page (root catalog)"}),
            json!({"href": ctx.href("/conformance"), "rel": "conformance", "type": "application/json", "title": "Conformance classes"}),
            json!({"href": ctx.href("/collections"), "rel": "data", "type": "application/json", "title": "Information about image collections"}),
            json!({"href": ctx.href("/search"), "rel": "search", "type": "application/geo+json", "method": "GET", "title": "STAC search"}),
            json!({"href": ctx.href("/search"), "rel": "search", "type": "application/geo+json", "method": "POST", "title": "STAC search"}),
        ];
        links.extend(entries.iter().map(|entry| {
            json!({
                "href": ctx.href(&format!("/collections/{}", entry.name)),
                "rel": "child",
                "type": "application/json",
                "title": entry.title,
            })
        }));

        Ok(json!({
            "type": "Catalog",
            "id": self.settings.catalog_id,
            "title": self.settings.catalog_title,
            "description": self.settings.catalog_description,
            "stac_version": self.settings.stac_version,
            "conformsTo": CONFORMANCE,
            "links": links,
        }))
    }

    /// Conformance document.
    pub fn conformance(&self) -> Value {
        json!({ "conformsTo": CONFORMANCE })
    }

    /// Collection documents, optionally scoped to one identifier.
    pub async fn collections(
        &self,
        identifier: Option<&str>,
        policy: &AccessPolicy,
        ctx: &RequestContext,
    ) -> CatalogResult<Vec<CollectionDocument>> {
        let listing = self.catalog.list_collections(identifier, policy).await?;
        let enricher = CollectionEnricher::new(&self.settings, ctx, &listing.relations);

        let mut documents = Vec::with_capacity(listing.rows.len());
        for row in &listing.rows {
            let aux = self.collection_aux(row).await?;
            documents.push(enricher.build(row, aux));
        }

        Ok(documents)
    }

    async fn collection_aux(&self, row: &CollectionRow) -> CatalogResult<CollectionAux> {
        let mut aux = CollectionAux {
            quicklook: self.catalog.collection_quicklook(row.id).await?,
            ..Default::default()
        };

        if row.has_category("eo") {
            aux.eo = Some(self.catalog.collection_eo(row.id).await?);
        }

        if row.is_cube() {
            aux.crs = self.catalog.collection_crs(row).await;
            aux.timeline = self.catalog.collection_timeline(row.id).await?;
        }

        Ok(aux)
    }

    /// Feature documents for a page of item rows.
    ///
    /// Processor lineage is fetched in one batch; band summaries once per
    /// distinct `eo` collection.
    pub async fn features(
        &self,
        rows: &[ItemRow],
        ctx: &RequestContext,
        exclude: &[&str],
    ) -> CatalogResult<Vec<Map<String, Value>>> {
        let item_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let lineage = self.catalog.item_processors(&item_ids).await?;

        let eo_collections: HashSet<i64> = rows
            .iter()
            .filter(|row| row.has_category("eo"))
            .map(|row| row.collection_id)
            .collect();
        let mut eo: HashMap<i64, CollectionEo> = HashMap::with_capacity(eo_collections.len());
        for collection_id in eo_collections {
            eo.insert(collection_id, self.catalog.collection_eo(collection_id).await?);
        }

        let enricher = ItemEnricher::new(&self.settings, ctx);
        Ok(rows
            .iter()
            .map(|row| {
                let aux = ItemAux {
                    lineage: lineage.get(&row.id),
                    eo: eo.get(&row.collection_id),
                };
                enricher.build(row, aux, exclude)
            })
            .collect())
    }

    /// FeatureCollection envelope for a page of features.
    pub fn feature_collection(
        &self,
        page: &ItemPage,
        features: Vec<Map<String, Value>>,
        links: Vec<Value>,
    ) -> Value {
        let returned = features.len();
        json!({
            "type": "FeatureCollection",
            "stac_version": self.settings.stac_version,
            "features": features,
            "links": links,
            "numberMatched": page.total,
            "numberReturned": returned,
            "context": {
                "page": page.page,
                "limit": page.per_page,
                "matched": page.total,
                "returned": returned,
            },
        })
    }
}
