//! Catalog query service.
//!
//! Executes compiled searches and the auxiliary per-collection lookups used
//! by the enrichment pipelines. Every operation is a pure read.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{PgExecutor, PgPool};
use tracing::debug;

use super::access::AccessPolicy;
use super::cache::LookupCache;
use super::error::{CatalogError, CatalogResult};
use super::filter::{FilterCompiler, GeometryField, SearchPlan};
use super::query::{self, ItemQueryBuilder};
use super::types::{ItemPage, PageRequest, SearchParams};
use crate::models::{
    Band, CatalogEntry, CollectionEo, CollectionRef, CollectionRow, ItemRow, ProcessingLineage,
    ProcessorRecord, format_timeline,
};

/// Search tuning shared by every request.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    /// Largest page size a caller may request.
    pub max_limit: u32,
    /// Geometry used for spatial filters.
    pub geometry: GeometryField,
    /// Statement timeout applied to search queries.
    pub statement_timeout: Duration,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            max_limit: 1000,
            geometry: GeometryField::Bbox,
            statement_timeout: Duration::from_secs(10),
        }
    }
}

/// Collections of one listing call plus the map used to resolve version links.
#[derive(Debug, Clone, Default)]
pub struct CollectionListing {
    pub rows: Vec<CollectionRow>,
    /// Internal id -> reference, for predecessor/successor links.
    pub relations: HashMap<i64, CollectionRef>,
}

/// Service executing catalog reads.
pub struct CatalogService {
    pool: PgPool,
    settings: CatalogSettings,
    cache: LookupCache,
}

impl CatalogService {
    pub fn new(pool: PgPool, settings: CatalogSettings) -> Self {
        Self {
            pool,
            settings,
            cache: LookupCache::new(),
        }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    /// Page request clamped to the configured maximum page size.
    pub fn page_request(&self, page: u32, limit: u32) -> PageRequest {
        PageRequest::clamped(page, limit, self.settings.max_limit)
    }

    /// Run an item search.
    ///
    /// Parameters are validated before any query runs. Count and page queries
    /// share one transaction bounded by the statement timeout.
    pub async fn search_items(
        &self,
        params: &SearchParams,
        policy: &AccessPolicy,
        page: PageRequest,
        include_assets: bool,
    ) -> CatalogResult<ItemPage> {
        let plan = SearchPlan::parse(params)?;

        let collection_ids = match plan.collection_identifiers() {
            Some(identifiers) => Some(self.resolve_collection_ids(identifiers, policy).await?),
            None => None,
        };

        // SeaQuery expressions are not `Send`; render before the next await.
        let (count_sql, page_sql) = {
            let condition = FilterCompiler::new(self.settings.geometry).compile(
                &plan,
                collection_ids.as_deref(),
                policy,
            );
            let builder = ItemQueryBuilder::new(condition).with_assets(include_assets);
            (builder.build_count(), builder.build(page))
        };

        let mut tx = self.pool.begin().await?;

        let timeout_ms = self.settings.statement_timeout.as_millis();
        sqlx::query(&format!("SET LOCAL statement_timeout = '{timeout_ms}ms'"))
            .execute(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar(&count_sql)
            .fetch_one(&mut *tx)
            .await?;

        let items: Vec<ItemRow> =
            fetch_rows(&mut *tx, &page_sql, Some(query::ITEM_ROW_ORDER)).await?;

        tx.commit().await?;

        debug!(
            total,
            returned = items.len(),
            page = page.page,
            limit = page.limit,
            "item search"
        );

        Ok(ItemPage::new(items, u64::try_from(total).unwrap_or(0), page))
    }

    /// Internal ids of the collections with the given identifiers that are
    /// available and visible to `policy`. Other identifiers are dropped.
    pub async fn resolve_collection_ids(
        &self,
        identifiers: &[String],
        policy: &AccessPolicy,
    ) -> CatalogResult<Vec<i64>> {
        if identifiers.is_empty() {
            return Ok(Vec::new());
        }

        let ids = sqlx::query_scalar(&query::collection_ids(identifiers, policy))
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Visible collections, optionally scoped to one identifier.
    ///
    /// When scoped, version links are resolved against a lightweight
    /// projection of every visible collection.
    pub async fn list_collections(
        &self,
        identifier: Option<&str>,
        policy: &AccessPolicy,
    ) -> CatalogResult<CollectionListing> {
        let rows: Vec<CollectionRow> = fetch_rows(
            &self.pool,
            &query::collections(identifier, policy),
            Some(query::COLLECTION_ROW_ORDER),
        )
        .await?;

        let relations = if identifier.is_some() && !rows.is_empty() {
            let refs: Vec<CollectionRef> =
                fetch_rows(&self.pool, &query::collection_relations(policy), None).await?;
            refs.into_iter().map(|r| (r.id, r)).collect()
        } else {
            rows.iter().map(|row| (row.id, CollectionRef::from(row))).collect()
        };

        Ok(CollectionListing { rows, relations })
    }

    /// Landing page listing of visible collections.
    pub async fn get_catalog(&self, policy: &AccessPolicy) -> CatalogResult<Vec<CatalogEntry>> {
        fetch_rows(
            &self.pool,
            &query::catalog(policy),
            Some(query::COLLECTION_ROW_ORDER),
        )
        .await
    }

    /// Electro-optical band summary, memoized per collection.
    pub async fn collection_eo(&self, collection_id: i64) -> CatalogResult<CollectionEo> {
        self.cache
            .eo
            .get_or_try_compute(collection_id, || async {
                let bands: Vec<Band> = sqlx::query_as(query::BANDS_SQL)
                    .bind(collection_id)
                    .fetch_all(&self.pool)
                    .await?;
                Ok::<_, CatalogError>(CollectionEo::from_bands(collection_id, &bands))
            })
            .await
    }

    /// Quicklook red/green/blue band names, memoized per collection.
    pub async fn collection_quicklook(
        &self,
        collection_id: i64,
    ) -> CatalogResult<Option<Vec<String>>> {
        self.cache
            .quicklook
            .get_or_try_compute(collection_id, || async {
                let bands: Option<Vec<String>> = sqlx::query_scalar(query::QUICKLOOK_SQL)
                    .bind(collection_id)
                    .fetch_optional(&self.pool)
                    .await?;
                Ok::<_, CatalogError>(bands)
            })
            .await
    }

    /// CRS of a collection, memoized per collection.
    pub async fn collection_crs(&self, collection: &CollectionRow) -> Option<String> {
        let resolved: CatalogResult<Option<String>> = self
            .cache
            .crs
            .get_or_try_compute(collection.id, || async { Ok(collection.crs()) })
            .await;
        resolved.unwrap_or_default()
    }

    /// Distinct acquisition dates of a cube collection.
    pub async fn collection_timeline(&self, collection_id: i64) -> CatalogResult<Vec<String>> {
        let instants: Vec<NaiveDateTime> = sqlx::query_scalar(query::TIMELINE_SQL)
            .bind(collection_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(format_timeline(&instants))
    }

    /// Processing lineage of a batch of items, keyed by internal item id.
    /// Items without processors are absent.
    pub async fn item_processors(
        &self,
        item_ids: &[i64],
    ) -> CatalogResult<HashMap<i64, ProcessingLineage>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let records: Vec<ProcessorRecord> = sqlx::query_as(query::PROCESSORS_SQL)
            .bind(item_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(group_lineage(&records))
    }

    /// Whether the catalog store is reachable.
    pub async fn is_healthy(&self) -> bool {
        crate::db::check_health(&self.pool).await
    }
}

/// Group processor records by item and aggregate each group.
fn group_lineage(records: &[ProcessorRecord]) -> HashMap<i64, ProcessingLineage> {
    let mut grouped: HashMap<i64, Vec<&ProcessorRecord>> = HashMap::new();
    for record in records {
        grouped.entry(record.item_id).or_default().push(record);
    }

    grouped
        .into_iter()
        .filter_map(|(item_id, records)| {
            ProcessingLineage::aggregate(records).map(|lineage| (item_id, lineage))
        })
        .collect()
}

/// Fetch rows of `sql` as JSON objects and decode them.
///
/// `order_by` repeats the inner ordering over the output aliases, since the
/// wrapping select does not inherit it.
async fn fetch_rows<'e, T, E>(executor: E, sql: &str, order_by: Option<&str>) -> CatalogResult<Vec<T>>
where
    T: DeserializeOwned,
    E: PgExecutor<'e>,
{
    let rows: Vec<Value> = sqlx::query_scalar(&row_json_sql(sql, order_by))
        .fetch_all(executor)
        .await?;

    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(CatalogError::from))
        .collect()
}

fn row_json_sql(sql: &str, order_by: Option<&str>) -> String {
    match order_by {
        Some(order_by) => format!("SELECT row_to_json(t) FROM ({sql}) t ORDER BY {order_by}"),
        None => format!("SELECT row_to_json(t) FROM ({sql}) t"),
    }
}
