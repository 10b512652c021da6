//! STAC API routes.
//!
//! Landing page, conformance, collections, collection items and item search.

use axum::{
    Router,
    extract::{Path, Query, RawQuery, State},
    response::Json,
    routing::get,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use url::form_urlencoded;

use super::extract::CallerRoles;
use crate::catalog::filter::escape_like_wildcards;
use crate::catalog::{AccessPolicy, BboxParam, ItemPage, PropertyQuery, SearchParams};
use crate::error::{AppError, AppResult};
use crate::stac::{CollectionDocument, FieldSelection, RequestContext};
use crate::state::AppState;

/// Create the STAC router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/conformance", get(conformance))
        .route("/collections", get(list_collections))
        .route("/collections/{collection_id}", get(get_collection))
        .route("/collections/{collection_id}/items", get(collection_items))
        .route("/collections/{collection_id}/items/{item_id}", get(get_item))
        .route("/search", get(search_get).post(search_post))
}

// -------------------------------------------------------------------------
// Response types
// -------------------------------------------------------------------------

const GEOJSON: &str = "application/geo+json";

/// A page of features ready to wrap in a FeatureCollection.
struct SearchOutcome {
    page: ItemPage,
    features: Vec<Map<String, Value>>,
}

// -------------------------------------------------------------------------
// Request types
// -------------------------------------------------------------------------

/// Item search parameters from a query string.
///
/// `intersects` and `query` are JSON-encoded.
#[derive(Debug, Default, Deserialize)]
struct ItemsQuery {
    collection_id: Option<String>,
    collections: Option<String>,
    ids: Option<String>,
    bbox: Option<String>,
    intersects: Option<String>,
    datetime: Option<String>,
    query: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
    fields: Option<String>,
}

impl ItemsQuery {
    fn search_params(&self) -> AppResult<SearchParams> {
        Ok(SearchParams {
            collection_id: self.collection_id.clone(),
            collections: self.collections.as_deref().map(split_csv),
            ids: self.ids.as_deref().map(split_csv),
            bbox: self.bbox.clone().map(BboxParam::Text),
            intersects: parse_json("intersects", self.intersects.as_deref())?,
            datetime: self.datetime.clone(),
            query: parse_json::<PropertyQuery>("query", self.query.as_deref())?,
            ..Default::default()
        })
    }
}

/// Item search body of `POST /search`.
#[derive(Debug, Default, Deserialize)]
struct SearchBody {
    collection_id: Option<String>,
    collections: Option<Vec<String>>,
    ids: Option<Vec<String>>,
    bbox: Option<BboxParam>,
    intersects: Option<Value>,
    datetime: Option<String>,
    query: Option<PropertyQuery>,
    page: Option<u32>,
    limit: Option<u32>,
    fields: Option<FieldsParam>,
}

impl SearchBody {
    fn search_params(self) -> SearchParams {
        SearchParams {
            collection_id: self.collection_id,
            collections: self.collections,
            ids: self.ids,
            bbox: self.bbox,
            intersects: self.intersects,
            datetime: self.datetime,
            query: self.query,
            ..Default::default()
        }
    }
}

/// `fields` as a selection string or as include/exclude lists.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldsParam {
    Text(String),
    Lists {
        #[serde(default)]
        include: Vec<String>,
        #[serde(default)]
        exclude: Vec<String>,
    },
}

impl FieldsParam {
    fn selection(&self) -> FieldSelection {
        match self {
            FieldsParam::Text(text) => FieldSelection::parse(Some(text)),
            FieldsParam::Lists { include, exclude } => {
                let joined: Vec<String> = include
                    .iter()
                    .cloned()
                    .chain(exclude.iter().map(|field| format!("-{field}")))
                    .collect();
                FieldSelection::parse(Some(&joined.join(",")))
            }
        }
    }
}

/// Requested page and page size.
#[derive(Debug, Clone, Copy, Default)]
struct Paging {
    page: Option<u32>,
    limit: Option<u32>,
}

// -------------------------------------------------------------------------
// Handlers
// -------------------------------------------------------------------------

/// Landing page.
async fn landing(
    State(state): State<AppState>,
    roles: CallerRoles,
    ctx: RequestContext,
) -> AppResult<Json<Value>> {
    let document = state.presenter().landing(&roles.policy(), &ctx).await?;
    Ok(Json(document))
}

async fn conformance(State(state): State<AppState>) -> Json<Value> {
    Json(state.presenter().conformance())
}

/// Every collection visible to the caller.
async fn list_collections(
    State(state): State<AppState>,
    roles: CallerRoles,
    ctx: RequestContext,
) -> AppResult<Json<Value>> {
    let collections = state
        .presenter()
        .collections(None, &roles.policy(), &ctx)
        .await?;

    Ok(Json(json!({
        "collections": collections,
        "links": [
            {"href": ctx.href("/collections"), "rel": "self", "type": "application/json"},
            {"href": ctx.root(), "rel": "root", "type": "application/json"},
        ],
    })))
}

async fn get_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    roles: CallerRoles,
    ctx: RequestContext,
) -> AppResult<Json<CollectionDocument>> {
    let mut collections = state
        .presenter()
        .collections(Some(&collection_id), &roles.policy(), &ctx)
        .await?;

    if collections.is_empty() {
        return Err(AppError::NotFound(format!("collection {collection_id}")));
    }

    Ok(Json(collections.swap_remove(0)))
}

/// Items of one collection.
async fn collection_items(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    roles: CallerRoles,
    ctx: RequestContext,
    RawQuery(raw_query): RawQuery,
    Query(query): Query<ItemsQuery>,
) -> AppResult<Json<Value>> {
    let policy = roles.policy();
    let visible = state
        .catalog()
        .resolve_collection_ids(std::slice::from_ref(&collection_id), &policy)
        .await?;
    if visible.is_empty() {
        return Err(AppError::NotFound(format!("collection {collection_id}")));
    }

    let params = SearchParams {
        collection_id: Some(collection_id.clone()),
        ..query.search_params()?
    };
    let fields = FieldSelection::parse(query.fields.as_deref());
    let paging = Paging {
        page: query.page,
        limit: query.limit,
    };

    let outcome = run_search(&state, &policy, &ctx, &params, paging, &fields).await?;
    let path = format!("/collections/{collection_id}/items");
    let mut links = query_links(&ctx, &path, raw_query.as_deref(), &outcome.page);
    links.push(json!({
        "href": ctx.href(&format!("/collections/{collection_id}")),
        "rel": "collection",
        "type": "application/json",
    }));

    Ok(Json(state.presenter().feature_collection(
        &outcome.page,
        outcome.features,
        links,
    )))
}

/// One item by name within a collection.
async fn get_item(
    State(state): State<AppState>,
    Path((collection_id, item_id)): Path<(String, String)>,
    roles: CallerRoles,
    ctx: RequestContext,
) -> AppResult<Json<Map<String, Value>>> {
    let params = SearchParams {
        collection_id: Some(collection_id.clone()),
        item_id: Some(escape_like_wildcards(&item_id)),
        ..Default::default()
    };
    let paging = Paging {
        page: Some(1),
        limit: Some(1),
    };

    let outcome = run_search(
        &state,
        &roles.policy(),
        &ctx,
        &params,
        paging,
        &FieldSelection::default(),
    )
    .await?;

    outcome
        .features
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("item {item_id} in collection {collection_id}")))
}

async fn search_get(
    State(state): State<AppState>,
    roles: CallerRoles,
    ctx: RequestContext,
    RawQuery(raw_query): RawQuery,
    Query(query): Query<ItemsQuery>,
) -> AppResult<Json<Value>> {
    let params = query.search_params()?;
    let fields = FieldSelection::parse(query.fields.as_deref());
    let paging = Paging {
        page: query.page,
        limit: query.limit,
    };

    let outcome = run_search(&state, &roles.policy(), &ctx, &params, paging, &fields).await?;
    let links = query_links(&ctx, "/search", raw_query.as_deref(), &outcome.page);

    Ok(Json(state.presenter().feature_collection(
        &outcome.page,
        outcome.features,
        links,
    )))
}

async fn search_post(
    State(state): State<AppState>,
    roles: CallerRoles,
    ctx: RequestContext,
    Json(raw_body): Json<Value>,
) -> AppResult<Json<Value>> {
    let body: SearchBody = serde_json::from_value(raw_body.clone())
        .map_err(|e| AppError::BadRequest(format!("invalid search body: {e}")))?;

    let fields = body
        .fields
        .as_ref()
        .map(FieldsParam::selection)
        .unwrap_or_default();
    let paging = Paging {
        page: body.page,
        limit: body.limit,
    };
    let params = body.search_params();

    let outcome = run_search(&state, &roles.policy(), &ctx, &params, paging, &fields).await?;
    let links = body_links(&ctx, &raw_body, &outcome.page);

    Ok(Json(state.presenter().feature_collection(
        &outcome.page,
        outcome.features,
        links,
    )))
}

// -------------------------------------------------------------------------
// Helpers
// -------------------------------------------------------------------------

/// Run a search and build the projected feature documents.
async fn run_search(
    state: &AppState,
    policy: &AccessPolicy,
    ctx: &RequestContext,
    params: &SearchParams,
    paging: Paging,
    fields: &FieldSelection,
) -> AppResult<SearchOutcome> {
    let request = state.catalog().page_request(
        paging.page.unwrap_or(1),
        paging.limit.unwrap_or(state.config().default_limit),
    );
    let include_assets = !fields.excludes("assets");

    let page = state
        .catalog()
        .search_items(params, policy, request, include_assets)
        .await?;

    let excluded = fields.excluded_keys();
    let mut features = state
        .presenter()
        .features(&page.items, ctx, &excluded)
        .await?;

    if !fields.is_empty() {
        for feature in &mut features {
            fields.apply(feature);
        }
    }

    Ok(SearchOutcome { page, features })
}

/// `self`/`root` plus `next`/`prev` links for a GET listing. Paging links
/// repeat the request query with the page number replaced.
fn query_links(ctx: &RequestContext, path: &str, raw_query: Option<&str>, page: &ItemPage) -> Vec<Value> {
    let self_href = match raw_query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{}{}?{}", ctx.stac_url, path, query),
        None => ctx.href(path),
    };

    let mut links = vec![
        json!({"href": self_href, "rel": "self", "type": GEOJSON}),
        json!({"href": ctx.root(), "rel": "root", "type": "application/json"}),
    ];

    let page_href = |number: u32| {
        format!(
            "{}{}?{}",
            ctx.stac_url,
            path,
            with_page(raw_query.unwrap_or_default(), number)
        )
    };

    if page.has_next {
        links.push(json!({"href": page_href(page.page + 1), "rel": "next", "type": GEOJSON}));
    }
    if page.has_prev {
        links.push(json!({"href": page_href(page.page - 1), "rel": "prev", "type": GEOJSON}));
    }

    links
}

/// `self`/`root` plus `next`/`prev` links for a POST search. Paging links
/// carry the original body with the page number replaced.
fn body_links(ctx: &RequestContext, body: &Value, page: &ItemPage) -> Vec<Value> {
    let search = ctx.href("/search");
    let mut links = vec![
        json!({"href": search, "rel": "self", "type": GEOJSON}),
        json!({"href": ctx.root(), "rel": "root", "type": "application/json"}),
    ];

    let page_link = |rel: &str, number: u32| {
        let mut next_body = body.as_object().cloned().unwrap_or_default();
        next_body.insert("page".to_string(), json!(number));
        json!({
            "href": search,
            "rel": rel,
            "type": GEOJSON,
            "method": "POST",
            "body": next_body,
            "merge": false,
        })
    };

    if page.has_next {
        links.push(page_link("next", page.page + 1));
    }
    if page.has_prev {
        links.push(page_link("prev", page.page - 1));
    }

    links
}

/// Re-encode a query string with `page` set to `number`.
fn with_page(query: &str, number: u32) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key != "page" {
            serializer.append_pair(&key, &value);
        }
    }
    serializer.append_pair("page", &number.to_string());
    serializer.finish()
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_json<T: DeserializeOwned>(name: &str, value: Option<&str>) -> AppResult<Option<T>> {
    value
        .map(|raw| {
            serde_json::from_str(raw)
                .map_err(|e| AppError::BadRequest(format!("invalid {name} parameter: {e}")))
        })
        .transpose()
}
