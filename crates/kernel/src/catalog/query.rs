//! Catalog SQL generation using SeaQuery.
//!
//! Every read against the `bdc` schema is built here. Builders return SQL
//! text rendered for PostgreSQL; the service wraps row queries in
//! `row_to_json` so rows arrive as JSON objects keyed by the aliases below.

use sea_query::{
    Alias, Asterisk, Cond, Expr, Iden, Order, PostgresQueryBuilder, Query, SelectStatement,
};

use super::access::AccessPolicy;
use super::types::PageRequest;

/// Catalog schema.
#[derive(Iden, Clone, Copy)]
#[iden = "bdc"]
pub struct Bdc;

#[derive(Iden, Clone, Copy)]
pub enum Items {
    Table,
    Id,
    Name,
    CollectionId,
    TileId,
    StartDate,
    EndDate,
    CloudCover,
    Footprint,
    Bbox,
    Metadata,
    Assets,
    IsAvailable,
    Created,
    Updated,
}

#[derive(Iden, Clone, Copy)]
pub enum Collections {
    Table,
    Id,
    Identifier,
    Name,
    Version,
    Title,
    Description,
    CollectionType,
    Category,
    IsPublic,
    IsAvailable,
    Keywords,
    Properties,
    Summaries,
    ItemAssets,
    Metadata,
    TemporalCompositionSchema,
    VersionPredecessor,
    VersionSuccessor,
    StartDate,
    EndDate,
    SpatialExtent,
    CompositeFunctionId,
    GridRefSysId,
    Created,
    Updated,
}

#[derive(Iden, Clone, Copy)]
pub enum Tiles {
    Table,
    Id,
    Name,
}

#[derive(Iden, Clone, Copy)]
pub enum CompositeFunctions {
    Table,
    Id,
    Name,
}

#[derive(Iden, Clone, Copy)]
pub enum GridRefSys {
    Table,
    Id,
    Name,
    Crs,
}

/// Bands of one collection, numeric attributes cast to floating point.
pub const BANDS_SQL: &str = r#"
    SELECT name, common_name, description,
           CAST(min_value AS double precision) AS min_value,
           CAST(max_value AS double precision) AS max_value,
           CAST(nodata AS double precision) AS nodata,
           CAST(scale_mult AS double precision) AS scale_mult,
           CAST(scale_add AS double precision) AS scale_add,
           data_type::text AS data_type,
           CAST(resolution_x AS double precision) AS resolution_x,
           CAST(resolution_y AS double precision) AS resolution_y,
           COALESCE(properties, '{}'::jsonb) AS properties
    FROM bdc.bands
    WHERE collection_id = $1::int8
    ORDER BY id
"#;

/// Red/green/blue band names used for a collection's quicklook.
pub const QUICKLOOK_SQL: &str = r#"
    SELECT ARRAY[r.name, g.name, b.name]::text[] AS quicklooks
    FROM bdc.quicklook q
    INNER JOIN bdc.bands r ON q.red = r.id
    INNER JOIN bdc.bands g ON q.green = g.id
    INNER JOIN bdc.bands b ON q.blue = b.id
    INNER JOIN bdc.collections c ON q.collection_id = c.id
    WHERE c.id = $1::int8
"#;

/// Timeline instants of a cube collection.
pub const TIMELINE_SQL: &str = r#"
    SELECT time_inst::timestamp AS time_inst
    FROM bdc.timeline
    WHERE collection_id = $1::int8
"#;

/// Processor records of a batch of items, in link order.
pub const PROCESSORS_SQL: &str = r#"
    SELECT ip.item_id, p.name, p.facility, p.level::int4 AS level, p.version
    FROM bdc.items_processors ip
    INNER JOIN bdc.processors p ON p.id = ip.processor_id
    WHERE ip.item_id = ANY($1::int8[])
    ORDER BY ip.item_id, p.id
"#;

/// Outer ordering of item search rows, over the output aliases.
pub const ITEM_ROW_ORDER: &str = r#"t."start" DESC, t."id" ASC"#;

/// Outer ordering of collection rows.
pub const COLLECTION_ROW_ORDER: &str = r#"t."id" ASC"#;

/// Providers of the outer collection row, aggregated into a JSON list.
const PROVIDERS_EXPR: &str = r#"(
    SELECT COALESCE(json_agg(json_build_object(
        'name', p.name,
        'description', p.description,
        'url', p.url,
        'roles', cp.roles
    )), '[]'::json)
    FROM bdc.collections_providers cp
    INNER JOIN bdc.providers p ON p.id = cp.provider_id
    WHERE cp.collection_id = "collections"."id"
)"#;

/// Item search query.
///
/// Joins the owning collection (identifier, type, category) and the optional
/// tile name; ordered by acquisition start descending, then id ascending.
pub struct ItemQueryBuilder {
    condition: Cond,
    include_assets: bool,
}

impl ItemQueryBuilder {
    pub fn new(condition: Cond) -> Self {
        Self {
            condition,
            include_assets: true,
        }
    }

    /// Skip the assets column (large JSONB) when the caller excludes it.
    pub fn with_assets(mut self, include_assets: bool) -> Self {
        self.include_assets = include_assets;
        self
    }

    /// Build the paged SELECT.
    pub fn build(&self, page: PageRequest) -> String {
        let mut query = Query::select();

        query
            .expr_as(
                Expr::col((Collections::Table, Collections::Identifier)),
                Alias::new("collection"),
            )
            .column((Collections::Table, Collections::CollectionType))
            .column((Collections::Table, Collections::Category))
            .expr_as(
                Expr::col((Items::Table, Items::Metadata)),
                Alias::new("item_meta"),
            )
            .expr_as(Expr::col((Items::Table, Items::Name)), Alias::new("item"))
            .column((Items::Table, Items::Id))
            .column((Items::Table, Items::CollectionId))
            .expr_as(
                Expr::col((Items::Table, Items::StartDate)),
                Alias::new("start"),
            )
            .expr_as(Expr::col((Items::Table, Items::EndDate)), Alias::new("end"))
            .column((Items::Table, Items::Created))
            .column((Items::Table, Items::Updated))
            .expr_as(
                Expr::cust(r#"CAST("items"."cloud_cover" AS double precision)"#),
                Alias::new("cloud_cover"),
            )
            .expr_as(
                Expr::cust(r#"ST_AsGeoJSON("items"."footprint")::json"#),
                Alias::new("footprint"),
            )
            .expr_as(
                Expr::cust(r#"ST_AsGeoJSON("items"."bbox")::json"#),
                Alias::new("bbox"),
            )
            .expr_as(Expr::col((Tiles::Table, Tiles::Name)), Alias::new("tile"));

        if self.include_assets {
            query.column((Items::Table, Items::Assets));
        }

        self.add_from(&mut query);

        query
            .order_by((Items::Table, Items::StartDate), Order::Desc)
            .order_by((Items::Table, Items::Id), Order::Asc)
            .limit(u64::from(page.limit))
            .offset(page.offset());

        query.to_string(PostgresQueryBuilder)
    }

    /// Build a COUNT query for the total number of matches.
    pub fn build_count(&self) -> String {
        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count());
        self.add_from(&mut query);
        query.to_string(PostgresQueryBuilder)
    }

    fn add_from(&self, query: &mut SelectStatement) {
        query
            .from((Bdc, Items::Table))
            .inner_join(
                (Bdc, Collections::Table),
                Expr::col((Collections::Table, Collections::Id))
                    .equals((Items::Table, Items::CollectionId)),
            )
            .left_join(
                (Bdc, Tiles::Table),
                Expr::col((Items::Table, Items::TileId)).equals((Tiles::Table, Tiles::Id)),
            )
            .cond_where(self.condition.clone());
    }
}

/// Visible, available collections.
fn visible_collections(policy: &AccessPolicy) -> Cond {
    let mut cond =
        Cond::all().add(Expr::col((Collections::Table, Collections::IsAvailable)).eq(true));
    if let Some(visibility) = policy.condition() {
        cond = cond.add(visibility);
    }
    cond
}

/// Full collection rows with composite function, grid and providers.
pub fn collections(identifier: Option<&str>, policy: &AccessPolicy) -> String {
    let mut query = Query::select();

    query
        .columns([
            (Collections::Table, Collections::Id),
            (Collections::Table, Collections::Identifier),
            (Collections::Table, Collections::Name),
            (Collections::Table, Collections::Version),
            (Collections::Table, Collections::Title),
            (Collections::Table, Collections::Description),
            (Collections::Table, Collections::CollectionType),
            (Collections::Table, Collections::Category),
            (Collections::Table, Collections::IsPublic),
            (Collections::Table, Collections::Keywords),
            (Collections::Table, Collections::Properties),
            (Collections::Table, Collections::Summaries),
            (Collections::Table, Collections::ItemAssets),
            (Collections::Table, Collections::Metadata),
            (Collections::Table, Collections::TemporalCompositionSchema),
            (Collections::Table, Collections::VersionPredecessor),
            (Collections::Table, Collections::VersionSuccessor),
            (Collections::Table, Collections::StartDate),
            (Collections::Table, Collections::EndDate),
            (Collections::Table, Collections::Created),
            (Collections::Table, Collections::Updated),
        ])
        .expr_as(
            Expr::cust(r#"ST_AsGeoJSON("collections"."spatial_extent")::json"#),
            Alias::new("spatial_extent"),
        )
        .expr_as(
            Expr::col((CompositeFunctions::Table, CompositeFunctions::Name)),
            Alias::new("composite_function"),
        )
        .expr_as(
            Expr::col((GridRefSys::Table, GridRefSys::Name)),
            Alias::new("grid_ref_sys"),
        )
        .expr_as(
            Expr::col((GridRefSys::Table, GridRefSys::Crs)),
            Alias::new("grs_crs"),
        )
        .expr_as(Expr::cust(PROVIDERS_EXPR), Alias::new("providers"))
        .from((Bdc, Collections::Table))
        .left_join(
            (Bdc, CompositeFunctions::Table),
            Expr::col((Collections::Table, Collections::CompositeFunctionId))
                .equals((CompositeFunctions::Table, CompositeFunctions::Id)),
        )
        .left_join(
            (Bdc, GridRefSys::Table),
            Expr::col((Collections::Table, Collections::GridRefSysId))
                .equals((GridRefSys::Table, GridRefSys::Id)),
        )
        .cond_where(visible_collections(policy))
        .order_by((Collections::Table, Collections::Id), Order::Asc);

    if let Some(identifier) = identifier {
        query.and_where(Expr::col((Collections::Table, Collections::Identifier)).eq(identifier));
    }

    query.to_string(PostgresQueryBuilder)
}

/// Lightweight id/identifier/title projection of visible collections.
pub fn collection_relations(policy: &AccessPolicy) -> String {
    Query::select()
        .columns([
            (Collections::Table, Collections::Id),
            (Collections::Table, Collections::Identifier),
            (Collections::Table, Collections::Title),
        ])
        .from((Bdc, Collections::Table))
        .cond_where(visible_collections(policy))
        .to_string(PostgresQueryBuilder)
}

/// Landing page listing: id, `name-version` display name and title.
pub fn catalog(policy: &AccessPolicy) -> String {
    Query::select()
        .column((Collections::Table, Collections::Id))
        .expr_as(
            Expr::cust(r#"concat("collections"."name", '-', "collections"."version")"#),
            Alias::new("name"),
        )
        .column((Collections::Table, Collections::Title))
        .from((Bdc, Collections::Table))
        .cond_where(visible_collections(policy))
        .order_by((Collections::Table, Collections::Id), Order::Asc)
        .to_string(PostgresQueryBuilder)
}

/// Internal ids of the visible collections with the given identifiers.
pub fn collection_ids(identifiers: &[String], policy: &AccessPolicy) -> String {
    Query::select()
        .column((Collections::Table, Collections::Id))
        .from((Bdc, Collections::Table))
        .cond_where(visible_collections(policy))
        .and_where(
            Expr::col((Collections::Table, Collections::Identifier))
                .is_in(identifiers.iter().cloned()),
        )
        .to_string(PostgresQueryBuilder)
}
