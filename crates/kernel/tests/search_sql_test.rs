#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Search compilation tests.
//!
//! Parameters go through plan validation, filter compilation and the item
//! query builder, and the rendered SQL is checked.

use serde_json::json;

use stac_kernel::catalog::query::ItemQueryBuilder;
use stac_kernel::catalog::{
    AccessPolicy, BboxParam, CatalogError, FilterCompiler, GeometryField, PageRequest,
    PropertyQuery, SearchParams, SearchPlan,
};

fn render(
    params: &SearchParams,
    resolved: Option<&[i64]>,
    policy: &AccessPolicy,
    geometry: GeometryField,
) -> String {
    let plan = SearchPlan::parse(params).unwrap();
    let condition = FilterCompiler::new(geometry).compile(&plan, resolved, policy);
    ItemQueryBuilder::new(condition).build(PageRequest::clamped(1, 10, 1000))
}

fn anonymous(params: &SearchParams) -> String {
    render(params, Some(&[3]), &AccessPolicy::anonymous(), GeometryField::Bbox)
}

fn property_query(value: serde_json::Value) -> PropertyQuery {
    serde_json::from_value(value).unwrap()
}

#[test]
fn empty_search_filters_availability_and_visibility_only() {
    let sql = render(
        &SearchParams::default(),
        None,
        &AccessPolicy::anonymous(),
        GeometryField::Bbox,
    );

    assert!(sql.contains(r#""collections"."is_available" = TRUE"#), "{sql}");
    assert!(sql.contains(r#""items"."is_available" = TRUE"#), "{sql}");
    assert!(sql.contains(r#""collections"."is_public" = TRUE"#), "{sql}");
    assert!(!sql.contains(r#""items"."collection_id" IN"#), "{sql}");
    assert!(sql.contains("LIMIT 10"), "{sql}");
}

#[test]
fn wildcard_role_sees_private_collections() {
    let sql = render(
        &SearchParams::default(),
        None,
        &AccessPolicy::from_roles(&["*".to_string()]),
        GeometryField::Bbox,
    );

    assert!(!sql.contains("is_public"), "{sql}");
}

#[test]
fn roles_widen_visibility() {
    let sql = render(
        &SearchParams::default(),
        None,
        &AccessPolicy::from_roles(&["S2-16D-2".to_string()]),
        GeometryField::Bbox,
    );

    assert!(sql.contains(r#""collections"."is_public" = TRUE"#), "{sql}");
    assert!(sql.contains("'S2-16D-2'"), "{sql}");
    assert!(sql.contains(" OR "), "{sql}");
}

#[test]
fn collections_filter_by_resolved_ids() {
    let params = SearchParams {
        collections: Some(vec!["S2-16D-2".into(), "LC8-16D-1".into()]),
        ..Default::default()
    };
    let sql = render(
        &params,
        Some(&[3, 9]),
        &AccessPolicy::anonymous(),
        GeometryField::Bbox,
    );

    assert!(sql.contains(r#""items"."collection_id" IN (3, 9)"#), "{sql}");
}

#[test]
fn unknown_collections_match_nothing() {
    let params = SearchParams {
        collection_id: Some("NOPE-1".into()),
        ..Default::default()
    };
    let sql = render(&params, Some(&[]), &AccessPolicy::anonymous(), GeometryField::Bbox);

    assert!(sql.contains("1 = 2"), "{sql}");
}

#[test]
fn footprint_flag_switches_spatial_column() {
    let params = SearchParams {
        bbox: Some(BboxParam::Coordinates(vec![-46.0, -13.0, -45.0, -12.0])),
        ..Default::default()
    };

    let on_bbox = render(&params, None, &AccessPolicy::anonymous(), GeometryField::Bbox);
    assert!(on_bbox.contains("ST_MakeEnvelope"), "{on_bbox}");
    assert!(on_bbox.contains(r#""items"."bbox")"#), "{on_bbox}");

    let on_footprint = render(
        &params,
        None,
        &AccessPolicy::anonymous(),
        GeometryField::Footprint,
    );
    assert!(on_footprint.contains(r#""items"."footprint")"#), "{on_footprint}");
}

#[test]
fn cloud_cover_compared_numerically() {
    let params = SearchParams {
        query: Some(property_query(json!({"eo:cloud_cover": {"lte": 20}}))),
        ..Default::default()
    };
    let sql = anonymous(&params);

    assert!(sql.contains(r#""items"."cloud_cover" <= 20"#), "{sql}");
}

#[test]
fn tile_in_list() {
    let params = SearchParams {
        query: Some(property_query(json!({"bdc:tile": {"in": ["007004", "007005"]}}))),
        ..Default::default()
    };
    let sql = anonymous(&params);

    assert!(sql.contains(r#""tiles"."name" IN ('007004', '007005')"#), "{sql}");
}

#[test]
fn metadata_property_compared_as_text() {
    let params = SearchParams {
        query: Some(property_query(json!({"platform": {"startsWith": "sentinel"}}))),
        ..Default::default()
    };
    let sql = anonymous(&params);

    assert!(sql.contains(r#""items"."metadata" ->>"#), "{sql}");
    assert!(sql.contains("'sentinel%'"), "{sql}");
}

#[test]
fn pattern_on_cloud_cover_rejected() {
    let params = SearchParams {
        query: Some(property_query(json!({"eo:cloud_cover": {"contains": "1"}}))),
        ..Default::default()
    };

    assert!(matches!(
        SearchPlan::parse(&params),
        Err(CatalogError::UnsupportedOperator { .. })
    ));
}

#[test]
fn datetime_interval_compiles_overlap() {
    let params = SearchParams {
        datetime: Some("2020-01-01T00:00:00Z/2020-12-31T23:59:59Z".into()),
        ..Default::default()
    };
    let sql = anonymous(&params);

    assert!(sql.contains(r#""items"."start_date" >= '2020-01-01"#), "{sql}");
    assert!(sql.contains(r#""items"."end_date" <= '2020-12-31"#), "{sql}");
}

#[test]
fn results_ordered_newest_first() {
    let sql = anonymous(&SearchParams::default());
    assert!(
        sql.contains(r#"ORDER BY "items"."start_date" DESC, "items"."id" ASC"#),
        "{sql}"
    );
}
