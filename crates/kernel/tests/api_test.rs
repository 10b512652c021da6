#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Router-level tests.
//!
//! Parameter validation happens before any store access, so every request
//! here is answered without a database.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use url::form_urlencoded;

use common::{TestApp, json_body};

fn search_uri(pairs: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("/search?{query}")
}

#[tokio::test]
async fn conformance_lists_core_classes() {
    let app = TestApp::new();

    let response = app.get("/conformance").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let classes: Vec<&str> = body["conformsTo"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c.as_str())
        .collect();
    assert!(classes.contains(&"https://api.stacspec.org/v1.0.0/core"));
    assert!(classes.contains(&"https://api.stacspec.org/v1.0.0/item-search"));
}

#[tokio::test]
async fn degenerate_bbox_rejected() {
    let app = TestApp::new();

    let response = app.get(&search_uri(&[("bbox", "-46,-13,-46,-12")])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["code"], "InvalidBoundingBoxError");
}

#[tokio::test]
async fn malformed_bbox_rejected() {
    let app = TestApp::new();

    let response = app.get(&search_uri(&[("bbox", "-46,-13,-45")])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn collection_id_with_collections_rejected() {
    let app = TestApp::new();

    let response = app
        .get(&search_uri(&[
            ("collection_id", "S2-16D-2"),
            ("collections", "LC8-16D-1"),
        ]))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["code"], "InvalidParameterCombination");
}

#[tokio::test]
async fn bad_datetime_rejected() {
    let app = TestApp::new();

    for datetime in ["yesterday", "2020-13-01", "../.."] {
        let response = app.get(&search_uri(&[("datetime", datetime)])).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{datetime}");

        let body = json_body(response).await;
        assert_eq!(body["code"], "InvalidDatetime", "{datetime}");
    }
}

#[tokio::test]
async fn unknown_query_operator_rejected() {
    let app = TestApp::new();

    let query = json!({"eo:cloud_cover": {"near": 10}}).to_string();
    let response = app.get(&search_uri(&[("query", &query)])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["code"], "UnsupportedOperator");
}

#[tokio::test]
async fn in_operator_requires_list() {
    let app = TestApp::new();

    let query = json!({"bdc:tile": {"in": "007004"}}).to_string();
    let response = app.get(&search_uri(&[("query", &query)])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["code"], "InvalidQueryValue");
}

#[tokio::test]
async fn malformed_intersects_rejected() {
    let app = TestApp::new();

    let response = app.get(&search_uri(&[("intersects", "{\"type\":")])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["code"], "BadRequest");
}

#[tokio::test]
async fn post_search_validates_body() {
    let app = TestApp::new();

    let response = app
        .post_json("/search", &json!({"bbox": [0.0, 0.0, 0.0, 0.0]}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "InvalidBoundingBoxError");

    let response = app
        .post_json(
            "/search",
            &json!({"collection_id": "S2-16D-2", "collections": ["LC8-16D-1"]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "InvalidParameterCombination");
}

#[tokio::test]
async fn post_search_rejects_mistyped_body() {
    let app = TestApp::new();

    let response = app
        .post_json("/search", &json!({"collections": "S2-16D-2", "limit": "ten"}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "BadRequest");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = TestApp::new();

    let response = app.get("/collections/S2-16D-2/items/a/b").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
