#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Document enrichment tests.
//!
//! Catalog rows come from `stac-test-utils` fixtures in the store's JSON
//! shape and are run through the collection and item enrichers.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::{Value, json};

use stac_kernel::models::{
    Band, CollectionEo, CollectionRef, CollectionRow, ItemRow, ProcessingLineage, ProcessorRecord,
};
use stac_kernel::stac::{
    CollectionAux, CollectionEnricher, ItemAux, ItemEnricher, RequestContext, StacSettings,
};
use stac_test_utils::{TestCollection, test_collection, test_item};

const EO_URI: &str = "https://stac-extensions.github.io/eo/v1.0.0/schema.json";
const DATACUBE_URI: &str = "https://stac-extensions.github.io/datacube/v2.0.0/schema.json";
const STORAGE_URI: &str = "https://stac-extensions.github.io/storage/v1.0.0/schema.json";
const PROCESSING_URI: &str = "https://stac-extensions.github.io/processing/v1.1.0/schema.json";

fn band(name: &str, resolution: Option<f64>) -> Band {
    Band {
        name: name.to_string(),
        common_name: Some(name.to_lowercase()),
        description: None,
        min_value: Some(0.0),
        max_value: Some(10000.0),
        nodata: Some(-9999.0),
        scale_mult: Some(0.0001),
        scale_add: None,
        data_type: Some("int16".to_string()),
        resolution_x: resolution,
        resolution_y: resolution,
        properties: json!({}),
    }
}

fn collection_row(fixture: &TestCollection) -> CollectionRow {
    serde_json::from_value(fixture.to_row()).unwrap()
}

fn ctx() -> RequestContext {
    RequestContext::new(
        "https://data.example.org/stac",
        "https://files.example.org/",
        "?access_token=abc",
    )
}

fn collection_document(row: &CollectionRow, aux: CollectionAux) -> Value {
    let settings = StacSettings::default();
    let ctx = ctx();
    let relations = HashMap::new();
    let document = CollectionEnricher::new(&settings, &ctx, &relations).build(row, aux);
    serde_json::to_value(document).unwrap()
}

fn extensions(document: &Value) -> Vec<&str> {
    document["stac_extensions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect()
}

#[test]
fn eo_collection_summarizes_bands() {
    let row = collection_row(&test_collection("LC8-30D", 1));
    let eo = CollectionEo::from_bands(
        row.id,
        &[
            band("B04", Some(30.0)),
            band("B05", Some(15.0)),
            band("QA", None),
        ],
    );

    let document = collection_document(
        &row,
        CollectionAux {
            eo: Some(eo),
            ..Default::default()
        },
    );

    assert_eq!(document["properties"]["eo:gsd"], json!(30.0));
    let bands = document["properties"]["eo:bands"].as_array().unwrap();
    assert_eq!(bands.len(), 2);
    assert_eq!(bands[0]["name"], "B04");
    assert!(extensions(&document).contains(&EO_URI));
    assert!(!extensions(&document).contains(&DATACUBE_URI));
    assert!(document.get("cube:dimensions").is_none());
}

#[test]
fn cube_collection_describes_dimensions() {
    let fixture = test_collection("S2-16D", 2).as_cube("BDC_SM_V2", "+proj=aea +lat_0=-12");
    let row = collection_row(&fixture);
    let eo = CollectionEo::from_bands(row.id, &[band("B04", Some(10.0)), band("B08", Some(10.0))]);

    let document = collection_document(
        &row,
        CollectionAux {
            eo: Some(eo),
            crs: row.crs(),
            timeline: vec!["2020-01-01".into(), "2020-01-17".into()],
            quicklook: Some(vec!["B04".into(), "B08".into(), "B04".into()]),
        },
    );

    assert!(extensions(&document).contains(&DATACUBE_URI));
    assert_eq!(document["bdc:type"], "cube");
    assert_eq!(document["bdc:grs"], "BDC_SM_V2");
    assert_eq!(document["bdc:crs"], "+proj=aea +lat_0=-12");
    assert_eq!(document["bdc:bands_quicklook"], json!(["B04", "B08", "B04"]));

    let dimensions = &document["cube:dimensions"];
    assert_eq!(dimensions["x"]["reference_system"], "+proj=aea +lat_0=-12");
    assert_eq!(dimensions["temporal"]["values"], json!(["2020-01-01", "2020-01-17"]));
    assert_eq!(dimensions["bands"]["values"], json!(["B04", "B08"]));
    assert_eq!(
        document["extent"]["temporal"]["interval"],
        json!([["2017-01-01T00:00:00.000000Z", "2021-12-31T00:00:00.000000Z"]])
    );
}

#[test]
fn collection_without_start_has_open_interval() {
    let fixture = test_collection("CB4-16D", 1).with_dates(None, NaiveDate::from_ymd_opt(2021, 1, 1));
    let document = collection_document(&collection_row(&fixture), CollectionAux::default());

    assert_eq!(document["extent"]["temporal"]["interval"], json!([[null, null]]));
}

#[test]
fn successor_marks_collection_deprecated() {
    let current = test_collection("S2-16D", 1).with_id(1).with_versions(None, Some(2));
    let row = collection_row(&current);

    let newer = collection_row(&test_collection("S2-16D", 2).with_id(2));
    let relations = HashMap::from([(2, CollectionRef::from(&newer))]);

    let settings = StacSettings::default();
    let ctx = ctx();
    let document = CollectionEnricher::new(&settings, &ctx, &relations)
        .build(&row, CollectionAux::default());
    let document = serde_json::to_value(document).unwrap();

    assert_eq!(document["deprecated"], true);
    let successor = document["links"]
        .as_array()
        .unwrap()
        .iter()
        .find(|link| link["rel"] == "successor-version")
        .unwrap();
    assert_eq!(
        successor["href"],
        "https://data.example.org/stac/collections/S2-16D-2?access_token=abc"
    );
}

#[test]
fn item_assets_resolved_against_file_root() {
    let collection = test_collection("S2-16D", 2).with_category(None);
    let row: ItemRow = serde_json::from_value(
        test_item(&collection, "S2-16D_V2_007004_20200601")
            .with_asset("B04", "/s2-16d/v2/007004/B04.tif")
            .to_row(),
    )
    .unwrap();

    let settings = StacSettings::default();
    let ctx = ctx();
    let feature = ItemEnricher::new(&settings, &ctx).build(&row, ItemAux::default(), &[]);

    assert_eq!(
        feature["assets"]["B04"]["href"],
        "https://files.example.org/s2-16d/v2/007004/B04.tif?access_token=abc"
    );
    assert_eq!(feature["bbox"], json!([-46.0, -13.0, -45.0, -12.0]));
    assert_eq!(feature["properties"]["bdc:tiles"], json!(["007004"]));
}

#[test]
fn storage_items_keep_hrefs() {
    let collection = test_collection("S2-16D", 2);
    let row: ItemRow = serde_json::from_value(
        test_item(&collection, "S2-16D_V2_007004_20200601")
            .with_metadata("storage:platform", json!("AWS"))
            .with_metadata("storage:region", json!("us-west-2"))
            .with_asset("B04", "s3://bdc-sentinel-2/007004/B04.tif")
            .to_row(),
    )
    .unwrap();

    let settings = StacSettings::default();
    let ctx = RequestContext::new("https://data.example.org/stac", "https://files.example.org", "");
    let feature = ItemEnricher::new(&settings, &ctx).build(&row, ItemAux::default(), &[]);

    assert_eq!(
        feature["assets"]["B04"]["href"],
        "s3://bdc-sentinel-2/007004/B04.tif"
    );
    assert!(extensions(&Value::Object(feature.clone())).contains(&STORAGE_URI));
    assert_eq!(feature["properties"]["storage:platform"], "AWS");
}

#[test]
fn eo_item_carries_band_and_lineage() {
    let collection = test_collection("S2-16D", 2).with_id(5);
    let row: ItemRow = serde_json::from_value(
        test_item(&collection, "S2-16D_V2_007004_20200601")
            .with_id(42)
            .with_asset("B04", "/s2/B04.tif")
            .with_asset("thumbnail", "/s2/thumbnail.png")
            .to_row(),
    )
    .unwrap();

    let eo = CollectionEo::from_bands(5, &[band("B04", Some(10.0))]);
    let records = [
        ProcessorRecord {
            item_id: 42,
            name: "sen2cor".into(),
            facility: "Sen2Cor".into(),
            level: 2,
            version: "2.8.0".into(),
        },
        ProcessorRecord {
            item_id: 42,
            name: "bdc-cube".into(),
            facility: "cube-builder".into(),
            level: 3,
            version: "1.0.0".into(),
        },
    ];
    let lineage = ProcessingLineage::aggregate(&records).unwrap();

    let settings = StacSettings::default();
    let ctx = ctx();
    let feature = ItemEnricher::new(&settings, &ctx).build(
        &row,
        ItemAux {
            lineage: Some(&lineage),
            eo: Some(&eo),
        },
        &[],
    );

    assert_eq!(feature["assets"]["B04"]["eo:bands"][0]["name"], "B04");
    assert!(feature["assets"]["thumbnail"].get("eo:bands").is_none());
    assert_eq!(feature["properties"]["eo:cloud_cover"], json!(12.5));
    assert_eq!(feature["properties"]["processing:lineage"], "bdc-cube");
    assert_eq!(feature["properties"]["processing:level"], 3);
    assert_eq!(
        feature["properties"]["processing:software"],
        json!({"Sen2Cor": "2.8.0", "cube-builder": "1.0.0"})
    );

    let document = Value::Object(feature);
    assert!(extensions(&document).contains(&EO_URI));
    assert!(extensions(&document).contains(&PROCESSING_URI));
}

#[test]
fn excluded_keys_dropped_from_feature() {
    let collection = test_collection("S2-16D", 2);
    let row: ItemRow = serde_json::from_value(
        test_item(&collection, "S2-16D_V2_007004_20200601")
            .without_assets()
            .to_row(),
    )
    .unwrap();

    let settings = StacSettings::default();
    let ctx = ctx();
    let feature =
        ItemEnricher::new(&settings, &ctx).build(&row, ItemAux::default(), &["assets", "links"]);

    assert!(feature.get("assets").is_none());
    assert!(feature.get("links").is_none());
    assert_eq!(feature["id"], "S2-16D_V2_007004_20200601");
}
