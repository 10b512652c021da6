//! Catalog search types.
//!
//! Provides type definitions for the search pipeline:
//! - SearchParams: named search criteria as received from callers
//! - QueryOperator / Queryable: property query dispatch
//! - BoundingBox: validated spatial envelope
//! - ItemPage: a page of raw item rows with paging metadata

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::CatalogError;
use crate::models::ItemRow;

/// Property query mapping: property name -> operator name -> operand.
pub type PropertyQuery = BTreeMap<String, BTreeMap<String, Value>>;

/// Search criteria for items.
///
/// All fields are optional; an empty value matches every visible item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    /// Single collection identifier (mutually exclusive with `collections`).
    pub collection_id: Option<String>,

    /// Collection identifiers to search in.
    pub collections: Option<Vec<String>>,

    /// Explicit item names. Overrides every other filter.
    pub ids: Option<Vec<String>>,

    /// Item name pattern (SQL `LIKE` semantics).
    pub item_id: Option<String>,

    /// Bounding box `west,south,east,north`.
    pub bbox: Option<BboxParam>,

    /// GeoJSON geometry to intersect with.
    pub intersects: Option<Value>,

    /// Single RFC 3339 timestamp or `start/end` interval.
    pub datetime: Option<String>,

    /// Property queries.
    pub query: Option<PropertyQuery>,
}

/// Raw bounding box as received: a comma-separated string or a list of numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BboxParam {
    Text(String),
    Coordinates(Vec<f64>),
}

/// A validated, non-degenerate bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Parse and validate a bounding box.
    ///
    /// Rejects anything that is not exactly four numbers, and boxes where
    /// `west == east` or `south == north`.
    pub fn parse(param: &BboxParam) -> Result<Self, CatalogError> {
        let coords: Vec<f64> = match param {
            BboxParam::Coordinates(values) => values.clone(),
            BboxParam::Text(text) => text
                .split(',')
                .map(|part| part.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .map_err(|_| CatalogError::InvalidBoundingBox(text.clone()))?,
        };

        let rejected = || CatalogError::InvalidBoundingBox(format!("{coords:?}"));

        let [west, south, east, north] = coords[..] else {
            return Err(rejected());
        };

        if coords.iter().any(|c| !c.is_finite()) || west == east || south == north {
            return Err(rejected());
        }

        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }
}

/// Property comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    StartsWith,
    EndsWith,
    Contains,
    In,
}

impl QueryOperator {
    /// Wire name of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            QueryOperator::Eq => "eq",
            QueryOperator::Neq => "neq",
            QueryOperator::Lt => "lt",
            QueryOperator::Lte => "lte",
            QueryOperator::Gt => "gt",
            QueryOperator::Gte => "gte",
            QueryOperator::StartsWith => "startsWith",
            QueryOperator::EndsWith => "endsWith",
            QueryOperator::Contains => "contains",
            QueryOperator::In => "in",
        }
    }

    /// Whether the operator is a text pattern match.
    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            QueryOperator::StartsWith | QueryOperator::EndsWith | QueryOperator::Contains
        )
    }
}

impl FromStr for QueryOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" => QueryOperator::Eq,
            "neq" => QueryOperator::Neq,
            "lt" => QueryOperator::Lt,
            "lte" => QueryOperator::Lte,
            "gt" => QueryOperator::Gt,
            "gte" => QueryOperator::Gte,
            "startsWith" => QueryOperator::StartsWith,
            "endsWith" => QueryOperator::EndsWith,
            "contains" => QueryOperator::Contains,
            "in" => QueryOperator::In,
            other => return Err(other.to_string()),
        })
    }
}

/// Item property a query can target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Queryable {
    /// Joined tile name (`bdc:tile`, legacy `bdc:tiles`).
    TileName,
    /// Indexed cloud cover column (`eo:cloud_cover`).
    CloudCover,
    /// Top-level key of the item's free-form metadata, compared as text.
    Metadata(String),
}

impl Queryable {
    /// Resolve a property name against the indexed aliases.
    pub fn resolve(property: &str) -> Self {
        match property {
            "bdc:tile" | "bdc:tiles" => Queryable::TileName,
            "eo:cloud_cover" => Queryable::CloudCover,
            other => Queryable::Metadata(other.to_string()),
        }
    }
}

/// A single parsed property constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub property: String,
    pub target: Queryable,
    pub operator: QueryOperator,
    pub value: Value,
}

impl PropertyFilter {
    /// Parse a property query mapping into ordered constraints.
    pub fn parse_all(query: &PropertyQuery) -> Result<Vec<Self>, CatalogError> {
        let mut filters = Vec::new();

        for (property, operations) in query {
            for (operator, value) in operations {
                let operator = operator.parse::<QueryOperator>().map_err(|operator| {
                    CatalogError::UnsupportedOperator {
                        property: property.clone(),
                        operator,
                    }
                })?;

                filters.push(PropertyFilter {
                    property: property.clone(),
                    target: Queryable::resolve(property),
                    operator,
                    value: value.clone(),
                });
            }
        }

        Ok(filters)
    }
}

/// Caller-requested page, clamped to the configured maximum page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-indexed page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl PageRequest {
    /// Build a page request, clamping `limit` into `1..=max_limit`.
    pub fn clamped(page: u32, limit: u32, max_limit: u32) -> Self {
        let max_limit = max_limit.max(1);
        if limit > max_limit {
            tracing::debug!(requested = limit, capped = max_limit, "limit exceeds maximum, capping");
        }

        Self {
            page: page.max(1),
            limit: limit.clamp(1, max_limit),
        }
    }

    /// Row offset of the first result on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// A page of item rows.
#[derive(Debug, Clone)]
pub struct ItemPage {
    /// Rows on this page, most recent acquisition first.
    pub items: Vec<ItemRow>,

    /// Total count (before paging).
    pub total: u64,

    /// Current page number (1-indexed).
    pub page: u32,

    /// Items per page.
    pub per_page: u32,

    /// Total number of pages.
    pub total_pages: u32,

    /// Whether there's a next page.
    pub has_next: bool,

    /// Whether there's a previous page.
    pub has_prev: bool,
}

impl ItemPage {
    /// Create a new page with paging calculations.
    pub fn new(items: Vec<ItemRow>, total: u64, request: PageRequest) -> Self {
        let total_pages = total.div_ceil(u64::from(request.limit.max(1)));
        let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);

        Self {
            items,
            total,
            page: request.page,
            per_page: request.limit,
            total_pages,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn bbox_from_text() {
        let bbox = BoundingBox::parse(&BboxParam::Text("-54.0, -13.5,-53.0,-12.5".into())).unwrap();
        assert_eq!(bbox.west, -54.0);
        assert_eq!(bbox.north, -12.5);
    }

    #[test]
    fn bbox_degenerate_rejected() {
        let same_x = BboxParam::Coordinates(vec![10.0, 0.0, 10.0, 5.0]);
        let same_y = BboxParam::Coordinates(vec![0.0, 5.0, 10.0, 5.0]);

        assert!(matches!(
            BoundingBox::parse(&same_x),
            Err(CatalogError::InvalidBoundingBox(_))
        ));
        assert!(matches!(
            BoundingBox::parse(&same_y),
            Err(CatalogError::InvalidBoundingBox(_))
        ));
    }

    #[test]
    fn bbox_wrong_arity_and_garbage_rejected() {
        assert!(BoundingBox::parse(&BboxParam::Coordinates(vec![1.0, 2.0, 3.0])).is_err());
        assert!(BoundingBox::parse(&BboxParam::Text("a,b,c,d".into())).is_err());
        assert!(BoundingBox::parse(&BboxParam::Text("1,2,3,4,5".into())).is_err());
    }

    #[test]
    fn bbox_param_deserializes_both_shapes() {
        let text: BboxParam = serde_json::from_value(json!("1,2,3,4")).unwrap();
        let list: BboxParam = serde_json::from_value(json!([1, 2, 3, 4])).unwrap();
        assert_eq!(text, BboxParam::Text("1,2,3,4".into()));
        assert_eq!(list, BboxParam::Coordinates(vec![1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn operator_names() {
        for op in [
            QueryOperator::Eq,
            QueryOperator::Neq,
            QueryOperator::Lt,
            QueryOperator::Lte,
            QueryOperator::Gt,
            QueryOperator::Gte,
            QueryOperator::StartsWith,
            QueryOperator::EndsWith,
            QueryOperator::Contains,
            QueryOperator::In,
        ] {
            assert_eq!(op.as_str().parse::<QueryOperator>(), Ok(op));
        }
        assert_eq!("like".parse::<QueryOperator>(), Err("like".to_string()));
    }

    #[test]
    fn property_filters_resolve_aliases() {
        let query: PropertyQuery = serde_json::from_value(json!({
            "bdc:tiles": {"eq": "007004"},
            "eo:cloud_cover": {"lte": 50, "gte": 0},
            "sat:orbit_state": {"eq": "descending"}
        }))
        .unwrap();

        let filters = PropertyFilter::parse_all(&query).unwrap();
        assert_eq!(filters.len(), 4);
        assert_eq!(filters[0].target, Queryable::TileName);
        assert_eq!(filters[1].target, Queryable::CloudCover);
        assert_eq!(
            filters[3].target,
            Queryable::Metadata("sat:orbit_state".to_string())
        );
    }

    #[test]
    fn unknown_operator_fails() {
        let query: PropertyQuery =
            serde_json::from_value(json!({"eo:cloud_cover": {"between": [1, 2]}})).unwrap();

        let err = PropertyFilter::parse_all(&query).unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedOperator { ref operator, .. } if operator == "between"));
    }

    #[test]
    fn page_request_clamps_limit() {
        let req = PageRequest::clamped(0, 5000, 1000);
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 1000);

        let req = PageRequest::clamped(3, 0, 1000);
        assert_eq!(req.limit, 1);
        assert_eq!(req.offset(), 2);
    }

    #[test]
    fn item_page_paging() {
        let page = ItemPage::new(vec![], 25, PageRequest::clamped(2, 10, 100));
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_prev);

        let beyond = ItemPage::new(vec![], 25, PageRequest::clamped(9, 10, 100));
        assert!(beyond.items.is_empty());
        assert!(!beyond.has_next);
    }
}
