//! Search filter compilation.
//!
//! Turns [`SearchParams`] into an ordered conjunction of SeaQuery conditions
//! in two phases:
//!
//! 1. [`SearchPlan::parse`] validates every parameter (parameter combinations,
//!    bounding box, datetime, property operators and operands) without touching
//!    the store.
//! 2. [`FilterCompiler::compile`] combines the plan with the resolved internal
//!    collection ids and the caller's [`AccessPolicy`].
//!
//! An explicit `ids` list overrides every other filter; availability and role
//! visibility always apply.

use sea_query::{Cond, Expr, ExprTrait, SimpleExpr, Value as SqlValue};
use serde_json::Value;

use super::access::AccessPolicy;
use super::error::CatalogError;
use super::query::{Collections, Items, Tiles};
use super::temporal::TemporalFilter;
use super::types::{BoundingBox, PropertyFilter, QueryOperator, Queryable, SearchParams};

/// Item geometry used for spatial intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryField {
    Footprint,
    Bbox,
}

impl GeometryField {
    /// Pick the geometry column from the footprint flag.
    pub fn from_footprint_flag(use_footprint: bool) -> Self {
        if use_footprint {
            GeometryField::Footprint
        } else {
            GeometryField::Bbox
        }
    }

    fn column_sql(self) -> &'static str {
        match self {
            GeometryField::Footprint => r#""items"."footprint""#,
            GeometryField::Bbox => r#""items"."bbox""#,
        }
    }
}

/// Spatial constraint, intersection geometry taking precedence over bbox.
#[derive(Debug, Clone, PartialEq)]
pub enum SpatialFilter {
    /// GeoJSON geometry.
    Intersects(Value),
    /// Validated envelope.
    Envelope(BoundingBox),
}

/// Validated search, ready to compile once collections are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPlan {
    /// Explicit item names; every other filter is ignored.
    Ids(Vec<String>),
    /// Regular filtered search.
    Filtered(FilteredSearch),
}

/// Filters of a regular search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredSearch {
    /// Collection identifiers to resolve, if the search is scoped.
    pub collections: Option<Vec<String>>,
    /// Item name pattern.
    pub name_pattern: Option<String>,
    /// Validated property constraints, in query order.
    pub properties: Vec<PropertyCondition>,
    pub spatial: Option<SpatialFilter>,
    pub temporal: Option<TemporalFilter>,
}

impl SearchPlan {
    /// Validate search parameters.
    pub fn parse(params: &SearchParams) -> Result<Self, CatalogError> {
        if params.collection_id.is_some() && params.collections.is_some() {
            return Err(CatalogError::InvalidParameterCombination(
                "use collection_id or collections".to_string(),
            ));
        }

        if let Some(ids) = &params.ids {
            return Ok(SearchPlan::Ids(ids.clone()));
        }

        let collections = params
            .collection_id
            .as_ref()
            .map(|id| vec![id.clone()])
            .or_else(|| params.collections.clone())
            .filter(|collections| !collections.is_empty());

        let properties = match &params.query {
            Some(query) => PropertyFilter::parse_all(query)?
                .iter()
                .map(PropertyCondition::parse)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let spatial = match (&params.intersects, &params.bbox) {
            (Some(geometry), _) => Some(SpatialFilter::Intersects(geometry.clone())),
            (None, Some(bbox)) => Some(SpatialFilter::Envelope(BoundingBox::parse(bbox)?)),
            (None, None) => None,
        };

        let temporal = params
            .datetime
            .as_deref()
            .map(str::parse::<TemporalFilter>)
            .transpose()?;

        Ok(SearchPlan::Filtered(FilteredSearch {
            collections,
            name_pattern: params.item_id.clone(),
            properties,
            spatial,
            temporal,
        }))
    }

    /// Collection identifiers that must be resolved to internal ids.
    pub fn collection_identifiers(&self) -> Option<&[String]> {
        match self {
            SearchPlan::Filtered(FilteredSearch {
                collections: Some(ids),
                ..
            }) => Some(ids),
            _ => None,
        }
    }
}

/// Compiles search plans into SQL conditions.
#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler {
    geometry: GeometryField,
}

impl FilterCompiler {
    pub fn new(geometry: GeometryField) -> Self {
        Self { geometry }
    }

    /// Build the full item predicate.
    ///
    /// `collection_ids` holds the internal ids resolved from
    /// [`SearchPlan::collection_identifiers`]; identifiers that did not resolve
    /// are simply absent, so an empty list matches nothing.
    pub fn compile(
        &self,
        plan: &SearchPlan,
        collection_ids: Option<&[i64]>,
        policy: &AccessPolicy,
    ) -> Cond {
        let mut cond = Cond::all()
            .add(Expr::col((Collections::Table, Collections::IsAvailable)).eq(true))
            .add(Expr::col((Items::Table, Items::IsAvailable)).eq(true));

        if let Some(visibility) = policy.condition() {
            cond = cond.add(visibility);
        }

        let search = match plan {
            SearchPlan::Ids(ids) => {
                return cond.add(Expr::col((Items::Table, Items::Name)).is_in(ids.iter().cloned()));
            }
            SearchPlan::Filtered(search) => search,
        };

        if search.collections.is_some() {
            let ids = collection_ids.unwrap_or_default();
            cond = cond.add(Expr::col((Items::Table, Items::CollectionId)).is_in(ids.iter().copied()));
        }

        if let Some(pattern) = &search.name_pattern {
            cond = cond.add(Expr::col((Items::Table, Items::Name)).like(pattern.as_str()));
        }

        for property in &search.properties {
            cond = cond.add(property.expr());
        }

        if let Some(spatial) = &search.spatial {
            cond = cond.add(self.spatial_condition(spatial));
        }

        if let Some(temporal) = &search.temporal {
            cond = cond.add(temporal.condition(
                (Items::Table, Items::StartDate),
                (Items::Table, Items::EndDate),
            ));
        }

        cond
    }

    fn spatial_condition(&self, spatial: &SpatialFilter) -> SimpleExpr {
        let geom = self.geometry.column_sql();
        match spatial {
            SpatialFilter::Intersects(geometry) => Expr::cust_with_values(
                format!("ST_Intersects(ST_GeomFromGeoJSON($1), {geom})"),
                [geometry.to_string()],
            ),
            SpatialFilter::Envelope(bbox) => Expr::cust_with_values(
                format!("ST_Intersects(ST_MakeEnvelope($1, $2, $3, $4, 4326), {geom})"),
                [bbox.west, bbox.south, bbox.east, bbox.north],
            ),
        }
    }
}

/// Comparison operator of a scalar constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Compare(Comparison, SqlValue),
    Like(String),
    In(Vec<SqlValue>),
}

/// One validated property constraint with typed operands.
///
/// Indexed aliases compare against typed columns; anything else compares the
/// text representation of a top-level metadata key.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyCondition {
    target: Queryable,
    predicate: Predicate,
}

impl PropertyCondition {
    /// Check the operator against the target and convert the operands.
    pub fn parse(filter: &PropertyFilter) -> Result<Self, CatalogError> {
        let numeric = filter.target == Queryable::CloudCover;

        if numeric && filter.operator.is_pattern() {
            return Err(CatalogError::UnsupportedOperator {
                property: filter.property.clone(),
                operator: filter.operator.as_str().to_string(),
            });
        }

        let operand = |value: &Value| -> Result<SqlValue, CatalogError> {
            if numeric {
                numeric_operand(filter, value).map(SqlValue::from)
            } else {
                text_operand(filter, value).map(SqlValue::from)
            }
        };
        let pattern = || text_operand(filter, &filter.value).map(|v| escape_like_wildcards(&v));
        let compare = |op| operand(&filter.value).map(|value| Predicate::Compare(op, value));

        let predicate = match filter.operator {
            QueryOperator::Eq => compare(Comparison::Eq)?,
            QueryOperator::Neq => compare(Comparison::Neq)?,
            QueryOperator::Lt => compare(Comparison::Lt)?,
            QueryOperator::Lte => compare(Comparison::Lte)?,
            QueryOperator::Gt => compare(Comparison::Gt)?,
            QueryOperator::Gte => compare(Comparison::Gte)?,
            QueryOperator::StartsWith => Predicate::Like(format!("{}%", pattern()?)),
            QueryOperator::EndsWith => Predicate::Like(format!("%{}", pattern()?)),
            QueryOperator::Contains => Predicate::Like(format!("%{}%", pattern()?)),
            QueryOperator::In => {
                let Value::Array(values) = &filter.value else {
                    return Err(invalid_value(filter, "'in' expects a list"));
                };
                Predicate::In(values.iter().map(operand).collect::<Result<Vec<_>, _>>()?)
            }
        };

        Ok(Self {
            target: filter.target.clone(),
            predicate,
        })
    }

    /// SQL expression of the constraint.
    pub fn expr(&self) -> SimpleExpr {
        let column: SimpleExpr = match &self.target {
            Queryable::TileName => Expr::col((Tiles::Table, Tiles::Name)).into(),
            Queryable::CloudCover => Expr::col((Items::Table, Items::CloudCover)).into(),
            Queryable::Metadata(key) => {
                Expr::cust_with_values(r#""items"."metadata" ->> $1"#, [key.clone()])
            }
        };

        match &self.predicate {
            Predicate::Compare(op, value) => {
                let value = value.clone();
                match op {
                    Comparison::Eq => column.eq(value),
                    Comparison::Neq => column.ne(value),
                    Comparison::Lt => column.lt(value),
                    Comparison::Lte => column.lte(value),
                    Comparison::Gt => column.gt(value),
                    Comparison::Gte => column.gte(value),
                }
            }
            Predicate::Like(pattern) => column.like(pattern.as_str()),
            Predicate::In(values) => column.is_in(values.iter().cloned()),
        }
    }
}

fn text_operand(filter: &PropertyFilter, value: &Value) -> Result<String, CatalogError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(invalid_value(filter, "expected a scalar")),
    }
}

fn numeric_operand(filter: &PropertyFilter, value: &Value) -> Result<f64, CatalogError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid_value(filter, "expected a number"))
}

fn invalid_value(filter: &PropertyFilter, reason: &str) -> CatalogError {
    CatalogError::InvalidQueryValue {
        property: filter.property.clone(),
        reason: reason.to_string(),
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
pub fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
