//! GeoJSON helpers.

use serde_json::Value;

/// `[min_x, min_y, max_x, max_y]` of a GeoJSON geometry.
///
/// Walks nested coordinate arrays of any geometry type, including geometry
/// collections. `None` for empty or malformed geometries.
pub fn bounds(geometry: &Value) -> Option<[f64; 4]> {
    let mut acc: Option<[f64; 4]> = None;
    visit(geometry, &mut acc);
    acc
}

fn visit(geometry: &Value, acc: &mut Option<[f64; 4]>) {
    if let Some(members) = geometry.get("geometries").and_then(Value::as_array) {
        for member in members {
            visit(member, acc);
        }
        return;
    }

    if let Some(coordinates) = geometry.get("coordinates") {
        extend(coordinates, acc);
    }
}

fn extend(coordinates: &Value, acc: &mut Option<[f64; 4]>) {
    let Some(values) = coordinates.as_array() else {
        return;
    };

    if let [Value::Number(x), Value::Number(y), ..] = values.as_slice() {
        if let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) {
            let b = acc.get_or_insert([x, y, x, y]);
            b[0] = b[0].min(x);
            b[1] = b[1].min(y);
            b[2] = b[2].max(x);
            b[3] = b[3].max(y);
        }
        return;
    }

    for nested in values {
        extend(nested, acc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn polygon_bounds() {
        let polygon = json!({
            "type": "Polygon",
            "coordinates": [[[-54.0, -13.0], [-53.0, -13.0], [-53.0, -12.0], [-54.0, -12.0], [-54.0, -13.0]]]
        });
        assert_eq!(bounds(&polygon), Some([-54.0, -13.0, -53.0, -12.0]));
    }

    #[test]
    fn point_and_collection() {
        let point = json!({"type": "Point", "coordinates": [1.5, 2.5]});
        assert_eq!(bounds(&point), Some([1.5, 2.5, 1.5, 2.5]));

        let collection = json!({
            "type": "GeometryCollection",
            "geometries": [point, {"type": "Point", "coordinates": [-1.0, 4.0]}]
        });
        assert_eq!(bounds(&collection), Some([-1.0, 2.5, 1.5, 4.0]));
    }

    #[test]
    fn empty_geometry_has_no_bounds() {
        assert_eq!(bounds(&json!({"type": "Polygon", "coordinates": []})), None);
        assert_eq!(bounds(&Value::Null), None);
    }
}
