//! GeoJSON export of cells for visual inspection.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};

use crate::cell::Cell;
use crate::error::Result;
use crate::grid::Grid;

/// Feature for one cell: its lon/lat corner ring plus identifying properties.
pub fn cell_feature(cell: &Cell) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("uri".to_string(), JsonValue::from(cell.uri.clone()));
    properties.insert("srid".to_string(), JsonValue::from(cell.srid()));
    properties.insert("size_x".to_string(), JsonValue::from(cell.size_x));
    properties.insert("size_y".to_string(), JsonValue::from(cell.size_y));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(&cell.geographic_ring.to_polygon()))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// FeatureCollection of the cells named by `uris`, in order.
pub fn cells_to_geojson<S: AsRef<str>>(grid: &Grid, uris: &[S]) -> Result<String> {
    let features = uris
        .iter()
        .map(|uri| grid.cell(uri.as_ref()).map(|cell| cell_feature(&cell)))
        .collect::<Result<Vec<_>>>()?;

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    Ok(serde_json::to_string(&collection)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridError;
    use crate::factory::new_grid;
    use std::collections::HashMap;

    fn grid() -> Grid {
        new_grid(
            &["+grid=regular +crs=4326 +resolution=1 +cell_size=1 +oy=90 +ox=-180"],
            &HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_cells_to_geojson() {
        let json = cells_to_geojson(&grid(), &["0/0", "1/0"]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["type"], "FeatureCollection");
        let features = parsed["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[1]["properties"]["uri"], "1/0");
        assert_eq!(features[1]["properties"]["srid"], 4326);
        assert_eq!(features[0]["properties"]["size_x"], 1);
        assert_eq!(features[0]["geometry"]["type"], "Polygon");
        assert_eq!(features[0]["geometry"]["coordinates"][0][0][0], -180.0);
        assert_eq!(features[0]["geometry"]["coordinates"][0][0][1], 89.0);
    }

    #[test]
    fn test_bad_uri_fails_whole_export() {
        assert!(matches!(
            cells_to_geojson(&grid(), &["0/0", "nope"]),
            Err(GridError::InvalidCellUri { .. })
        ));
    }
}
