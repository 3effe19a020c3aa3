//! Common test fixtures for grid engine tests.
//!
//! AOIs are lon/lat multipolygons, the input type of every covering.

use geo::{polygon, LineString, MultiPolygon, Polygon};

/// Common bounding box definitions for testing: (min_lon, min_lat, max_lon, max_lat).
pub mod bbox {
    /// Global bounding box (-180 to 180, -90 to 90)
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

    /// South-eastern France, straddling the Alps (UTM zone 31N)
    pub const ALPS: (f64, f64, f64, f64) = (5.8, 44.5, 6.6, 45.1);

    /// Continental United States bounding box
    pub const CONUS: (f64, f64, f64, f64) = (-130.0, 20.0, -60.0, 55.0);

    /// Crosses antimeridian (Pacific-centric), min_lon > max_lon
    pub const PACIFIC: (f64, f64, f64, f64) = (170.0, -20.0, -170.0, -10.0);
}

/// Axis-aligned rectangle AOI, counter-clockwise from the south-west corner.
pub fn rect_aoi(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: min_lon, y: min_lat),
        (x: max_lon, y: min_lat),
        (x: max_lon, y: max_lat),
        (x: min_lon, y: max_lat),
        (x: min_lon, y: min_lat),
    ]])
}

/// AOI from a bbox tuple.
pub fn bbox_aoi(bbox: (f64, f64, f64, f64)) -> MultiPolygon<f64> {
    rect_aoi(bbox.0, bbox.1, bbox.2, bbox.3)
}

/// The south-eastern France AOI.
pub fn alps_aoi() -> MultiPolygon<f64> {
    bbox_aoi(bbox::ALPS)
}

/// The whole world.
pub fn world_aoi() -> MultiPolygon<f64> {
    bbox_aoi(bbox::GLOBAL)
}

/// A square AOI spanning the antimeridian, written with unwrapped longitudes
/// (170 to 190) the way downstream tools usually emit it.
pub fn antimeridian_aoi() -> MultiPolygon<f64> {
    rect_aoi(170.0, -20.0, 190.0, -10.0)
}

/// An AOI with no coordinates.
pub fn empty_aoi() -> MultiPolygon<f64> {
    MultiPolygon::new(vec![])
}

/// A degenerate AOI whose vertices all sit on one point.
pub fn point_aoi(lon: f64, lat: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Polygon::new(
        LineString::from(vec![(lon, lat), (lon, lat), (lon, lat), (lon, lat)]),
        vec![],
    )])
}

/// A triangle AOI with a hole, exercising interior rings.
pub fn holed_aoi() -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Polygon::new(
        LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (5.0, 10.0), (0.0, 0.0)]),
        vec![LineString::from(vec![
            (4.0, 2.0),
            (6.0, 2.0),
            (5.0, 4.0),
            (4.0, 2.0),
        ])],
    )])
}
