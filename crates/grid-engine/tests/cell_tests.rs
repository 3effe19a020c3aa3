//! Integration tests for cell lookup and cell boundaries.

use std::collections::HashMap;

use grid_engine::{densify_ring, new_grid, CancellationToken, EdgeMode, Grid, GridError, Ring};
use projection::{great_circle_midpoint, haversine_distance, linear_midpoint, CrsCache};
use test_utils::{alps_aoi, assert_approx_eq, assert_line_approx_eq};

fn grid(flags: &str) -> Grid {
    new_grid(&[flags], &HashMap::new()).unwrap()
}

// ============================================================================
// URI round-trips
// ============================================================================

#[test]
fn test_regular_uri_round_trip() {
    let g = grid("+grid=regular +crs=EPSG:32631 +resolution=10 +cell_size=256");
    for i in [-3, 0, 1, 17, 280] {
        for j in [-1960, -1955, 0, 4] {
            let uri = format!("{}/{}", i, j);
            let cell = g.cell(&uri).unwrap();
            assert_eq!(cell.uri, uri);
            assert_eq!(cell.srid(), 32631);
            assert_eq!(cell.pixel_to_crs.origin(), (i as f64 * 2560.0, -(j as f64) * 2560.0));
        }
    }
}

#[test]
fn test_regular_rejects_malformed_uris() {
    let g = grid("+grid=regular +crs=3857 +resolution=10 +cell_size=256");
    for bad in ["", "1", "1/2/3", "1/x", "1.0/2", " 1/2"] {
        assert!(
            matches!(g.cell(bad), Err(GridError::InvalidCellUri { .. })),
            "{:?} should be rejected",
            bad
        );
    }
}

#[test]
fn test_rectangular_cells() {
    let g = grid(
        "+grid=regular +crs=4326 +resolution=0.5 +cell_size=4 +cell_size_x=2 +ox=-180 +oy=90",
    );
    let cell = g.cell("1/1").unwrap();
    assert_eq!((cell.size_x, cell.size_y), (2, 4));

    let rect = cell.ring.bounding_rect().unwrap();
    assert_eq!((rect.min().x, rect.max().x), (-179.0, -178.0));
    assert_eq!((rect.min().y, rect.max().y), (86.0, 88.0));
}

// ============================================================================
// UTM 31N single-cell fixture
// ============================================================================

/// Single-cell URI of the south-eastern France AOI in UTM zone 31N at 10 m.
const ALPS_UTM_URI: &str = "720298.4297198915/5000366.394349512/6590/6914";

#[test]
fn test_single_cell_utm_fixture() {
    let g = grid("+grid=singlecell +crs=EPSG:32631 +resolution=10");
    let uri = g
        .covers(CancellationToken::new(), &alps_aoi())
        .collect_uris()
        .unwrap()
        .remove(0);
    assert_eq!(uri, ALPS_UTM_URI);

    let cell = g.cell(&uri).unwrap();
    assert_eq!(cell.uri, uri);
    assert_eq!((cell.size_x, cell.size_y), (6590, 6914));

    // Ten decimal places.
    assert_line_approx_eq!(
        cell.geographic_ring.line(),
        [
            (5.7711423403, 44.5007350208),
            (5.8010969280, 45.1224119343),
            (6.6375181807, 45.0988096270),
            (6.5986608829, 44.4776358349),
            (5.7711423403, 44.5007350208),
        ],
        5e-11
    );
}

#[test]
fn test_densified_boundary_keeps_corners() {
    let g = grid("+grid=singlecell +crs=EPSG:32631 +resolution=10");
    let cache = CrsCache::new();
    let to_lonlat = cache.transform("EPSG:32631", "EPSG:4326").unwrap();

    let cell = g.cell(ALPS_UTM_URI).unwrap();
    let dense = cell.densified_geographic_ring(&to_lonlat).unwrap();

    assert!(dense.len() >= cell.geographic_ring.len());
    for corner in cell.geographic_ring.line().coords() {
        assert!(
            dense
                .line()
                .coords()
                .any(|c| (c.x - corner.x).abs() < 1e-12 && (c.y - corner.y).abs() < 1e-12),
            "corner {:?} missing from densified ring",
            corner
        );
    }
}

// ============================================================================
// Densification accuracy
// ============================================================================

#[test]
fn test_polar_cell_densification_accuracy() {
    // 1000 km cells in polar stereographic north.
    let g = grid(
        "+grid=regular +crs=EPSG:3413 +resolution=1000 +cell_size=1000 +ox=-2000000 +oy=2000000",
    );
    let cell = g.cell("0/0").unwrap();

    let cache = CrsCache::new();
    let to_lonlat = cache.transform("EPSG:3413", "EPSG:4326").unwrap();
    let from_lonlat = to_lonlat.inverse();

    let (dense, stats) = densify_ring(cell.ring.line(), &to_lonlat, EdgeMode::Geodesic).unwrap();
    assert_eq!(stats.unconverged, 0);
    assert!(stats.inserted > 0);
    assert_eq!(dense.0.len(), 5 + stats.inserted);

    // Inserted vertices are true midpoints: back in the grid CRS they sit on
    // the cell's straight edges.
    let ring = Ring::new(dense.clone(), 4326).reproject(&from_lonlat).unwrap();
    let rect = cell.ring.bounding_rect().unwrap();
    for c in ring.line().coords() {
        let on_vertical = (c.x - rect.min().x).abs() < 1e-2 || (c.x - rect.max().x).abs() < 1e-2;
        let on_horizontal = (c.y - rect.min().y).abs() < 1e-2 || (c.y - rect.max().y).abs() < 1e-2;
        assert!(on_vertical || on_horizontal, "{:?} is off the cell boundary", c);
        assert!(c.x >= rect.min().x - 1e-2 && c.x <= rect.max().x + 1e-2);
        assert!(c.y >= rect.min().y - 1e-2 && c.y <= rect.max().y + 1e-2);
    }

    // Every remaining edge is within 1% of the longest original edge.
    let corners: Vec<(f64, f64)> = cell
        .geographic_ring
        .line()
        .coords()
        .map(|c| (c.x, c.y))
        .collect();
    let budget = corners
        .windows(2)
        .map(|w| 0.0101 * haversine_distance(w[0], w[1]))
        .fold(0.0, f64::max);

    let lonlat: Vec<(f64, f64)> = dense.coords().map(|c| (c.x, c.y)).collect();
    let source: Vec<(f64, f64)> = ring.line().coords().map(|c| (c.x, c.y)).collect();
    for k in 0..lonlat.len() - 1 {
        let (mx, my) = linear_midpoint(source[k], source[k + 1]);
        let truth = to_lonlat.apply_point(mx, my).unwrap();
        let candidate = great_circle_midpoint(lonlat[k], lonlat[k + 1]);
        let deviation = haversine_distance(candidate, truth);
        assert!(
            deviation <= budget,
            "edge {} deviates by {} m, budget {} m",
            k,
            deviation,
            budget
        );
    }
}

#[test]
fn test_geometric_densification_of_geographic_grid_is_noop() {
    let g = grid("+grid=regular +crs=4326 +resolution=1 +cell_size=10 +ox=-180 +oy=90");
    let cell = g.cell("3/2").unwrap();
    let cache = CrsCache::new();
    let identity = cache.transform("EPSG:4326", "4326").unwrap();

    let (dense, stats) = densify_ring(cell.ring.line(), &identity, EdgeMode::Geometric).unwrap();
    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.unconverged, 0);
    assert_eq!(&dense, cell.ring.line());
}

// ============================================================================
// Antimeridian
// ============================================================================

/// A 300 km web mercator cell straddling 180 degrees east.
fn antimeridian_cell() -> (grid_engine::Cell, projection::CrsTransform) {
    let g = grid(
        "+grid=regular +crs=EPSG:3857 +resolution=1000 +cell_size=300 +ox=19900000 +oy=1000000",
    );
    let cache = CrsCache::new();
    let to_lonlat = cache.transform("EPSG:3857", "EPSG:4326").unwrap();
    (g.cell("0/0").unwrap(), to_lonlat)
}

const WEST: f64 = 178.76474153978475;
const EAST: f64 = -178.54031260785666;
const SOUTH: f64 = 6.275621247650772;
const NORTH: f64 = 8.946573850543423;

#[test]
fn test_antimeridian_corners_wrap() {
    let (cell, _) = antimeridian_cell();
    assert_line_approx_eq!(
        cell.geographic_ring.line(),
        [(WEST, SOUTH), (WEST, NORTH), (EAST, NORTH), (EAST, SOUTH), (WEST, SOUTH)],
        1e-9
    );
}

#[test]
fn test_antimeridian_geodesic_densification() {
    // Great circles between the wrapped corners already take the short way
    // across 180 degrees: nothing is inserted.
    let (cell, to_lonlat) = antimeridian_cell();
    let (dense, stats) = densify_ring(cell.ring.line(), &to_lonlat, EdgeMode::Geodesic).unwrap();

    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.unconverged, 0);
    assert_line_approx_eq!(
        &dense,
        [(WEST, SOUTH), (WEST, NORTH), (EAST, NORTH), (EAST, SOUTH), (WEST, SOUTH)],
        1e-9
    );
}

#[test]
fn test_antimeridian_geometric_densification() {
    // Straight lon/lat edges between wrapped corners run the long way round,
    // so the east-west edges bisect down to the depth limit on both sides of
    // 180 degrees. Longitudes are kept as reprojected, never unwrapped.
    let (cell, to_lonlat) = antimeridian_cell();
    let (dense, stats) = densify_ring(cell.ring.line(), &to_lonlat, EdgeMode::Geometric).unwrap();

    assert_eq!(stats.inserted, 12);
    assert_eq!(stats.unconverged, 2);

    let crossing = [
        179.4384780028744,
        179.77534623441923,
        179.94378035019162,
        179.98588887913473,
        -179.97200259192218,
        -179.8877855340359,
    ];
    let mut expected = vec![(WEST, SOUTH), (WEST, NORTH)];
    expected.extend(crossing.iter().map(|lon| (*lon, NORTH)));
    expected.extend([(EAST, NORTH), (EAST, SOUTH)]);
    expected.extend(crossing.iter().rev().map(|lon| (*lon, SOUTH)));
    expected.push((WEST, SOUTH));

    assert_line_approx_eq!(&dense, expected, 1e-9);
}

// ============================================================================
// Configuration through the factory
// ============================================================================

#[test]
fn test_placeholders_are_substituted() {
    let mut params = HashMap::new();
    params.insert("epsg".to_string(), "32631".to_string());
    params.insert("res".to_string(), "20".to_string());
    params.insert("cell_size".to_string(), "128".to_string());

    let g = new_grid(&["+grid=regular +crs=EPSG:{epsg} +resolution={res}"], &params).unwrap();
    assert_eq!(g.crs().srid(), 32631);

    let cell = g.cell("1/0").unwrap();
    assert_eq!(cell.size_x, 128);
    assert_approx_eq!(cell.pixel_to_crs.rx(), 20.0, 0.0);
    assert_eq!(cell.pixel_to_crs.origin(), (2560.0, 0.0));
}

#[test]
fn test_unresolved_placeholder() {
    assert!(matches!(
        new_grid(&["+grid=regular +crs=EPSG:{epsg} +resolution=10"], &HashMap::new()),
        Err(GridError::InvalidConfig(_))
    ));
}

#[test]
fn test_invalid_regular_parameters() {
    for flags in [
        "+grid=regular +crs=3857 +resolution=10",
        "+grid=regular +crs=3857 +resolution=0 +cell_size=256",
        "+grid=regular +crs=3857 +resolution=10 +cell_size=0",
        "+grid=regular +crs=3857 +resolution=10 +cell_size=65537",
        "+grid=regular +crs=3857 +resolution=ten +cell_size=256",
        "+grid=regular +resolution=10 +cell_size=256",
        "+grid=regular +crs=3857 +resolution=10 +cell_size=256 +memory_limit=0",
    ] {
        assert!(
            matches!(
                new_grid(&[flags], &HashMap::new()),
                Err(GridError::InvalidConfig(_))
            ),
            "{:?} should be rejected",
            flags
        );
    }
}

#[test]
fn test_unsupported_grid() {
    match new_grid(&["+grid=healpix +crs=4326"], &HashMap::new()) {
        Err(GridError::UnsupportedGrid { name }) => assert_eq!(name, "healpix"),
        other => panic!("unexpected {:?}", other.map(|g| g.name())),
    }
}

// ============================================================================
// GeoJSON inspection
// ============================================================================

#[test]
fn test_cells_to_geojson_round_trips_through_parser() {
    // Quarter-world cells.
    let g = grid(
        "+grid=regular +crs=EPSG:3857 +resolution=10018754.171394622 +cell_size=1 \
         +ox=-20037508.342789244 +oy=20037508.342789244",
    );
    let json = grid_engine::cells_to_geojson(&g, &["1/1", "2/1", "1/2"]).unwrap();

    let parsed: geojson::GeoJson = json.parse().unwrap();
    let geojson::GeoJson::FeatureCollection(collection) = parsed else {
        panic!("expected a FeatureCollection");
    };
    assert_eq!(collection.features.len(), 3);

    let first = &collection.features[0];
    assert_eq!(first.property("uri").and_then(|v| v.as_str()), Some("1/1"));
    assert_eq!(first.property("srid").and_then(|v| v.as_i64()), Some(3857));

    let polygon: geo::Polygon<f64> = first.geometry.clone().unwrap().value.try_into().unwrap();
    let rect = geo::BoundingRect::bounding_rect(&polygon).unwrap();
    assert_approx_eq!(rect.min().x, -90.0, 1e-9);
    assert_approx_eq!(rect.max().x, 0.0, 1e-9);
    assert_approx_eq!(rect.min().y, 0.0, 1e-9);
    assert!(rect.max().y > 66.0 && rect.max().y < 67.0);
}
