//! Rings and shapes tagged with an SRID, and their lon/lat clones.
//!
//! [`GeographicRing`]/[`GeographicShape`] and [`GeometricRing`]/[`GeometricShape`]
//! all hold lon/lat coordinates (SRID 4326). They differ only in how edges
//! between vertices are meant: great circles for the former, straight lon/lat
//! segments for the latter. Densification inserts vertices accordingly.

pub mod densify;

use std::ops::Deref;

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon, Rect};
use geozero::wkb::Wkb;
use geozero::{CoordDimensions, ToGeo, ToWkb};
use projection::{CrsTransform, WGS84_SRID};

use crate::affine::Affine;
use crate::error::{GridError, Result};

pub use densify::{densify_ring, DensifyStats, EdgeMode, MAX_DENSIFY_DEPTH, RELATIVE_ACCURACY};

/// A closed linear ring with its SRID (0 = unspecified).
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    srid: i32,
    line: LineString<f64>,
}

impl Ring {
    /// Wrap a line string, closing it if needed.
    pub fn new(mut line: LineString<f64>, srid: i32) -> Self {
        line.close();
        Self { srid, line }
    }

    /// Build from parallel coordinate arrays.
    pub fn from_flat(xs: &[f64], ys: &[f64], srid: i32) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(GridError::encoding(format!(
                "coordinate arrays differ in length: {} vs {}",
                xs.len(),
                ys.len()
            )));
        }
        let coords: Vec<Coord<f64>> = xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| Coord { x, y })
            .collect();
        Ok(Self::new(LineString::new(coords), srid))
    }

    /// Four-corner ring of a `size_x` x `size_y` pixel raster.
    ///
    /// Corners run (minx,miny), (minx,maxy), (maxx,maxy), (maxx,miny) and back,
    /// whatever the signs of the affine scales.
    pub fn from_extent(pixel_to_crs: &Affine, size_x: u32, size_y: u32, srid: i32) -> Self {
        let (x0, y0) = pixel_to_crs.transform(0.0, 0.0);
        let (x1, y1) = pixel_to_crs.transform(size_x as f64, size_y as f64);

        let (minx, maxx) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (miny, maxy) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };

        Self::new(
            LineString::from(vec![
                (minx, miny),
                (minx, maxy),
                (maxx, maxy),
                (maxx, miny),
                (minx, miny),
            ]),
            srid,
        )
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn line(&self) -> &LineString<f64> {
        &self.line
    }

    /// Number of vertices, closing vertex included.
    pub fn len(&self) -> usize {
        self.line.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line.0.is_empty()
    }

    /// Coordinates as parallel x and y arrays.
    pub fn flat_coords(&self) -> (Vec<f64>, Vec<f64>) {
        self.line.coords().map(|c| (c.x, c.y)).unzip()
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.line.bounding_rect()
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(self.line.clone(), vec![])
    }

    /// Reproject the vertices in one batch; edges are not densified.
    pub fn reproject(&self, transform: &CrsTransform) -> Result<Ring> {
        let (mut xs, mut ys) = self.flat_coords();
        transform.apply(&mut xs, &mut ys)?;
        Ring::from_flat(&xs, &ys, transform.target().srid())
    }

    /// Lon/lat clone whose edges follow great circles.
    pub fn to_geographic(&self, to_lonlat: &CrsTransform) -> Result<GeographicRing> {
        let (line, _) = densify_ring(&self.line, to_lonlat, EdgeMode::Geodesic)?;
        Ok(GeographicRing(Ring::new(line, WGS84_SRID)))
    }

    /// Lon/lat clone whose edges are straight in lon/lat.
    pub fn to_geometric(&self, to_lonlat: &CrsTransform) -> Result<GeometricRing> {
        let (line, _) = densify_ring(&self.line, to_lonlat, EdgeMode::Geometric)?;
        Ok(GeometricRing(Ring::new(line, WGS84_SRID)))
    }
}

/// Lon/lat ring whose edges follow great circles.
#[derive(Debug, Clone, PartialEq)]
pub struct GeographicRing(Ring);

/// Lon/lat ring whose edges are straight lines in lon/lat.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricRing(Ring);

impl GeographicRing {
    /// Tag an existing lon/lat ring.
    pub fn from_lonlat(line: LineString<f64>) -> Self {
        Self(Ring::new(line, WGS84_SRID))
    }

    pub fn into_inner(self) -> Ring {
        self.0
    }
}

impl GeometricRing {
    /// Tag an existing lon/lat ring.
    pub fn from_lonlat(line: LineString<f64>) -> Self {
        Self(Ring::new(line, WGS84_SRID))
    }

    pub fn into_inner(self) -> Ring {
        self.0
    }
}

impl Deref for GeographicRing {
    type Target = Ring;

    fn deref(&self) -> &Ring {
        &self.0
    }
}

impl Deref for GeometricRing {
    type Target = Ring;

    fn deref(&self) -> &Ring {
        &self.0
    }
}

/// Precise lon/lat boundary of a raster extent.
///
/// Builds the four-corner ring in the raster CRS and densifies its edges along
/// great circles.
pub fn new_geographic_ring_from_extent(
    pixel_to_crs: &Affine,
    size_x: u32,
    size_y: u32,
    srid: i32,
    to_lonlat: &CrsTransform,
) -> Result<GeographicRing> {
    Ring::from_extent(pixel_to_crs, size_x, size_y, srid).to_geographic(to_lonlat)
}

/// A multipolygon with its SRID.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    srid: i32,
    polygons: MultiPolygon<f64>,
}

impl Shape {
    pub fn new(polygons: MultiPolygon<f64>, srid: i32) -> Self {
        Self { srid, polygons }
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn polygons(&self) -> &MultiPolygon<f64> {
        &self.polygons
    }

    pub fn into_polygons(self) -> MultiPolygon<f64> {
        self.polygons
    }

    /// Total number of vertices across every ring.
    pub fn coord_count(&self) -> usize {
        self.rings().map(|ring| ring.0.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.coord_count() == 0
    }

    /// All coordinates, exterior then interiors per polygon.
    pub fn flat_coords(&self) -> (Vec<f64>, Vec<f64>) {
        self.rings()
            .flat_map(|ring| ring.coords())
            .map(|c| (c.x, c.y))
            .unzip()
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.polygons.bounding_rect()
    }

    /// Reproject every vertex in one batch; edges are not densified.
    pub fn reproject(&self, transform: &CrsTransform) -> Result<Shape> {
        let (mut xs, mut ys) = self.flat_coords();
        transform.apply(&mut xs, &mut ys)?;

        let mut coords = xs.into_iter().zip(ys).map(|(x, y)| Coord { x, y });
        let polygons = self
            .polygons
            .iter()
            .map(|polygon| {
                let mut take = |ring: &LineString<f64>| -> LineString<f64> {
                    LineString::new(coords.by_ref().take(ring.0.len()).collect())
                };
                let exterior = take(polygon.exterior());
                let interiors = polygon.interiors().iter().map(&mut take).collect();
                Polygon::new(exterior, interiors)
            })
            .collect();

        Ok(Shape::new(polygons, transform.target().srid()))
    }

    /// Lon/lat clone whose edges follow great circles.
    pub fn to_geographic(&self, to_lonlat: &CrsTransform) -> Result<GeographicShape> {
        let (polygons, _) = self.densified(to_lonlat, EdgeMode::Geodesic)?;
        Ok(GeographicShape(Shape::new(polygons, WGS84_SRID)))
    }

    /// Lon/lat clone whose edges are straight in lon/lat.
    pub fn to_geometric(&self, to_lonlat: &CrsTransform) -> Result<GeometricShape> {
        let (polygons, _) = self.densified(to_lonlat, EdgeMode::Geometric)?;
        Ok(GeometricShape(Shape::new(polygons, WGS84_SRID)))
    }

    /// Densify every ring and report the combined stats.
    pub fn densified(
        &self,
        to_lonlat: &CrsTransform,
        mode: EdgeMode,
    ) -> Result<(MultiPolygon<f64>, DensifyStats)> {
        let mut stats = DensifyStats::default();
        let mut polygons = Vec::with_capacity(self.polygons.0.len());

        for polygon in &self.polygons {
            let (exterior, s) = densify_ring(polygon.exterior(), to_lonlat, mode)?;
            stats += s;

            let mut interiors = Vec::with_capacity(polygon.interiors().len());
            for interior in polygon.interiors() {
                let (ring, s) = densify_ring(interior, to_lonlat, mode)?;
                stats += s;
                interiors.push(ring);
            }
            polygons.push(Polygon::new(exterior, interiors));
        }

        Ok((MultiPolygon::new(polygons), stats))
    }

    /// OGC WKB encoding (2D). The SRID is not embedded.
    pub fn to_wkb(&self) -> Result<Vec<u8>> {
        Ok(geo::Geometry::MultiPolygon(self.polygons.clone()).to_wkb(CoordDimensions::xy())?)
    }

    /// Decode OGC WKB holding a polygon or multipolygon.
    pub fn from_wkb(bytes: &[u8], srid: i32) -> Result<Shape> {
        let geometry = Wkb(bytes).to_geo()?;
        Ok(Shape::new(into_multipolygon(geometry)?, srid))
    }

    /// GeoJSON geometry object.
    pub fn to_geojson(&self) -> String {
        geojson::Geometry::new(geojson::Value::from(&self.polygons)).to_string()
    }

    /// Decode a GeoJSON geometry, feature or feature collection with a single
    /// polygon or multipolygon.
    pub fn from_geojson(text: &str, srid: i32) -> Result<Shape> {
        let json: geojson::GeoJson = text.parse()?;
        let geometry = geo::Geometry::<f64>::try_from(json)?;
        Ok(Shape::new(into_multipolygon(geometry)?, srid))
    }

    fn rings(&self) -> impl Iterator<Item = &LineString<f64>> {
        self.polygons
            .iter()
            .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors().iter()))
    }
}

fn into_multipolygon(geometry: geo::Geometry<f64>) -> Result<MultiPolygon<f64>> {
    match geometry {
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        geo::Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        geo::Geometry::Rect(r) => Ok(MultiPolygon::new(vec![r.to_polygon()])),
        geo::Geometry::GeometryCollection(gc) if gc.0.len() == 1 => {
            gc.0.into_iter()
                .next()
                .map(into_multipolygon)
                .unwrap_or_else(|| Err(GridError::encoding("empty geometry collection")))
        }
        other => Err(GridError::encoding(format!(
            "expected a polygon or multipolygon, got {}",
            geometry_name(&other)
        ))),
    }
}

fn geometry_name(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}

/// Lon/lat shape whose edges follow great circles.
#[derive(Debug, Clone, PartialEq)]
pub struct GeographicShape(Shape);

/// Lon/lat shape whose edges are straight lines in lon/lat.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricShape(Shape);

impl GeographicShape {
    pub fn into_inner(self) -> Shape {
        self.0
    }
}

impl GeometricShape {
    pub fn into_inner(self) -> Shape {
        self.0
    }
}

impl Deref for GeographicShape {
    type Target = Shape;

    fn deref(&self) -> &Shape {
        &self.0
    }
}

impl Deref for GeometricShape {
    type Target = Shape;

    fn deref(&self) -> &Shape {
        &self.0
    }
}
