//! One addressable tile of a grid.

use std::sync::Arc;

use projection::{Crs, CrsTransform};

use crate::affine::Affine;
use crate::error::Result;
use crate::geometry::{new_geographic_ring_from_extent, GeographicRing, Ring};

/// A grid tile: URI, CRS, pixel transform, pixel size and boundaries.
///
/// Cells are computed on demand and never mutated.
#[derive(Debug, Clone)]
pub struct Cell {
    pub uri: String,
    pub crs: Arc<Crs>,
    pub pixel_to_crs: Affine,
    pub size_x: u32,
    pub size_y: u32,
    /// Boundary in the grid CRS.
    pub ring: Ring,
    /// Four reprojected corners in lon/lat.
    pub geographic_ring: GeographicRing,
}

impl Cell {
    pub fn new(
        uri: impl Into<String>,
        crs: Arc<Crs>,
        pixel_to_crs: Affine,
        size_x: u32,
        size_y: u32,
        to_lonlat: &CrsTransform,
    ) -> Result<Self> {
        let ring = Ring::from_extent(&pixel_to_crs, size_x, size_y, crs.srid());
        let geographic_ring = GeographicRing::from_lonlat(ring.reproject(to_lonlat)?.line().clone());

        Ok(Self {
            uri: uri.into(),
            crs,
            pixel_to_crs,
            size_x,
            size_y,
            ring,
            geographic_ring,
        })
    }

    pub fn srid(&self) -> i32 {
        self.crs.srid()
    }

    /// Boundary densified along great circles, for callers that need more
    /// than the four corners.
    pub fn densified_geographic_ring(&self, to_lonlat: &CrsTransform) -> Result<GeographicRing> {
        new_geographic_ring_from_extent(
            &self.pixel_to_crs,
            self.size_x,
            self.size_y,
            self.srid(),
            to_lonlat,
        )
    }
}
