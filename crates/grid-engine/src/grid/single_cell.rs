//! Single-cell grid: every AOI is covered by one cell fitted to its bounds.
//!
//! Cell URIs carry their own geometry: `"{ox}/{oy}/{width}/{height}"`, the
//! north-west corner in the grid CRS followed by the size in pixels.

use std::sync::Arc;

use geo::MultiPolygon;
use projection::{Crs, CrsTransform, WGS84_SRID};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::affine::Affine;
use crate::cell::Cell;
use crate::config::SingleCellGridConfig;
use crate::error::{GridError, Result};
use crate::geometry::Shape;
use crate::stream::CoverStream;

#[derive(Debug, Clone)]
pub struct SingleCellGrid {
    config: SingleCellGridConfig,
    crs: Arc<Crs>,
    to_lonlat: CrsTransform,
    from_lonlat: CrsTransform,
}

impl SingleCellGrid {
    pub fn new(config: SingleCellGridConfig, crs: Arc<Crs>, wgs84: Arc<Crs>) -> Result<Self> {
        config.validate().map_err(GridError::InvalidConfig)?;

        debug!(crs = %crs, resolution = config.resolution, "Created single-cell grid");

        Ok(Self {
            to_lonlat: CrsTransform::new(crs.clone(), wgs84.clone()),
            from_lonlat: CrsTransform::new(wgs84, crs.clone()),
            config,
            crs,
        })
    }

    pub fn config(&self) -> &SingleCellGridConfig {
        &self.config
    }

    pub fn crs(&self) -> &Arc<Crs> {
        &self.crs
    }

    /// The cell named `"ox/oy/width/height"`.
    pub fn cell(&self, uri: &str) -> Result<Cell> {
        let (ox, oy, size_x, size_y) = parse_cell_uri(uri)?;
        let resolution = self.config.resolution;
        let pixel_to_crs =
            Affine::translation(ox, oy).multiply(&Affine::scale(resolution, -resolution));

        Cell::new(
            format!("{}/{}/{}/{}", ox, oy, size_x, size_y),
            self.crs.clone(),
            pixel_to_crs,
            size_x,
            size_y,
            &self.to_lonlat,
        )
    }

    /// URI of the one cell fitted to `aoi`.
    pub fn covering_uri(&self, aoi: &MultiPolygon<f64>) -> Result<String> {
        let aoi = Shape::new(aoi.clone(), WGS84_SRID);
        if aoi.is_empty() {
            return Err(GridError::EmptyAoi);
        }

        let rect = aoi
            .reproject(&self.from_lonlat)?
            .bounding_rect()
            .ok_or(GridError::EmptyBounds)?;
        let (min, max) = (rect.min(), rect.max());
        if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
            return Err(GridError::EmptyBounds);
        }

        let width = pixel_count(rect.width(), self.config.resolution)?;
        let height = pixel_count(rect.height(), self.config.resolution)?;

        debug!(width, height, "Single-cell covering");
        Ok(format!("{}/{}/{}/{}", min.x, max.y, width, height))
    }

    /// A stream of exactly one element: the fitted cell, or the error.
    pub fn covers(&self, token: CancellationToken, aoi: &MultiPolygon<f64>) -> CoverStream {
        if token.is_cancelled() {
            return CoverStream::failed(GridError::Cancelled);
        }
        match self.covering_uri(aoi) {
            Ok(uri) => CoverStream::ready(vec![Ok(uri)]),
            Err(e) => CoverStream::failed(e),
        }
    }
}

/// Pixels spanned by `extent`, rounded and at least one.
fn pixel_count(extent: f64, resolution: f64) -> Result<u32> {
    let pixels = (extent / resolution).round().max(1.0);
    if pixels > u32::MAX as f64 {
        return Err(GridError::invalid_config(format!(
            "AOI spans {} pixels at resolution {}",
            pixels, resolution
        )));
    }
    Ok(pixels as u32)
}

fn parse_cell_uri(uri: &str) -> Result<(f64, f64, u32, u32)> {
    let parts: Vec<&str> = uri.split('/').collect();
    let [ox, oy, w, h] = parts.as_slice() else {
        return Err(GridError::invalid_uri(uri, "expected \"ox/oy/width/height\""));
    };

    let coord = |s: &str| match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(GridError::invalid_uri(uri, format!("{:?} is not a finite number", s))),
    };
    let size = |s: &str| match s.parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(GridError::invalid_uri(uri, format!("{:?} is not a positive size", s))),
    };

    Ok((coord(ox)?, coord(oy)?, size(w)?, size(h)?))
}
