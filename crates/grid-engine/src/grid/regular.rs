//! Regular grid: an infinite lattice of equally sized cells.
//!
//! Cell `"i/j"` spans pixels `[i·cell_size_x, (i+1)·cell_size_x)` by
//! `[j·cell_size_y, (j+1)·cell_size_y)` from the grid origin, with rows growing
//! southwards.

use std::sync::Arc;

use geo::MultiPolygon;
use projection::{Crs, CrsTransform, WGS84_SRID};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::affine::Affine;
use crate::cell::Cell;
use crate::config::RegularGridConfig;
use crate::error::{GridError, Result};
use crate::geometry::Shape;
use crate::rasterize::Rasterizer;
use crate::stream::CoverStream;

/// Covering raster: one pixel per cell over a padded index box.
#[derive(Debug, Clone, PartialEq)]
pub struct CoveringWindow {
    /// The AOI in the grid CRS.
    pub shape: Shape,
    /// Cell column of raster column 0.
    pub i_min: i64,
    /// Cell row of raster row 0.
    pub j_min: i64,
    pub width: usize,
    pub height: usize,
    /// Raster pixel to grid CRS.
    pub geotransform: Affine,
}

impl CoveringWindow {
    /// Mask bytes plus working overhead.
    pub fn required_bytes(&self) -> u128 {
        self.width as u128 * self.height as u128 * 2
    }
}

/// A regular tiling grid.
#[derive(Debug, Clone)]
pub struct RegularGrid {
    config: RegularGridConfig,
    crs: Arc<Crs>,
    to_lonlat: CrsTransform,
    from_lonlat: CrsTransform,
    pixel_to_crs: Affine,
    cell_to_crs: Affine,
    crs_to_cell: Affine,
    rasterizer: Arc<dyn Rasterizer>,
}

impl RegularGrid {
    /// Build a grid over `crs`; `wgs84` is the lon/lat CRS of AOIs and
    /// geographic rings.
    pub fn new(
        config: RegularGridConfig,
        crs: Arc<Crs>,
        wgs84: Arc<Crs>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Result<Self> {
        config.validate().map_err(GridError::InvalidConfig)?;

        let pixel_to_crs = Affine::translation(config.origin_x, config.origin_y)
            .multiply(&Affine::scale(config.resolution, -config.resolution));
        let cell_to_crs = pixel_to_crs.multiply(&Affine::scale(
            config.cell_size_x as f64,
            config.cell_size_y as f64,
        ));
        let crs_to_cell = cell_to_crs.inverse()?;

        debug!(
            crs = %crs,
            resolution = config.resolution,
            cell_size_x = config.cell_size_x,
            cell_size_y = config.cell_size_y,
            "Created regular grid"
        );

        Ok(Self {
            to_lonlat: CrsTransform::new(crs.clone(), wgs84.clone()),
            from_lonlat: CrsTransform::new(wgs84, crs.clone()),
            config,
            crs,
            pixel_to_crs,
            cell_to_crs,
            crs_to_cell,
            rasterizer,
        })
    }

    pub fn config(&self) -> &RegularGridConfig {
        &self.config
    }

    pub fn crs(&self) -> &Arc<Crs> {
        &self.crs
    }

    pub fn pixel_to_crs(&self) -> &Affine {
        &self.pixel_to_crs
    }

    /// Cell index to CRS (one unit = one cell).
    pub fn cell_to_crs(&self) -> &Affine {
        &self.cell_to_crs
    }

    /// The cell named `"i/j"`.
    pub fn cell(&self, uri: &str) -> Result<Cell> {
        let (i, j) = parse_cell_index(uri)?;
        let size_x = self.config.cell_size_x as u32;
        let size_y = self.config.cell_size_y as u32;

        let pixel_to_crs = self.pixel_to_crs.multiply(&Affine::translation(
            i as f64 * size_x as f64,
            j as f64 * size_y as f64,
        ));

        Cell::new(
            format!("{}/{}", i, j),
            self.crs.clone(),
            pixel_to_crs,
            size_x,
            size_y,
            &self.to_lonlat,
        )
    }

    /// Raster window used to cover `aoi`.
    ///
    /// Fails with `MemoryLimitExceeded` without rasterizing anything when the
    /// window is over budget.
    pub fn covering_window(&self, aoi: &MultiPolygon<f64>) -> Result<CoveringWindow> {
        let aoi = Shape::new(aoi.clone(), WGS84_SRID);
        if aoi.is_empty() {
            return Err(GridError::EmptyAoi);
        }

        let shape = aoi.reproject(&self.from_lonlat)?;
        let rect = shape.bounding_rect().ok_or(GridError::EmptyBounds)?;
        let (min, max) = (rect.min(), rect.max());
        if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
            return Err(GridError::EmptyBounds);
        }

        let mut fi = (f64::INFINITY, f64::NEG_INFINITY);
        let mut fj = (f64::INFINITY, f64::NEG_INFINITY);
        for (x, y) in [(min.x, min.y), (min.x, max.y), (max.x, max.y), (max.x, min.y)] {
            let (i, j) = self.crs_to_cell.transform(x, y);
            fi = (fi.0.min(i), fi.1.max(i));
            fj = (fj.0.min(j), fj.1.max(j));
        }

        // One cell of padding on each side absorbs rounding at cell borders.
        let i_min = fi.0.floor() as i64 - 1;
        let i_max = fi.1.ceil() as i64 + 1;
        let j_min = fj.0.floor() as i64 - 1;
        let j_max = fj.1.ceil() as i64 + 1;

        let width = i_max.saturating_sub(i_min).max(0) as u64;
        let height = j_max.saturating_sub(j_min).max(0) as u64;
        let required = width as u128 * height as u128 * 2;

        if required > self.config.memory_limit as u128 {
            warn!(
                width,
                height,
                required,
                limit = self.config.memory_limit,
                "Covering exceeds memory limit"
            );
            return Err(GridError::MemoryLimitExceeded {
                required,
                limit: self.config.memory_limit,
            });
        }

        let width = usize::try_from(width)
            .map_err(|_| GridError::rasterize(format!("covering width {} overflows", width)))?;
        let height = usize::try_from(height)
            .map_err(|_| GridError::rasterize(format!("covering height {} overflows", height)))?;

        let geotransform = self
            .cell_to_crs
            .multiply(&Affine::translation(i_min as f64, j_min as f64));

        debug!(i_min, j_min, width, height, "Covering window");

        Ok(CoveringWindow {
            shape,
            i_min,
            j_min,
            width,
            height,
            geotransform,
        })
    }

    /// Stream the URIs of the cells meeting `aoi`, row by row from the north.
    pub fn covers(&self, token: CancellationToken, aoi: &MultiPolygon<f64>) -> CoverStream {
        let window = match self.covering_window(aoi) {
            Ok(window) => window,
            Err(e) => return CoverStream::failed(e),
        };
        let rasterizer = self.rasterizer.clone();

        CoverStream::spawn("regular", token, move |tx| {
            tx.check_cancelled()?;

            let mask = rasterizer.rasterize(
                &window.shape,
                window.width,
                window.height,
                &window.geotransform,
            )?;
            if mask.len() != window.width * window.height {
                return Err(GridError::rasterize(format!(
                    "mask holds {} bytes, expected {}x{}",
                    mask.len(),
                    window.width,
                    window.height
                )));
            }

            let mut emitted = 0usize;
            for (row, values) in mask.chunks_exact(window.width.max(1)).enumerate() {
                tx.check_cancelled()?;
                let j = window.j_min + row as i64;
                for (col, value) in values.iter().enumerate() {
                    if *value == 0 {
                        continue;
                    }
                    let i = window.i_min + col as i64;
                    if !tx.send(format!("{}/{}", i, j)) {
                        debug!(emitted, "Covering consumer went away");
                        return Ok(());
                    }
                    emitted += 1;
                }
            }

            debug!(emitted, "Covering complete");
            Ok(())
        })
    }
}

/// Parse `"i/j"` into signed cell indices.
fn parse_cell_index(uri: &str) -> Result<(i64, i64)> {
    let mut parts = uri.split('/');
    let (Some(i), Some(j), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(GridError::invalid_uri(uri, "expected \"i/j\""));
    };

    let parse = |s: &str| {
        s.parse::<i64>()
            .map_err(|_| GridError::invalid_uri(uri, format!("{:?} is not an integer", s)))
    };
    Ok((parse(i)?, parse(j)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterize::AllTouchedRasterizer;
    use test_utils::{assert_approx_eq, rect_aoi};

    fn grid(crs: u32, resolution: f64, cell_size: i64, ox: f64, oy: f64) -> RegularGrid {
        let config = RegularGridConfig {
            crs: crs.to_string(),
            cell_size_x: cell_size,
            cell_size_y: cell_size,
            resolution,
            origin_x: ox,
            origin_y: oy,
            memory_limit: i64::MAX,
        };
        RegularGrid::new(
            config,
            Arc::new(Crs::from_epsg(crs).unwrap()),
            Arc::new(Crs::wgs84().unwrap()),
            Arc::new(AllTouchedRasterizer::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_cell_index() {
        assert_eq!(parse_cell_index("3/-7").unwrap(), (3, -7));
        for bad in ["", "3", "3/", "/3", "3/4/5", "a/b", "1.5/2"] {
            assert!(
                matches!(parse_cell_index(bad), Err(GridError::InvalidCellUri { .. })),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_cell_geometry() {
        let g = grid(4326, 0.25, 4, 0.0, 10.0);
        let cell = g.cell("2/4").unwrap();
        assert_eq!(cell.uri, "2/4");
        assert_eq!((cell.size_x, cell.size_y), (4, 4));

        let rect = cell.ring.bounding_rect().unwrap();
        assert_eq!((rect.min().x, rect.min().y), (2.0, 5.0));
        assert_eq!((rect.max().x, rect.max().y), (3.0, 6.0));
    }

    #[test]
    fn test_cell_uri_round_trip() {
        let g = grid(3857, 0.5971642834779395, 256, -20037508.342789244, 20037508.342789244);
        for (i, j) in [(0, 0), (-1, 5), (1234, -4321), (65535, 65535)] {
            let uri = format!("{}/{}", i, j);
            assert_eq!(g.cell(&uri).unwrap().uri, uri);
        }
        assert_eq!(g.cell("+7/-0").unwrap().uri, "7/0");
    }

    #[test]
    fn test_neighbours_share_borders_exactly() {
        let g = grid(3857, 0.5971642834779395, 256, -20037508.342789244, 20037508.342789244);
        let left = g.cell("130000/90000").unwrap().ring.bounding_rect().unwrap();
        let right = g.cell("130001/90000").unwrap().ring.bounding_rect().unwrap();
        let below = g.cell("130000/90001").unwrap().ring.bounding_rect().unwrap();
        assert_approx_eq!(left.max().x, right.min().x, 1e-6);
        assert_approx_eq!(left.min().y, below.max().y, 1e-6);
    }

    #[test]
    fn test_covering_window_pads_index_box() {
        let g = grid(4326, 0.25, 4, 0.0, 10.0);
        let window = g.covering_window(&rect_aoi(2.0, 3.0, 5.0, 6.0)).unwrap();
        assert_eq!((window.i_min, window.j_min), (1, 3));
        assert_eq!((window.width, window.height), (5, 5));
        assert_eq!(window.required_bytes(), 50);
        assert_eq!(window.geotransform.origin(), (1.0, 7.0));
        assert_approx_eq!(window.geotransform.rx(), 1.0, 0.0);
        assert_approx_eq!(window.geotransform.ry(), -1.0, 0.0);
    }

    #[test]
    fn test_covering_window_rejects_empty() {
        let g = grid(4326, 0.25, 4, 0.0, 10.0);
        assert!(matches!(
            g.covering_window(&MultiPolygon::new(vec![])),
            Err(GridError::EmptyAoi)
        ));
    }
}
