//! AOI generators for covering tests.
//!
//! These generators create AOIs whose expected coverings are known in
//! closed form, so tests can compare against exact URI sets.

use geo::MultiPolygon;

use crate::fixtures::rect_aoi;

/// Geometry of a north-up regular lattice in lon/lat degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    /// West edge of cell column 0
    pub origin_x: f64,
    /// North edge of cell row 0
    pub origin_y: f64,
    /// Cell width in degrees
    pub cell_width: f64,
    /// Cell height in degrees
    pub cell_height: f64,
}

impl Lattice {
    /// Lattice of `cell_size` pixels at `resolution` degrees per pixel.
    pub fn new(origin_x: f64, origin_y: f64, resolution: f64, cell_size: u32) -> Self {
        let side = resolution * cell_size as f64;
        Self {
            origin_x,
            origin_y,
            cell_width: side,
            cell_height: side,
        }
    }

    /// AOI covering exactly the cells `[i0, i0 + width) x [j0, j0 + height)`.
    ///
    /// Rows grow southwards from the origin.
    pub fn block_aoi(&self, i0: i64, j0: i64, width: u32, height: u32) -> MultiPolygon<f64> {
        let min_lon = self.origin_x + i0 as f64 * self.cell_width;
        let max_lon = self.origin_x + (i0 + width as i64) as f64 * self.cell_width;
        let max_lat = self.origin_y - j0 as f64 * self.cell_height;
        let min_lat = self.origin_y - (j0 + height as i64) as f64 * self.cell_height;
        rect_aoi(min_lon, min_lat, max_lon, max_lat)
    }

    /// URIs `"i/j"` of the block, row-major from the north-west cell.
    pub fn block_uris(&self, i0: i64, j0: i64, width: u32, height: u32) -> Vec<String> {
        let mut uris = Vec::with_capacity((width * height) as usize);
        for j in j0..j0 + height as i64 {
            for i in i0..i0 + width as i64 {
                uris.push(format!("{}/{}", i, j));
            }
        }
        uris
    }
}

/// Evenly spaced vertices on a circle, closed. Useful for densification inputs.
pub fn circle_coords(cx: f64, cy: f64, radius: f64, n: usize) -> Vec<(f64, f64)> {
    let mut coords: Vec<(f64, f64)> = (0..n)
        .map(|k| {
            let t = k as f64 / n as f64 * std::f64::consts::TAU;
            (cx + radius * t.cos(), cy + radius * t.sin())
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    coords
}
