//! Polygon rasterization into byte masks.
//!
//! Coverings only need a mask of "touched" pixels. [`Rasterizer`] is the seam
//! for plugging in an external engine; [`AllTouchedRasterizer`] is the
//! built-in implementation.

use std::fmt;

use crate::affine::Affine;
use crate::error::{GridError, Result};
use crate::geometry::Shape;

/// Burns polygons into a `width` x `height` row-major byte mask.
pub trait Rasterizer: Send + Sync + fmt::Debug {
    /// `geotransform` maps pixel coordinates to the CRS of `shape`.
    fn rasterize(
        &self,
        shape: &Shape,
        width: usize,
        height: usize,
        geotransform: &Affine,
    ) -> Result<Vec<u8>>;
}

/// All-touched rasterizer.
///
/// A pixel is burned when the polygon meets its open footprint. Boundaries
/// running exactly along pixel edges burn neither neighbour, so polygons
/// aligned with the pixel lattice burn exactly the pixels they cover.
///
/// Zero-area polygons (points, slivers) have no interior to fall back on and
/// burn every pixel whose closed footprint they touch instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllTouchedRasterizer {
    pub burn_value: u8,
}

impl Default for AllTouchedRasterizer {
    fn default() -> Self {
        Self { burn_value: 255 }
    }
}

impl AllTouchedRasterizer {
    pub fn new(burn_value: u8) -> Self {
        Self { burn_value }
    }
}

impl Rasterizer for AllTouchedRasterizer {
    fn rasterize(
        &self,
        shape: &Shape,
        width: usize,
        height: usize,
        geotransform: &Affine,
    ) -> Result<Vec<u8>> {
        let len = width
            .checked_mul(height)
            .ok_or_else(|| GridError::rasterize(format!("raster {}x{} overflows", width, height)))?;
        let mut mask = Mask {
            data: vec![0; len],
            width,
            height,
            value: self.burn_value,
        };
        if len == 0 {
            return Ok(mask.data);
        }

        let to_pixel = geotransform.inverse()?;

        for polygon in shape.polygons() {
            let rings = std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(|ring| {
                    ring.coords()
                        .map(|c| {
                            let (px, py) = to_pixel.transform(c.x, c.y);
                            if px.is_finite() && py.is_finite() {
                                Ok((px, py))
                            } else {
                                Err(GridError::rasterize(format!(
                                    "non-finite pixel coordinate for ({}, {})",
                                    c.x, c.y
                                )))
                            }
                        })
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?;

            if rings.first().map_or(true, |exterior| ring_area(exterior) == 0.0) {
                for ring in &rings {
                    if let [p] = ring.as_slice() {
                        mask.burn_segment_closed(*p, *p);
                    }
                    for edge in ring.windows(2) {
                        mask.burn_segment_closed(edge[0], edge[1]);
                    }
                }
                continue;
            }

            for ring in &rings {
                for edge in ring.windows(2) {
                    mask.burn_segment(edge[0], edge[1]);
                }
            }
            mask.fill_even_odd(&rings);
        }

        Ok(mask.data)
    }
}

struct Mask {
    data: Vec<u8>,
    width: usize,
    height: usize,
    value: u8,
}

impl Mask {
    /// Burn `[first, last]` pixels of a row, clamped to the raster.
    fn burn_span(&mut self, row: i64, first: f64, last: f64) {
        if row < 0 || row >= self.height as i64 || last < first {
            return;
        }
        let first = first.max(0.0);
        let last = last.min(self.width as f64 - 1.0);
        if last < first {
            return;
        }
        let start = row as usize * self.width;
        self.data[start + first as usize..=start + last as usize].fill(self.value);
    }

    /// Burn every pixel whose open footprint meets the segment `p`-`q`.
    fn burn_segment(&mut self, p: (f64, f64), q: (f64, f64)) {
        let (ylo, yhi) = if p.1 <= q.1 { (p.1, q.1) } else { (q.1, p.1) };

        if ylo == yhi {
            // Horizontal: only burns when strictly inside a row.
            if ylo.fract() == 0.0 {
                return;
            }
            let (xa, xb) = ordered(p.0, q.0);
            self.burn_span(clamp_index(ylo.floor(), self.height), xa.floor(), xb.ceil() - 1.0);
            return;
        }

        let first_row = clamp_index(ylo.floor(), self.height);
        let last_row = clamp_index(yhi.floor(), self.height);
        let slope = (q.0 - p.0) / (q.1 - p.1);
        let x_at = |y: f64| {
            if y == p.1 {
                p.0
            } else if y == q.1 {
                q.0
            } else {
                p.0 + (y - p.1) * slope
            }
        };

        for row in first_row.max(0)..=last_row.min(self.height as i64 - 1) {
            let ya = ylo.max(row as f64);
            let yb = yhi.min(row as f64 + 1.0);
            // Portions touching the row only along its border burn nothing.
            if yb <= ya {
                continue;
            }
            let (xa, xb) = ordered(x_at(ya), x_at(yb));
            self.burn_span(row, xa.floor(), xb.ceil() - 1.0);
        }
    }

    /// Burn every pixel whose closed footprint meets the segment `p`-`q`.
    fn burn_segment_closed(&mut self, p: (f64, f64), q: (f64, f64)) {
        let (ylo, yhi) = ordered(p.1, q.1);
        let first_row = clamp_index(ylo.ceil() - 1.0, self.height);
        let last_row = clamp_index(yhi.floor(), self.height);

        for row in first_row.max(0)..=last_row.min(self.height as i64 - 1) {
            let (xa, xb) = if ylo == yhi {
                ordered(p.0, q.0)
            } else {
                let ya = ylo.max(row as f64);
                let yb = yhi.min(row as f64 + 1.0);
                let x_at = |y: f64| p.0 + (y - p.1) * (q.0 - p.0) / (q.1 - p.1);
                ordered(x_at(ya), x_at(yb))
            };
            self.burn_span(row, xa.ceil() - 1.0, xb.floor());
        }
    }

    /// Burn pixels whose centre lies inside the rings (even-odd rule).
    fn fill_even_odd(&mut self, rings: &[Vec<(f64, f64)>]) {
        let (ylo, yhi) = rings
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.1), hi.max(p.1))
            });
        if ylo > yhi {
            return;
        }

        let first_row = clamp_index((ylo - 0.5).ceil(), self.height).max(0);
        let last_row = clamp_index((yhi - 0.5).floor(), self.height).min(self.height as i64 - 1);
        let mut crossings = Vec::new();

        for row in first_row..=last_row {
            let yc = row as f64 + 0.5;
            crossings.clear();
            for ring in rings {
                for edge in ring.windows(2) {
                    let (p, q) = (edge[0], edge[1]);
                    if (p.1 <= yc) != (q.1 <= yc) {
                        crossings.push(p.0 + (yc - p.1) * (q.0 - p.0) / (q.1 - p.1));
                    }
                }
            }
            crossings.sort_by(f64::total_cmp);

            for pair in crossings.chunks_exact(2) {
                self.burn_span(row, (pair[0] - 0.5).ceil(), (pair[1] - 0.5).ceil() - 1.0);
            }
        }
    }
}

/// Shoelace area of a closed ring, unsigned.
fn ring_area(ring: &[(f64, f64)]) -> f64 {
    ring.windows(2)
        .map(|w| w[0].0 * w[1].1 - w[1].0 * w[0].1)
        .sum::<f64>()
        .abs()
        / 2.0
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Clamp a floored coordinate to one past the raster on either side.
fn clamp_index(v: f64, size: usize) -> i64 {
    v.clamp(-1.0, size as f64) as i64
}
