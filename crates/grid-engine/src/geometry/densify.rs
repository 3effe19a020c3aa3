//! Adaptive edge densification into lon/lat.
//!
//! A straight edge in a projected CRS is generally a curve once reprojected to
//! lon/lat. Each edge is bisected recursively until the interpolated midpoint
//! (straight average or great-circle midpoint) stays within 1% of the local
//! edge length of the true reprojected midpoint.

use geo::{Coord, LineString};
use projection::{great_circle_midpoint, haversine_distance, linear_midpoint, CrsTransform};
use tracing::debug;

use crate::error::Result;

/// Bisection levels allowed per original edge.
pub const MAX_DENSIFY_DEPTH: u32 = 5;

/// Tolerated midpoint deviation, relative to the edge length.
pub const RELATIVE_ACCURACY: f64 = 0.01;

/// How output edges are interpreted between consecutive vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    /// Edges follow great circles.
    Geodesic,
    /// Edges are straight in lon/lat.
    Geometric,
}

impl EdgeMode {
    fn midpoint(self, a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
        match self {
            Self::Geodesic => great_circle_midpoint(a, b),
            Self::Geometric => linear_midpoint(a, b),
        }
    }
}

/// Outcome counters of one densification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DensifyStats {
    /// Vertices inserted between original vertices.
    pub inserted: usize,
    /// Edges that still exceeded their budget when the depth ran out.
    pub unconverged: usize,
}

impl std::ops::AddAssign for DensifyStats {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.unconverged += other.unconverged;
    }
}

/// Densify a closed ring from its source CRS into lon/lat.
///
/// Vertices are reprojected in one batch; only midpoints are transformed one
/// at a time. Non-convergence is reported in the stats, never as an error.
pub fn densify_ring(
    line: &LineString<f64>,
    to_lonlat: &CrsTransform,
    mode: EdgeMode,
) -> Result<(LineString<f64>, DensifyStats)> {
    let source: Vec<(f64, f64)> = line.coords().map(|c| (c.x, c.y)).collect();
    if source.is_empty() {
        return Ok((LineString::new(vec![]), DensifyStats::default()));
    }

    let mut xs: Vec<f64> = source.iter().map(|p| p.0).collect();
    let mut ys: Vec<f64> = source.iter().map(|p| p.1).collect();
    to_lonlat.apply(&mut xs, &mut ys)?;
    let lonlat: Vec<(f64, f64)> = xs.into_iter().zip(ys).collect();

    let densifier = Densifier { to_lonlat, mode };
    let mut stats = DensifyStats::default();
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(source.len() * 2);

    for k in 0..source.len() - 1 {
        let (p0, p1) = (source[k], source[k + 1]);
        let (q0, q1) = (lonlat[k], lonlat[k + 1]);
        out.push(q0.into());

        let Some(qm) = densifier.true_midpoint(p0, p1) else {
            stats.unconverged += 1;
            continue;
        };

        let budget =
            RELATIVE_ACCURACY * (haversine_distance(q0, qm) + haversine_distance(qm, q1));

        let before = out.len();
        densifier.densify_edge(
            Edge { p0, p1, q0, q1, qm },
            budget,
            MAX_DENSIFY_DEPTH,
            &mut out,
            &mut stats,
        );
        stats.inserted += out.len() - before;
    }

    if let Some(&first) = lonlat.first() {
        out.push(first.into());
    }

    if stats.unconverged > 0 {
        debug!(
            edges = source.len() - 1,
            inserted = stats.inserted,
            unconverged = stats.unconverged,
            source = %to_lonlat.source(),
            "Densification did not converge on every edge"
        );
    }

    Ok((LineString::new(out), stats))
}

/// One edge known both in the source CRS (`p`) and in lon/lat (`q`).
#[derive(Clone, Copy)]
struct Edge {
    p0: (f64, f64),
    p1: (f64, f64),
    q0: (f64, f64),
    q1: (f64, f64),
    /// Reprojection of the source midpoint.
    qm: (f64, f64),
}

struct Densifier<'a> {
    to_lonlat: &'a CrsTransform,
    mode: EdgeMode,
}

impl Densifier<'_> {
    /// Reprojected midpoint of a source segment; `None` when not finite.
    fn true_midpoint(&self, p0: (f64, f64), p1: (f64, f64)) -> Option<(f64, f64)> {
        let (mx, my) = linear_midpoint(p0, p1);
        match self.to_lonlat.apply_point(mx, my) {
            Ok((lon, lat)) if lon.is_finite() && lat.is_finite() => Some((lon, lat)),
            _ => None,
        }
    }

    fn densify_edge(
        &self,
        edge: Edge,
        budget: f64,
        depth: u32,
        out: &mut Vec<Coord<f64>>,
        stats: &mut DensifyStats,
    ) {
        let candidate = self.mode.midpoint(edge.q0, edge.q1);
        let deviation = haversine_distance(candidate, edge.qm);
        // NaN deviation compares false here and falls through to bisection.
        if deviation <= budget {
            return;
        }

        if depth == 0 {
            out.push(edge.qm.into());
            stats.unconverged += 1;
            return;
        }

        let pm = linear_midpoint(edge.p0, edge.p1);

        match self.true_midpoint(edge.p0, pm) {
            Some(qm) => self.densify_edge(
                Edge {
                    p0: edge.p0,
                    p1: pm,
                    q0: edge.q0,
                    q1: edge.qm,
                    qm,
                },
                budget,
                depth - 1,
                out,
                stats,
            ),
            None => stats.unconverged += 1,
        }

        out.push(edge.qm.into());

        match self.true_midpoint(pm, edge.p1) {
            Some(qm) => self.densify_edge(
                Edge {
                    p0: pm,
                    p1: edge.p1,
                    q0: edge.qm,
                    q1: edge.q1,
                    qm,
                },
                budget,
                depth - 1,
                out,
                stats,
            ),
            None => stats.unconverged += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection::Crs;
    use std::sync::Arc;

    fn identity() -> CrsTransform {
        let wgs84 = Arc::new(Crs::wgs84().unwrap());
        CrsTransform::new(wgs84.clone(), wgs84)
    }

    fn square(min: f64, max: f64) -> LineString<f64> {
        LineString::from(vec![(min, min), (min, max), (max, max), (max, min), (min, min)])
    }

    #[test]
    fn test_geometric_identity_inserts_nothing() {
        let ring = square(-10.0, 10.0);
        let (out, stats) = densify_ring(&ring, &identity(), EdgeMode::Geometric).unwrap();
        assert_eq!(out, ring);
        assert_eq!(stats, DensifyStats::default());
    }

    #[test]
    fn test_geodesic_identity_densifies_long_parallels() {
        // Straight lon/lat edges along 60N bulge away from their great circle.
        let ring = LineString::from(vec![
            (-45.0, 60.0),
            (45.0, 60.0),
            (45.0, 50.0),
            (-45.0, 50.0),
            (-45.0, 60.0),
        ]);
        let (out, stats) = densify_ring(&ring, &identity(), EdgeMode::Geodesic).unwrap();

        assert!(stats.inserted > 0);
        assert_eq!(stats.unconverged, 0);
        assert_eq!(out.0.len(), ring.0.len() + stats.inserted);
        assert_eq!(out.0.first(), out.0.last());

        // Inserted vertices along the first edge stay on the parallel, in order.
        let first_edge: Vec<_> = out.0.iter().take_while(|c| c.x < 45.0).collect();
        assert!(first_edge.len() > 2);
        assert!(first_edge.iter().all(|c| c.y == 60.0));
        assert!(first_edge.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn test_meridians_need_no_densification() {
        // Meridians are great circles, so only the parallels get vertices.
        let ring = LineString::from(vec![(0.0, 0.0), (0.0, 40.0), (0.0, 0.0)]);
        let (out, stats) = densify_ring(&ring, &identity(), EdgeMode::Geodesic).unwrap();
        assert_eq!(out, ring);
        assert_eq!(stats.inserted, 0);
    }

    #[test]
    fn test_empty_ring() {
        let (out, stats) =
            densify_ring(&LineString::new(vec![]), &identity(), EdgeMode::Geodesic).unwrap();
        assert!(out.0.is_empty());
        assert_eq!(stats, DensifyStats::default());
    }

    #[test]
    fn test_stats_add_assign() {
        let mut a = DensifyStats {
            inserted: 1,
            unconverged: 2,
        };
        a += DensifyStats {
            inserted: 3,
            unconverged: 4,
        };
        assert_eq!(
            a,
            DensifyStats {
                inserted: 4,
                unconverged: 6
            }
        );
    }
}
