//! Batch coordinate transforms between two CRS handles.

use std::sync::Arc;

use proj4rs::transform::{transform, Transform, TransformClosure};

use crate::crs::Crs;
use crate::error::{ProjectionError, Result};

/// Transform between a source and a target CRS.
///
/// Geographic coordinates are exchanged in degrees; the radian convention of
/// the underlying projection library never leaks out of this type.
#[derive(Debug, Clone)]
pub struct CrsTransform {
    source: Arc<Crs>,
    target: Arc<Crs>,
}

impl CrsTransform {
    pub fn new(source: Arc<Crs>, target: Arc<Crs>) -> Self {
        Self { source, target }
    }

    pub fn source(&self) -> &Arc<Crs> {
        &self.source
    }

    pub fn target(&self) -> &Arc<Crs> {
        &self.target
    }

    /// True when both ends share a definition; `apply` is then a no-op.
    pub fn is_identity(&self) -> bool {
        Arc::ptr_eq(&self.source, &self.target)
            || self.source.definition() == self.target.definition()
    }

    /// The transform from target back to source.
    pub fn inverse(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
        }
    }

    /// Transform coordinates in place.
    ///
    /// The whole batch fails if any coordinate is rejected by the projection.
    pub fn apply(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<()> {
        if xs.len() != ys.len() {
            return Err(ProjectionError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }
        if xs.is_empty() || self.is_identity() {
            return Ok(());
        }

        let src_geographic = self.source.is_geographic();
        let dst_geographic = self.target.is_geographic();

        if src_geographic {
            xs.iter_mut().for_each(|x| *x = x.to_radians());
            ys.iter_mut().for_each(|y| *y = y.to_radians());
        }

        let mut columns = Columns { xs, ys };
        transform(self.source.proj(), self.target.proj(), &mut columns).map_err(|e| {
            ProjectionError::transform_failed(format!(
                "{} -> {}: {}",
                self.source, self.target, e
            ))
        })?;

        if dst_geographic {
            columns.xs.iter_mut().for_each(|x| *x = x.to_degrees());
            columns.ys.iter_mut().for_each(|y| *y = y.to_degrees());
        }

        Ok(())
    }

    /// Transform a single point.
    pub fn apply_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let mut xs = [x];
        let mut ys = [y];
        self.apply(&mut xs, &mut ys)?;
        Ok((xs[0], ys[0]))
    }
}

/// Adapts parallel x/y columns to the projection library's `Transform` trait.
struct Columns<'a> {
    xs: &'a mut [f64],
    ys: &'a mut [f64],
}

impl Transform for Columns<'_> {
    fn transform_coordinates<F: TransformClosure>(
        &mut self,
        f: &mut F,
    ) -> proj4rs::errors::Result<()> {
        for (x, y) in self.xs.iter_mut().zip(self.ys.iter_mut()) {
            let (tx, ty, _) = f(*x, *y, 0.0)?;
            *x = tx;
            *y = ty;
        }
        Ok(())
    }
}
