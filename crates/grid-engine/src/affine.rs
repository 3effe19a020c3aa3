//! Affine pixel <-> CRS transforms.
//!
//! An [`Affine`] maps `(x, y)` to `(a + b·x + c·y, d + e·x + f·y)`.
//!
//! Cell URIs are persisted, so neighbouring cells must agree on their shared
//! boundary to the last bit. Composition and inversion are therefore carried
//! out in exact rational arithmetic and rounded to `f64` once per coefficient,
//! and point evaluation uses error-free transformations (`two_prod`/`two_sum`)
//! so its only rounding is the final one.

use num::{BigRational, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// 2D affine transform `(x, y) -> (a + b·x + c·y, d + e·x + f·y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Affine {
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn identity() -> Self {
        Self::new(0.0, 1.0, 0.0, 0.0, 0.0, 1.0)
    }

    pub const fn translation(ox: f64, oy: f64) -> Self {
        Self::new(ox, 1.0, 0.0, oy, 0.0, 1.0)
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(0.0, sx, 0.0, 0.0, 0.0, sy)
    }

    /// Coefficients `(a, b, c, d, e, f)`.
    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Signed x scale.
    pub fn rx(&self) -> f64 {
        self.b
    }

    /// Signed y scale, negative for north-up rasters.
    pub fn ry(&self) -> f64 {
        self.f
    }

    /// Image of the pixel origin.
    pub fn origin(&self) -> (f64, f64) {
        (self.a, self.d)
    }

    /// Apply to a point.
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        (
            dot2(self.a, self.b, x, self.c, y),
            dot2(self.d, self.e, x, self.f, y),
        )
    }

    /// Compose `self ∘ other`: the result applies `other` first.
    pub fn multiply(&self, other: &Affine) -> Affine {
        match (self.exact(), other.exact()) {
            (Some(s), Some(o)) => {
                let [a, b, c, d, e, f] = &s;
                let [oa, ob, oc, od, oe, of] = &o;
                Affine::new(
                    round(a + b * oa + c * od),
                    round(b * ob + c * oe),
                    round(b * oc + c * of),
                    round(d + e * oa + f * od),
                    round(e * ob + f * oe),
                    round(e * oc + f * of),
                )
            }
            // NaN/inf have no rational value; plain arithmetic propagates them.
            _ => Affine::new(
                self.a + self.b * other.a + self.c * other.d,
                self.b * other.b + self.c * other.e,
                self.b * other.c + self.c * other.f,
                self.d + self.e * other.a + self.f * other.d,
                self.e * other.b + self.f * other.e,
                self.e * other.c + self.f * other.f,
            ),
        }
    }

    /// The inverse transform; fails when `b·f − c·e == 0`.
    pub fn inverse(&self) -> Result<Affine> {
        let [a, b, c, d, e, f] = self.exact().ok_or(GridError::NonInvertible)?;

        let det = &b * &f - &c * &e;
        if det.is_zero() {
            return Err(GridError::NonInvertible);
        }

        let ib = &f / &det;
        let ic = -&c / &det;
        let ie = -&e / &det;
        let i_f = &b / &det;
        let ia = -(&ib * &a + &ic * &d);
        let id = -(&ie * &a + &i_f * &d);

        let inverse = Affine::new(
            round(ia),
            round(ib),
            round(ic),
            round(id),
            round(ie),
            round(i_f),
        );
        if inverse.coefficients().iter().all(|v| v.is_finite()) {
            Ok(inverse)
        } else {
            Err(GridError::NonInvertible)
        }
    }

    fn exact(&self) -> Option<[BigRational; 6]> {
        Some([
            BigRational::from_float(self.a)?,
            BigRational::from_float(self.b)?,
            BigRational::from_float(self.c)?,
            BigRational::from_float(self.d)?,
            BigRational::from_float(self.e)?,
            BigRational::from_float(self.f)?,
        ])
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

/// Round an exact value to the nearest `f64`.
fn round(value: BigRational) -> f64 {
    match value.to_f64() {
        Some(v) => v,
        None if value.is_negative() => f64::NEG_INFINITY,
        None => f64::INFINITY,
    }
}

/// Error-free product: `a·b = p + err` exactly.
#[inline]
fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    (p, a.mul_add(b, -p))
}

/// Error-free sum: `a + b = s + err` exactly.
#[inline]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    (s, (a - (s - bb)) + (b - bb))
}

/// `offset + s1·v1 + s2·v2`, accurate as if computed in twice the working
/// precision and rounded once.
#[inline]
fn dot2(offset: f64, s1: f64, v1: f64, s2: f64, v2: f64) -> f64 {
    let (p1, e1) = two_prod(s1, v1);
    let (p2, e2) = two_prod(s2, v2);
    let (t1, r1) = two_sum(offset, p1);
    let (t2, r2) = two_sum(t1, p2);
    t2 + ((r1 + r2) + (e1 + e2))
}
