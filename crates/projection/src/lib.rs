//! Coordinate reference systems for the grid engine.
//!
//! Map projection math is delegated to `proj4rs`; this crate owns what sits
//! around it:
//!
//! - [`Crs`]: parse EPSG codes, proj strings and WKT into a projection handle
//! - [`CrsTransform`]: batch transforms between two CRS handles, degrees in/out
//! - [`CrsCache`]: an explicit, shareable cache of parsed CRS handles
//! - [`geodesic`]: spherical distance and great-circle midpoint helpers

pub mod cache;
pub mod crs;
pub mod error;
pub mod geodesic;
pub mod transform;

pub use cache::CrsCache;
pub use crs::{Crs, WGS84_SRID};
pub use error::{ProjectionError, Result};
pub use geodesic::{great_circle_midpoint, haversine_distance, linear_midpoint, EARTH_RADIUS_M};
pub use transform::CrsTransform;
