//! Grid and coordinate geometry engine.
//!
//! Splits projected coordinate systems into addressable tiles ("cells") and
//! answers the two questions a datacube needs before it reads anything:
//!
//! - **Which cells meet an area of interest?** [`Grid::covers`] streams cell
//!   URIs lazily and can be cancelled between lattice rows.
//! - **What exactly does a cell cover?** [`Grid::cell`] returns the cell's CRS,
//!   pixel transform and boundary rings, with a geodesically densified lon/lat
//!   boundary available on request.
//!
//! # Architecture
//!
//! ```text
//! flags + parameters
//!      │
//!      ▼
//! GridFactory::new_grid ──► Grid::{Regular, SingleCell}
//!                                │
//!              ┌─────────────────┴─────────────────┐
//!              ▼                                   ▼
//!        cell("i/j")                        covers(token, aoi)
//!              │                                   │
//!     Affine ∘ translation              reproject ─► index box
//!              │                                   │
//!     Ring ─► GeographicRing            Rasterizer ─► CoverStream
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_engine::{new_grid, CancellationToken};
//!
//! let grid = new_grid(&["+grid=regular +crs=EPSG:3857 +resolution=10 +cell_size=256"], &params)?;
//! let uris = grid.covers(CancellationToken::new(), &aoi).collect_uris()?;
//! let cell = grid.cell(&uris[0])?;
//! ```

pub mod affine;
pub mod cell;
pub mod config;
pub mod error;
pub mod factory;
pub mod geometry;
pub mod grid;
pub mod inspect;
pub mod rasterize;
pub mod stream;

// Re-exports
pub use affine::Affine;
pub use cell::Cell;
pub use config::{GridDefaults, GridParameters, RegularGridConfig, SingleCellGridConfig};
pub use error::{GridError, Result};
pub use factory::{new_grid, GridFactory};
pub use geometry::{densify_ring, DensifyStats, EdgeMode};
pub use geometry::{
    new_geographic_ring_from_extent, GeographicRing, GeographicShape, GeometricRing,
    GeometricShape, Ring, Shape,
};
pub use grid::{CoveringWindow, Grid, GridKind, RegularGrid, SingleCellGrid};
pub use inspect::{cell_feature, cells_to_geojson};
pub use rasterize::{AllTouchedRasterizer, Rasterizer};
pub use stream::{CoverSender, CoverStream, StreamedUri};
pub use tokio_util::sync::CancellationToken;
