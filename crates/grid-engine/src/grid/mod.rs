//! Grids: addressable tilings of a CRS.
//!
//! Every grid answers two questions:
//! - `cell(uri)`: which tile does a URI name?
//! - `covers(token, aoi)`: which tiles meet a lon/lat AOI?

pub mod regular;
pub mod single_cell;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use geo::MultiPolygon;
use projection::Crs;
use tokio_util::sync::CancellationToken;

use crate::cell::Cell;
use crate::error::{GridError, Result};
use crate::stream::CoverStream;

pub use regular::{CoveringWindow, RegularGrid};
pub use single_cell::SingleCellGrid;

/// Known grid types, as named by the `grid` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridKind {
    Regular,
    SingleCell,
}

impl GridKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::SingleCell => "singlecell",
        }
    }
}

impl FromStr for GridKind {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "regular" => Ok(Self::Regular),
            "singlecell" => Ok(Self::SingleCell),
            _ => Err(GridError::unsupported_grid(s)),
        }
    }
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A configured grid.
#[derive(Debug, Clone)]
pub enum Grid {
    Regular(RegularGrid),
    SingleCell(SingleCellGrid),
}

impl Grid {
    pub fn kind(&self) -> GridKind {
        match self {
            Self::Regular(_) => GridKind::Regular,
            Self::SingleCell(_) => GridKind::SingleCell,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    pub fn crs(&self) -> &Arc<Crs> {
        match self {
            Self::Regular(g) => g.crs(),
            Self::SingleCell(g) => g.crs(),
        }
    }

    /// The cell a URI names.
    pub fn cell(&self, uri: &str) -> Result<Cell> {
        match self {
            Self::Regular(g) => g.cell(uri),
            Self::SingleCell(g) => g.cell(uri),
        }
    }

    /// URIs of the cells meeting `aoi` (lon/lat).
    ///
    /// The token is checked between lattice rows; cancellation ends the
    /// stream with `Err(GridError::Cancelled)`.
    pub fn covers(&self, token: CancellationToken, aoi: &MultiPolygon<f64>) -> CoverStream {
        match self {
            Self::Regular(g) => g.covers(token, aoi),
            Self::SingleCell(g) => g.covers(token, aoi),
        }
    }
}

impl From<RegularGrid> for Grid {
    fn from(grid: RegularGrid) -> Self {
        Self::Regular(grid)
    }
}

impl From<SingleCellGrid> for Grid {
    fn from(grid: SingleCellGrid) -> Self {
        Self::SingleCell(grid)
    }
}
