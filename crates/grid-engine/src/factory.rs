//! Grid construction from flags and parameters.

use std::collections::HashMap;
use std::sync::Arc;

use projection::{Crs, CrsCache, ProjectionError};
use tracing::info;

use crate::config::{GridDefaults, GridParameters, RegularGridConfig, SingleCellGridConfig};
use crate::error::{GridError, Result};
use crate::grid::{Grid, GridKind, RegularGrid, SingleCellGrid};
use crate::rasterize::{AllTouchedRasterizer, Rasterizer};

/// Builds grids, sharing one CRS cache between them.
#[derive(Debug, Clone)]
pub struct GridFactory {
    cache: Arc<CrsCache>,
    defaults: GridDefaults,
    rasterizer: Arc<dyn Rasterizer>,
}

impl Default for GridFactory {
    fn default() -> Self {
        Self::new(Arc::new(CrsCache::new()))
    }
}

impl GridFactory {
    pub fn new(cache: Arc<CrsCache>) -> Self {
        Self {
            cache,
            defaults: GridDefaults::default(),
            rasterizer: Arc::new(AllTouchedRasterizer::default()),
        }
    }

    /// A factory with a fresh cache and defaults from the environment.
    pub fn from_env() -> Self {
        Self::default().with_defaults(GridDefaults::from_env())
    }

    pub fn with_defaults(mut self, defaults: GridDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn cache(&self) -> &Arc<CrsCache> {
        &self.cache
    }

    pub fn defaults(&self) -> &GridDefaults {
        &self.defaults
    }

    /// Build the grid described by `flags`, e.g.
    /// `["+grid=regular +crs=EPSG:{epsg} +resolution=10 +cell_size=256"]`.
    pub fn new_grid<S: AsRef<str>>(
        &self,
        flags: &[S],
        parameters: &HashMap<String, String>,
    ) -> Result<Grid> {
        let params = GridParameters::from_flags(flags, parameters)?;
        let kind: GridKind = params.require("grid")?.parse()?;
        let wgs84 = self.cache.wgs84()?;

        let grid = match kind {
            GridKind::Regular => {
                let config = RegularGridConfig::from_parameters(&params, &self.defaults)?;
                let crs = self.crs(&config.crs)?;
                Grid::from(RegularGrid::new(config, crs, wgs84, self.rasterizer.clone())?)
            }
            GridKind::SingleCell => {
                let config = SingleCellGridConfig::from_parameters(&params)?;
                let crs = self.crs(&config.crs)?;
                Grid::from(SingleCellGrid::new(config, crs, wgs84)?)
            }
        };

        info!(grid = grid.name(), crs = %grid.crs(), "Created grid");
        Ok(grid)
    }

    fn crs(&self, text: &str) -> Result<Arc<Crs>> {
        self.cache.get(text).map_err(|e| match e {
            ProjectionError::UnsupportedCrs(_) | ProjectionError::InvalidDefinition { .. } => {
                GridError::invalid_config(format!("invalid crs {:?}: {}", text, e))
            }
            other => GridError::Transform(other),
        })
    }
}

/// Build a grid with a fresh factory.
pub fn new_grid<S: AsRef<str>>(flags: &[S], parameters: &HashMap<String, String>) -> Result<Grid> {
    GridFactory::default().new_grid(flags, parameters)
}
