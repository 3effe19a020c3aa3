//! Grid configuration: flag parsing and typed per-grid configs.
//!
//! Grids are described by `+key=value` flags, the way they appear in catalog
//! layouts, e.g. `+grid=regular +crs={crs} +resolution=10 +cell_size=256`.
//! `{name}` placeholders inside values are filled from a parameter map.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Smallest accepted cell size, in pixels.
pub const MIN_CELL_SIZE: i64 = 1;
/// Largest accepted cell size, in pixels.
pub const MAX_CELL_SIZE: i64 = 65536;

/// Resolved grid parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridParameters {
    values: BTreeMap<String, String>,
}

impl GridParameters {
    /// Parse flags and merge the parameter map.
    ///
    /// Each flag element may hold several whitespace-separated `+key=value`
    /// tokens. Parameters referenced as `{name}` placeholders are consumed;
    /// the others are added as plain keys unless a flag already set them.
    pub fn from_flags<S: AsRef<str>>(
        flags: &[S],
        parameters: &HashMap<String, String>,
    ) -> Result<Self> {
        let mut values = BTreeMap::new();
        let mut used = HashSet::new();

        for token in flags.iter().flat_map(|f| f.as_ref().split_whitespace()) {
            let body = token.strip_prefix('+').ok_or_else(|| {
                GridError::invalid_config(format!("flag {:?} must start with '+'", token))
            })?;
            let (key, raw) = body.split_once('=').ok_or_else(|| {
                GridError::invalid_config(format!("flag {:?} must be +key=value", token))
            })?;
            if key.is_empty() {
                return Err(GridError::invalid_config(format!(
                    "flag {:?} has an empty key",
                    token
                )));
            }

            let value = substitute(raw, parameters, &mut used)?;
            values.insert(key.to_string(), value);
        }

        for (key, value) in parameters {
            if !used.contains(key.as_str()) && !values.contains_key(key) {
                values.insert(key.clone(), value.clone());
            }
        }

        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// A value that must be present.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| GridError::invalid_config(format!("missing parameter '{}'", key)))
    }

    pub fn f64(&self, key: &str) -> Result<Option<f64>> {
        self.parsed(key)
    }

    pub fn i64(&self, key: &str) -> Result<Option<i64>> {
        self.parsed(key)
    }

    pub fn u32(&self, key: &str) -> Result<Option<u32>> {
        self.parsed(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
                GridError::invalid_config(format!("parameter '{}' is not a valid number: {:?}", key, raw))
            }),
        }
    }
}

/// Replace `{name}` placeholders from `parameters`, recording used names.
fn substitute<'p>(
    raw: &str,
    parameters: &'p HashMap<String, String>,
    used: &mut HashSet<&'p str>,
) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            GridError::invalid_config(format!("unterminated placeholder in {:?}", raw))
        })?;

        let name = &after[..close];
        let (key, value) = parameters.get_key_value(name).ok_or_else(|| {
            GridError::invalid_config(format!("no parameter for placeholder {{{}}}", name))
        })?;
        used.insert(key.as_str());
        out.push_str(value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Process-wide defaults applied to every grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDefaults {
    /// Byte budget of one covering raster.
    pub memory_limit: i64,
}

impl Default for GridDefaults {
    fn default() -> Self {
        Self {
            memory_limit: i64::MAX,
        }
    }
}

impl GridDefaults {
    /// Load defaults from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GRID_MEMORY_LIMIT") {
            if let Ok(limit) = val.trim().parse() {
                config.memory_limit = limit;
            }
        }

        config
    }

    /// Validate the defaults.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.memory_limit <= 0 {
            return Err("memory_limit must be > 0".to_string());
        }
        Ok(())
    }
}

/// Configuration of a regular tiling grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegularGridConfig {
    /// CRS as given by the user (EPSG code, proj string or WKT).
    pub crs: String,
    /// Cell width in pixels.
    pub cell_size_x: i64,
    /// Cell height in pixels.
    pub cell_size_y: i64,
    /// CRS units per pixel.
    pub resolution: f64,
    /// CRS x of the grid origin (west edge of column 0).
    pub origin_x: f64,
    /// CRS y of the grid origin (north edge of row 0).
    pub origin_y: f64,
    /// Byte budget of one covering raster.
    pub memory_limit: i64,
}

impl RegularGridConfig {
    /// Build from resolved parameters.
    ///
    /// `cell_size_x`/`cell_size_y` override `cell_size`; `ox`/`oy` default to 0.
    pub fn from_parameters(params: &GridParameters, defaults: &GridDefaults) -> Result<Self> {
        let cell_size = params.i64("cell_size")?;
        let cell_size_x = params.i64("cell_size_x")?.or(cell_size);
        let cell_size_y = params.i64("cell_size_y")?.or(cell_size);

        let config = Self {
            crs: params.require("crs")?.to_string(),
            cell_size_x: cell_size_x
                .ok_or_else(|| GridError::invalid_config("missing parameter 'cell_size'"))?,
            cell_size_y: cell_size_y
                .ok_or_else(|| GridError::invalid_config("missing parameter 'cell_size'"))?,
            resolution: params
                .f64("resolution")?
                .ok_or_else(|| GridError::invalid_config("missing parameter 'resolution'"))?,
            origin_x: params.f64("ox")?.unwrap_or(0.0),
            origin_y: params.f64("oy")?.unwrap_or(0.0),
            memory_limit: params.i64("memory_limit")?.unwrap_or(defaults.memory_limit),
        };

        config.validate().map_err(GridError::InvalidConfig)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, size) in [("cell_size_x", self.cell_size_x), ("cell_size_y", self.cell_size_y)] {
            if !(MIN_CELL_SIZE..=MAX_CELL_SIZE).contains(&size) {
                return Err(format!(
                    "{} must be in [{}, {}], got {}",
                    name, MIN_CELL_SIZE, MAX_CELL_SIZE, size
                ));
            }
        }

        validate_resolution(self.resolution)?;

        if !self.origin_x.is_finite() || !self.origin_y.is_finite() {
            return Err("grid origin must be finite".to_string());
        }

        if self.memory_limit <= 0 {
            return Err("memory_limit must be > 0".to_string());
        }

        Ok(())
    }
}

/// Configuration of a one-cell-per-AOI grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleCellGridConfig {
    /// CRS as given by the user (EPSG code, proj string or WKT).
    pub crs: String,
    /// CRS units per pixel.
    pub resolution: f64,
}

impl SingleCellGridConfig {
    /// Build from resolved parameters.
    pub fn from_parameters(params: &GridParameters) -> Result<Self> {
        let config = Self {
            crs: params.require("crs")?.to_string(),
            resolution: params
                .f64("resolution")?
                .ok_or_else(|| GridError::invalid_config("missing parameter 'resolution'"))?,
        };

        config.validate().map_err(GridError::InvalidConfig)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        validate_resolution(self.resolution)
    }
}

fn validate_resolution(resolution: f64) -> std::result::Result<(), String> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(format!("resolution must be finite and > 0, got {}", resolution));
    }
    Ok(())
}
