//! Explicit cache of parsed CRS handles.
//!
//! The cache is owned by whoever builds grids and is shared through an `Arc`.
//! Handles stay alive as long as something holds them; `clear` only drops the
//! cache's own references.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::crs::{parse_epsg_code, Crs, WGS84_SRID};
use crate::error::Result;
use crate::transform::CrsTransform;

/// Thread-safe cache of [`Crs`] handles keyed by their normalized input.
#[derive(Debug, Default)]
pub struct CrsCache {
    entries: RwLock<HashMap<String, Arc<Crs>>>,
}

impl CrsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or parse a CRS.
    ///
    /// EPSG inputs share one entry regardless of spelling (`4326`,
    /// `EPSG:4326`, `urn:ogc:def:crs:EPSG::4326`).
    pub fn get(&self, text: &str) -> Result<Arc<Crs>> {
        let key = cache_key(text);

        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(crs) = entries.get(&key) {
                return Ok(crs.clone());
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        // Another caller may have parsed it while we waited for the write lock.
        if let Some(crs) = entries.get(&key) {
            return Ok(crs.clone());
        }

        let crs = Arc::new(Crs::parse(text)?);
        debug!(key = %key, srid = crs.srid(), "Cached CRS");
        entries.insert(key, crs.clone());
        Ok(crs)
    }

    /// The WGS84 lon/lat CRS.
    pub fn wgs84(&self) -> Result<Arc<Crs>> {
        self.get(&format!("EPSG:{}", WGS84_SRID))
    }

    /// Build a transform between two cached CRS.
    pub fn transform(&self, from: &str, to: &str) -> Result<CrsTransform> {
        Ok(CrsTransform::new(self.get(from)?, self.get(to)?))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

fn cache_key(text: &str) -> String {
    match parse_epsg_code(text) {
        Some(code) => format!("EPSG:{}", code),
        None => text.trim().to_string(),
    }
}
