//! Coordinate Reference System handles.
//!
//! A [`Crs`] is parsed once from user input and then shared (`Arc<Crs>`)
//! between every transform that needs it.

use std::fmt;

use proj4rs::Proj;

use crate::error::{ProjectionError, Result};

/// SRID of WGS84 geographic coordinates (lon/lat in degrees).
pub const WGS84_SRID: i32 = 4326;

/// A parsed coordinate reference system.
pub struct Crs {
    definition: String,
    srid: i32,
    proj: Proj,
}

impl Crs {
    /// Parse a CRS from user input.
    ///
    /// Accepts:
    /// - EPSG codes: `"4326"`, `"EPSG:32631"`, `"urn:ogc:def:crs:EPSG::2154"`
    /// - proj strings: `"+proj=utm +zone=31 +datum=WGS84"`
    /// - WKT carrying an EPSG authority (`AUTHORITY["EPSG","3857"]` or `ID["EPSG",3857]`)
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ProjectionError::invalid_definition(text, "empty CRS"));
        }

        if text.starts_with('+') {
            return Self::from_proj_string(text);
        }

        if let Some(code) = parse_epsg_code(text) {
            return Self::from_epsg(code);
        }

        if text.contains('[') {
            return match wkt_authority_code(text) {
                Some(code) => Self::from_epsg(code),
                None => Err(ProjectionError::invalid_definition(
                    text,
                    "WKT without a top-level EPSG authority",
                )),
            };
        }

        Err(ProjectionError::invalid_definition(
            text,
            "expected an EPSG code, a +proj string or WKT",
        ))
    }

    /// Build a CRS from an EPSG code of the supported table.
    pub fn from_epsg(code: u32) -> Result<Self> {
        let definition = epsg_definition(code)
            .ok_or_else(|| ProjectionError::UnsupportedCrs(format!("EPSG:{}", code)))?;
        let proj = Proj::from_proj_string(&definition)
            .map_err(|e| ProjectionError::invalid_definition(&definition, e.to_string()))?;

        Ok(Self {
            definition,
            srid: code as i32,
            proj,
        })
    }

    /// Build a CRS from a proj string. The SRID is left unspecified (0).
    pub fn from_proj_string(definition: &str) -> Result<Self> {
        let proj = Proj::from_proj_string(definition)
            .map_err(|e| ProjectionError::invalid_definition(definition, e.to_string()))?;

        Ok(Self {
            definition: definition.to_string(),
            srid: 0,
            proj,
        })
    }

    /// WGS84 geographic coordinates.
    pub fn wgs84() -> Result<Self> {
        Self::from_epsg(WGS84_SRID as u32)
    }

    /// Spatial reference identifier (EPSG code, 0 when unspecified).
    pub fn srid(&self) -> i32 {
        self.srid
    }

    /// Canonical proj string of this CRS.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// True for lon/lat coordinate systems.
    pub fn is_geographic(&self) -> bool {
        self.proj.is_latlong()
    }

    pub(crate) fn proj(&self) -> &Proj {
        &self.proj
    }
}

impl fmt::Debug for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crs")
            .field("srid", &self.srid)
            .field("definition", &self.definition)
            .finish()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.srid != 0 {
            write!(f, "EPSG:{}", self.srid)
        } else {
            write!(f, "{}", self.definition)
        }
    }
}

/// Extract an EPSG code from `"4326"`, `"EPSG:4326"` or an OGC URN.
pub(crate) fn parse_epsg_code(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Ok(code) = text.parse::<u32>() {
        return Some(code);
    }

    let upper = text.to_ascii_uppercase();
    if let Some(rest) = upper.strip_prefix("EPSG:") {
        return rest.trim().parse().ok();
    }
    if let Some(rest) = upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:") {
        // The version segment may be empty: urn:ogc:def:crs:EPSG::2154
        return rest.rsplit(':').next().and_then(|code| code.parse().ok());
    }

    None
}

/// Find the top-level (last) EPSG authority of a WKT string.
fn wkt_authority_code(wkt: &str) -> Option<u32> {
    let upper = wkt.to_ascii_uppercase();
    let start = ["AUTHORITY[\"EPSG\",", "ID[\"EPSG\","]
        .iter()
        .filter_map(|marker| upper.rfind(marker).map(|pos| pos + marker.len()))
        .max()?;

    let rest = &upper[start..];
    let end = rest.find([']', ','])?;
    rest[..end].trim().trim_matches('"').parse().ok()
}

/// Proj definitions of the supported EPSG codes.
fn epsg_definition(code: u32) -> Option<String> {
    let definition = match code {
        4326 => "+proj=longlat +datum=WGS84 +no_defs",
        4258 | 4269 => "+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs",
        3857 | 900913 => {
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs"
        }
        2154 => {
            "+proj=lcc +lat_0=46.5 +lon_0=3 +lat_1=49 +lat_2=44 +x_0=700000 +y_0=6600000 \
             +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
        }
        3035 => {
            "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 \
             +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
        }
        3031 => {
            "+proj=stere +lat_0=-90 +lat_ts=-71 +lon_0=0 +k=1 +x_0=0 +y_0=0 \
             +datum=WGS84 +units=m +no_defs"
        }
        3413 => {
            "+proj=stere +lat_0=90 +lat_ts=70 +lon_0=-45 +k=1 +x_0=0 +y_0=0 \
             +datum=WGS84 +units=m +no_defs"
        }
        5070 => {
            "+proj=aea +lat_0=23 +lon_0=-96 +lat_1=29.5 +lat_2=45.5 +x_0=0 +y_0=0 \
             +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
        }
        6933 => "+proj=cea +lat_ts=30 +lon_0=0 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs",
        32601..=32660 => {
            return Some(format!(
                "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs",
                code - 32600
            ))
        }
        32701..=32760 => {
            return Some(format!(
                "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
                code - 32700
            ))
        }
        _ => return None,
    };
    Some(definition.to_string())
}
