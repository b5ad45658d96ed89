//! Hospital seed catalog.
//!
//! Deployments ship a YAML file describing the hospitals the network
//! dispatches to; `lifeline-cli seed` upserts it into the database.
//! Validation happens at load time so a typo in the file fails the
//! seed run instead of producing an undispatchable hospital row.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::geo::Coordinate;
use crate::ConfigError;

/// One hospital as written in the catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct HospitalEntry {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl HospitalEntry {
    /// The entry's position, `None` when out of range.
    ///
    /// Validation has already rejected invalid catalogs, so for a
    /// loaded catalog this always returns `Some`.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// The parsed catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct HospitalCatalog {
    pub hospitals: Vec<HospitalEntry>,
}

/// Load and validate the hospital catalog at `path`.
///
/// # Errors
///
/// [`ConfigError::CatalogIo`] when the file cannot be read,
/// [`ConfigError::CatalogParse`] for malformed YAML and
/// [`ConfigError::Validation`] for entries that parse but are unusable
/// (blank or duplicate names, out-of-range coordinates).
pub fn load_hospital_catalog(path: &Path) -> Result<HospitalCatalog, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::CatalogIo {
        path: path.display().to_string(),
        source,
    })?;
    parse_hospital_catalog(&raw)
}

/// Parse and validate catalog YAML from a string.
///
/// # Errors
///
/// Same as [`load_hospital_catalog`], minus the I/O case.
pub fn parse_hospital_catalog(raw: &str) -> Result<HospitalCatalog, ConfigError> {
    let catalog: HospitalCatalog = serde_yaml::from_str(raw)?;
    validate(&catalog)?;
    Ok(catalog)
}

fn validate(catalog: &HospitalCatalog) -> Result<(), ConfigError> {
    if catalog.hospitals.is_empty() {
        return Err(ConfigError::Validation(
            "hospital catalog contains no hospitals".to_owned(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in &catalog.hospitals {
        let name = entry.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "hospital catalog entry with blank name".to_owned(),
            ));
        }
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate hospital name in catalog: {name}"
            )));
        }
        if entry.coordinate().is_none() {
            return Err(ConfigError::Validation(format!(
                "hospital {name} has out-of-range coordinates ({}, {})",
                entry.latitude, entry.longitude
            )));
        }
    }
    Ok(())
}
