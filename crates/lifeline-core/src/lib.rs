//! Domain core for the Lifeline emergency network: dispatch
//! resolution, geographic primitives, the hospital seed catalog and
//! application configuration. No I/O beyond reading config files;
//! everything with a network or database behind it sits behind the
//! port traits in [`dispatch`].

use thiserror::Error;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("{0}")]
    Validation(String),
    #[error("failed to read hospital catalog at {path}: {source}")]
    CatalogIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse hospital catalog: {0}")]
    CatalogParse(#[from] serde_yaml::Error),
}

pub mod app_config;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod geo;

pub use app_config::{AppConfig, Environment};
pub use catalog::{load_hospital_catalog, HospitalCatalog, HospitalEntry};
pub use config::{load_app_config, load_app_config_from_env};
pub use dispatch::{
    nearest_hospital, nearest_responder, DescriptionEnhancer, DispatchContext, DispatchError,
    DispatchOutcome, DispatchReport, DispatchStore, DispatchTrigger, Dispatcher, EmergencyCategory,
    EmergencyNotice, EmergencySink, HospitalCandidate, NewEmergencyAlert, NewSosRequest,
    NotifyStatus, PortError, ProviderDirectory, ResponderCandidate, HOSPITAL_RADIUS_KM,
};
pub use geo::{format_point, haversine_km, parse_point, Coordinate, EARTH_RADIUS_KM};
