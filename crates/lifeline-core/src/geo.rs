//! Geographic primitives shared across the workspace.
//!
//! Distances are great-circle kilometres computed with the haversine
//! formula. Provider coordinates arrive from two places with different
//! shapes: hospitals store `latitude`/`longitude` columns, responders
//! store a Postgres point literal (`"(lng,lat)"`, longitude first).
//! Both funnel through [`Coordinate`], which cannot hold a
//! non-finite or out-of-range value.

use serde::Serialize;

/// Mean Earth radius in kilometres, as used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A validated WGS84 position.
///
/// Construction goes through [`Coordinate::new`], [`Coordinate::from_parts`]
/// or [`parse_point`]; all three reject non-finite and out-of-range values,
/// so downstream distance math never has to re-check its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite values and values outside
    /// `[-90, 90]` latitude / `[-180, 180]` longitude.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }

    /// Build a coordinate from a pair of optional columns.
    ///
    /// Returns `None` when either part is absent or invalid, which lets
    /// callers filter half-filled provider rows in one step.
    #[must_use]
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        Self::new(latitude?, longitude?)
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Great-circle distance between two coordinates in kilometres.
///
/// Total over valid [`Coordinate`]s: never panics, never returns NaN.
#[must_use]
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lng = (to.longitude - from.longitude).to_radians();
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Parse a Postgres point literal of the form `"(lng,lat)"`.
///
/// Longitude comes first in the stored text; the parentheses are
/// optional and whitespace around either number is ignored. Returns
/// `None` for anything that does not parse into a valid [`Coordinate`],
/// so rows with stale or malformed locations simply drop out of
/// candidate lists instead of failing a dispatch.
#[must_use]
pub fn parse_point(raw: &str) -> Option<Coordinate> {
    let inner = raw.trim().trim_start_matches('(').trim_end_matches(')');
    let (lng, lat) = inner.split_once(',')?;
    let longitude: f64 = lng.trim().parse().ok()?;
    let latitude: f64 = lat.trim().parse().ok()?;
    Coordinate::new(latitude, longitude)
}

/// Render a coordinate as the point literal accepted by [`parse_point`].
#[must_use]
pub fn format_point(coordinate: Coordinate) -> String {
    format!("({},{})", coordinate.longitude, coordinate.latitude)
}
