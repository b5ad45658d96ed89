//! Adapters that plug the Postgres layer into the dispatch ports.
//!
//! Rows with unusable coordinates are dropped here, at the boundary,
//! so the resolver only ever sees valid candidates.

use lifeline_core::{
    parse_point, Coordinate, DispatchStore, HospitalCandidate, NewEmergencyAlert, NewSosRequest,
    PortError, ProviderDirectory, ResponderCandidate,
};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::{alerts, hospitals, responders, sos_requests};

/// [`ProviderDirectory`] backed by the `hospitals` and `responders` tables.
#[derive(Clone)]
pub struct PgProviderDirectory {
    pool: PgPool,
}

impl PgProviderDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProviderDirectory for PgProviderDirectory {
    async fn list_hospitals(&self) -> Result<Vec<HospitalCandidate>, PortError> {
        let rows = hospitals::list_dispatchable_hospitals(&self.pool)
            .await
            .map_err(|e| PortError::new(e.to_string()))?;

        let candidates = rows
            .into_iter()
            .filter_map(|row| {
                match Coordinate::from_parts(row.latitude, row.longitude) {
                    Some(location) => Some(HospitalCandidate {
                        id: row.id,
                        name: row.name,
                        location,
                    }),
                    None => {
                        // The SQL filter only checks for NULL; out-of-range
                        // values still land here.
                        debug!(hospital = %row.id, "skipping hospital with unusable coordinates");
                        None
                    }
                }
            })
            .collect();

        Ok(candidates)
    }

    async fn list_active_responders(&self) -> Result<Vec<ResponderCandidate>, PortError> {
        let rows = responders::list_on_duty_responders(&self.pool)
            .await
            .map_err(|e| PortError::new(e.to_string()))?;

        let candidates = rows
            .into_iter()
            .filter_map(|row| {
                let raw = row.current_location.as_deref().unwrap_or_default();
                match parse_point(raw) {
                    Some(location) => Some(ResponderCandidate {
                        id: row.id,
                        location,
                    }),
                    None => {
                        debug!(responder = %row.id, "skipping responder with unparseable location");
                        None
                    }
                }
            })
            .collect();

        Ok(candidates)
    }
}

/// [`DispatchStore`] backed by the two emergency record tables.
#[derive(Clone)]
pub struct PgDispatchStore {
    pool: PgPool,
}

impl PgDispatchStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DispatchStore for PgDispatchStore {
    async fn create_sos_request(&self, record: &NewSosRequest) -> Result<Uuid, PortError> {
        let row = sos_requests::insert_sos_request(&self.pool, record)
            .await
            .map_err(|e| PortError::new(e.to_string()))?;
        Ok(row.id)
    }

    async fn create_emergency_alert(&self, record: &NewEmergencyAlert) -> Result<Uuid, PortError> {
        let row = alerts::insert_emergency_alert(&self.pool, record)
            .await
            .map_err(|e| PortError::new(e.to_string()))?;
        Ok(row.id)
    }
}
