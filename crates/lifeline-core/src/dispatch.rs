//! Emergency dispatch resolution.
//!
//! A single trigger walks a fixed ladder: find the nearest hospital
//! within [`HOSPITAL_RADIUS_KM`], otherwise the nearest on-duty
//! responder at any distance, otherwise log the emergency unassigned.
//! Exactly one emergency record is written per successful dispatch
//! (none for the unassigned case), and the notification at the end is
//! best-effort: its failure never undoes an assignment.
//!
//! The resolver talks to the outside world only through the port
//! traits defined here ([`ProviderDirectory`], [`DispatchStore`],
//! [`DescriptionEnhancer`], [`EmergencySink`]), so the whole ladder is
//! testable with in-memory fakes.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::geo::{haversine_km, Coordinate};

/// Hospitals further away than this are never auto-assigned.
/// Responders have no such cap; a distant responder beats no help at all.
pub const HOSPITAL_RADIUS_KM: f64 = 5.0;

const DESCRIPTION_MAX_CHARS: usize = 200;
const FALLBACK_DESCRIPTION: &str = "Emergency SOS request";
const DEFAULT_ADDRESS: &str = "Current Location";

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// Who raised the alarm. Passed in explicitly by the caller; the
/// resolver never reaches into any ambient session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchContext {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_phone: String,
}

/// Broad class of emergency, carried through records and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmergencyCategory {
    #[default]
    Medical,
    Safety,
}

impl EmergencyCategory {
    /// Parse a wire value, case-insensitively. Unknown values are `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "medical" => Some(Self::Medical),
            "safety" => Some(Self::Safety),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Medical => "medical",
            Self::Safety => "safety",
        }
    }
}

impl fmt::Display for EmergencyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One press of the panic button.
///
/// `location` is `None` when the caller's position could not be
/// obtained; that is fatal for the dispatch but decided here, not at
/// the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchTrigger {
    pub context: DispatchContext,
    pub location: Option<Coordinate>,
    pub category: EmergencyCategory,
    pub note: Option<String>,
}

// ---------------------------------------------------------------------------
// Candidates and records
// ---------------------------------------------------------------------------

/// A hospital eligible for assignment. Directory adapters only emit
/// candidates whose coordinates parsed, so `location` is always valid.
#[derive(Debug, Clone, PartialEq)]
pub struct HospitalCandidate {
    pub id: Uuid,
    pub name: String,
    pub location: Coordinate,
}

/// A verified, on-duty responder with a parseable last-known location.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponderCandidate {
    pub id: Uuid,
    pub location: Coordinate,
}

/// Row to persist when a hospital takes the emergency.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSosRequest {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_phone: String,
    pub location: Coordinate,
    pub category: EmergencyCategory,
    pub description: String,
    pub user_address: String,
    pub hospital_id: Uuid,
}

/// Row to persist when a responder takes the emergency.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmergencyAlert {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_phone: String,
    pub category: EmergencyCategory,
    pub description: String,
    pub location: Coordinate,
    pub location_description: String,
    pub responder_id: Uuid,
}

/// Payload handed to the notification sink after a dispatch resolves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmergencyNotice {
    pub category: EmergencyCategory,
    pub location: Coordinate,
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Flattened failure from an adapter behind one of the ports.
///
/// The resolver only ever logs or propagates the message; adapters keep
/// their own structured error types on the far side of the boundary.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct PortError(String);

impl PortError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Read-only view of dispatchable providers.
#[async_trait::async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Hospitals that are open for dispatch and have usable coordinates.
    async fn list_hospitals(&self) -> Result<Vec<HospitalCandidate>, PortError>;

    /// Verified responders currently on duty with a usable location.
    async fn list_active_responders(&self) -> Result<Vec<ResponderCandidate>, PortError>;
}

/// Writes the single emergency record produced by a dispatch.
#[async_trait::async_trait]
pub trait DispatchStore: Send + Sync {
    async fn create_sos_request(&self, record: &NewSosRequest) -> Result<Uuid, PortError>;

    async fn create_emergency_alert(&self, record: &NewEmergencyAlert) -> Result<Uuid, PortError>;
}

/// Turns a short seed into a readable incident description.
#[async_trait::async_trait]
pub trait DescriptionEnhancer: Send + Sync {
    async fn enhance(&self, seed: &str) -> Result<String, PortError>;
}

/// Fire-and-forget notification channel (mail relay, noop, ...).
#[async_trait::async_trait]
pub trait EmergencySink: Send + Sync {
    /// Deliver the notice. Implementations report [`NotifyStatus::Sent`]
    /// or [`NotifyStatus::Skipped`]; errors become
    /// [`NotifyStatus::Failed`] at the call site.
    async fn notify(&self, notice: &EmergencyNotice) -> Result<NotifyStatus, PortError>;
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Where the emergency ended up.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchOutcome {
    HospitalAssigned {
        record_id: Uuid,
        hospital_id: Uuid,
        hospital_name: String,
        distance_km: f64,
    },
    ResponderAssigned {
        record_id: Uuid,
        responder_id: Uuid,
        distance_km: f64,
    },
    /// No provider available; the emergency was acknowledged but no
    /// record was written and nothing is assigned.
    Logged,
}

/// Fate of the trailing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyStatus {
    Sent,
    Skipped,
    Failed,
}

/// Everything the caller learns about a finished dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub outcome: DispatchOutcome,
    pub description: String,
    pub notify: NotifyStatus,
}

/// Why a dispatch failed outright. Directory, enhancer and sink
/// problems degrade instead of surfacing here.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The trigger carried no usable caller location. Nothing was
    /// written and nothing was notified.
    #[error("caller location unavailable")]
    LocationUnavailable,
    /// The emergency record could not be persisted. No notification is
    /// sent for a dispatch that left no record.
    #[error("failed to record emergency: {0}")]
    Persist(#[source] PortError),
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Nearest hospital within `radius_km` of the caller, if any.
///
/// The boundary is inclusive. Ties on distance resolve to the lower
/// provider id so repeated runs over the same data pick the same
/// hospital.
#[must_use]
pub fn nearest_hospital(
    caller: Coordinate,
    hospitals: &[HospitalCandidate],
    radius_km: f64,
) -> Option<(&HospitalCandidate, f64)> {
    let mut best: Option<(&HospitalCandidate, f64)> = None;
    for candidate in hospitals {
        let distance = haversine_km(caller, candidate.location);
        if distance > radius_km {
            continue;
        }
        let closer = match best {
            None => true,
            Some((current, best_distance)) => match distance.partial_cmp(&best_distance) {
                Some(Ordering::Less) => true,
                Some(Ordering::Equal) => candidate.id < current.id,
                _ => false,
            },
        };
        if closer {
            best = Some((candidate, distance));
        }
    }
    best
}

/// Nearest responder to the caller at any distance, if any.
///
/// Same deterministic tie-break as [`nearest_hospital`].
#[must_use]
pub fn nearest_responder(
    caller: Coordinate,
    responders: &[ResponderCandidate],
) -> Option<(&ResponderCandidate, f64)> {
    let mut best: Option<(&ResponderCandidate, f64)> = None;
    for candidate in responders {
        let distance = haversine_km(caller, candidate.location);
        let closer = match best {
            None => true,
            Some((current, best_distance)) => match distance.partial_cmp(&best_distance) {
                Some(Ordering::Less) => true,
                Some(Ordering::Equal) => candidate.id < current.id,
                _ => false,
            },
        };
        if closer {
            best = Some((candidate, distance));
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Runs the dispatch ladder over a set of ports.
#[derive(Clone)]
pub struct Dispatcher {
    directory: Arc<dyn ProviderDirectory>,
    store: Arc<dyn DispatchStore>,
    enhancer: Arc<dyn DescriptionEnhancer>,
    sink: Arc<dyn EmergencySink>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        directory: Arc<dyn ProviderDirectory>,
        store: Arc<dyn DispatchStore>,
        enhancer: Arc<dyn DescriptionEnhancer>,
        sink: Arc<dyn EmergencySink>,
    ) -> Self {
        Self {
            directory,
            store,
            enhancer,
            sink,
        }
    }

    /// Resolve one trigger to a report.
    ///
    /// Steps run strictly in order: locate, rank hospitals, rank
    /// responders (only when no hospital qualified), describe, persist,
    /// notify. A directory read failure empties that provider set and
    /// the ladder continues; an enhancer failure falls back to a stock
    /// description; a sink failure is recorded in the report.
    ///
    /// # Errors
    ///
    /// [`DispatchError::LocationUnavailable`] when the trigger has no
    /// location, [`DispatchError::Persist`] when the record write
    /// fails. In both cases no notification is attempted.
    pub async fn dispatch(&self, trigger: DispatchTrigger) -> Result<DispatchReport, DispatchError> {
        let caller = trigger
            .location
            .ok_or(DispatchError::LocationUnavailable)?;

        let hospitals = match self.directory.list_hospitals().await {
            Ok(hospitals) => hospitals,
            Err(e) => {
                warn!(error = %e, "hospital directory read failed, treating as empty");
                Vec::new()
            }
        };
        let hospital = nearest_hospital(caller, &hospitals, HOSPITAL_RADIUS_KM)
            .map(|(candidate, distance)| (candidate.clone(), distance));

        let responder = if hospital.is_some() {
            None
        } else {
            let responders = match self.directory.list_active_responders().await {
                Ok(responders) => responders,
                Err(e) => {
                    warn!(error = %e, "responder directory read failed, treating as empty");
                    Vec::new()
                }
            };
            nearest_responder(caller, &responders)
                .map(|(candidate, distance)| (candidate.clone(), distance))
        };

        let description = self.describe(&trigger).await;

        let outcome = if let Some((hospital, distance_km)) = hospital {
            let record = NewSosRequest {
                user_id: trigger.context.user_id,
                user_name: trigger.context.user_name.clone(),
                user_phone: trigger.context.user_phone.clone(),
                location: caller,
                category: trigger.category,
                description: description.clone(),
                user_address: DEFAULT_ADDRESS.to_owned(),
                hospital_id: hospital.id,
            };
            let record_id = self
                .store
                .create_sos_request(&record)
                .await
                .map_err(DispatchError::Persist)?;
            info!(
                record = %record_id,
                hospital = %hospital.id,
                distance_km,
                "emergency assigned to hospital"
            );
            DispatchOutcome::HospitalAssigned {
                record_id,
                hospital_id: hospital.id,
                hospital_name: hospital.name,
                distance_km,
            }
        } else if let Some((responder, distance_km)) = responder {
            let record = NewEmergencyAlert {
                user_id: trigger.context.user_id,
                user_name: trigger.context.user_name.clone(),
                user_phone: trigger.context.user_phone.clone(),
                category: trigger.category,
                description: description.clone(),
                location: caller,
                location_description: DEFAULT_ADDRESS.to_owned(),
                responder_id: responder.id,
            };
            let record_id = self
                .store
                .create_emergency_alert(&record)
                .await
                .map_err(DispatchError::Persist)?;
            info!(
                record = %record_id,
                responder = %responder.id,
                distance_km,
                "emergency assigned to responder"
            );
            DispatchOutcome::ResponderAssigned {
                record_id,
                responder_id: responder.id,
                distance_km,
            }
        } else {
            warn!(user = %trigger.context.user_id, "no provider available, emergency logged unassigned");
            DispatchOutcome::Logged
        };

        let notice = EmergencyNotice {
            category: trigger.category,
            location: caller,
        };
        let notify = match self.sink.notify(&notice).await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "emergency notification failed");
                NotifyStatus::Failed
            }
        };

        Ok(DispatchReport {
            outcome,
            description,
            notify,
        })
    }

    async fn describe(&self, trigger: &DispatchTrigger) -> String {
        let seed = trigger
            .note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
            .map_or_else(
                || format!("{} emergency at current location", trigger.category),
                ToOwned::to_owned,
            );
        match self.enhancer.enhance(&seed).await {
            Ok(text) if !text.trim().is_empty() => truncate_chars(text.trim(), DESCRIPTION_MAX_CHARS),
            Ok(_) => {
                warn!("description enhancer returned empty text, using fallback");
                FALLBACK_DESCRIPTION.to_owned()
            }
            Err(e) => {
                warn!(error = %e, "description enhancement failed, using fallback");
                FALLBACK_DESCRIPTION.to_owned()
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
