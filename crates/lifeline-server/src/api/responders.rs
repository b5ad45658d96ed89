//! Responder profile, availability, and workload handlers.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use lifeline_core::{format_point, Coordinate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ResponderItem {
    id: Uuid,
    name: String,
    phone: Option<String>,
    is_verified: bool,
    is_on_duty: bool,
    current_location: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<lifeline_db::ResponderRow> for ResponderItem {
    fn from(row: lifeline_db::ResponderRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            phone: row.phone,
            is_verified: row.is_verified,
            is_on_duty: row.is_on_duty,
            current_location: row.current_location,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ResponderStatsItem {
    assigned_today: i64,
    assigned_week: i64,
    assigned_total: i64,
    completed_total: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct AvailabilityRequest {
    pub on_duty: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// GET /api/v1/responders/{id}
pub(super) async fn get_responder(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ResponderItem>>, ApiError> {
    let row = lifeline_db::get_responder(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(&req_id.0, "not_found", format!("responder '{id}' not found"))
        })?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/v1/responders/{id}/availability: flip duty status and
/// optionally move the stored position.
///
/// Going off duty without coordinates keeps the last known position, so
/// coming back on duty is a one-field request.
pub(super) async fn put_availability(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<AvailabilityRequest>,
) -> Result<Json<ApiResponse<ResponderItem>>, ApiError> {
    let rid = &req_id.0;

    let location = match (body.latitude, body.longitude) {
        (None, None) => None,
        (Some(latitude), Some(longitude)) => {
            let coordinate = Coordinate::new(latitude, longitude).ok_or_else(|| {
                ApiError::new(rid, "validation_error", "latitude/longitude out of range")
            })?;
            Some(format_point(coordinate))
        }
        _ => {
            return Err(ApiError::new(
                rid,
                "validation_error",
                "latitude and longitude must be provided together",
            ));
        }
    };

    let row = lifeline_db::set_responder_availability(&state.pool, id, body.on_duty, location.as_deref())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(&req_id.0, "not_found", format!("responder '{id}' not found"))
        })?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/responders/{id}/stats: assignment counts by window.
pub(super) async fn get_responder_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ResponderStatsItem>>, ApiError> {
    lifeline_db::get_responder(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(&req_id.0, "not_found", format!("responder '{id}' not found"))
        })?;

    let stats = lifeline_db::responder_stats(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ResponderStatsItem {
            assigned_today: stats.assigned_today,
            assigned_week: stats.assigned_week,
            assigned_total: stats.assigned_total,
            completed_total: stats.completed_total,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_request_coordinates_are_optional() {
        let body: AvailabilityRequest =
            serde_json::from_str(r#"{"on_duty":false}"#).expect("deserialize");
        assert!(!body.on_duty);
        assert!(body.latitude.is_none());
        assert!(body.longitude.is_none());
    }

    #[test]
    fn responder_stats_item_is_serializable() {
        let item = ResponderStatsItem {
            assigned_today: 1,
            assigned_week: 4,
            assigned_total: 9,
            completed_total: 7,
        };
        let json = serde_json::to_string(&item).expect("serialize stats");
        assert!(json.contains("\"assigned_week\":4"));
        assert!(json.contains("\"completed_total\":7"));
    }
}
