//! SOS request read and lifecycle handlers.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SosRequestItem {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    user_phone: String,
    latitude: f64,
    longitude: f64,
    emergency_type: String,
    description: String,
    user_address: String,
    status: String,
    assigned_hospital_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<lifeline_db::SosRequestRow> for SosRequestItem {
    fn from(row: lifeline_db::SosRequestRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            user_phone: row.user_phone,
            latitude: row.latitude,
            longitude: row.longitude,
            emergency_type: row.emergency_type,
            description: row.description,
            user_address: row.user_address,
            status: row.status,
            assigned_hospital_id: row.assigned_hospital_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SosListQuery {
    pub hospital_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusChangeRequest {
    pub status: String,
}

/// GET /api/v1/sos-requests: newest first, optionally filtered.
pub(super) async fn list_sos_requests(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SosListQuery>,
) -> Result<Json<ApiResponse<Vec<SosRequestItem>>>, ApiError> {
    if let Some(status) = query.status.as_deref() {
        if !lifeline_db::is_sos_status(status) {
            return Err(ApiError::new(
                &req_id.0,
                "validation_error",
                format!("unknown SOS status '{status}'"),
            ));
        }
    }

    let rows = lifeline_db::list_sos_requests(
        &state.pool,
        query.hospital_id,
        query.status.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(SosRequestItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/sos-requests/{id}
pub(super) async fn get_sos_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SosRequestItem>>, ApiError> {
    let row = lifeline_db::get_sos_request(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(&req_id.0, "not_found", format!("SOS request '{id}' not found"))
        })?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/sos-requests/{id}/status: walk the lifecycle.
///
/// Out-of-order moves answer 409; the current row is left alone.
pub(super) async fn change_sos_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChangeRequest>,
) -> Result<Json<ApiResponse<SosRequestItem>>, ApiError> {
    if !lifeline_db::is_sos_status(&body.status) {
        return Err(ApiError::new(
            &req_id.0,
            "validation_error",
            format!("unknown SOS status '{}'", body.status),
        ));
    }

    let row = lifeline_db::transition_sos_status(&state.pool, id, &body.status)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
