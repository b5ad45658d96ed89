//! Blood request workflow handlers: request, approve, reject, fulfil.
//!
//! Approval reserves stock, fulfilment consumes it, and rejection or
//! expiry leaves it alone. The arithmetic lives in the db layer inside a
//! transaction; handlers here validate the vocabulary and map errors.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct BloodRequestItem {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    user_phone: String,
    hospital_id: Uuid,
    blood_group: String,
    units_requested: i32,
    units_approved: Option<i32>,
    urgency: String,
    patient_name: Option<String>,
    notes: Option<String>,
    status: String,
    hospital_response: Option<String>,
    responded_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<lifeline_db::BloodRequestRow> for BloodRequestItem {
    fn from(row: lifeline_db::BloodRequestRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            user_phone: row.user_phone,
            hospital_id: row.hospital_id,
            blood_group: row.blood_group,
            units_requested: row.units_requested,
            units_approved: row.units_approved,
            urgency: row.urgency,
            patient_name: row.patient_name,
            notes: row.notes,
            status: row.status,
            hospital_response: row.hospital_response,
            responded_at: row.responded_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateBloodRequest {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_phone: String,
    pub hospital_id: Uuid,
    pub blood_group: String,
    pub units_requested: i32,
    pub urgency: Option<String>,
    pub patient_name: Option<String>,
    pub notes: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BloodRequestListQuery {
    pub hospital_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApproveRequest {
    pub units_approved: i32,
    pub response: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct RejectRequest {
    pub response: Option<String>,
}

/// POST /api/v1/blood-requests
pub(super) async fn create_blood_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateBloodRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BloodRequestItem>>), ApiError> {
    let rid = &req_id.0;

    if !lifeline_db::is_valid_blood_group(&body.blood_group) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("unknown blood group '{}'", body.blood_group),
        ));
    }
    if body.units_requested <= 0 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "units_requested must be at least 1",
        ));
    }
    let urgency = body.urgency.as_deref().unwrap_or("normal");
    if !lifeline_db::is_valid_urgency(urgency) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("urgency must be 'normal', 'urgent' or 'critical', got '{urgency}'"),
        ));
    }

    lifeline_db::get_hospital(&state.pool, body.hospital_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                rid,
                "not_found",
                format!("hospital '{}' not found", body.hospital_id),
            )
        })?;

    let row = lifeline_db::insert_blood_request(
        &state.pool,
        &lifeline_db::NewBloodRequest {
            user_id: body.user_id,
            user_name: body.user_name.trim(),
            user_phone: body.user_phone.trim(),
            hospital_id: body.hospital_id,
            blood_group: &body.blood_group,
            units_requested: body.units_requested,
            urgency,
            patient_name: body.patient_name.as_deref(),
            notes: body.notes.as_deref(),
            expires_at: body.expires_at,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/blood-requests
pub(super) async fn list_blood_requests(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BloodRequestListQuery>,
) -> Result<Json<ApiResponse<Vec<BloodRequestItem>>>, ApiError> {
    let rows = lifeline_db::list_blood_requests(
        &state.pool,
        query.hospital_id,
        query.user_id,
        query.status.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(BloodRequestItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/blood-requests/{id}
pub(super) async fn get_blood_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BloodRequestItem>>, ApiError> {
    let row = lifeline_db::get_blood_request(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(&req_id.0, "not_found", format!("blood request '{id}' not found"))
        })?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/blood-requests/{id}/approve: reserve stock for a
/// pending request. Short stock answers 409 and changes nothing.
pub(super) async fn approve_blood_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<ApproveRequest>,
) -> Result<Json<ApiResponse<BloodRequestItem>>, ApiError> {
    if body.units_approved <= 0 {
        return Err(ApiError::new(
            &req_id.0,
            "validation_error",
            "units_approved must be at least 1",
        ));
    }

    let row = lifeline_db::approve_blood_request(
        &state.pool,
        id,
        body.units_approved,
        body.response.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/blood-requests/{id}/reject
pub(super) async fn reject_blood_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<RejectRequest>,
) -> Result<Json<ApiResponse<BloodRequestItem>>, ApiError> {
    let row = lifeline_db::reject_blood_request(&state.pool, id, body.response.as_deref())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/blood-requests/{id}/fulfil: hand over the units and
/// release the reservation.
pub(super) async fn fulfil_blood_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BloodRequestItem>>, ApiError> {
    let row = lifeline_db::fulfil_blood_request(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
