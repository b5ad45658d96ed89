//! Emergency alert read and lifecycle handlers (responder-assigned
//! incidents).

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
pub(super) struct EmergencyAlertItem {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    user_phone: String,
    alert_type: String,
    description: String,
    location_lat: f64,
    location_lng: f64,
    location_description: String,
    status: String,
    responder_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<lifeline_db::EmergencyAlertRow> for EmergencyAlertItem {
    fn from(row: lifeline_db::EmergencyAlertRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            user_phone: row.user_phone,
            alert_type: row.alert_type,
            description: row.description,
            location_lat: row.location_lat,
            location_lng: row.location_lng,
            location_description: row.location_description,
            status: row.status,
            responder_id: row.responder_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AlertListQuery {
    pub responder_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusChangeRequest {
    pub status: String,
}

/// GET /api/v1/alerts: newest first, optionally filtered.
pub(super) async fn list_alerts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AlertListQuery>,
) -> Result<Json<ApiResponse<Vec<EmergencyAlertItem>>>, ApiError> {
    if let Some(status) = query.status.as_deref() {
        if !lifeline_db::is_alert_status(status) {
            return Err(ApiError::new(
                &req_id.0,
                "validation_error",
                format!("unknown alert status '{status}'"),
            ));
        }
    }

    let rows = lifeline_db::list_emergency_alerts(
        &state.pool,
        query.responder_id,
        query.status.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(EmergencyAlertItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/alerts/{id}
pub(super) async fn get_alert(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EmergencyAlertItem>>, ApiError> {
    let row = lifeline_db::get_emergency_alert(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(&req_id.0, "not_found", format!("alert '{id}' not found")))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/alerts/{id}/status: walk the lifecycle.
pub(super) async fn change_alert_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChangeRequest>,
) -> Result<Json<ApiResponse<EmergencyAlertItem>>, ApiError> {
    if !lifeline_db::is_alert_status(&body.status) {
        return Err(ApiError::new(
            &req_id.0,
            "validation_error",
            format!("unknown alert status '{}'", body.status),
        ));
    }

    let row = lifeline_db::transition_alert_status(&state.pool, id, &body.status)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_item_is_serializable() {
        let item = EmergencyAlertItem {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "Asha".to_string(),
            user_phone: "+91-9000000000".to_string(),
            alert_type: "safety".to_string(),
            description: "Needs assistance.".to_string(),
            location_lat: 18.5204,
            location_lng: 73.8567,
            location_description: "Current Location".to_string(),
            status: "active".to_string(),
            responder_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&item).expect("serialize alert");
        assert!(json.contains("\"alert_type\":\"safety\""));
        assert!(json.contains("\"status\":\"active\""));
    }
}
