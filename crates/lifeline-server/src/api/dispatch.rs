//! The panic button: one POST resolves an emergency to a provider,
//! records it, and kicks off the notification.

use axum::{extract::State, http::StatusCode, Extension, Json};
use lifeline_core::{
    Coordinate, DispatchContext, DispatchError, DispatchReport, DispatchTrigger, EmergencyCategory,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

const DEFAULT_USER_NAME: &str = "User";
const DEFAULT_USER_PHONE: &str = "Not provided";

#[derive(Debug, Deserialize)]
pub(super) struct DispatchRequest {
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub user_phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub category: Option<String>,
    pub note: Option<String>,
}

/// POST /api/v1/dispatch: raise an emergency.
///
/// A missing or unusable location is a 422: nothing was written and
/// nothing was sent. A persisted emergency answers 201 even when the
/// trailing notification failed; the report says so instead.
pub(super) async fn create_dispatch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<DispatchRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DispatchReport>>), ApiError> {
    let rid = &req_id.0;

    let category = match body.category.as_deref() {
        None => EmergencyCategory::default(),
        Some(raw) => EmergencyCategory::parse(raw).ok_or_else(|| {
            ApiError::new(
                rid,
                "validation_error",
                format!("category must be 'medical' or 'safety', got '{raw}'"),
            )
        })?,
    };

    let trigger = DispatchTrigger {
        context: DispatchContext {
            user_id: body.user_id,
            user_name: body
                .user_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_owned()),
            user_phone: body
                .user_phone
                .filter(|phone| !phone.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_PHONE.to_owned()),
        },
        location: Coordinate::from_parts(body.latitude, body.longitude),
        category,
        note: body.note,
    };

    let report = state.dispatcher.dispatch(trigger).await.map_err(|e| match e {
        DispatchError::LocationUnavailable => ApiError::new(
            rid,
            "location_unavailable",
            "caller location is required for dispatch",
        ),
        DispatchError::Persist(source) => {
            tracing::error!(error = %source, "dispatch could not record the emergency");
            ApiError::new(rid, "dispatch_failed", "failed to record the emergency")
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: report,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
