//! Emergency contact handlers. Contacts belong to a user; there is no
//! standalone contact listing.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ContactItem {
    id: Uuid,
    user_id: Uuid,
    name: String,
    phone: String,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<lifeline_db::ContactRow> for ContactItem {
    fn from(row: lifeline_db::ContactRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateContactRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// GET /api/v1/users/{user_id}/contacts
pub(super) async fn list_contacts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ContactItem>>>, ApiError> {
    let rows = lifeline_db::list_contacts_for_user(&state.pool, user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ContactItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/users/{user_id}/contacts
pub(super) async fn create_contact(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ContactItem>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim();
    if name.is_empty() || name.len() > 200 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "name must be 1 to 200 characters",
        ));
    }
    let phone = body.phone.trim();
    if phone.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "phone is required"));
    }

    let row = lifeline_db::insert_contact(
        &state.pool,
        user_id,
        name,
        phone,
        body.email.as_deref().map(str::trim).filter(|e| !e.is_empty()),
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

/// DELETE /api/v1/contacts/{id}
pub(super) async fn delete_contact(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = lifeline_db::delete_contact(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(
            &req_id.0,
            "not_found",
            format!("contact '{id}' not found"),
        ))
    }
}
