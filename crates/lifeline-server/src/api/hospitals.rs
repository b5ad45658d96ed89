//! Hospital directory handlers, including each hospital's blood stock.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct BloodStockItem {
    pub blood_group: String,
    pub units_available: i32,
    pub units_reserved: i32,
}

#[derive(Debug, Serialize)]
pub(super) struct HospitalItem {
    id: Uuid,
    name: String,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    is_available: bool,
    blood_stock: Vec<BloodStockItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct InventoryUpdateRequest {
    pub blood_group: String,
    pub units_available: i32,
}

fn hospital_item(row: lifeline_db::HospitalRow, blood_stock: Vec<BloodStockItem>) -> HospitalItem {
    HospitalItem {
        id: row.id,
        name: row.name,
        address: row.address,
        phone: row.phone,
        email: row.email,
        latitude: row.latitude,
        longitude: row.longitude,
        is_available: row.is_available,
        blood_stock,
    }
}

fn stock_item(row: lifeline_db::BloodInventoryRow) -> BloodStockItem {
    BloodStockItem {
        blood_group: row.blood_group,
        units_available: row.units_available,
        units_reserved: row.units_reserved,
    }
}

/// GET /api/v1/hospitals: the full directory with per-group stock.
pub(super) async fn list_hospitals(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<HospitalItem>>>, ApiError> {
    let hospitals = lifeline_db::list_hospitals(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let inventory = lifeline_db::list_inventory(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut stock_by_hospital: HashMap<Uuid, Vec<BloodStockItem>> = HashMap::new();
    for row in inventory {
        stock_by_hospital
            .entry(row.hospital_id)
            .or_default()
            .push(stock_item(row));
    }

    let data = hospitals
        .into_iter()
        .map(|row| {
            let stock = stock_by_hospital.remove(&row.id).unwrap_or_default();
            hospital_item(row, stock)
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/hospitals/{id}
pub(super) async fn get_hospital(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<HospitalItem>>, ApiError> {
    let row = resolve_hospital(&state.pool, id, &req_id.0).await?;
    let stock = lifeline_db::list_inventory_for_hospital(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .into_iter()
        .map(stock_item)
        .collect();

    Ok(Json(ApiResponse {
        data: hospital_item(row, stock),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/v1/hospitals/{id}/blood-inventory: set one group's stock.
///
/// Restocking replaces `units_available` only; reservations made by the
/// approval workflow stay as they are.
pub(super) async fn put_blood_inventory(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<InventoryUpdateRequest>,
) -> Result<Json<ApiResponse<BloodStockItem>>, ApiError> {
    let rid = &req_id.0;

    if !lifeline_db::is_valid_blood_group(&body.blood_group) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("unknown blood group '{}'", body.blood_group),
        ));
    }
    if body.units_available < 0 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "units_available must be zero or more",
        ));
    }

    resolve_hospital(&state.pool, id, rid).await?;

    let row = lifeline_db::upsert_inventory(&state.pool, id, &body.blood_group, body.units_available)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: stock_item(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Resolve a hospital id to its row, returning 404 if not found.
async fn resolve_hospital(
    pool: &sqlx::PgPool,
    id: Uuid,
    request_id: &str,
) -> Result<lifeline_db::HospitalRow, ApiError> {
    lifeline_db::get_hospital(pool, id)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?
        .ok_or_else(|| {
            ApiError::new(request_id, "not_found", format!("hospital '{id}' not found"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hospital_item_serializes_with_nested_stock() {
        let item = HospitalItem {
            id: Uuid::new_v4(),
            name: "Ruby Hall Clinic".to_string(),
            address: Some("40 Sassoon Road, Pune".to_string()),
            phone: None,
            email: None,
            latitude: Some(18.5308),
            longitude: Some(73.8775),
            is_available: true,
            blood_stock: vec![BloodStockItem {
                blood_group: "A+".to_string(),
                units_available: 10,
                units_reserved: 2,
            }],
        };
        let json = serde_json::to_string(&item).expect("serialize hospital");
        assert!(json.contains("\"blood_group\":\"A+\""));
        assert!(json.contains("\"units_reserved\":2"));
    }
}
