mod alerts;
mod blood;
mod contacts;
mod dispatch;
mod hospitals;
mod responders;
mod sos;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use lifeline_core::Dispatcher;
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "location_unavailable" => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

/// Map db-layer errors onto the wire taxonomy. Lifecycle and stock
/// violations are client conflicts, not server faults.
pub(super) fn map_db_error(request_id: String, error: &lifeline_db::DbError) -> ApiError {
    match error {
        lifeline_db::DbError::NotFound => {
            ApiError::new(request_id, "not_found", "record not found")
        }
        lifeline_db::DbError::InvalidStatusTransition { from, to } => ApiError::new(
            request_id,
            "conflict",
            format!("cannot move from '{from}' to '{to}'"),
        ),
        lifeline_db::DbError::InsufficientStock {
            requested,
            available,
        } => ApiError::new(
            request_id,
            "conflict",
            format!("requested {requested} units but only {available} are unreserved"),
        ),
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/dispatch", post(dispatch::create_dispatch))
        .route("/api/v1/sos-requests", get(sos::list_sos_requests))
        .route("/api/v1/sos-requests/{id}", get(sos::get_sos_request))
        .route(
            "/api/v1/sos-requests/{id}/status",
            patch(sos::change_sos_status),
        )
        .route("/api/v1/alerts", get(alerts::list_alerts))
        .route("/api/v1/alerts/{id}", get(alerts::get_alert))
        .route(
            "/api/v1/alerts/{id}/status",
            patch(alerts::change_alert_status),
        )
        .route("/api/v1/hospitals", get(hospitals::list_hospitals))
        .route("/api/v1/hospitals/{id}", get(hospitals::get_hospital))
        .route(
            "/api/v1/hospitals/{id}/blood-inventory",
            put(hospitals::put_blood_inventory),
        )
        .route("/api/v1/responders/{id}", get(responders::get_responder))
        .route(
            "/api/v1/responders/{id}/availability",
            put(responders::put_availability),
        )
        .route(
            "/api/v1/responders/{id}/stats",
            get(responders::get_responder_stats),
        )
        .route(
            "/api/v1/users/{user_id}/contacts",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route("/api/v1/contacts/{id}", delete(contacts::delete_contact))
        .route(
            "/api/v1/blood-requests",
            get(blood::list_blood_requests).post(blood::create_blood_request),
        )
        .route("/api/v1/blood-requests/{id}", get(blood::get_blood_request))
        .route(
            "/api/v1/blood-requests/{id}/approve",
            post(blood::approve_blood_request),
        )
        .route(
            "/api/v1/blood-requests/{id}/reject",
            post(blood::reject_blood_request),
        )
        .route(
            "/api/v1/blood-requests/{id}/fulfil",
            post(blood::fulfil_blood_request),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match lifeline_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use lifeline_relay::{EchoEnhancer, NoopSink};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_app(pool: sqlx::PgPool) -> Router {
        let directory = Arc::new(lifeline_db::PgProviderDirectory::new(pool.clone()));
        let store = Arc::new(lifeline_db::PgDispatchStore::new(pool.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            directory,
            store,
            Arc::new(EchoEnhancer),
            Arc::new(NoopSink),
        ));

        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        build_app(AppState { pool, dispatcher }, auth, default_rate_limit_state())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json parse")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    /// Insert a hospital row directly and return its generated `id`.
    async fn insert_test_hospital(
        pool: &sqlx::PgPool,
        name: &str,
        latitude: f64,
        longitude: f64,
    ) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO hospitals (name, latitude, longitude, is_available) \
             VALUES ($1, $2, $3, true) RETURNING id",
        )
        .bind(name)
        .bind(latitude)
        .bind(longitude)
        .fetch_one(pool)
        .await
        .expect("insert_test_hospital failed")
    }

    /// Insert a verified on-duty responder and return its generated `id`.
    async fn insert_test_responder(pool: &sqlx::PgPool, name: &str, location: &str) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO responders (name, phone, is_verified, is_on_duty, current_location) \
             VALUES ($1, '+91-9000000001', true, true, $2) RETURNING id",
        )
        .bind(name)
        .bind(location)
        .fetch_one(pool)
        .await
        .expect("insert_test_responder failed")
    }

    fn dispatch_body(latitude: f64, longitude: f64) -> serde_json::Value {
        serde_json::json!({
            "user_id": Uuid::new_v4(),
            "user_name": "Asha",
            "user_phone": "+91-9000000000",
            "latitude": latitude,
            "longitude": longitude
        })
    }

    // -------------------------------------------------------------------------
    // Envelope unit tests (no DB)
    // -------------------------------------------------------------------------

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_conflict_maps_to_409() {
        let response = ApiError::new("req-1", "conflict", "already resolved").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn api_error_location_unavailable_maps_to_422() {
        let response =
            ApiError::new("req-1", "location_unavailable", "no position").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn map_db_error_turns_transitions_into_conflicts() {
        let err = lifeline_db::DbError::InvalidStatusTransition {
            from: "pending".to_string(),
            to: "resolved".to_string(),
        };
        let mapped = map_db_error("req-1".to_string(), &err);
        assert_eq!(mapped.error.code, "conflict");
        assert!(mapped.error.message.contains("pending"));
    }

    #[test]
    fn map_db_error_turns_short_stock_into_conflicts() {
        let err = lifeline_db::DbError::InsufficientStock {
            requested: 4,
            available: 1,
        };
        let mapped = map_db_error("req-1".to_string(), &err);
        assert_eq!(mapped.error.code, "conflict");
        assert!(mapped.error.message.contains('4'));
    }

    // -------------------------------------------------------------------------
    // Health
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_reports_ok(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(get_request("/api/v1/health"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"].as_str(), Some("ok"));
        assert!(json["meta"]["request_id"].is_string());
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn dispatch_assigns_the_nearest_hospital(pool: sqlx::PgPool) {
        // Caller at (18.52, 73.85); "Near" is ~1 km away, "Far" is ~60 km.
        let near = insert_test_hospital(&pool, "Near", 18.53, 73.85).await;
        insert_test_hospital(&pool, "Far", 19.07, 73.50).await;
        insert_test_responder(&pool, "Kiran", "(73.85,18.52)").await;

        let app = test_app(pool.clone());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/dispatch",
                dispatch_body(18.52, 73.85),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["outcome"]["kind"].as_str(), Some("hospital_assigned"));
        assert_eq!(
            json["data"]["outcome"]["hospital_id"].as_str(),
            Some(near.to_string().as_str())
        );
        assert_eq!(json["data"]["notify"].as_str(), Some("skipped"));

        let rows = lifeline_db::list_sos_requests(&pool, None, None, 10)
            .await
            .expect("list sos");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].assigned_hospital_id, near);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn dispatch_falls_back_to_a_responder(pool: sqlx::PgPool) {
        // Only hospital is ~60 km out, beyond the assignment radius.
        insert_test_hospital(&pool, "Far", 19.07, 73.50).await;
        let responder = insert_test_responder(&pool, "Kiran", "(73.86,18.53)").await;

        let app = test_app(pool.clone());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/dispatch",
                dispatch_body(18.52, 73.85),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(
            json["data"]["outcome"]["kind"].as_str(),
            Some("responder_assigned")
        );
        assert_eq!(
            json["data"]["outcome"]["responder_id"].as_str(),
            Some(responder.to_string().as_str())
        );

        let alerts = lifeline_db::list_emergency_alerts(&pool, Some(responder), None, 10)
            .await
            .expect("list alerts");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].status, "active");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn dispatch_with_no_providers_logs_without_records(pool: sqlx::PgPool) {
        let app = test_app(pool.clone());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/dispatch",
                dispatch_body(18.52, 73.85),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["outcome"]["kind"].as_str(), Some("logged"));

        let sos = lifeline_db::list_sos_requests(&pool, None, None, 10)
            .await
            .expect("list sos");
        assert!(sos.is_empty());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn dispatch_without_location_is_unprocessable(pool: sqlx::PgPool) {
        insert_test_hospital(&pool, "Near", 18.53, 73.85).await;

        let app = test_app(pool.clone());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/dispatch",
                serde_json::json!({ "user_id": Uuid::new_v4() }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("location_unavailable"));

        let sos = lifeline_db::list_sos_requests(&pool, None, None, 10)
            .await
            .expect("list sos");
        assert!(sos.is_empty(), "a failed dispatch must write nothing");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn dispatch_rejects_an_unknown_category(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/dispatch",
                serde_json::json!({
                    "user_id": Uuid::new_v4(),
                    "latitude": 18.52,
                    "longitude": 73.85,
                    "category": "vibes"
                }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    // -------------------------------------------------------------------------
    // SOS lifecycle over HTTP
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn sos_status_walks_and_conflicts_over_http(pool: sqlx::PgPool) {
        insert_test_hospital(&pool, "Near", 18.53, 73.85).await;

        let app = test_app(pool.clone());
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/dispatch",
                dispatch_body(18.52, 73.85),
            ))
            .await
            .expect("response");
        let json = body_json(response).await;
        let record_id = json["data"]["outcome"]["record_id"]
            .as_str()
            .expect("record id")
            .to_owned();

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/api/v1/sos-requests/{record_id}/status"),
                serde_json::json!({ "status": "acknowledged" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"].as_str(), Some("acknowledged"));

        let response = app
            .oneshot(json_request(
                "PATCH",
                &format!("/api/v1/sos-requests/{record_id}/status"),
                serde_json::json!({ "status": "resolved" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("conflict"));
    }

    // -------------------------------------------------------------------------
    // Hospitals and inventory
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn hospital_directory_embeds_blood_stock(pool: sqlx::PgPool) {
        let hospital = insert_test_hospital(&pool, "Ruby Hall Clinic", 18.53, 73.87).await;
        lifeline_db::upsert_inventory(&pool, hospital, "A+", 10)
            .await
            .expect("stock");

        let app = test_app(pool);
        let response = app
            .oneshot(get_request("/api/v1/hospitals"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["name"].as_str(), Some("Ruby Hall Clinic"));
        let stock = data[0]["blood_stock"].as_array().expect("stock array");
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0]["blood_group"].as_str(), Some("A+"));
        assert_eq!(stock[0]["units_available"].as_i64(), Some(10));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn inventory_put_validates_the_blood_group(pool: sqlx::PgPool) {
        let hospital = insert_test_hospital(&pool, "Ruby Hall Clinic", 18.53, 73.87).await;

        let app = test_app(pool);
        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/hospitals/{hospital}/blood-inventory"),
                serde_json::json!({ "blood_group": "Q+", "units_available": 5 }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unknown_hospital_is_404(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(get_request(&format!("/api/v1/hospitals/{}", Uuid::new_v4())))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // -------------------------------------------------------------------------
    // Responders
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn responder_availability_round_trip(pool: sqlx::PgPool) {
        let responder = insert_test_responder(&pool, "Kiran", "(73.85,18.52)").await;

        let app = test_app(pool);
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/responders/{responder}/availability"),
                serde_json::json!({ "on_duty": false }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["is_on_duty"].as_bool(), Some(false));
        assert_eq!(
            json["data"]["current_location"].as_str(),
            Some("(73.85,18.52)"),
            "location survives going off duty"
        );

        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/responders/{responder}/availability"),
                serde_json::json!({ "on_duty": true, "latitude": 18.6, "longitude": 73.9 }),
            ))
            .await
            .expect("response");
        let json = body_json(response).await;
        assert_eq!(json["data"]["is_on_duty"].as_bool(), Some(true));
        assert_eq!(json["data"]["current_location"].as_str(), Some("(73.9,18.6)"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn responder_availability_needs_both_coordinates(pool: sqlx::PgPool) {
        let responder = insert_test_responder(&pool, "Kiran", "(73.85,18.52)").await;

        let app = test_app(pool);
        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/responders/{responder}/availability"),
                serde_json::json!({ "on_duty": true, "latitude": 18.6 }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // -------------------------------------------------------------------------
    // Contacts
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn contact_create_list_delete_over_http(pool: sqlx::PgPool) {
        let user = Uuid::new_v4();
        let app = test_app(pool);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/v1/users/{user}/contacts"),
                serde_json::json!({ "name": "Zoya", "phone": "+91-9000000002" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        let contact_id = json["data"]["id"].as_str().expect("contact id").to_owned();

        let response = app
            .clone()
            .oneshot(get_request(&format!("/api/v1/users/{user}/contacts")))
            .await
            .expect("response");
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().map(Vec::len), Some(1));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/contacts/{contact_id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/contacts/{contact_id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // -------------------------------------------------------------------------
    // Blood workflow over HTTP
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn blood_request_approval_conflicts_when_stock_is_short(pool: sqlx::PgPool) {
        let hospital = insert_test_hospital(&pool, "Ruby Hall Clinic", 18.53, 73.87).await;
        lifeline_db::upsert_inventory(&pool, hospital, "B+", 2)
            .await
            .expect("stock");

        let app = test_app(pool);
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/blood-requests",
                serde_json::json!({
                    "user_id": Uuid::new_v4(),
                    "user_name": "Asha",
                    "user_phone": "+91-9000000000",
                    "hospital_id": hospital,
                    "blood_group": "B+",
                    "units_requested": 5,
                    "urgency": "urgent"
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        let request_id = json["data"]["id"].as_str().expect("request id").to_owned();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/v1/blood-requests/{request_id}/approve"),
                serde_json::json!({ "units_approved": 5 }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/v1/blood-requests/{request_id}/approve"),
                serde_json::json!({ "units_approved": 2, "response": "Partial approval" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"].as_str(), Some("approved"));
        assert_eq!(json["data"]["units_approved"].as_i64(), Some(2));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn blood_request_for_an_unknown_hospital_is_404(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/blood-requests",
                serde_json::json!({
                    "user_id": Uuid::new_v4(),
                    "user_name": "Asha",
                    "user_phone": "+91-9000000000",
                    "hospital_id": Uuid::new_v4(),
                    "blood_group": "A+",
                    "units_requested": 1
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
