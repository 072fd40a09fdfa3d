//! services/api/src/web/rest.rs
//!
//! Contains the profile and liveness handlers and the master definition
//! for the OpenAPI specification.

use attendance_core::domain::GeoPoint;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::web::attendance;
use crate::web::auth;
use crate::web::classes::{self, ClassResponse};
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        me_handler,
        health_handler,
        classes::create_class_handler,
        classes::list_classes_handler,
        classes::join_class_handler,
        classes::leave_class_handler,
        classes::delete_class_handler,
        classes::class_roster_handler,
        attendance::mark_attendance_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            classes::TimingDto,
            classes::CreateClassRequest,
            classes::JoinClassRequest,
            classes::ClassResponse,
            classes::RosterEntry,
            attendance::MarkAttendanceRequest,
            attendance::MarkAttendanceResponse,
            UserProfileResponse,
        )
    ),
    tags(
        (name = "Class Attendance API", description = "API endpoints for rosters and geofenced attendance marking.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The caller's profile with their enrolled classes.
#[derive(Serialize, ToSchema)]
pub struct UserProfileResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_longitude: Option<f64>,
    pub classes: Vec<ClassResponse>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// GET /me - The caller's profile and classes
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Caller profile", body = UserProfileResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state.db.find_user_by_id(user_id).await.map_err(|e| {
        error!("Failed to load caller: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load profile".to_string())
    })?;

    let classes = state.db.classes_for_user(user_id).await.map_err(|e| {
        error!("Failed to load classes: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load profile".to_string())
    })?;

    let (last_latitude, last_longitude) = match user.last_location {
        Some(GeoPoint {
            latitude,
            longitude,
        }) => (Some(latitude), Some(longitude)),
        None => (None, None),
    };

    let response = UserProfileResponse {
        id: user.id,
        full_name: user.full_name,
        email: user.email,
        role: user.role.as_str().to_string(),
        present: user.present,
        last_latitude,
        last_longitude,
        classes: classes.into_iter().map(ClassResponse::from).collect(),
    };

    Ok(Json(response))
}

/// GET /health - Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}
