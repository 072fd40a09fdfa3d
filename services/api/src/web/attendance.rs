//! services/api/src/web/attendance.rs
//!
//! The attendance endpoint: runs the eligibility engine for the caller's
//! wall-clock time and reported position.

use attendance_core::domain::GeoPoint;
use attendance_core::recorder::MarkOutcome;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct MarkAttendanceRequest {
    pub class_id: Uuid,
    /// Absent coordinates mean the device denied geolocation; the attempt
    /// then fails closed on the geofence check.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct MarkAttendanceResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub message: String,
}

//=========================================================================================
// Handler
//=========================================================================================

/// POST /attendance - Mark the caller present for a class
#[utoipa::path(
    post,
    path = "/attendance",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "Attempt evaluated; see the success flag", body = MarkAttendanceResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mark_attendance_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<MarkAttendanceRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state.db.find_user_by_id(user_id).await.map_err(|e| {
        error!("Failed to load caller: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to mark attendance".to_string())
    })?;

    let reported = match (req.latitude, req.longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint {
            latitude,
            longitude,
        }),
        _ => None,
    };

    let outcome = state
        .recorder
        .mark_attendance(&user.email, req.class_id, reported, Local::now().naive_local())
        .await
        .map_err(|e| {
            error!("Attendance attempt failed: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to mark attendance".to_string())
        })?;

    let response = match outcome {
        MarkOutcome::Marked => MarkAttendanceResponse {
            success: true,
            reason: None,
            message: "Attendance marked successfully".to_string(),
        },
        MarkOutcome::Rejected(reason) => MarkAttendanceResponse {
            success: false,
            reason: Some(reason.as_str().to_string()),
            message: reason.message().to_string(),
        },
    };

    Ok(Json(response))
}
