//! services/api/src/web/classes.rs
//!
//! Class and roster endpoints: teachers create and delete classes,
//! students join and leave them by entry code.

use attendance_core::domain::{GeoPoint, Role, SchoolClass, TimingEntry};
use attendance_core::ports::PortError;
use attendance_core::schedule;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// One weekly meeting, as it appears on the wire.
#[derive(Deserialize, Serialize, ToSchema)]
pub struct TimingDto {
    pub day: String,
    /// 12-hour clock, e.g. "10:00AM".
    pub start_time: String,
    pub end_time: Option<String>,
}

impl From<TimingDto> for TimingEntry {
    fn from(dto: TimingDto) -> Self {
        TimingEntry {
            day: dto.day,
            start_time: dto.start_time,
            end_time: dto.end_time,
        }
    }
}

impl From<TimingEntry> for TimingDto {
    fn from(entry: TimingEntry) -> Self {
        TimingDto {
            day: entry.day,
            start_time: entry.start_time,
            end_time: entry.end_time,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateClassRequest {
    pub name: String,
    pub entry_code: String,
    pub timings: Vec<TimingDto>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct JoinClassRequest {
    pub entry_code: String,
}

#[derive(Serialize, ToSchema)]
pub struct ClassResponse {
    pub id: Uuid,
    pub name: String,
    pub entry_code: String,
    pub timings: Vec<TimingDto>,
    pub latitude: f64,
    pub longitude: f64,
    pub student_count: usize,
}

impl From<SchoolClass> for ClassResponse {
    fn from(class: SchoolClass) -> Self {
        ClassResponse {
            id: class.id,
            name: class.name,
            entry_code: class.entry_code,
            timings: class.timings.into_iter().map(TimingDto::from).collect(),
            latitude: class.location.latitude,
            longitude: class.location.longitude,
            student_count: class.student_ids.len(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RosterEntry {
    pub id: Uuid,
    pub full_name: String,
    pub present: bool,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /classes - Create a class (teachers only)
#[utoipa::path(
    post,
    path = "/classes",
    request_body = CreateClassRequest,
    responses(
        (status = 201, description = "Class created", body = ClassResponse),
        (status = 400, description = "Malformed timing entry"),
        (status = 403, description = "Caller is not a teacher"),
        (status = 409, description = "Entry code already in use")
    )
)]
pub async fn create_class_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateClassRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require_teacher(&state, user_id).await?;

    let timings: Vec<TimingEntry> = req.timings.into_iter().map(TimingEntry::from).collect();
    for timing in &timings {
        schedule::validate_entry(timing)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    }

    let location = GeoPoint {
        latitude: req.latitude,
        longitude: req.longitude,
    };
    let class = state
        .db
        .create_class(&req.name, &req.entry_code, user_id, &timings, location)
        .await
        .map_err(|e| match e {
            PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            other => {
                error!("Failed to create class: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create class".to_string())
            }
        })?;

    Ok((StatusCode::CREATED, Json(ClassResponse::from(class))))
}

/// GET /classes - List the caller's classes
#[utoipa::path(
    get,
    path = "/classes",
    responses(
        (status = 200, description = "Classes the caller teaches or attends", body = [ClassResponse])
    )
)]
pub async fn list_classes_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let classes = state.db.classes_for_user(user_id).await.map_err(|e| {
        error!("Failed to list classes: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to list classes".to_string())
    })?;

    let response: Vec<ClassResponse> = classes.into_iter().map(ClassResponse::from).collect();
    Ok(Json(response))
}

/// POST /classes/join - Join a class by entry code
#[utoipa::path(
    post,
    path = "/classes/join",
    request_body = JoinClassRequest,
    responses(
        (status = 200, description = "Joined", body = ClassResponse),
        (status = 404, description = "No class with this entry code"),
        (status = 409, description = "Already enrolled")
    )
)]
pub async fn join_class_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<JoinClassRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let class = state
        .db
        .find_class_by_entry_code(&req.entry_code)
        .await
        .map_err(|e| match e {
            PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            other => {
                error!("Failed to look up entry code: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to join class".to_string())
            }
        })?;

    state
        .db
        .enroll_student(class.id, user_id)
        .await
        .map_err(|e| match e {
            PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            other => {
                error!("Failed to enroll student: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to join class".to_string())
            }
        })?;

    Ok(Json(ClassResponse::from(class)))
}

/// POST /classes/{id}/leave - Leave a class
#[utoipa::path(
    post,
    path = "/classes/{id}/leave",
    params(("id" = Uuid, Path, description = "Class id")),
    responses(
        (status = 200, description = "Left the class"),
        (status = 404, description = "Class not found")
    )
)]
pub async fn leave_class_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(class_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // Confirm the class exists so an unknown id is a 404, not a no-op.
    state.db.find_class_by_id(class_id).await.map_err(|e| match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        other => {
            error!("Failed to look up class: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to leave class".to_string())
        }
    })?;

    state
        .db
        .withdraw_student(class_id, user_id)
        .await
        .map_err(|e| {
            error!("Failed to withdraw student: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to leave class".to_string())
        })?;

    Ok(StatusCode::OK)
}

/// DELETE /classes/{id} - Delete a class (owning teacher only)
#[utoipa::path(
    delete,
    path = "/classes/{id}",
    params(("id" = Uuid, Path, description = "Class id")),
    responses(
        (status = 200, description = "Class deleted"),
        (status = 403, description = "Caller does not own this class"),
        (status = 404, description = "Class not found")
    )
)]
pub async fn delete_class_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(class_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let class = state.db.find_class_by_id(class_id).await.map_err(|e| match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        other => {
            error!("Failed to look up class: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete class".to_string())
        }
    })?;

    if class.teacher_id != user_id {
        return Err((
            StatusCode::FORBIDDEN,
            "Only the class teacher can delete a class".to_string(),
        ));
    }

    state.db.delete_class(class_id).await.map_err(|e| {
        error!("Failed to delete class: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete class".to_string())
    })?;

    Ok(StatusCode::OK)
}

/// GET /classes/{id}/students - Roster with presence flags (owning teacher only)
#[utoipa::path(
    get,
    path = "/classes/{id}/students",
    params(("id" = Uuid, Path, description = "Class id")),
    responses(
        (status = 200, description = "Enrolled students", body = [RosterEntry]),
        (status = 403, description = "Caller does not own this class"),
        (status = 404, description = "Class not found")
    )
)]
pub async fn class_roster_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(class_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let class = state.db.find_class_by_id(class_id).await.map_err(|e| match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        other => {
            error!("Failed to look up class: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch roster".to_string())
        }
    })?;

    if class.teacher_id != user_id {
        return Err((
            StatusCode::FORBIDDEN,
            "Only the class teacher can view the roster".to_string(),
        ));
    }

    let students = state.db.students_in_class(class_id).await.map_err(|e| {
        error!("Failed to fetch roster: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch roster".to_string())
    })?;

    let roster: Vec<RosterEntry> = students
        .into_iter()
        .map(|s| RosterEntry {
            id: s.id,
            full_name: s.full_name,
            present: s.present,
        })
        .collect();

    Ok(Json(roster))
}

/// Rejects callers whose account role is not `Teacher`.
async fn require_teacher(
    state: &Arc<AppState>,
    user_id: Uuid,
) -> Result<(), (StatusCode, String)> {
    let user = state.db.find_user_by_id(user_id).await.map_err(|e| {
        error!("Failed to load caller: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to verify role".to_string())
    })?;

    if user.role != Role::Teacher {
        return Err((
            StatusCode::FORBIDDEN,
            "Only teachers can perform this action".to_string(),
        ));
    }
    Ok(())
}
