//! crates/attendance_core/src/recorder.rs
//!
//! Orchestrates an attendance attempt: identity and class lookup, the
//! time-window and geofence admission checks, and the state transition
//! that records presence.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::info;
use uuid::Uuid;

use crate::domain::GeoPoint;
use crate::geofence::GeofenceConfig;
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::window;

/// Why an attendance attempt was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UserNotFound,
    ClassNotFound,
    OutsideTimeWindow,
    OutsideGeofence,
}

impl RejectReason {
    /// Stable identifier surfaced to API clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::UserNotFound => "user_not_found",
            RejectReason::ClassNotFound => "class_not_found",
            RejectReason::OutsideTimeWindow => "outside_time_window",
            RejectReason::OutsideGeofence => "outside_geofence",
        }
    }

    /// User-actionable message for reason-specific UI rendering.
    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::UserNotFound => "No account matches this email.",
            RejectReason::ClassNotFound => "This class does not exist.",
            RejectReason::OutsideTimeWindow => {
                "Attendance can only be marked within 5 minutes of the class start time."
            }
            RejectReason::OutsideGeofence => "You are not at the class location.",
        }
    }
}

/// The outcome of an attendance attempt. Rejections are expected,
/// user-actionable results, not errors; infrastructure failures surface
/// as `Err(PortError)` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Marked,
    Rejected(RejectReason),
}

/// The attendance eligibility and recording engine.
///
/// Holds no connection state of its own; every invocation is an
/// independent request-scoped operation against the injected store.
#[derive(Clone)]
pub struct AttendanceRecorder {
    db: Arc<dyn DatabaseService>,
    geofence: GeofenceConfig,
}

impl AttendanceRecorder {
    pub fn new(db: Arc<dyn DatabaseService>, geofence: GeofenceConfig) -> Self {
        Self { db, geofence }
    }

    /// Attempts to mark the caller present for `class_id` at `now`.
    ///
    /// The reported location is persisted even when the attempt is
    /// ultimately rejected, so near-misses stay diagnosable. A missing
    /// location (geolocation denied or unavailable on the device) fails
    /// closed as a geofence rejection and skips the location write.
    ///
    /// Setting `present = true` is idempotent: concurrent attempts for the
    /// same user are safe because the written value never depends on the
    /// previous one.
    pub async fn mark_attendance(
        &self,
        email: &str,
        class_id: Uuid,
        reported: Option<GeoPoint>,
        now: NaiveDateTime,
    ) -> PortResult<MarkOutcome> {
        let user = match self.db.find_user_by_email(email).await {
            Ok(user) => user,
            Err(PortError::NotFound(_)) => {
                return Ok(MarkOutcome::Rejected(RejectReason::UserNotFound))
            }
            Err(err) => return Err(err),
        };

        let class = match self.db.find_class_by_id(class_id).await {
            Ok(class) => class,
            Err(PortError::NotFound(_)) => {
                return Ok(MarkOutcome::Rejected(RejectReason::ClassNotFound))
            }
            Err(err) => return Err(err),
        };

        if let Some(point) = reported {
            self.db.update_user_location(user.id, point).await?;
        }

        if !window::is_within_window(now, &class.timings) {
            return Ok(MarkOutcome::Rejected(RejectReason::OutsideTimeWindow));
        }

        let Some(point) = reported else {
            return Ok(MarkOutcome::Rejected(RejectReason::OutsideGeofence));
        };
        if !self.geofence.admits(point, class.location) {
            return Ok(MarkOutcome::Rejected(RejectReason::OutsideGeofence));
        }

        self.db.set_user_present(user.id, true).await?;
        info!(user = %user.email, class = %class.name, "attendance marked");

        Ok(MarkOutcome::Marked)
    }
}
