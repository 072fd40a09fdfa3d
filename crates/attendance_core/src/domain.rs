//! crates/attendance_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format,
//! with one exception: `TimingEntry` carries serde derives because its
//! camelCase JSON shape is the one normalized persisted representation
//! of a class schedule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A geographic coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// One recurring weekly meeting of a class.
///
/// `day` and `start_time` are kept as the raw stored strings; the schedule
/// resolver validates them when an occurrence is needed, so a malformed
/// entry degrades to "never admits" instead of poisoning the whole class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingEntry {
    pub day: String,
    /// 12-hour clock, e.g. "10:00AM".
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

/// The two account roles the system knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    /// Parses the lowercase role string stored in the database.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    /// Ids of the classes the user teaches or is enrolled in.
    pub class_ids: Vec<Uuid>,
    pub present: bool,
    /// Last coordinates reported during an attendance attempt, if any.
    pub last_location: Option<GeoPoint>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// A class with its recurring weekly schedule and registered location.
#[derive(Debug, Clone)]
pub struct SchoolClass {
    pub id: Uuid,
    pub name: String,
    pub entry_code: String,
    pub teacher_id: Uuid,
    pub timings: Vec<TimingEntry>,
    /// Where attendance must be marked from.
    pub location: GeoPoint,
    pub student_ids: Vec<Uuid>,
}
