//! crates/attendance_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{GeoPoint, Role, SchoolClass, TimingEntry, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(
        &self,
        full_name: &str,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User>;

    async fn get_user_credentials(&self, email: &str) -> PortResult<UserCredentials>;

    async fn find_user_by_email(&self, email: &str) -> PortResult<User>;

    async fn find_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Class and Roster Management ---
    async fn create_class(
        &self,
        name: &str,
        entry_code: &str,
        teacher_id: Uuid,
        timings: &[TimingEntry],
        location: GeoPoint,
    ) -> PortResult<SchoolClass>;

    async fn find_class_by_id(&self, class_id: Uuid) -> PortResult<SchoolClass>;

    async fn find_class_by_entry_code(&self, entry_code: &str) -> PortResult<SchoolClass>;

    async fn classes_for_user(&self, user_id: Uuid) -> PortResult<Vec<SchoolClass>>;

    async fn students_in_class(&self, class_id: Uuid) -> PortResult<Vec<User>>;

    async fn enroll_student(&self, class_id: Uuid, user_id: Uuid) -> PortResult<()>;

    async fn withdraw_student(&self, class_id: Uuid, user_id: Uuid) -> PortResult<()>;

    /// Deletes a class and removes its id from every enrolled user's class
    /// list in the same transaction.
    async fn delete_class(&self, class_id: Uuid) -> PortResult<()>;

    // --- Attendance Writes ---
    /// Overwrites the user's last-known location. Single-statement update;
    /// the written value does not depend on the previous one.
    async fn update_user_location(&self, user_id: Uuid, location: GeoPoint) -> PortResult<()>;

    /// Sets the user's presence flag. Idempotent single-statement update.
    async fn set_user_present(&self, user_id: Uuid, present: bool) -> PortResult<()>;
}
