//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use attendance_core::domain::{GeoPoint, Role, SchoolClass, TimingEntry, User, UserCredentials};
use attendance_core::ports::{DatabaseService, PortError, PortResult};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Translates a unique-constraint violation into a `Conflict`, anything
/// else into `Unexpected`.
fn insert_error(e: sqlx::Error, what: &str) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return PortError::Conflict(format!("{what} already exists"));
        }
    }
    unexpected(e)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    full_name: String,
    email: String,
    role: String,
    classes: Json<Vec<Uuid>>,
    present: bool,
    location_latitude: Option<f64>,
    location_longitude: Option<f64>,
}

impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            PortError::Unexpected(format!("unknown role {:?} for user {}", self.role, self.id))
        })?;
        let last_location = match (self.location_latitude, self.location_longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Ok(User {
            id: self.id,
            full_name: self.full_name,
            email: self.email,
            role,
            class_ids: self.classes.0,
            present: self.present,
            last_location,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
    role: String,
}

impl CredentialsRecord {
    fn to_domain(self) -> PortResult<UserCredentials> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            PortError::Unexpected(format!("unknown role {:?} for user {}", self.role, self.id))
        })?;
        Ok(UserCredentials {
            user_id: self.id,
            email: self.email,
            hashed_password: self.hashed_password,
            role,
        })
    }
}

#[derive(FromRow)]
struct ClassRecord {
    id: Uuid,
    name: String,
    entry_code: String,
    teacher_id: Uuid,
    timings: Json<serde_json::Value>,
    location_latitude: f64,
    location_longitude: f64,
    students: Json<Vec<Uuid>>,
}

impl ClassRecord {
    fn to_domain(self) -> SchoolClass {
        SchoolClass {
            id: self.id,
            name: self.name,
            entry_code: self.entry_code,
            teacher_id: self.teacher_id,
            timings: parse_timings(self.id, self.timings.0),
            location: GeoPoint {
                latitude: self.location_latitude,
                longitude: self.location_longitude,
            },
            student_ids: self.students.0,
        }
    }
}

/// Validates the stored timing array element by element. A malformed
/// element is skipped with a warning so it degrades to "never admits"
/// instead of making the whole class unreadable.
fn parse_timings(class_id: Uuid, raw: serde_json::Value) -> Vec<TimingEntry> {
    let serde_json::Value::Array(elements) = raw else {
        warn!(%class_id, "stored timings are not a JSON array, treating as empty");
        return Vec::new();
    };
    elements
        .into_iter()
        .filter_map(|element| match serde_json::from_value(element) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(%class_id, %err, "skipping malformed timing entry");
                None
            }
        })
        .collect()
}

const USER_COLUMNS: &str =
    "id, full_name, email, role, classes, present, location_latitude, location_longitude";
const CLASS_COLUMNS: &str =
    "id, name, entry_code, teacher_id, timings, location_latitude, location_longitude, students";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(
        &self,
        full_name: &str,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, full_name, email, hashed_password, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(full_name)
        .bind(email)
        .bind(hashed_password)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_error(e, "A user with this email"))?;

        record.to_domain()
    }

    async fn get_user_credentials(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password, role FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;

        record.to_domain()
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;

        record.to_domain()
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;

        record.to_domain()
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "SELECT user_id, expires_at FROM auth_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match row {
            Some((user_id, expires_at)) if expires_at > Utc::now() => Ok(user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_class(
        &self,
        name: &str,
        entry_code: &str,
        teacher_id: Uuid,
        timings: &[TimingEntry],
        location: GeoPoint,
    ) -> PortResult<SchoolClass> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, ClassRecord>(&format!(
            "INSERT INTO classes \
             (id, name, entry_code, teacher_id, timings, location_latitude, location_longitude) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {CLASS_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(entry_code)
        .bind(teacher_id)
        .bind(Json(timings))
        .bind(location.latitude)
        .bind(location.longitude)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| insert_error(e, "A class with this entry code"))?;

        // The teacher's own class list includes the classes they run.
        sqlx::query(
            "UPDATE users SET classes = classes || jsonb_build_array(to_jsonb($1::uuid)) \
             WHERE id = $2",
        )
        .bind(record.id)
        .bind(teacher_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn find_class_by_id(&self, class_id: Uuid) -> PortResult<SchoolClass> {
        let record = sqlx::query_as::<_, ClassRecord>(&format!(
            "SELECT {CLASS_COLUMNS} FROM classes WHERE id = $1"
        ))
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Class {} not found", class_id)))?;

        Ok(record.to_domain())
    }

    async fn find_class_by_entry_code(&self, entry_code: &str) -> PortResult<SchoolClass> {
        let record = sqlx::query_as::<_, ClassRecord>(&format!(
            "SELECT {CLASS_COLUMNS} FROM classes WHERE entry_code = $1"
        ))
        .bind(entry_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| {
            PortError::NotFound(format!("Class with entry code {} not found", entry_code))
        })?;

        Ok(record.to_domain())
    }

    async fn classes_for_user(&self, user_id: Uuid) -> PortResult<Vec<SchoolClass>> {
        let (class_ids,) = sqlx::query_as::<_, (Json<Vec<Uuid>>,)>(
            "SELECT classes FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;

        let records = sqlx::query_as::<_, ClassRecord>(&format!(
            "SELECT {CLASS_COLUMNS} FROM classes WHERE id = ANY($1)"
        ))
        .bind(class_ids.0)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn students_in_class(&self, class_id: Uuid) -> PortResult<Vec<User>> {
        let class = self.find_class_by_id(class_id).await?;

        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) ORDER BY full_name ASC"
        ))
        .bind(class.student_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn enroll_student(&self, class_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, ClassRecord>(&format!(
            "SELECT {CLASS_COLUMNS} FROM classes WHERE id = $1 FOR UPDATE"
        ))
        .bind(class_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Class {} not found", class_id)))?;

        if record.students.0.contains(&user_id) {
            return Err(PortError::Conflict(
                "Student is already enrolled in this class".to_string(),
            ));
        }

        sqlx::query(
            "UPDATE classes SET students = students || jsonb_build_array(to_jsonb($1::uuid)) \
             WHERE id = $2",
        )
        .bind(user_id)
        .bind(class_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query(
            "UPDATE users SET classes = classes || jsonb_build_array(to_jsonb($1::uuid)) \
             WHERE id = $2",
        )
        .bind(class_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn withdraw_student(&self, class_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query("UPDATE classes SET students = students - ($1::uuid)::text WHERE id = $2")
            .bind(user_id)
            .bind(class_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        sqlx::query("UPDATE users SET classes = classes - ($1::uuid)::text WHERE id = $2")
            .bind(class_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn delete_class(&self, class_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Cascade removal from every enrolled (or teaching) user's class list.
        sqlx::query(
            "UPDATE users SET classes = classes - ($1::uuid)::text \
             WHERE classes @> jsonb_build_array(to_jsonb($1::uuid))",
        )
        .bind(class_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        let deleted = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(class_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        if deleted.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Class {} not found", class_id)));
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn update_user_location(&self, user_id: Uuid, location: GeoPoint) -> PortResult<()> {
        sqlx::query(
            "UPDATE users SET location_latitude = $1, location_longitude = $2 WHERE id = $3",
        )
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn set_user_present(&self, user_id: Uuid, present: bool) -> PortResult<()> {
        sqlx::query("UPDATE users SET present = $1 WHERE id = $2")
            .bind(present)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tolerates_malformed_timing_elements() {
        let class_id = Uuid::new_v4();
        let raw = json!([
            { "day": "Monday", "startTime": "10:00AM", "endTime": "11:00AM" },
            { "day": "Wednesday" },
            "not even an object",
            { "day": "Friday", "startTime": "2:00PM" }
        ]);

        let timings = parse_timings(class_id, raw);

        assert_eq!(timings.len(), 2);
        assert_eq!(timings[0].day, "Monday");
        assert_eq!(timings[0].end_time.as_deref(), Some("11:00AM"));
        assert_eq!(timings[1].day, "Friday");
        assert_eq!(timings[1].end_time, None);
    }

    #[test]
    fn non_array_timings_become_empty() {
        assert!(parse_timings(Uuid::new_v4(), json!({"day": "Monday"})).is_empty());
        assert!(parse_timings(Uuid::new_v4(), json!(null)).is_empty());
    }
}
