use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use attendance_core::domain::{GeoPoint, Role, SchoolClass, TimingEntry, User, UserCredentials};
use attendance_core::ports::{DatabaseService, PortError, PortResult};
use attendance_core::recorder::{AttendanceRecorder, MarkOutcome, RejectReason};
use attendance_core::GeofenceConfig;

const CLASSROOM: GeoPoint = GeoPoint {
    latitude: 37.7662739142613,
    longitude: -121.91465778737411,
};

/// In-memory store standing in for the Postgres adapter. Only the methods
/// the recorder touches mutate state; the roster/auth methods are never
/// reached from these tests and answer with an error if they are.
#[derive(Default)]
struct MockStore {
    users: Mutex<HashMap<String, User>>,
    classes: Mutex<HashMap<Uuid, SchoolClass>>,
    location_writes: Mutex<Vec<(Uuid, GeoPoint)>>,
    presence_writes: Mutex<Vec<(Uuid, bool)>>,
}

impl MockStore {
    fn with_user_and_class(user: User, class: SchoolClass) -> Self {
        let store = Self::default();
        store.users.lock().unwrap().insert(user.email.clone(), user);
        store.classes.lock().unwrap().insert(class.id, class);
        store
    }

    fn last_location_for(&self, user_id: Uuid) -> Option<GeoPoint> {
        self.location_writes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, _)| *id == user_id)
            .map(|(_, point)| *point)
    }

    fn is_present(&self, user_id: Uuid) -> bool {
        self.presence_writes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, _)| *id == user_id)
            .map(|(_, present)| *present)
            .unwrap_or(false)
    }
}

fn unused(method: &str) -> PortError {
    PortError::Unexpected(format!("{method} not exercised by recorder tests"))
}

#[async_trait]
impl DatabaseService for MockStore {
    async fn create_user(
        &self,
        _full_name: &str,
        _email: &str,
        _hashed_password: &str,
        _role: Role,
    ) -> PortResult<User> {
        Err(unused("create_user"))
    }

    async fn get_user_credentials(&self, _email: &str) -> PortResult<UserCredentials> {
        Err(unused("get_user_credentials"))
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<User> {
        self.users
            .lock()
            .unwrap()
            .get(email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {email} not found")))
    }

    async fn find_user_by_id(&self, _user_id: Uuid) -> PortResult<User> {
        Err(unused("find_user_by_id"))
    }

    async fn create_auth_session(
        &self,
        _session_id: &str,
        _user_id: Uuid,
        _expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        Err(unused("create_auth_session"))
    }

    async fn validate_auth_session(&self, _session_id: &str) -> PortResult<Uuid> {
        Err(unused("validate_auth_session"))
    }

    async fn delete_auth_session(&self, _session_id: &str) -> PortResult<()> {
        Err(unused("delete_auth_session"))
    }

    async fn create_class(
        &self,
        _name: &str,
        _entry_code: &str,
        _teacher_id: Uuid,
        _timings: &[TimingEntry],
        _location: GeoPoint,
    ) -> PortResult<SchoolClass> {
        Err(unused("create_class"))
    }

    async fn find_class_by_id(&self, class_id: Uuid) -> PortResult<SchoolClass> {
        self.classes
            .lock()
            .unwrap()
            .get(&class_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Class {class_id} not found")))
    }

    async fn find_class_by_entry_code(&self, _entry_code: &str) -> PortResult<SchoolClass> {
        Err(unused("find_class_by_entry_code"))
    }

    async fn classes_for_user(&self, _user_id: Uuid) -> PortResult<Vec<SchoolClass>> {
        Err(unused("classes_for_user"))
    }

    async fn students_in_class(&self, _class_id: Uuid) -> PortResult<Vec<User>> {
        Err(unused("students_in_class"))
    }

    async fn enroll_student(&self, _class_id: Uuid, _user_id: Uuid) -> PortResult<()> {
        Err(unused("enroll_student"))
    }

    async fn withdraw_student(&self, _class_id: Uuid, _user_id: Uuid) -> PortResult<()> {
        Err(unused("withdraw_student"))
    }

    async fn delete_class(&self, _class_id: Uuid) -> PortResult<()> {
        Err(unused("delete_class"))
    }

    async fn update_user_location(&self, user_id: Uuid, location: GeoPoint) -> PortResult<()> {
        self.location_writes.lock().unwrap().push((user_id, location));
        Ok(())
    }

    async fn set_user_present(&self, user_id: Uuid, present: bool) -> PortResult<()> {
        self.presence_writes.lock().unwrap().push((user_id, present));
        Ok(())
    }
}

fn student(email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        full_name: "John Doe".to_string(),
        email: email.to_string(),
        role: Role::Student,
        class_ids: Vec::new(),
        present: false,
        last_location: None,
    }
}

fn class_with_timings(timings: Vec<TimingEntry>) -> SchoolClass {
    SchoolClass {
        id: Uuid::new_v4(),
        name: "Mathematics".to_string(),
        entry_code: "hg6rf1".to_string(),
        teacher_id: Uuid::new_v4(),
        timings,
        location: CLASSROOM,
        student_ids: Vec::new(),
    }
}

fn timing(day: &str, start_time: &str) -> TimingEntry {
    TimingEntry {
        day: day.to_string(),
        start_time: start_time.to_string(),
        end_time: None,
    }
}

// 2024-09-16 is a Monday.
fn monday_at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, 16)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn recorder(store: &Arc<MockStore>) -> AttendanceRecorder {
    let db: Arc<dyn DatabaseService> = store.clone();
    AttendanceRecorder::new(db, GeofenceConfig::default())
}

/// Roughly 1000 feet north of the classroom.
fn far_away() -> GeoPoint {
    GeoPoint {
        latitude: CLASSROOM.latitude + (1000.0_f64 / (3963.0 * 5280.0)).to_degrees(),
        longitude: CLASSROOM.longitude,
    }
}

#[tokio::test]
async fn marks_present_inside_window_and_geofence() {
    let user = student("johndoe@student.com");
    let user_id = user.id;
    let class = class_with_timings(vec![timing("Monday", "10:02AM")]);
    let class_id = class.id;
    let store = Arc::new(MockStore::with_user_and_class(user, class));

    let outcome = recorder(&store)
        .mark_attendance(
            "johndoe@student.com",
            class_id,
            Some(CLASSROOM),
            monday_at(10, 0),
        )
        .await
        .unwrap();

    assert_eq!(outcome, MarkOutcome::Marked);
    assert!(store.is_present(user_id));
    assert_eq!(store.last_location_for(user_id), Some(CLASSROOM));
}

#[tokio::test]
async fn geofence_rejection_still_records_location() {
    let user = student("johndoe@student.com");
    let user_id = user.id;
    let class = class_with_timings(vec![timing("Monday", "10:02AM")]);
    let class_id = class.id;
    let store = Arc::new(MockStore::with_user_and_class(user, class));
    let reported = far_away();

    let outcome = recorder(&store)
        .mark_attendance(
            "johndoe@student.com",
            class_id,
            Some(reported),
            monday_at(10, 0),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        MarkOutcome::Rejected(RejectReason::OutsideGeofence)
    );
    assert!(!store.is_present(user_id));
    // The near-miss is still auditable.
    assert_eq!(store.last_location_for(user_id), Some(reported));
}

#[tokio::test]
async fn rejects_an_hour_before_the_window() {
    let user = student("johndoe@student.com");
    let user_id = user.id;
    let class = class_with_timings(vec![timing("Monday", "11:00AM")]);
    let class_id = class.id;
    let store = Arc::new(MockStore::with_user_and_class(user, class));

    let outcome = recorder(&store)
        .mark_attendance(
            "johndoe@student.com",
            class_id,
            Some(CLASSROOM),
            monday_at(10, 0),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        MarkOutcome::Rejected(RejectReason::OutsideTimeWindow)
    );
    assert!(!store.is_present(user_id));
    // Location is persisted before the window check runs.
    assert_eq!(store.last_location_for(user_id), Some(CLASSROOM));
}

#[tokio::test]
async fn unknown_email_and_unknown_class_are_distinct_rejections() {
    let user = student("johndoe@student.com");
    let class = class_with_timings(vec![timing("Monday", "10:00AM")]);
    let class_id = class.id;
    let store = Arc::new(MockStore::with_user_and_class(user, class));
    let recorder = recorder(&store);

    let outcome = recorder
        .mark_attendance("nobody@student.com", class_id, Some(CLASSROOM), monday_at(10, 0))
        .await
        .unwrap();
    assert_eq!(outcome, MarkOutcome::Rejected(RejectReason::UserNotFound));

    let outcome = recorder
        .mark_attendance(
            "johndoe@student.com",
            Uuid::new_v4(),
            Some(CLASSROOM),
            monday_at(10, 0),
        )
        .await
        .unwrap();
    assert_eq!(outcome, MarkOutcome::Rejected(RejectReason::ClassNotFound));
}

#[tokio::test]
async fn denied_geolocation_fails_closed_without_location_write() {
    let user = student("johndoe@student.com");
    let user_id = user.id;
    let class = class_with_timings(vec![timing("Monday", "10:00AM")]);
    let class_id = class.id;
    let store = Arc::new(MockStore::with_user_and_class(user, class));

    let outcome = recorder(&store)
        .mark_attendance("johndoe@student.com", class_id, None, monday_at(10, 0))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        MarkOutcome::Rejected(RejectReason::OutsideGeofence)
    );
    assert!(!store.is_present(user_id));
    assert_eq!(store.last_location_for(user_id), None);
}

#[tokio::test]
async fn malformed_timing_entry_does_not_block_a_valid_one() {
    let user = student("johndoe@student.com");
    let user_id = user.id;
    let class = class_with_timings(vec![
        timing("Funday", "10:00AM"),
        timing("Monday", "10:00AM"),
    ]);
    let class_id = class.id;
    let store = Arc::new(MockStore::with_user_and_class(user, class));

    let outcome = recorder(&store)
        .mark_attendance(
            "johndoe@student.com",
            class_id,
            Some(CLASSROOM),
            monday_at(10, 3),
        )
        .await
        .unwrap();

    assert_eq!(outcome, MarkOutcome::Marked);
    assert!(store.is_present(user_id));
}
