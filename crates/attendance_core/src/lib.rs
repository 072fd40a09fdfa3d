pub mod domain;
pub mod geo;
pub mod geofence;
pub mod ports;
pub mod recorder;
pub mod schedule;
pub mod window;

pub use domain::{AuthSession, GeoPoint, Role, SchoolClass, TimingEntry, User, UserCredentials};
pub use geofence::GeofenceConfig;
pub use ports::{DatabaseService, PortError, PortResult};
pub use recorder::{AttendanceRecorder, MarkOutcome, RejectReason};
pub use schedule::ScheduleError;
