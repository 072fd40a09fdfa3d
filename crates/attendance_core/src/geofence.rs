//! crates/attendance_core/src/geofence.rs
//!
//! The geographic admission check: is a reported position within the
//! admissible radius of a class's registered location?

use crate::domain::GeoPoint;
use crate::geo;

/// Default admissible radius, in feet.
pub const DEFAULT_RADIUS_FEET: f64 = 20.0;

/// Geofence policy. The radius is configuration, not a per-call constant.
#[derive(Debug, Clone, Copy)]
pub struct GeofenceConfig {
    pub radius_feet: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            radius_feet: DEFAULT_RADIUS_FEET,
        }
    }
}

impl GeofenceConfig {
    /// Returns true when `reported` lies within the radius of `target`,
    /// boundary-inclusive.
    pub fn admits(&self, reported: GeoPoint, target: GeoPoint) -> bool {
        geo::distance_feet(reported, target) <= self.radius_feet
    }
}
