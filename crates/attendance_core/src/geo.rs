//! crates/attendance_core/src/geo.rs
//!
//! Great-circle distance between two coordinates.

use crate::domain::GeoPoint;

/// Mean Earth radius in statute miles.
const EARTH_RADIUS_MILES: f64 = 3963.0;
const FEET_PER_MILE: f64 = 5280.0;

/// Computes the haversine distance between two points, in feet.
///
/// Pure and total: NaN inputs propagate as NaN, validation is the
/// caller's responsibility.
pub fn distance_feet(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_MILES * c * FEET_PER_MILE
}
