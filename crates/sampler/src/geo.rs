//! Great-circle helpers

/// Planetary radius used for every distance (meters)
pub const PLANET_RADIUS_M: f64 = 6_373_000.0;

/// Haversine distance between two points in decimal degrees, in meters
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    PLANET_RADIUS_M * c
}

/// Map a course in degrees onto `[0, 1]` so that 0° and 360° coincide
pub fn cyclical_course(course: f64) -> f64 {
    (course.to_radians().sin() + 1.0) / 2.0
}
