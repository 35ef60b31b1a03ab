use crate::location_sample::LocationSample;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters between two (latitude, longitude) pairs given in degrees.
pub fn haversine_distance(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let d_lat = (p2.0 - p1.0).to_radians();
    let d_lon = (p2.1 - p1.1).to_radians();
    let lat1 = p1.0.to_radians();
    let lat2 = p2.0.to_radians();

    let a = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
    let c = 2. * f64::atan2(f64::sqrt(a), f64::sqrt(1. - a));

    EARTH_RADIUS_METERS * c
}

pub fn sample_distance(from: &LocationSample, to: &LocationSample) -> f64 {
    haversine_distance((from.latitude, from.longitude), (to.latitude, to.longitude))
}

/// Sums the distance between every pair of consecutive samples.
/// O(n), so use it for stored routes rather than on every live update.
pub fn route_distance(samples: &[LocationSample]) -> f64 {
    samples
        .windows(2)
        .fold(0., |total, pair| total + sample_distance(&pair[0], &pair[1]))
}
