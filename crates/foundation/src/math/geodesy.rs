use crate::coord::Coordinate;

/// IUGG mean Earth radius (meters).
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance in meters (haversine on a sphere).
///
/// Symmetric, and exactly `0.0` for identical points. Longitude differences
/// are taken the short way round, so `-180` and `180` are the same meridian.
pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }

    let mut dlon = b.longitude - a.longitude;
    if dlon > 180.0 {
        dlon -= 360.0;
    } else if dlon < -180.0 {
        dlon += 360.0;
    }

    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let half_dlat = (b.latitude - a.latitude).to_radians() * 0.5;
    let half_dlon = dlon.to_radians() * 0.5;

    let sin_dlat = half_dlat.sin();
    let sin_dlon = half_dlon.sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;

    2.0 * EARTH_MEAN_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial great-circle bearing from `from` to `to`, degrees clockwise from
/// north in `[0, 360)`. Identical points yield `0.0`.
pub fn initial_bearing_deg(from: Coordinate, to: Coordinate) -> f64 {
    if from == to {
        return 0.0;
    }

    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let deg = y.atan2(x).to_degrees();
    let normalized = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Sum of consecutive great-circle distances along `points`.
pub fn path_length_m(points: &[Coordinate]) -> f64 {
    points.windows(2).map(|w| distance_m(w[0], w[1])).sum()
}
