use super::Coordinate;

/// Mean Earth radius used by the haversine formula, in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in kilometres
///
/// Uses the haversine formula on a spherical Earth. Inputs are validated
/// [`Coordinate`]s, so the result is always finite.
pub fn distance_km(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine_km(
        from.latitude(),
        from.longitude(),
        to.latitude(),
        to.longitude(),
    )
}

/// Raw haversine on degree values; NaN in, NaN out
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
