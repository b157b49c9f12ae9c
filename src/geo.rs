//! Great-circle geometry between turbine positions (WGS84 lat/lon degrees).

/// Mean Earth radius (IUGG), in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance in metres (haversine).
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial bearing from point 1 to point 2, degrees clockwise from north in
/// `[0, 360)`.
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dlambda = (lon2 - lon1).to_radians();
    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    crate::math::wrap_360(y.atan2(x).to_degrees())
}

/// Arithmetic centroid of a set of positions. Adequate for a single wind
/// farm; not for sets spanning the antimeridian.
pub fn centroid(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.0).sum::<f64>() / n;
    let lon = points.iter().map(|p| p.1).sum::<f64>() / n;
    Some((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance_to_self() {
        assert!(distance_m(50.0, 2.75, 50.0, 2.75).abs() < 1e-6);
    }

    #[test]
    fn test_one_degree_of_latitude_is_about_111km() {
        let d = distance_m(50.0, 2.75, 51.0, 2.75);
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn test_cardinal_bearings() {
        assert!(bearing_deg(50.0, 2.0, 51.0, 2.0).abs() < 1e-6);
        assert!((bearing_deg(50.0, 2.0, 49.0, 2.0) - 180.0).abs() < 1e-6);
        let east = bearing_deg(0.0, 0.0, 0.0, 1.0);
        assert!((east - 90.0).abs() < 1e-6);
        let west = bearing_deg(0.0, 1.0, 0.0, 0.0);
        assert!((west - 270.0).abs() < 1e-6);
    }

    #[test]
    fn test_centroid() {
        assert_eq!(centroid(&[]), None);
        assert_eq!(centroid(&[(50.0, 2.0), (52.0, 4.0)]), Some((51.0, 3.0)));
    }
}
