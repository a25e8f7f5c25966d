/// Mean Earth radius in nautical miles
pub(crate) const EARTH_RADIUS_NM: f64 = 3440.0;

/// Calculate great-circle distance between two points using Haversine formula
/// Returns distance in nautical miles
pub(crate) fn haversine_distance_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_NM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(haversine_distance_nm(40.0, -74.0, 40.0, -74.0), 0.0);
    }

    #[test]
    fn test_fifth_of_a_degree_of_latitude_is_about_twelve_nm() {
        let d = haversine_distance_nm(40.0, -74.0, 40.2, -74.0);
        assert!((d - 12.0).abs() < 0.1, "got {d}");
    }

    #[test]
    fn test_hundredth_of_a_degree_is_well_under_a_mile() {
        let d = haversine_distance_nm(40.0, -74.0, 40.01, -74.0);
        assert!(d < 1.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = haversine_distance_nm(51.47, -0.45, 40.64, -73.78);
        let b = haversine_distance_nm(40.64, -73.78, 51.47, -0.45);
        assert!((a - b).abs() < 1e-9);
        // LHR-JFK is roughly 2990 nm
        assert!((a - 2990.0).abs() < 30.0, "got {a}");
    }
}
