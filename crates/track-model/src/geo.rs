//! Spherical-Earth distance helpers.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two lat/lon pairs (degrees),
/// using the haversine formula.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(haversine_distance_m(48.2, 16.37, 48.2, 16.37), 0.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = haversine_distance_m(0.0, 0.0, 1.0, 0.0);
        let expected = EARTH_RADIUS_M * 1.0f64.to_radians();
        assert!((d - expected).abs() < 1e-6);
        assert!((d - 111_194.93).abs() < 0.1);
    }

    #[test]
    fn test_symmetric() {
        let ab = haversine_distance_m(51.5074, -0.1278, 48.8566, 2.3522);
        let ba = haversine_distance_m(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((ab - ba).abs() < 1e-6);
        // London - Paris is roughly 344 km.
        assert!((ab - 343_556.0).abs() < 1_000.0);
    }

    #[test]
    fn test_antipodal_points_do_not_produce_nan() {
        let d = haversine_distance_m(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - EARTH_RADIUS_M * std::f64::consts::PI).abs() < 1e-3);
    }

    proptest::proptest! {
        #[test]
        fn prop_distance_is_finite_and_non_negative(
            lat1 in -90.0f64..90.0,
            lon1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0,
            lon2 in -180.0f64..180.0,
        ) {
            let d = haversine_distance_m(lat1, lon1, lat2, lon2);
            proptest::prop_assert!(d.is_finite());
            proptest::prop_assert!(d >= 0.0);
            proptest::prop_assert!(d <= EARTH_RADIUS_M * std::f64::consts::PI + 1e-6);
        }
    }
}
