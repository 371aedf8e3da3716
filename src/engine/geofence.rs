use crate::config::AttendancePolicy;
use crate::error::AttendanceError;
use crate::model::{branch::Branch, user::StaffUser};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// The circular region a login must originate from. Derived per login,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTarget {
    pub lat: f64,
    pub lng: f64,
    pub radius_m: f64,
}

/// Great-circle distance in meters between two WGS84 coordinates.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// User-level office coordinates win over branch coordinates. A user radius
/// of exactly `legacy_unset_radius` (50.0) counts as unset and the branch
/// radius still overrides it; historical rows depend on this sentinel.
pub fn resolve_geo_target(
    user: &StaffUser,
    branch: Option<&Branch>,
    policy: &AttendancePolicy,
) -> Option<GeoTarget> {
    let branch_radius = branch.and_then(|b| b.geo_radius);

    if let (Some(lat), Some(lng)) = (user.office_latitude, user.office_longitude) {
        let radius_m = match user.geo_radius {
            Some(r) if r != policy.legacy_unset_radius => r,
            _ => branch_radius.unwrap_or(policy.default_geo_radius_m),
        };
        return Some(GeoTarget { lat, lng, radius_m });
    }

    let branch = branch?;
    let (lat, lng) = (branch.latitude?, branch.longitude?);
    Some(GeoTarget {
        lat,
        lng,
        radius_m: branch_radius.unwrap_or(policy.default_geo_radius_m),
    })
}

/// Pure eligibility check; no side effects.
pub fn enforce(
    user: &StaffUser,
    branch: Option<&Branch>,
    lat: Option<f64>,
    lng: Option<f64>,
    policy: &AttendancePolicy,
) -> Result<(), AttendanceError> {
    if !user.geofence_enabled {
        return Ok(());
    }

    let (Some(lat), Some(lng)) = (lat, lng) else {
        return Err(AttendanceError::SignalLoss);
    };

    // Geofencing on but no target configured anywhere: nothing to enforce.
    let Some(target) = resolve_geo_target(user, branch, policy) else {
        return Ok(());
    };

    let distance_m = haversine_m(lat, lng, target.lat, target.lng);
    if distance_m > target.radius_m {
        return Err(AttendanceError::GeoPerimeter {
            distance_m,
            radius_m: target.radius_m,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DHAKA: (f64, f64) = (23.8103, 90.4125);

    fn user(enabled: bool) -> StaffUser {
        StaffUser {
            id: 1,
            full_name: Some("Test".into()),
            username: None,
            email: "t@company.com".into(),
            role: "EMPLOYEE".into(),
            shift_id: None,
            branch_id: None,
            geofence_enabled: enabled,
            office_latitude: None,
            office_longitude: None,
            geo_radius: None,
        }
    }

    fn branch(lat: f64, lng: f64, radius: Option<f64>) -> Branch {
        Branch {
            id: 1,
            name: "HQ".into(),
            latitude: Some(lat),
            longitude: Some(lng),
            geo_radius: radius,
        }
    }

    #[test]
    fn identical_points_are_zero_meters_apart() {
        assert_eq!(haversine_m(DHAKA.0, DHAKA.1, DHAKA.0, DHAKA.1), 0.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_m(23.0, 90.0, 24.0, 90.0);
        assert!((d - 111_195.0).abs() < 200.0, "got {d}");
    }

    #[test]
    fn disabled_geofencing_allows_without_coordinates() {
        assert!(enforce(&user(false), None, None, None, &AttendancePolicy::default()).is_ok());
    }

    #[test]
    fn enabled_geofencing_requires_coordinates() {
        let b = branch(DHAKA.0, DHAKA.1, None);
        let err = enforce(&user(true), Some(&b), None, None, &AttendancePolicy::default());
        assert!(matches!(err, Err(AttendanceError::SignalLoss)));
    }

    #[test]
    fn login_at_target_is_accepted_and_far_away_is_rejected() {
        let policy = AttendancePolicy::default();
        let b = branch(DHAKA.0, DHAKA.1, Some(200.0));

        assert!(enforce(&user(true), Some(&b), Some(DHAKA.0), Some(DHAKA.1), &policy).is_ok());

        // Roughly 1.1 km north of the branch.
        let err = enforce(&user(true), Some(&b), Some(DHAKA.0 + 0.01), Some(DHAKA.1), &policy);
        match err {
            Err(AttendanceError::GeoPerimeter { distance_m, radius_m }) => {
                assert!(distance_m > 1_000.0);
                assert_eq!(radius_m, 200.0);
            }
            other => panic!("expected perimeter violation, got {other:?}"),
        }
    }

    #[test]
    fn user_office_coordinates_win_over_branch() {
        let policy = AttendancePolicy::default();
        let mut u = user(true);
        u.office_latitude = Some(DHAKA.0);
        u.office_longitude = Some(DHAKA.1);
        u.geo_radius = Some(300.0);

        // Branch would reject this login; the user-level target accepts it.
        let b = branch(22.0, 89.0, Some(50.0));
        let target = resolve_geo_target(&u, Some(&b), &policy).unwrap();
        assert_eq!(target.radius_m, 300.0);
        assert!(enforce(&u, Some(&b), Some(DHAKA.0), Some(DHAKA.1), &policy).is_ok());
    }

    #[test]
    fn user_radius_of_exactly_fifty_defers_to_branch_radius() {
        let policy = AttendancePolicy::default();
        let mut u = user(true);
        u.office_latitude = Some(DHAKA.0);
        u.office_longitude = Some(DHAKA.1);
        u.geo_radius = Some(policy.legacy_unset_radius);

        let b = branch(DHAKA.0, DHAKA.1, Some(750.0));
        let target = resolve_geo_target(&u, Some(&b), &policy).unwrap();
        assert_eq!(target.radius_m, 750.0);

        // And with no branch radius either, the 100 m default applies.
        let b = branch(DHAKA.0, DHAKA.1, None);
        let target = resolve_geo_target(&u, Some(&b), &policy).unwrap();
        assert_eq!(target.radius_m, policy.default_geo_radius_m);
    }

    #[test]
    fn no_target_anywhere_allows_the_login() {
        let policy = AttendancePolicy::default();
        assert!(resolve_geo_target(&user(true), None, &policy).is_none());
        assert!(enforce(&user(true), None, Some(DHAKA.0), Some(DHAKA.1), &policy).is_ok());
    }
}
