use chrono::{Duration, NaiveTime};
use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_attendance_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),

            rate_attendance_per_min: env::var("RATE_ATTENDANCE_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
        }
    }
}

/// All attendance rule defaults in one place. Every value here used to live
/// as a scattered literal in the previous system; production code and tests
/// must reference these fields, never re-inline the numbers.
#[derive(Debug, Clone)]
pub struct AttendancePolicy {
    /// Fallback shift start when a user has no shift assigned.
    pub default_shift_start: NaiveTime,
    /// Minutes past shift start before a login counts as late.
    pub default_grace_minutes: i64,
    /// Fallback shift end for the escalation scheduler.
    pub default_shift_end: NaiveTime,
    /// Geofence radius when neither user nor branch configures one.
    pub default_geo_radius_m: f64,
    /// A user-level radius equal to this literal is treated as unset and the
    /// branch radius still applies. Inherited sentinel, kept bug-compatible.
    pub legacy_unset_radius: f64,
    /// Same-IP entries younger than this are not re-appended to the trail.
    pub ip_dedup_window: Duration,
    /// Quiet period after shift end before the checkout reminder fires.
    pub reminder_grace: Duration,
    /// Past shift end + this, a reminded session is marked missed.
    pub missed_cutoff: Duration,
    /// Logins this close before an overnight shift's start still belong to
    /// the shift ending the next calendar day.
    pub overnight_tolerance: Duration,
    /// Length of the reconstructed day-by-day history window.
    pub history_days: i64,
    /// Checkout stays available this long after login.
    pub checkout_window: Duration,
    /// Escalation scheduler period.
    pub scheduler_period: std::time::Duration,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            default_shift_start: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            default_grace_minutes: 15,
            default_shift_end: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            default_geo_radius_m: 100.0,
            legacy_unset_radius: 50.0,
            ip_dedup_window: Duration::minutes(120),
            reminder_grace: Duration::minutes(5),
            missed_cutoff: Duration::minutes(30),
            overnight_tolerance: Duration::minutes(60),
            history_days: 60,
            checkout_window: Duration::hours(10),
            scheduler_period: std::time::Duration::from_secs(300),
        }
    }
}

impl AttendancePolicy {
    /// 09:30 start + 15 min grace = 09:45, the shiftless late cutoff.
    pub fn default_late_cutoff(&self) -> NaiveTime {
        self.default_shift_start + Duration::minutes(self.default_grace_minutes)
    }
}
