use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A named daily work window. `start_time > end_time` denotes an overnight
/// shift wrapping midnight.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ShiftConfig {
    pub id: u64,
    pub name: String,
    #[schema(value_type = String, format = "time")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, format = "time")]
    pub end_time: NaiveTime,
    pub late_grace_minutes: Option<i64>,
    #[schema(value_type = Option<String>, format = "time")]
    pub half_day_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>, format = "time")]
    pub absent_time: Option<NaiveTime>,
}

impl ShiftConfig {
    pub fn is_overnight(&self) -> bool {
        self.start_time > self.end_time
    }

    pub fn grace_minutes(&self) -> i64 {
        self.late_grace_minutes.unwrap_or(15)
    }

    /// Logins after this time of day count as late.
    pub fn late_cutoff(&self) -> NaiveTime {
        self.start_time + Duration::minutes(self.grace_minutes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(start: (u32, u32), end: (u32, u32)) -> ShiftConfig {
        ShiftConfig {
            id: 1,
            name: "Test".into(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            late_grace_minutes: None,
            half_day_time: None,
            absent_time: None,
        }
    }

    #[test]
    fn overnight_means_start_after_end() {
        assert!(shift((22, 0), (6, 0)).is_overnight());
        assert!(!shift((9, 30), (18, 30)).is_overnight());
    }

    #[test]
    fn late_cutoff_applies_default_grace() {
        let s = shift((9, 30), (18, 30));
        assert_eq!(s.late_cutoff(), NaiveTime::from_hms_opt(9, 45, 0).unwrap());

        let mut s = shift((8, 0), (17, 0));
        s.late_grace_minutes = Some(30);
        assert_eq!(s.late_cutoff(), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
    }
}
