use crate::config::AttendancePolicy;
use crate::model::attendance::AttendanceRecord;
use crate::model::history::{AttendanceDay, DayStatus};
use crate::model::shift::ShiftConfig;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::collections::HashMap;

pub const SUNDAY_REMARK: &str = "Sunday Holiday";
pub const ABSENT_REMARK: &str = "Absent";
pub const LATE_ABSENT_REMARK: &str = "Marked Absent (Late Check-in)";
pub const LEFT_EARLY_REMARK: &str = "Left Early";
pub const NO_DATA_REMARK: &str = "No Data";

/// Status frozen into the record at login time. Authoritative from then on.
pub fn login_status(
    login_tod: NaiveTime,
    shift: Option<&ShiftConfig>,
    policy: &AttendancePolicy,
) -> DayStatus {
    let limit = shift
        .map(ShiftConfig::late_cutoff)
        .unwrap_or_else(|| policy.default_late_cutoff());

    if login_tod > limit {
        DayStatus::Late
    } else {
        DayStatus::Present
    }
}

/// Derives one calendar day. A stored `metadata.status` always wins over the
/// shift rules; without one the rules run against the check-in time of day.
pub fn derive_day(
    date: NaiveDate,
    record: Option<&AttendanceRecord>,
    shift: Option<&ShiftConfig>,
    policy: &AttendancePolicy,
    now: NaiveDateTime,
) -> AttendanceDay {
    let Some(record) = record else {
        let (status, remark) = if date.weekday() == Weekday::Sun {
            (DayStatus::Holiday, SUNDAY_REMARK)
        } else {
            (DayStatus::Absent, ABSENT_REMARK)
        };
        return AttendanceDay {
            date,
            check_in: None,
            check_out: None,
            ip_address: None,
            status: status.to_string(),
            remark: remark.to_string(),
            can_check_out: false,
        };
    };

    let meta = record.metadata();
    let check_in = record.login_time;
    let check_out = record.logout_time;

    let (status, remark) = match meta.status {
        Some(stored) => {
            let remark = meta.remark.clone().unwrap_or_else(|| stored.clone());
            (stored, remark)
        }
        None => {
            let (status, remark) = derive_from_rules(check_in, check_out, shift, policy);
            (status.to_string(), remark)
        }
    };

    AttendanceDay {
        date,
        check_in: Some(check_in),
        check_out,
        ip_address: record.ip_address.clone(),
        status,
        remark,
        can_check_out: check_out.is_none() && now - check_in < policy.checkout_window,
    }
}

/// Rule precedence: late check first, then the absent-threshold override,
/// then the half-day override. Without a shift only the default late cutoff
/// applies.
fn derive_from_rules(
    check_in: NaiveDateTime,
    check_out: Option<NaiveDateTime>,
    shift: Option<&ShiftConfig>,
    policy: &AttendancePolicy,
) -> (DayStatus, String) {
    let in_tod = check_in.time();

    let Some(shift) = shift else {
        let status = if in_tod > policy.default_late_cutoff() {
            DayStatus::Late
        } else {
            DayStatus::Present
        };
        return (status, status.to_string());
    };

    let mut status = if in_tod > shift.late_cutoff() {
        DayStatus::Late
    } else {
        DayStatus::Present
    };
    let mut remark = status.to_string();

    if let Some(absent_time) = shift.absent_time {
        if in_tod > absent_time {
            status = DayStatus::Absent;
            remark = LATE_ABSENT_REMARK.to_string();
        }
    }

    if let (Some(check_out), Some(half_day_time)) = (check_out, shift.half_day_time) {
        if check_out.time() < half_day_time {
            status = DayStatus::HalfDay;
            remark = LEFT_EARLY_REMARK.to_string();
        }
    }

    (status, remark)
}

/// Day-by-day reconstruction over the rolling window ending at `end`,
/// most-recent-first, exactly one entry per calendar date. When several
/// records share a date, the first one in `records` order is kept.
pub fn reconstruct_history(
    end: NaiveDate,
    records: &[AttendanceRecord],
    shift: Option<&ShiftConfig>,
    policy: &AttendancePolicy,
    now: NaiveDateTime,
) -> Vec<AttendanceDay> {
    let mut by_date: HashMap<NaiveDate, &AttendanceRecord> = HashMap::new();
    for record in records {
        by_date.entry(record.login_time.date()).or_insert(record);
    }

    (0..policy.history_days)
        .map(|offset| {
            let date = end - Duration::days(offset);
            derive_day(date, by_date.get(&date).copied(), shift, policy, now)
        })
        .collect()
}

/// Single-date lookup with the same precedence; an empty non-Sunday reads as
/// absent with a "No Data" remark instead of the usual one.
pub fn single_day(
    date: NaiveDate,
    records: &[AttendanceRecord],
    shift: Option<&ShiftConfig>,
    policy: &AttendancePolicy,
    now: NaiveDateTime,
) -> AttendanceDay {
    let record = records.iter().find(|r| r.login_time.date() == date);

    let mut day = derive_day(date, record, shift, policy, now);
    if record.is_none() && date.weekday() != Weekday::Sun {
        day.remark = NO_DATA_REMARK.to_string();
    }
    day
}
