use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Rule-derived daily statuses. Stored metadata may also carry free-form
/// strings (manual corrections, escalation markers) which pass through
/// reconstruction verbatim, so the day DTO keeps `status` as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "title_case")]
pub enum DayStatus {
    Present,
    Late,
    Absent,
    HalfDay,
    Holiday,
}

/// One reconstructed calendar day of a user's attendance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceDay {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<NaiveDateTime>,
    pub ip_address: Option<String>,
    pub status: String,
    pub remark: String,
    /// Checkout is still offered for this day's session.
    pub can_check_out: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_render_their_display_names() {
        assert_eq!(DayStatus::Present.to_string(), "Present");
        assert_eq!(DayStatus::HalfDay.to_string(), "Half Day");
        assert_eq!(DayStatus::Holiday.to_string(), "Holiday");
    }
}
