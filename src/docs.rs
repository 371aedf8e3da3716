use crate::api::attendance::LoginRequest;
use crate::engine::session::Correction;
use crate::model::attendance::AttendanceRecord;
use crate::model::history::AttendanceDay;
use crate::model::shift::ShiftConfig;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Engine API",
        version = "1.0.0",
        description = r#"
## Attendance Determination & Compliance Engine

Converts raw login/logout events into governed daily attendance statuses.

### Key Features
- **Geofenced logins**
  - Haversine perimeter check against user- or branch-level office coordinates
- **Status determination**
  - Present/Late at login, full shift-rule derivation for historical days
- **Rolling history**
  - 60-day day-by-day reconstruction with gap filling and Sunday holidays
- **IP audit trail**
  - Dedup-aware hourly IP checkpoints on long-running field sessions
- **Missed-checkout escalation**
  - Reminder then final marker for sessions left open past shift end

### Response Format
- JSON-based RESTful responses

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::login,
        crate::api::attendance::logout,
        crate::api::attendance::history,
        crate::api::attendance::history_days,
        crate::api::attendance::day,
        crate::api::attendance::correct,
        crate::api::attendance::hourly_ip
    ),
    components(
        schemas(
            LoginRequest,
            Correction,
            AttendanceRecord,
            AttendanceDay,
            ShiftConfig
        )
    ),
    tags(
        (name = "Attendance", description = "Attendance engine APIs")
    )
)]
pub struct ApiDoc;
