use actix_web::{HttpResponse, http::StatusCode};
use derive_more::{Display, Error};
use serde_json::json;

/// Caller-visible failures of the attendance engine. Internal parsing and
/// derivation problems are recovered with defaults and never reach here.
#[derive(Debug, Display, Error)]
pub enum AttendanceError {
    /// Geofencing is enforced for the user but no coordinates arrived.
    #[display(fmt = "Location signal missing, cannot verify login position")]
    SignalLoss,

    /// Login coordinates fall outside the resolved perimeter.
    #[display(fmt = "Login from {:.0} m away, allowed radius {:.0} m", distance_m, radius_m)]
    GeoPerimeter { distance_m: f64, radius_m: f64 },

    /// Logout or correction against an id that does not exist.
    #[display(fmt = "Attendance record not found")]
    RecordNotFound,

    #[display(fmt = "Internal Server Error")]
    Database,
}

impl From<sqlx::Error> for AttendanceError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        AttendanceError::Database
    }
}

impl actix_web::ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::SignalLoss => StatusCode::BAD_REQUEST,
            AttendanceError::GeoPerimeter { .. } => StatusCode::FORBIDDEN,
            AttendanceError::RecordNotFound => StatusCode::NOT_FOUND,
            AttendanceError::Database => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}
