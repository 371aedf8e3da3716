use crate::config::AttendancePolicy;
use crate::engine::session::Correction;
use crate::engine::{ip_tracker, session};
use crate::model::attendance::AttendanceRecord;
use crate::model::history::AttendanceDay;
use crate::model::user::StaffRole;
use crate::store::directory;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = 23.8103)]
    pub lat: Option<f64>,
    #[schema(example = 90.4125)]
    pub lng: Option<f64>,
}

fn client_ip(req: &HttpRequest) -> String {
    req.headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .map(|h| h.split(',').next().unwrap_or(h).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("X-User-Agent")
        .or_else(|| req.headers().get("User-Agent"))
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// Attendance login
#[utoipa::path(
    post,
    path = "/api/v1/attendance/login/{user_id}",
    params(
        ("user_id", Path, description = "User ID")
    ),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login recorded", body = AttendanceRecord),
        (status = 400, description = "Geofencing enabled but coordinates missing"),
        (status = 403, description = "Coordinates outside the allowed perimeter"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn login(
    pool: web::Data<MySqlPool>,
    policy: web::Data<AttendancePolicy>,
    path: web::Path<u64>,
    payload: web::Json<LoginRequest>,
    req: HttpRequest,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    let ip = client_ip(&req);
    let ua = user_agent(&req);

    let record = session::record_login(
        pool.get_ref(),
        policy.get_ref(),
        user_id,
        &ip,
        ua.as_deref(),
        payload.lat,
        payload.lng,
    )
    .await?;

    Ok(HttpResponse::Ok().json(record))
}

/// Attendance logout
#[utoipa::path(
    post,
    path = "/api/v1/attendance/logout/{record_id}",
    params(
        ("record_id", Path, description = "Attendance record ID")
    ),
    responses(
        (status = 200, description = "Logout recorded", body = AttendanceRecord),
        (status = 404, description = "Attendance record not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn logout(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    req: HttpRequest,
) -> actix_web::Result<impl Responder> {
    let record_id = path.into_inner();
    let ip = client_ip(&req);

    let record = session::record_logout(pool.get_ref(), record_id, &ip).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Raw login/logout history, newest first
#[utoipa::path(
    get,
    path = "/api/v1/attendance/history/{user_id}",
    params(
        ("user_id", Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Attendance records", body = [AttendanceRecord]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn history(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let records = session::history(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Day-by-day reconstruction of the rolling 60-day window
#[utoipa::path(
    get,
    path = "/api/v1/attendance/history/{user_id}/days",
    params(
        ("user_id", Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "One entry per calendar date, most recent first", body = [AttendanceDay]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn history_days(
    pool: web::Data<MySqlPool>,
    policy: web::Data<AttendancePolicy>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let days = session::history_days(pool.get_ref(), policy.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(days))
}

/// Single-day reconstruction
#[utoipa::path(
    get,
    path = "/api/v1/attendance/history/{user_id}/days/{date}",
    params(
        ("user_id", Path, description = "User ID"),
        ("date", Path, description = "Calendar date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "The reconstructed day", body = AttendanceDay),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn day(
    pool: web::Data<MySqlPool>,
    policy: web::Data<AttendancePolicy>,
    path: web::Path<(u64, NaiveDate)>,
) -> actix_web::Result<impl Responder> {
    let (user_id, date) = path.into_inner();
    let day = session::day_for_date(pool.get_ref(), policy.get_ref(), user_id, date).await?;
    Ok(HttpResponse::Ok().json(day))
}

/// Manual HR/Admin correction
#[utoipa::path(
    put,
    path = "/api/v1/attendance/{record_id}",
    params(
        ("record_id", Path, description = "Attendance record ID")
    ),
    request_body = Correction,
    responses(
        (status = 200, description = "Corrected record", body = AttendanceRecord),
        (status = 404, description = "Attendance record not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn correct(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<Correction>,
) -> actix_web::Result<impl Responder> {
    let record =
        session::correct_record(pool.get_ref(), path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Hourly IP checkpoint for field roles
#[utoipa::path(
    post,
    path = "/api/v1/attendance/hourly-ip/{user_id}",
    params(
        ("user_id", Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "Checkpoint accepted (or ignored for non-field roles)")
    ),
    tag = "Attendance"
)]
pub async fn hourly_ip(
    pool: web::Data<MySqlPool>,
    policy: web::Data<AttendancePolicy>,
    path: web::Path<u64>,
    req: HttpRequest,
) -> impl Responder {
    let user_id = path.into_inner();
    let ip = client_ip(&req);

    // Only field staff get their IPs checkpointed, and a failure here must
    // never surface to the request that triggered it.
    let is_field_role = matches!(
        directory::user(pool.get_ref(), user_id).await,
        Ok(Some(ref user)) if user.role() == Some(StaffRole::MarketingExecutive)
    );
    if is_field_role {
        if let Err(e) =
            ip_tracker::record_hourly_ip(pool.get_ref(), policy.get_ref(), user_id, &ip).await
        {
            error!(user_id, error = %e, "Hourly IP checkpoint failed");
        }
    }

    HttpResponse::NoContent().finish()
}
