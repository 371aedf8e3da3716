use crate::config::AttendancePolicy;
use crate::engine::{geofence, status};
use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceMetadata, AttendanceRecord};
use crate::model::history::AttendanceDay;
use crate::store::{attendance as store, directory};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;
use tracing::{info, warn};

/// Fields an HR/Admin correction may overwrite. Whatever is set here
/// supersedes all derivation logic for the record from then on.
#[derive(Debug, Default, serde::Deserialize, utoipa::ToSchema)]
pub struct Correction {
    pub status: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<NaiveDateTime>,
    pub remark: Option<String>,
}

/// Login pipeline: geofence gate, at-login status determination, record
/// creation with the status and geo snapshot frozen into the metadata.
pub async fn record_login(
    pool: &MySqlPool,
    policy: &AttendancePolicy,
    user_id: u64,
    ip: &str,
    user_agent: Option<&str>,
    lat: Option<f64>,
    lng: Option<f64>,
) -> Result<AttendanceRecord, AttendanceError> {
    let user = directory::user(pool, user_id)
        .await?
        .ok_or(AttendanceError::RecordNotFound)?;
    let branch = directory::branch_for_user(pool, &user).await?;

    geofence::enforce(&user, branch.as_ref(), lat, lng, policy)?;

    let shift = directory::shift_for_user(pool, &user).await?;
    let now = Local::now().naive_local();
    let login_status = status::login_status(now.time(), shift.as_ref(), policy);

    // Nothing stops a user from holding several open sessions at once.
    // Kept that way on purpose; downstream readers pick the most recent.
    let open = store::open_session_count(pool, user_id).await?;
    if open > 0 {
        warn!(user_id, open_sessions = open, "Login with an attendance session still open");
    }

    let metadata = AttendanceMetadata {
        status: Some(login_status.to_string()),
        shift: shift.map(|s| s.name),
        lat,
        lng,
        ..Default::default()
    };

    let record = store::insert_login(pool, user_id, now, ip, user_agent, &metadata).await?;
    info!(
        user_id,
        record_id = record.id,
        status = %login_status,
        "Attendance login recorded"
    );
    Ok(record)
}

pub async fn record_logout(
    pool: &MySqlPool,
    record_id: u64,
    ip: &str,
) -> Result<AttendanceRecord, AttendanceError> {
    let now = Local::now().naive_local();
    let record = store::record_logout(pool, record_id, now, ip).await?;
    info!(record_id, user_id = record.user_id, "Attendance logout recorded");
    Ok(record)
}

/// Raw record list, newest first.
pub async fn history(
    pool: &MySqlPool,
    user_id: u64,
) -> Result<Vec<AttendanceRecord>, AttendanceError> {
    store::history_for_user(pool, user_id).await
}

/// Day-by-day reconstruction of the rolling window ending today.
pub async fn history_days(
    pool: &MySqlPool,
    policy: &AttendancePolicy,
    user_id: u64,
) -> Result<Vec<AttendanceDay>, AttendanceError> {
    let now = Local::now().naive_local();
    let end = now.date();
    let start = (end - Duration::days(policy.history_days - 1))
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let upper = (end + Duration::days(1)).and_hms_opt(0, 0, 0).unwrap();

    let records = store::for_user_between(pool, user_id, start, upper).await?;
    let shift = user_shift(pool, user_id).await?;

    Ok(status::reconstruct_history(end, &records, shift.as_ref(), policy, now))
}

/// Single-day reconstruction with the same precedence as the full window.
pub async fn day_for_date(
    pool: &MySqlPool,
    policy: &AttendancePolicy,
    user_id: u64,
    date: NaiveDate,
) -> Result<AttendanceDay, AttendanceError> {
    let now = Local::now().naive_local();
    let start = date.and_hms_opt(0, 0, 0).unwrap();
    let upper = (date + Duration::days(1)).and_hms_opt(0, 0, 0).unwrap();

    let records = store::for_user_between(pool, user_id, start, upper).await?;
    let shift = user_shift(pool, user_id).await?;

    Ok(status::single_day(date, &records, shift.as_ref(), policy, now))
}

pub async fn correct_record(
    pool: &MySqlPool,
    record_id: u64,
    correction: Correction,
) -> Result<AttendanceRecord, AttendanceError> {
    // Surface the 404 before touching anything.
    store::get_by_id(pool, record_id).await?;

    store::set_times(pool, record_id, correction.check_in, correction.check_out).await?;

    if correction.status.is_some() || correction.remark.is_some() {
        store::update_metadata(pool, record_id, |meta| {
            if let Some(ref status) = correction.status {
                meta.status = Some(status.clone());
            }
            if let Some(ref remark) = correction.remark {
                meta.remark = Some(remark.clone());
            }
        })
        .await?;
    }

    info!(record_id, "Manual attendance correction applied");
    store::get_by_id(pool, record_id).await
}

/// A user or shift missing from the directory degrades to default rules.
async fn user_shift(
    pool: &MySqlPool,
    user_id: u64,
) -> Result<Option<crate::model::shift::ShiftConfig>, AttendanceError> {
    match directory::user(pool, user_id).await? {
        Some(user) => directory::shift_for_user(pool, &user).await,
        None => Ok(None),
    }
}
