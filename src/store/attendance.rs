use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceMetadata, AttendanceRecord};
use chrono::NaiveDateTime;
use sqlx::MySqlPool;
use tracing::{error, warn};

const COLUMNS: &str = "id, user_id, login_time, logout_time, ip_address, \
                       logout_ip_address, user_agent, metadata, created_at";

pub async fn insert_login(
    pool: &MySqlPool,
    user_id: u64,
    login_time: NaiveDateTime,
    ip: &str,
    user_agent: Option<&str>,
    metadata: &AttendanceMetadata,
) -> Result<AttendanceRecord, AttendanceError> {
    let result = sqlx::query(
        r#"
        INSERT INTO login_history (user_id, login_time, ip_address, user_agent, metadata, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(login_time)
    .bind(ip)
    .bind(user_agent)
    .bind(metadata.to_json())
    .bind(login_time)
    .execute(pool)
    .await?;

    get_by_id(pool, result.last_insert_id()).await
}

pub async fn find_by_id(
    pool: &MySqlPool,
    id: u64,
) -> Result<Option<AttendanceRecord>, AttendanceError> {
    let record = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {COLUMNS} FROM login_history WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}

pub async fn get_by_id(pool: &MySqlPool, id: u64) -> Result<AttendanceRecord, AttendanceError> {
    find_by_id(pool, id)
        .await?
        .ok_or(AttendanceError::RecordNotFound)
}

pub async fn record_logout(
    pool: &MySqlPool,
    id: u64,
    logout_time: NaiveDateTime,
    ip: &str,
) -> Result<AttendanceRecord, AttendanceError> {
    let result = sqlx::query(
        r#"
        UPDATE login_history
        SET logout_time = ?, logout_ip_address = ?
        WHERE id = ?
        "#,
    )
    .bind(logout_time)
    .bind(ip)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AttendanceError::RecordNotFound);
    }
    get_by_id(pool, id).await
}

/// All currently-open sessions, the escalation scheduler's work list.
pub async fn open_sessions(pool: &MySqlPool) -> Result<Vec<AttendanceRecord>, AttendanceError> {
    let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {COLUMNS} FROM login_history WHERE logout_time IS NULL"
    ))
    .fetch_all(pool)
    .await?;
    Ok(records)
}

pub async fn latest_open_for_user(
    pool: &MySqlPool,
    user_id: u64,
) -> Result<Option<AttendanceRecord>, AttendanceError> {
    let record = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {COLUMNS} FROM login_history \
         WHERE user_id = ? AND logout_time IS NULL \
         ORDER BY login_time DESC LIMIT 1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}

pub async fn open_session_count(pool: &MySqlPool, user_id: u64) -> Result<i64, AttendanceError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM login_history WHERE user_id = ? AND logout_time IS NULL",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn history_for_user(
    pool: &MySqlPool,
    user_id: u64,
) -> Result<Vec<AttendanceRecord>, AttendanceError> {
    let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {COLUMNS} FROM login_history WHERE user_id = ? ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(records)
}

/// Records whose login falls within `[start, end)`, newest first. History
/// reconstruction keys on this fetch order: the first record seen for a
/// calendar date is the one kept.
pub async fn for_user_between(
    pool: &MySqlPool,
    user_id: u64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<AttendanceRecord>, AttendanceError> {
    let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {COLUMNS} FROM login_history \
         WHERE user_id = ? AND login_time >= ? AND login_time < ? \
         ORDER BY login_time DESC"
    ))
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    Ok(records)
}

pub async fn set_times(
    pool: &MySqlPool,
    id: u64,
    check_in: Option<NaiveDateTime>,
    check_out: Option<NaiveDateTime>,
) -> Result<(), AttendanceError> {
    if check_in.is_none() && check_out.is_none() {
        return Ok(());
    }
    let mut sets = Vec::new();
    if check_in.is_some() {
        sets.push("login_time = ?");
    }
    if check_out.is_some() {
        sets.push("logout_time = ?");
    }
    let sql = format!(
        "UPDATE login_history SET {} WHERE id = ?",
        sets.join(", ")
    );

    let mut query = sqlx::query(&sql);
    if let Some(t) = check_in {
        query = query.bind(t);
    }
    if let Some(t) = check_out {
        query = query.bind(t);
    }
    // rows_affected is unreliable for existence here: MySQL reports 0 for a
    // value-unchanged update. Callers check existence up front.
    query.bind(id).execute(pool).await?;
    Ok(())
}

const METADATA_CAS_ATTEMPTS: u32 = 3;

/// Single funnel for every metadata mutation (login never conflicts, but the
/// IP tracker and the escalation scheduler can both touch an open record).
/// Read-modify-write guarded by a null-safe compare on the previous value;
/// a concurrent writer makes the guard miss and the whole cycle retries.
pub async fn update_metadata<F>(
    pool: &MySqlPool,
    id: u64,
    mutate: F,
) -> Result<AttendanceMetadata, AttendanceError>
where
    F: Fn(&mut AttendanceMetadata),
{
    for attempt in 1..=METADATA_CAS_ATTEMPTS {
        let record = get_by_id(pool, id).await?;
        let mut meta = record.metadata();
        mutate(&mut meta);
        let next = meta.to_json();

        // An unchanged document would report zero affected rows and read as
        // a lost race; skip the write instead.
        if record.metadata.as_deref() == Some(next.as_str()) {
            return Ok(meta);
        }

        let result = sqlx::query(
            "UPDATE login_history SET metadata = ? WHERE id = ? AND metadata <=> ?",
        )
        .bind(&next)
        .bind(id)
        .bind(&record.metadata)
        .execute(pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(meta);
        }
        warn!(record_id = id, attempt, "Metadata write lost a race, retrying");
    }

    error!(record_id = id, "Metadata write kept losing races, giving up");
    Err(AttendanceError::Database)
}
