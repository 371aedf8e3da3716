use crate::error::AttendanceError;
use crate::model::{branch::Branch, shift::ShiftConfig, user::StaffUser};
use anyhow::Result;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::info;

// Directory rows change rarely; a short TTL keeps shift/geo edits visible
// within a minute without a DB round trip per login.
static USER_CACHE: Lazy<Cache<u64, StaffUser>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(60))
        .build()
});

static SHIFT_CACHE: Lazy<Cache<u64, ShiftConfig>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(60))
        .build()
});

static BRANCH_CACHE: Lazy<Cache<u64, Branch>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(60))
        .build()
});

const USER_COLUMNS: &str = "id, full_name, username, email, role, shift_id, branch_id, \
                            geofence_enabled, office_latitude, office_longitude, geo_radius";

/// Directory lookup; absence is a normal outcome, never an error.
pub async fn user(pool: &MySqlPool, id: u64) -> Result<Option<StaffUser>, AttendanceError> {
    if let Some(user) = USER_CACHE.get(&id).await {
        return Ok(Some(user));
    }

    let user = sqlx::query_as::<_, StaffUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    if let Some(ref user) = user {
        USER_CACHE.insert(id, user.clone()).await;
    }
    Ok(user)
}

pub async fn shift(pool: &MySqlPool, id: u64) -> Result<Option<ShiftConfig>, AttendanceError> {
    if let Some(shift) = SHIFT_CACHE.get(&id).await {
        return Ok(Some(shift));
    }

    let shift = sqlx::query_as::<_, ShiftConfig>(
        "SELECT id, name, start_time, end_time, late_grace_minutes, half_day_time, absent_time \
         FROM shifts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    if let Some(ref shift) = shift {
        SHIFT_CACHE.insert(id, shift.clone()).await;
    }
    Ok(shift)
}

pub async fn branch(pool: &MySqlPool, id: u64) -> Result<Option<Branch>, AttendanceError> {
    if let Some(branch) = BRANCH_CACHE.get(&id).await {
        return Ok(Some(branch));
    }

    let branch = sqlx::query_as::<_, Branch>(
        "SELECT id, name, latitude, longitude, geo_radius FROM branches WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    if let Some(ref branch) = branch {
        BRANCH_CACHE.insert(id, branch.clone()).await;
    }
    Ok(branch)
}

/// A missing or dangling shift assignment falls back to engine defaults
/// downstream; this never fails the caller over directory gaps.
pub async fn shift_for_user(
    pool: &MySqlPool,
    user: &StaffUser,
) -> Result<Option<ShiftConfig>, AttendanceError> {
    match user.shift_id {
        Some(shift_id) => shift(pool, shift_id).await,
        None => Ok(None),
    }
}

pub async fn branch_for_user(
    pool: &MySqlPool,
    user: &StaffUser,
) -> Result<Option<Branch>, AttendanceError> {
    match user.branch_id {
        Some(branch_id) => branch(pool, branch_id).await,
        None => Ok(None),
    }
}

/// Preloads the small shift and branch tables so the first logins after a
/// restart skip the cold lookups. Spawned from main, best-effort.
pub async fn warmup_directory(pool: &MySqlPool) -> Result<()> {
    let shifts = sqlx::query_as::<_, ShiftConfig>(
        "SELECT id, name, start_time, end_time, late_grace_minutes, half_day_time, absent_time \
         FROM shifts",
    )
    .fetch_all(pool)
    .await?;

    let inserts: Vec<_> = shifts
        .into_iter()
        .map(|s| SHIFT_CACHE.insert(s.id, s))
        .collect();
    let shift_count = inserts.len();
    futures::future::join_all(inserts).await;

    let branches = sqlx::query_as::<_, Branch>(
        "SELECT id, name, latitude, longitude, geo_radius FROM branches",
    )
    .fetch_all(pool)
    .await?;

    let inserts: Vec<_> = branches
        .into_iter()
        .map(|b| BRANCH_CACHE.insert(b.id, b))
        .collect();
    let branch_count = inserts.len();
    futures::future::join_all(inserts).await;

    info!(shift_count, branch_count, "Directory cache warmed up");
    Ok(())
}
