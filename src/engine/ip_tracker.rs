use crate::config::AttendancePolicy;
use crate::error::AttendanceError;
use crate::model::attendance::IpHistoryEntry;
use crate::store::attendance as store;
use chrono::{Local, NaiveDateTime};
use sqlx::MySqlPool;
use tracing::debug;

/// A repeat of the trail's last IP within the dedup window is not worth a
/// new entry; anything else is.
pub fn should_append(
    history: &[IpHistoryEntry],
    ip: &str,
    now: NaiveDateTime,
    policy: &AttendancePolicy,
) -> bool {
    match history.last() {
        Some(last) => last.ip != ip || now - last.timestamp >= policy.ip_dedup_window,
        None => true,
    }
}

/// Appends `{now, ip}` to the most recent open session's IP trail. No open
/// session is a no-op, as is a dedup hit. Malformed stored metadata reads as
/// an empty trail, so this call never fails over historical garbage.
pub async fn record_hourly_ip(
    pool: &MySqlPool,
    policy: &AttendancePolicy,
    user_id: u64,
    ip: &str,
) -> Result<(), AttendanceError> {
    let Some(open) = store::latest_open_for_user(pool, user_id).await? else {
        return Ok(());
    };

    let now = Local::now().naive_local();
    if !should_append(&open.metadata().ip_history, ip, now, policy) {
        return Ok(());
    }

    store::update_metadata(pool, open.id, |meta| {
        // Re-checked inside the write funnel: a concurrent append may have
        // landed between the read above and this retry.
        if should_append(&meta.ip_history, ip, now, policy) {
            meta.ip_history.push(IpHistoryEntry {
                timestamp: now,
                ip: ip.to_string(),
            });
        }
    })
    .await?;

    debug!(user_id, record_id = open.id, ip, "IP appended to session trail");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap()
    }

    fn entry(ip: &str, age: Duration) -> IpHistoryEntry {
        IpHistoryEntry {
            timestamp: now() - age,
            ip: ip.into(),
        }
    }

    #[test]
    fn empty_trail_always_appends() {
        assert!(should_append(&[], "10.0.0.1", now(), &AttendancePolicy::default()));
    }

    #[test]
    fn same_ip_within_the_window_is_deduplicated() {
        let p = AttendancePolicy::default();
        let trail = vec![entry("10.0.0.1", Duration::minutes(30))];
        assert!(!should_append(&trail, "10.0.0.1", now(), &p));
    }

    #[test]
    fn different_ip_appends_even_inside_the_window() {
        let p = AttendancePolicy::default();
        let trail = vec![entry("10.0.0.1", Duration::minutes(30))];
        assert!(should_append(&trail, "10.0.0.2", now(), &p));
    }

    #[test]
    fn same_ip_appends_once_the_window_has_elapsed() {
        let p = AttendancePolicy::default();

        let trail = vec![entry("10.0.0.1", Duration::minutes(119))];
        assert!(!should_append(&trail, "10.0.0.1", now(), &p));

        let trail = vec![entry("10.0.0.1", Duration::minutes(120))];
        assert!(should_append(&trail, "10.0.0.1", now(), &p));
    }

    #[test]
    fn only_the_last_entry_matters_for_dedup() {
        let p = AttendancePolicy::default();
        // The same IP appears earlier in the trail but a roaming hop is the
        // most recent entry, so re-appending is allowed.
        let trail = vec![
            entry("10.0.0.1", Duration::minutes(40)),
            entry("172.16.0.9", Duration::minutes(10)),
        ];
        assert!(should_append(&trail, "10.0.0.1", now(), &p));
    }

    #[test]
    fn double_call_within_window_appends_exactly_once() {
        let p = AttendancePolicy::default();
        let mut trail: Vec<IpHistoryEntry> = Vec::new();

        for _ in 0..2 {
            if should_append(&trail, "10.0.0.1", now(), &p) {
                trail.push(IpHistoryEntry {
                    timestamp: now(),
                    ip: "10.0.0.1".into(),
                });
            }
        }
        assert_eq!(trail.len(), 1);
    }
}
