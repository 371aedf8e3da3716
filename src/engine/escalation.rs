use crate::config::AttendancePolicy;
use crate::error::AttendanceError;
use crate::mailer::Mailer;
use crate::model::attendance::{AttendanceMetadata, AttendanceRecord};
use crate::model::shift::ShiftConfig;
use crate::store::{attendance as store, directory};
use chrono::{Duration, Local, NaiveDateTime};
use sqlx::MySqlPool;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Terminal marker; a status containing it exits the state machine.
pub const MISSED_CHECKOUT_MARKER: &str = "Checkout Not Done";

/// What one scheduler cycle does with one open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationAction {
    /// Terminal state reached, still inside grace, or reminded but not yet
    /// past the missed cutoff.
    Skip,
    /// First escalation: exactly one reminder, then wait for a later cycle.
    SendReminder,
    /// Reminded and still open past the cutoff: write the final marker.
    MarkMissed,
}

/// Per-session transition decision, pure in its inputs.
pub fn next_action(
    meta: &AttendanceMetadata,
    now: NaiveDateTime,
    shift_end: NaiveDateTime,
    policy: &AttendancePolicy,
) -> EscalationAction {
    if meta
        .status
        .as_deref()
        .is_some_and(|s| s.contains(MISSED_CHECKOUT_MARKER))
    {
        return EscalationAction::Skip;
    }

    if now <= shift_end + policy.reminder_grace {
        return EscalationAction::Skip;
    }

    if !meta.checkout_reminder_sent {
        return EscalationAction::SendReminder;
    }

    if now > shift_end + policy.missed_cutoff {
        return EscalationAction::MarkMissed;
    }

    EscalationAction::Skip
}

/// Shift end as an absolute timestamp for the session's login. Overnight
/// shifts end the next calendar day when the login lands inside the
/// tolerance window before shift start; a login after midnight belongs to
/// the shift already in progress and ends the same day.
pub fn resolve_shift_end(
    login_time: NaiveDateTime,
    shift: Option<&ShiftConfig>,
    policy: &AttendancePolicy,
) -> NaiveDateTime {
    let Some(shift) = shift else {
        return login_time.date().and_time(policy.default_shift_end);
    };

    if shift.is_overnight() {
        let window_start = shift.start_time - policy.overnight_tolerance;
        if login_time.time() > window_start {
            return (login_time.date() + Duration::days(1)).and_time(shift.end_time);
        }
        return login_time.date().and_time(shift.end_time);
    }

    login_time.date().and_time(shift.end_time)
}

pub fn missed_status(display_name: &str) -> String {
    format!("{MISSED_CHECKOUT_MARKER} — {display_name} — Email Sent but User Did Not Checkout")
}

fn reminder_subject() -> &'static str {
    "Action Required: Forgot to Checkout?"
}

fn reminder_body(display_name: &str, shift_end: NaiveDateTime) -> String {
    format!(
        "<p>Dear {},</p>\
         <p>This is a reminder that your shift ended at <strong>{}</strong>, \
         but you have not marked your checkout yet.</p>\
         <p>Please login to the HR Portal and complete your checkout immediately \
         to avoid attendance discrepancies.</p>\
         <p>Regards,<br>HR Team</p>",
        display_name,
        shift_end.time()
    )
}

/// One scheduler tick: walk every open session and advance its state.
/// Sessions fail independently; one bad record never aborts the batch.
pub async fn run_cycle(pool: &MySqlPool, mailer: &dyn Mailer, policy: &AttendancePolicy) {
    let cycle_id = Uuid::new_v4();

    let sessions = match store::open_sessions(pool).await {
        Ok(sessions) => sessions,
        Err(e) => {
            error!(%cycle_id, error = %e, "Could not list open sessions, skipping cycle");
            return;
        }
    };

    let now = Local::now().naive_local();
    info!(%cycle_id, open_sessions = sessions.len(), "Missed-checkout scan started");

    for session in &sessions {
        if let Err(e) = process_session(pool, mailer, policy, session, now).await {
            error!(
                %cycle_id,
                record_id = session.id,
                user_id = session.user_id,
                error = %e,
                "Failed to process open session, continuing with the rest"
            );
        }
    }
}

async fn process_session(
    pool: &MySqlPool,
    mailer: &dyn Mailer,
    policy: &AttendancePolicy,
    session: &AttendanceRecord,
    now: NaiveDateTime,
) -> Result<(), AttendanceError> {
    // A user deleted from the directory leaves the session where it is.
    let Some(user) = directory::user(pool, session.user_id).await? else {
        return Ok(());
    };
    let shift = directory::shift_for_user(pool, &user).await?;
    let shift_end = resolve_shift_end(session.login_time, shift.as_ref(), policy);

    match next_action(&session.metadata(), now, shift_end, policy) {
        EscalationAction::Skip => {}
        EscalationAction::SendReminder => {
            mailer.send(
                &user.email,
                reminder_subject(),
                &reminder_body(user.display_name(), shift_end),
            );
            store::update_metadata(pool, session.id, |meta| {
                meta.checkout_reminder_sent = true;
            })
            .await?;
            info!(
                record_id = session.id,
                user_id = user.id,
                "Checkout reminder sent"
            );
        }
        EscalationAction::MarkMissed => {
            let status = missed_status(user.display_name());
            store::update_metadata(pool, session.id, |meta| {
                meta.status = Some(status.clone());
            })
            .await?;
            warn!(
                record_id = session.id,
                user_id = user.id,
                "Session marked as missed checkout"
            );
        }
    }
    Ok(())
}

/// Spawns the fixed-period scan onto the server runtime.
pub fn spawn_scheduler(pool: MySqlPool, mailer: Arc<dyn Mailer>, policy: AttendancePolicy) {
    actix_web::rt::spawn(async move {
        info!(
            period_secs = policy.scheduler_period.as_secs(),
            "Starting missed-checkout escalation scheduler"
        );
        loop {
            run_cycle(&pool, mailer.as_ref(), &policy).await;
            actix_web::rt::time::sleep(policy.scheduler_period).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn policy() -> AttendancePolicy {
        AttendancePolicy::default()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn dt(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn shift(start: NaiveTime, end: NaiveTime) -> ShiftConfig {
        ShiftConfig {
            id: 1,
            name: "Test".into(),
            start_time: start,
            end_time: end,
            late_grace_minutes: None,
            half_day_time: None,
            absent_time: None,
        }
    }

    // -------- shift end resolution --------

    #[test]
    fn normal_shift_ends_on_the_login_date() {
        let s = shift(time(9, 0), time(18, 0));
        let end = resolve_shift_end(dt(2, 9, 15), Some(&s), &policy());
        assert_eq!(end, dt(2, 18, 0));
    }

    #[test]
    fn no_shift_ends_at_the_default_time() {
        let end = resolve_shift_end(dt(2, 9, 15), None, &policy());
        assert_eq!(end, dt(2, 18, 30));
    }

    #[test]
    fn overnight_login_before_midnight_ends_next_day() {
        // 22:00 → 06:00 shift, login 23:00: inside the tolerance window.
        let s = shift(time(22, 0), time(6, 0));
        let end = resolve_shift_end(dt(2, 23, 0), Some(&s), &policy());
        assert_eq!(end, dt(3, 6, 0));
    }

    #[test]
    fn overnight_login_after_midnight_ends_same_day() {
        let s = shift(time(22, 0), time(6, 0));
        let end = resolve_shift_end(dt(3, 1, 0), Some(&s), &policy());
        assert_eq!(end, dt(3, 6, 0));
    }

    #[test]
    fn overnight_tolerance_window_boundary() {
        let s = shift(time(22, 0), time(6, 0));
        // 21:30 is inside start − 60 min; 20:30 is not.
        assert_eq!(resolve_shift_end(dt(2, 21, 30), Some(&s), &policy()), dt(3, 6, 0));
        assert_eq!(resolve_shift_end(dt(2, 20, 30), Some(&s), &policy()), dt(2, 6, 0));
    }

    // -------- transition decisions --------

    #[test]
    fn inside_grace_nothing_happens() {
        let meta = AttendanceMetadata::default();
        let end = dt(2, 18, 0);
        assert_eq!(
            next_action(&meta, dt(2, 18, 5), end, &policy()),
            EscalationAction::Skip
        );
    }

    #[test]
    fn past_grace_sends_exactly_one_reminder_then_waits() {
        let p = policy();
        let end = dt(2, 18, 0);
        let mut meta = AttendanceMetadata::default();

        // First cycle past grace: reminder, not the marker.
        assert_eq!(next_action(&meta, dt(2, 18, 6), end, &p), EscalationAction::SendReminder);
        meta.checkout_reminder_sent = true;

        // Same cycle window again: reminded, cutoff not reached.
        assert_eq!(next_action(&meta, dt(2, 18, 10), end, &p), EscalationAction::Skip);
    }

    #[test]
    fn reminded_session_past_cutoff_is_marked_missed_once() {
        let p = policy();
        let end = dt(2, 18, 0);
        let mut meta = AttendanceMetadata {
            checkout_reminder_sent: true,
            ..Default::default()
        };

        assert_eq!(next_action(&meta, dt(2, 18, 31), end, &p), EscalationAction::MarkMissed);
        meta.status = Some(missed_status("Jamila Rahman"));

        // Terminal: further cycles leave it alone.
        assert_eq!(next_action(&meta, dt(2, 19, 0), end, &p), EscalationAction::Skip);
        assert_eq!(next_action(&meta, dt(3, 9, 0), end, &p), EscalationAction::Skip);
    }

    #[test]
    fn unreminded_session_far_past_cutoff_still_gets_the_reminder_first() {
        // Scheduler downtime can leave a session discovered only after the
        // cutoff; the reminder still goes out before any marking.
        let meta = AttendanceMetadata::default();
        assert_eq!(
            next_action(&meta, dt(2, 20, 0), dt(2, 18, 0), &policy()),
            EscalationAction::SendReminder
        );
    }

    #[test]
    fn full_escalation_sequence_is_idempotent() {
        let p = policy();
        let end = dt(2, 18, 0);
        let mut meta = AttendanceMetadata::default();
        let mut reminders = 0;
        let mut markings = 0;

        // Cycles every 5 minutes from 18:00 to 19:00.
        for minutes in (0..=60).step_by(5) {
            let now = end + Duration::minutes(minutes);
            match next_action(&meta, now, end, &p) {
                EscalationAction::Skip => {}
                EscalationAction::SendReminder => {
                    reminders += 1;
                    meta.checkout_reminder_sent = true;
                }
                EscalationAction::MarkMissed => {
                    markings += 1;
                    meta.status = Some(missed_status("jamila"));
                }
            }
        }

        assert_eq!(reminders, 1);
        assert_eq!(markings, 1);
        assert!(meta.status.as_deref().unwrap().contains(MISSED_CHECKOUT_MARKER));
    }

    #[test]
    fn missed_status_embeds_the_display_name() {
        let s = missed_status("Jamila Rahman");
        assert!(s.contains(MISSED_CHECKOUT_MARKER));
        assert!(s.contains("Jamila Rahman"));
        assert!(s.contains("Email Sent but User Did Not Checkout"));
    }

    #[test]
    fn reminder_body_names_the_user_and_shift_end() {
        let body = reminder_body("Jamila Rahman", dt(2, 18, 0));
        assert!(body.contains("Jamila Rahman"));
        assert!(body.contains("18:00"));
    }
}
