//! Day-before and hour-before reminders, plus the guest's answer to them.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDateTime};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::db::queries::{self, StatusChange};
use crate::models::{Booking, BookingStatus, ReminderKind, Sender};
use crate::services::admin::notify_admin;
use crate::services::messaging::{acknowledge, OutgoingMessage};
use crate::services::{keyboards, texts};
use crate::state::AppState;

pub const REMINDER_PERIOD: StdDuration = StdDuration::from_secs(60);
const ERROR_PAUSE: StdDuration = StdDuration::from_secs(5);

/// Hour-before reminders go out while the visit is this many hours away.
const HOUR_WINDOW: (f64, f64) = (0.9, 1.1);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub day_sent: usize,
    pub hour_sent: usize,
    pub failed: usize,
}

pub async fn run(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(REMINDER_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = IntervalStream::new(interval);

    tracing::info!(period_secs = REMINDER_PERIOD.as_secs(), "reminder scheduler started");
    while ticks.next().await.is_some() {
        let now = state.config.local_now();
        match run_cycle(&state, now).await {
            Ok(report) if report != CycleReport::default() => {
                tracing::info!(
                    day_sent = report.day_sent,
                    hour_sent = report.hour_sent,
                    failed = report.failed,
                    "reminder cycle finished"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "reminder cycle failed");
                tokio::time::sleep(ERROR_PAUSE).await;
            }
        }
    }
}

fn hours_until_visit(booking: &Booking, now: NaiveDateTime) -> f64 {
    (booking.visit_starts_at() - now).num_seconds() as f64 / 3600.0
}

fn due_within_the_hour(booking: &Booking, now: NaiveDateTime) -> bool {
    let hours = hours_until_visit(booking, now);
    (HOUR_WINDOW.0..=HOUR_WINDOW.1).contains(&hours)
}

/// One scan. A reminder that cannot be delivered keeps its flag unset and
/// is tried again next cycle; the flags of delivered ones flip together.
pub async fn run_cycle(state: &AppState, now: NaiveDateTime) -> anyhow::Result<CycleReport> {
    let today = now.date();
    let (day_due, hour_due) = {
        let conn = state.db();
        let day_due = queries::due_day_reminders(&conn, today + Duration::days(1))?;
        let hour_due = queries::due_hour_reminders(&conn, today - Duration::days(1), today)?;
        (day_due, hour_due)
    };

    let venue = &state.config.venue;
    let mut report = CycleReport::default();
    let mut delivered = Vec::new();

    for booking in &day_due {
        let message = OutgoingMessage::markdown(texts::day_reminder(booking, venue))
            .with_inline(keyboards::visit_actions(booking.id));
        match state.messaging().send_message(booking.guest_id, &message).await {
            Ok(_) => {
                report.day_sent += 1;
                delivered.push((ReminderKind::DayBefore, booking.id));
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(booking_id = booking.id, error = %e, "day-before reminder not delivered");
            }
        }
    }

    for booking in hour_due.iter().filter(|b| due_within_the_hour(b, now)) {
        let message = OutgoingMessage::markdown(texts::hour_reminder(booking, venue));
        match state.messaging().send_message(booking.guest_id, &message).await {
            Ok(_) => {
                report.hour_sent += 1;
                delivered.push((ReminderKind::HourBefore, booking.id));
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(booking_id = booking.id, error = %e, "hour-before reminder not delivered");
            }
        }
    }

    let conn = state.db();
    queries::mark_reminders_sent(&conn, &delivered)?;
    Ok(report)
}

fn own_booking(state: &AppState, sender: &Sender, booking_id: i64) -> anyhow::Result<Option<Booking>> {
    let conn = state.db();
    Ok(queries::get_booking(&conn, booking_id)?.filter(|b| b.guest_id == sender.id))
}

/// "I'll be there" under the day-before reminder.
pub async fn confirm_visit(state: &AppState, sender: &Sender, callback_id: &str, booking_id: i64) {
    let notice = match own_booking(state, sender, booking_id) {
        Ok(Some(booking)) => {
            tracing::info!(booking_id, guest = sender.id, "visit confirmed");
            let message = OutgoingMessage::markdown(texts::visit_confirmed(&booking));
            notify_admin(state, message).await;
            "✅ Thank you! We look forward to seeing you."
        }
        Ok(None) => "❌ Booking not found",
        Err(e) => {
            tracing::error!(booking_id, error = %e, "failed to load booking");
            "❌ Something went wrong"
        }
    };
    acknowledge(state.messaging(), callback_id, Some(notice)).await;
}

/// "Cancel visit" under the day-before reminder.
pub async fn cancel_visit(state: &AppState, sender: &Sender, callback_id: &str, booking_id: i64) {
    let change = match own_booking(state, sender, booking_id) {
        Ok(Some(_)) => {
            let conn = state.db();
            queries::transition_booking(&conn, booking_id, BookingStatus::CancelledByGuest)
        }
        Ok(None) => Ok(StatusChange::NotFound),
        Err(e) => Err(e),
    };

    let notice = match change {
        Ok(StatusChange::Applied(booking)) => {
            tracing::info!(booking_id, guest = sender.id, "visit cancelled by guest");
            let message = OutgoingMessage::markdown(texts::visit_cancelled(&booking));
            notify_admin(state, message).await;
            "❌ Your booking has been cancelled".to_string()
        }
        Ok(StatusChange::Refused(booking)) => {
            format!("⚠️ This booking is already {}", booking.status.label())
        }
        Ok(StatusChange::NotFound) => "❌ Booking not found".to_string(),
        Err(e) => {
            tracing::error!(booking_id, error = %e, "failed to cancel visit");
            "❌ Something went wrong".to_string()
        }
    };
    acknowledge(state.messaging(), callback_id, Some(&notice)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::DATE_FORMAT;
    use crate::test_support::{guest, seed_booking, test_state, ADMIN_ID};
    use chrono::{NaiveDate, NaiveTime};

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, DATE_FORMAT)
            .unwrap()
            .and_time(hm(time))
    }

    fn hm(time: &str) -> NaiveTime {
        NaiveTime::parse_from_str(time, "%H:%M").unwrap()
    }

    fn day(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap()
    }

    #[tokio::test]
    async fn test_day_reminder_sent_once() {
        let (state, outbox) = test_state();
        let booking = seed_booking(&state, 42, day("2025-06-14"), hm("20:00"), BookingStatus::Approved);
        let now = at("2025-06-13", "12:00");

        let first = run_cycle(&state, now).await.unwrap();
        let second = run_cycle(&state, now).await.unwrap();

        assert_eq!(first.day_sent, 1);
        assert_eq!(second, CycleReport::default());
        let sent = outbox.sent_to(42);
        assert_eq!(sent.len(), 1);
        let payloads: Vec<&str> = sent[0].inline_keyboard().unwrap().payloads().collect();
        assert_eq!(
            payloads,
            vec![
                format!("confirm_visit_{}", booking.id),
                format!("cancel_visit_{}", booking.id)
            ]
        );
    }

    #[tokio::test]
    async fn test_undelivered_reminder_is_retried() {
        let (state, outbox) = test_state();
        let booking = seed_booking(&state, 42, day("2025-06-14"), hm("20:00"), BookingStatus::Approved);
        let now = at("2025-06-13", "12:00");
        outbox.block(42);

        let report = run_cycle(&state, now).await.unwrap();
        assert_eq!(report.failed, 1);
        assert!(!queries::get_booking(&state.db(), booking.id).unwrap().unwrap().reminder_24h_sent);

        let due = queries::due_day_reminders(&state.db(), day("2025-06-14")).unwrap();
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn test_pending_bookings_get_no_reminder() {
        let (state, outbox) = test_state();
        seed_booking(&state, 42, day("2025-06-14"), hm("20:00"), BookingStatus::Pending);

        run_cycle(&state, at("2025-06-13", "12:00")).await.unwrap();

        assert!(outbox.sent_to(42).is_empty());
    }

    #[tokio::test]
    async fn test_hour_reminder_window() {
        let (state, outbox) = test_state();
        let booking = seed_booking(&state, 42, day("2025-06-14"), hm("20:00"), BookingStatus::Approved);

        // 1h15m ahead: too early.
        run_cycle(&state, at("2025-06-14", "18:45")).await.unwrap();
        assert!(outbox.sent_to(42).is_empty());

        // 1h ahead.
        let report = run_cycle(&state, at("2025-06-14", "19:00")).await.unwrap();
        assert_eq!(report.hour_sent, 1);
        assert!(queries::get_booking(&state.db(), booking.id).unwrap().unwrap().reminder_1h_sent);

        run_cycle(&state, at("2025-06-14", "19:02")).await.unwrap();
        assert_eq!(outbox.sent_to(42).len(), 1);
    }

    #[tokio::test]
    async fn test_hour_reminder_after_midnight() {
        let (state, outbox) = test_state();
        // Friday's 01:30 slot is Saturday early morning.
        seed_booking(&state, 42, day("2025-06-13"), hm("01:30"), BookingStatus::Approved);

        let report = run_cycle(&state, at("2025-06-14", "00:30")).await.unwrap();

        assert_eq!(report.hour_sent, 1);
        assert!(outbox.last_to(42).unwrap().text.contains("01:30"));
    }

    #[tokio::test]
    async fn test_cancel_visit_by_owner() {
        let (state, outbox) = test_state();
        let booking = seed_booking(&state, 42, day("2025-06-14"), hm("20:00"), BookingStatus::Approved);

        cancel_visit(&state, &guest(42, "Anna"), "cb", booking.id).await;

        let stored = queries::get_booking(&state.db(), booking.id).unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::CancelledByGuest);
        assert!(outbox.last_to(ADMIN_ID).unwrap().text.contains("cancelled the visit"));
    }

    #[tokio::test]
    async fn test_other_guest_cannot_touch_booking() {
        let (state, outbox) = test_state();
        let booking = seed_booking(&state, 42, day("2025-06-14"), hm("20:00"), BookingStatus::Approved);
        let stranger = guest(99, "Mallory");

        cancel_visit(&state, &stranger, "cb", booking.id).await;
        confirm_visit(&state, &stranger, "cb", booking.id).await;

        let stored = queries::get_booking(&state.db(), booking.id).unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Approved);
        assert!(outbox.sent_to(ADMIN_ID).is_empty());
        let (_, notice) = outbox.last_answer().unwrap();
        assert_eq!(notice.as_deref(), Some("❌ Booking not found"));
    }

    #[tokio::test]
    async fn test_confirm_visit_notifies_admin() {
        let (state, outbox) = test_state();
        let booking = seed_booking(&state, 42, day("2025-06-14"), hm("20:00"), BookingStatus::Approved);

        confirm_visit(&state, &guest(42, "Anna"), "cb", booking.id).await;

        assert!(outbox.last_to(ADMIN_ID).unwrap().text.contains("confirmed the visit"));
    }
}
