use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

use crate::models::booking::TIME_FORMAT;
use crate::models::{Callback, Command, Review};
use crate::services::messaging::{InlineButton, InlineKeyboard};

fn labels(rows: &[&[Command]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|c| c.label().to_string()).collect())
        .collect()
}

pub fn main_menu(is_admin: bool) -> Vec<Vec<String>> {
    let mut rows = labels(&[
        &[Command::Book],
        &[Command::Contacts, Command::LeaveReview],
    ]);
    if is_admin {
        rows.push(vec![Command::AdminPanel.label().to_string()]);
    }
    rows
}

pub fn admin_menu() -> Vec<Vec<String>> {
    labels(&[
        &[Command::PendingBookings],
        &[Command::UpcomingBookings, Command::RejectedBookings],
        &[Command::PendingReviews, Command::Statistics],
        &[Command::MainMenu],
    ])
}

pub fn cancel_menu() -> Vec<Vec<String>> {
    labels(&[&[Command::CancelBooking]])
}

pub fn comment_menu() -> Vec<Vec<String>> {
    labels(&[&[Command::SkipComment], &[Command::CancelBooking]])
}

/// Bookable slots for a date: every half hour from 16:00 to 23:30, and on
/// Friday and Saturday nights 00:00 to 02:00 as well.
pub fn time_slots(date: NaiveDate) -> Vec<NaiveTime> {
    let mut slots: Vec<NaiveTime> = (16..24)
        .flat_map(|hour| [0, 30].map(|minute| (hour, minute)))
        .filter_map(|(hour, minute)| NaiveTime::from_hms_opt(hour, minute, 0))
        .collect();

    if matches!(date.weekday(), Weekday::Fri | Weekday::Sat) {
        slots.extend(
            [(0, 0), (0, 30), (1, 0), (1, 30), (2, 0)]
                .into_iter()
                .filter_map(|(hour, minute)| NaiveTime::from_hms_opt(hour, minute, 0)),
        );
    }
    slots
}

pub fn time_menu(date: NaiveDate) -> Vec<Vec<String>> {
    let slots: Vec<String> = time_slots(date)
        .iter()
        .map(|t| t.format(TIME_FORMAT).to_string())
        .collect();

    let mut rows: Vec<Vec<String>> = slots.chunks(4).map(|chunk| chunk.to_vec()).collect();
    rows.extend(labels(&[&[Command::BackToCalendar], &[Command::CancelBooking]]));
    rows
}

/// Approve / reject / reply under a booking card sent to the administrator.
pub fn booking_actions(booking_id: i64) -> InlineKeyboard {
    InlineKeyboard::new()
        .row(vec![
            InlineButton::new("✅ Approve", &Callback::AdminApprove(booking_id)),
            InlineButton::new("❌ Reject", &Callback::AdminReject(booking_id)),
        ])
        .row(vec![InlineButton::new(
            "💬 Reply to guest",
            &Callback::AdminReply(booking_id),
        )])
}

/// Attached to the day-before reminder.
pub fn visit_actions(booking_id: i64) -> InlineKeyboard {
    InlineKeyboard::new().row(vec![
        InlineButton::new("✅ I'll be there", &Callback::ConfirmVisit(booking_id)),
        InlineButton::new("❌ Cancel visit", &Callback::CancelVisit(booking_id)),
    ])
}

pub fn rating_keyboard() -> InlineKeyboard {
    InlineKeyboard::new().row(
        (1..=5)
            .map(|rating| InlineButton::new(format!("{rating} ⭐"), &Callback::ReviewRating(rating)))
            .collect(),
    )
}

/// Moderation buttons; a reply is only offered when there is text to answer.
pub fn review_actions(review: &Review) -> InlineKeyboard {
    let mut keyboard = InlineKeyboard::new().row(vec![
        InlineButton::new("✅ Publish", &Callback::PublishReview(review.id)),
        InlineButton::new("❌ Reject", &Callback::RejectReview(review.id)),
    ]);
    if review.has_text() {
        keyboard.push_row(vec![InlineButton::new(
            "💬 Reply to guest",
            &Callback::ReplyReview(review.id),
        )]);
    }
    keyboard
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewStatus;
    use crate::services::validation::validate_time;
    use chrono::NaiveDateTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekday_slots_end_before_midnight() {
        let tuesday = date(2025, 6, 17);
        let slots = time_slots(tuesday);
        assert_eq!(slots.len(), 16);
        assert_eq!(slots.first().unwrap().format(TIME_FORMAT).to_string(), "16:00");
        assert_eq!(slots.last().unwrap().format(TIME_FORMAT).to_string(), "23:30");
    }

    #[test]
    fn test_weekend_slots_run_past_midnight() {
        let friday = date(2025, 6, 13);
        let slots = time_slots(friday);
        assert_eq!(slots.len(), 21);
        assert_eq!(slots.last().unwrap().format(TIME_FORMAT).to_string(), "02:00");
    }

    #[test]
    fn test_every_offered_slot_is_bookable() {
        for day in 13..=19 {
            let d = date(2025, 6, day);
            for slot in time_slots(d) {
                assert!(validate_time(slot, d).is_ok(), "{slot} on {d}");
            }
        }
    }

    #[test]
    fn test_time_menu_ends_with_navigation() {
        let rows = time_menu(date(2025, 6, 17));
        assert_eq!(rows[0], vec!["16:00", "16:30", "17:00", "17:30"]);
        assert_eq!(rows[rows.len() - 2], vec![Command::BackToCalendar.label()]);
        assert_eq!(rows[rows.len() - 1], vec![Command::CancelBooking.label()]);
    }

    #[test]
    fn test_admin_sees_panel_button() {
        let flat = |rows: Vec<Vec<String>>| rows.concat();
        assert!(flat(main_menu(true)).contains(&Command::AdminPanel.label().to_string()));
        assert!(!flat(main_menu(false)).contains(&Command::AdminPanel.label().to_string()));
    }

    #[test]
    fn test_review_reply_needs_text() {
        let mut review = Review {
            id: 4,
            guest_id: 1,
            name: "Anna".to_string(),
            rating: 5,
            text: String::new(),
            status: ReviewStatus::Pending,
            created_at: NaiveDateTime::default(),
        };
        assert_eq!(review_actions(&review).payloads().count(), 2);

        review.text = "Great hookah".to_string();
        let keyboard = review_actions(&review);
        let payloads: Vec<&str> = keyboard.payloads().collect();
        assert_eq!(
            payloads,
            vec!["publish_review_4", "reject_review_4", "admin_reply_review_4"]
        );
    }
}
