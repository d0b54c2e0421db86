//! Routes every inbound event to the service that owns it.

use crate::models::{BookingStatus, Callback, Command, Inbound, ReviewStatus, Sender};
use crate::services::messaging::{acknowledge, deliver, OutgoingMessage};
use crate::services::reply_modes::ReplyTarget;
use crate::services::{admin, booking_flow, keyboards, reminders, reviews, texts};
use crate::state::AppState;

const ACCESS_DENIED: &str = "⛔ Access denied";

pub async fn handle_inbound(state: &AppState, inbound: Inbound) {
    match inbound {
        Inbound::Text {
            sender,
            chat_id,
            text,
        } => {
            tracing::debug!(guest = sender.id, chat_id, "text message received");
            handle_text(state, &sender, chat_id, &text).await;
        }
        Inbound::Callback {
            id,
            sender,
            chat_id,
            message_id,
            data,
        } => {
            tracing::debug!(guest = sender.id, chat_id, data = %data, "callback received");
            handle_callback(state, &sender, chat_id, &id, message_id, &data).await;
        }
    }
}

fn main_menu_for(state: &AppState, sender: &Sender) -> Vec<Vec<String>> {
    keyboards::main_menu(state.config.is_admin(sender.id))
}

async fn handle_text(state: &AppState, sender: &Sender, chat_id: i64, text: &str) {
    if let Some(command) = Command::parse(text) {
        return handle_command(state, sender, chat_id, command).await;
    }

    let is_command_like = text.starts_with('/');

    if state.config.is_admin(sender.id) && !is_command_like {
        if let Some(target) = state.reply_modes.take(sender.id) {
            match target {
                ReplyTarget::Booking(booking_id) => {
                    admin::relay_booking_reply(state, sender.id, chat_id, booking_id, text).await
                }
                ReplyTarget::Review(review_id) => {
                    reviews::relay_reply(state, chat_id, review_id, text).await
                }
            }
            return;
        }
    }

    if state.sessions.contains(sender.id) {
        return booking_flow::handle_text(state, sender, chat_id, text).await;
    }

    if !is_command_like && state.review_drafts.contains(sender.id) {
        return reviews::submit(state, sender, chat_id, Some(text)).await;
    }

    let hint = OutgoingMessage::plain("🤔 I didn't understand that. Please use the menu below.")
        .with_menu(main_menu_for(state, sender));
    deliver(state.messaging(), chat_id, hint).await;
}

async fn handle_command(state: &AppState, sender: &Sender, chat_id: i64, command: Command) {
    let is_admin = state.config.is_admin(sender.id);
    if command.requires_admin() && !is_admin {
        tracing::warn!(guest = sender.id, ?command, "privileged command refused");
        let message = OutgoingMessage::plain(ACCESS_DENIED).with_menu(main_menu_for(state, sender));
        deliver(state.messaging(), chat_id, message).await;
        return;
    }

    match command {
        Command::Start => {
            let text = if is_admin {
                texts::welcome_admin(&state.config.venue)
            } else {
                texts::welcome_guest(&state.config.venue)
            };
            let message = OutgoingMessage::markdown(text).with_menu(main_menu_for(state, sender));
            deliver(state.messaging(), chat_id, message).await;
        }
        Command::Book => booking_flow::start(state, sender, chat_id).await,
        Command::Contacts => {
            let message = OutgoingMessage::markdown(texts::contacts(&state.config.venue))
                .with_menu(main_menu_for(state, sender));
            deliver(state.messaging(), chat_id, message).await;
        }
        Command::LeaveReview => reviews::start(state, chat_id).await,
        Command::SkipReview => {
            // `/skip` also answers the comment step when no review is drafted.
            if !state.review_drafts.contains(sender.id) && state.sessions.contains(sender.id) {
                booking_flow::skip_comment(state, sender, chat_id).await;
            } else {
                reviews::submit(state, sender, chat_id, None).await;
            }
        }
        Command::CancelBooking => booking_flow::cancel(state, sender, chat_id).await,
        Command::SkipComment => booking_flow::skip_comment(state, sender, chat_id).await,
        Command::BackToCalendar => booking_flow::back_to_calendar(state, sender, chat_id).await,
        Command::MainMenu => {
            let message =
                OutgoingMessage::plain("🏠 Main menu").with_menu(main_menu_for(state, sender));
            deliver(state.messaging(), chat_id, message).await;
        }
        Command::AdminPanel => admin::open_panel(state, chat_id).await,
        Command::PendingBookings => admin::show_pending_bookings(state, chat_id).await,
        Command::UpcomingBookings => admin::show_upcoming_bookings(state, chat_id).await,
        Command::RejectedBookings => admin::show_rejected_bookings(state, chat_id).await,
        Command::PendingReviews => admin::show_pending_reviews(state, chat_id).await,
        Command::Statistics => admin::show_stats(state, chat_id).await,
    }
}

async fn handle_callback(
    state: &AppState,
    sender: &Sender,
    chat_id: i64,
    callback_id: &str,
    message_id: Option<i64>,
    data: &str,
) {
    let callback = match Callback::parse(data) {
        Ok(callback) => callback,
        Err(e) => {
            tracing::warn!(guest = sender.id, error = %e, "rejected callback");
            acknowledge(state.messaging(), callback_id, Some("❌ Unknown command")).await;
            return;
        }
    };

    if callback.requires_admin() && !state.config.is_admin(sender.id) {
        tracing::warn!(guest = sender.id, data, "privileged callback refused");
        acknowledge(state.messaging(), callback_id, Some(ACCESS_DENIED)).await;
        return;
    }

    match callback {
        Callback::Ignore => acknowledge(state.messaging(), callback_id, None).await,
        Callback::CalendarPrev { year, month } => {
            booking_flow::navigate(state, sender, chat_id, callback_id, message_id, (year, month), -1)
                .await
        }
        Callback::CalendarNext { year, month } => {
            booking_flow::navigate(state, sender, chat_id, callback_id, message_id, (year, month), 1)
                .await
        }
        Callback::CalendarDay(date) => {
            booking_flow::pick_date(state, sender, chat_id, callback_id, date).await
        }
        Callback::CalendarCancel => {
            booking_flow::cancel_from_calendar(state, sender, chat_id, callback_id, message_id)
                .await
        }
        Callback::AdminApprove(booking_id) => {
            admin::decide(state, chat_id, callback_id, message_id, booking_id, BookingStatus::Approved)
                .await
        }
        Callback::AdminReject(booking_id) => {
            admin::decide(state, chat_id, callback_id, message_id, booking_id, BookingStatus::Rejected)
                .await
        }
        Callback::AdminReply(booking_id) => {
            admin::start_booking_reply(state, sender.id, chat_id, callback_id, booking_id).await
        }
        Callback::ConfirmVisit(booking_id) => {
            reminders::confirm_visit(state, sender, callback_id, booking_id).await
        }
        Callback::CancelVisit(booking_id) => {
            reminders::cancel_visit(state, sender, callback_id, booking_id).await
        }
        Callback::ReviewRating(rating) => {
            reviews::choose_rating(state, sender, chat_id, callback_id, message_id, rating).await
        }
        Callback::PublishReview(review_id) => {
            reviews::moderate(state, chat_id, callback_id, message_id, review_id, ReviewStatus::Published)
                .await
        }
        Callback::RejectReview(review_id) => {
            reviews::moderate(state, chat_id, callback_id, message_id, review_id, ReviewStatus::Rejected)
                .await
        }
        Callback::ReplyReview(review_id) => {
            reviews::start_reply(state, sender.id, chat_id, callback_id, message_id, review_id).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries;
    use crate::models::BookingStep;
    use crate::test_support::{guest, seed_booking, test_state, ADMIN_ID};
    use chrono::{Duration, NaiveTime};

    fn text(sender: &Sender, body: &str) -> Inbound {
        Inbound::Text {
            sender: sender.clone(),
            chat_id: sender.id,
            text: body.to_string(),
        }
    }

    fn press(sender: &Sender, data: &str) -> Inbound {
        Inbound::Callback {
            id: format!("cb-{data}"),
            sender: sender.clone(),
            chat_id: sender.id,
            message_id: Some(1),
            data: data.to_string(),
        }
    }

    #[tokio::test]
    async fn test_guest_cannot_approve() {
        let (state, outbox) = test_state();
        let anna = guest(42, "Anna");
        let date = state.config.local_now().date() + Duration::days(1);
        let booking = seed_booking(&state, 42, date, NaiveTime::from_hms_opt(20, 0, 0).unwrap(), BookingStatus::Pending);

        handle_inbound(&state, press(&anna, &format!("admin_approve_{}", booking.id))).await;

        let (_, notice) = outbox.last_answer().unwrap();
        assert_eq!(notice.as_deref(), Some(ACCESS_DENIED));
        let stored = queries::get_booking(&state.db(), booking.id).unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_guest_cannot_open_admin_panel() {
        let (state, outbox) = test_state();
        let anna = guest(42, "Anna");

        handle_inbound(&state, text(&anna, Command::Statistics.label())).await;

        assert_eq!(outbox.last_to(42).unwrap().text, ACCESS_DENIED);
    }

    #[tokio::test]
    async fn test_malformed_callback_is_rejected() {
        let (state, outbox) = test_state();
        let anna = guest(42, "Anna");

        handle_inbound(&state, press(&anna, "admin_approve_abc")).await;
        handle_inbound(&state, press(&anna, "launch_rockets")).await;

        let (_, notice) = outbox.last_answer().unwrap();
        assert_eq!(notice.as_deref(), Some("❌ Unknown command"));
    }

    #[tokio::test]
    async fn test_calendar_year_overflow_is_rejected() {
        let (state, outbox) = test_state();
        let anna = guest(42, "Anna");
        handle_inbound(&state, text(&anna, Command::Book.label())).await;

        handle_inbound(&state, press(&anna, "calendar_next_2147483647_12")).await;

        let (_, notice) = outbox.last_answer().unwrap();
        assert_eq!(notice.as_deref(), Some("❌ Unknown command"));
        assert!(outbox.edits().is_empty());
        assert!(state.sessions.contains(42));
    }

    #[tokio::test]
    async fn test_cancel_works_in_any_step() {
        let (state, _outbox) = test_state();
        let anna = guest(42, "Anna");
        let date = state.config.local_now().date() + Duration::days(1);

        handle_inbound(&state, text(&anna, "/book")).await;
        handle_inbound(&state, press(&anna, &Callback::CalendarDay(date).payload())).await;
        handle_inbound(&state, text(&anna, "20:00")).await;
        assert!(matches!(
            state.sessions.get(42).unwrap().step,
            BookingStep::AwaitingGuests { .. }
        ));

        handle_inbound(&state, text(&anna, Command::CancelBooking.label())).await;
        assert!(!state.sessions.contains(42));
    }

    #[tokio::test]
    async fn test_calendar_day_outside_date_step_is_refused() {
        let (state, outbox) = test_state();
        let anna = guest(42, "Anna");
        let date = state.config.local_now().date() + Duration::days(1);

        handle_inbound(&state, text(&anna, "/book")).await;
        handle_inbound(&state, press(&anna, &Callback::CalendarDay(date).payload())).await;
        handle_inbound(&state, press(&anna, &Callback::CalendarDay(date + Duration::days(1)).payload())).await;

        let (_, notice) = outbox.last_answer().unwrap();
        assert_eq!(notice.as_deref(), Some("❌ Please answer the current step first"));
        assert_eq!(state.sessions.get(42).unwrap().step.date(), Some(date));
    }

    #[tokio::test]
    async fn test_admin_reply_mode_takes_precedence() {
        let (state, outbox) = test_state();
        let admin = guest(ADMIN_ID, "Admin");
        let date = state.config.local_now().date() + Duration::days(1);
        let booking = seed_booking(&state, 42, date, NaiveTime::from_hms_opt(20, 0, 0).unwrap(), BookingStatus::Approved);

        handle_inbound(&state, press(&admin, &format!("admin_reply_{}", booking.id))).await;
        handle_inbound(&state, text(&admin, "Your table is by the window")).await;

        assert!(outbox.last_to(42).unwrap().text.contains("Your table is by the window"));
        assert!(!state.reply_modes.is_active(ADMIN_ID));

        // The next message is no longer a reply.
        handle_inbound(&state, text(&admin, "hello")).await;
        assert_eq!(outbox.sent_to(42).len(), 1);
    }

    #[tokio::test]
    async fn test_slash_text_is_not_a_review() {
        let (state, outbox) = test_state();
        let boris = guest(7, "Boris");

        handle_inbound(&state, press(&boris, "review_direct_5")).await;
        handle_inbound(&state, text(&boris, "/unknown")).await;
        assert!(state.review_drafts.contains(7));
        assert!(outbox.last_to(7).unwrap().text.starts_with("🤔"));

        handle_inbound(&state, text(&boris, "/skip")).await;
        assert!(!state.review_drafts.contains(7));
        assert_eq!(queries::get_stats(&state.db()).unwrap().total_reviews, 1);
    }

    #[tokio::test]
    async fn test_unknown_text_gets_hint() {
        let (state, outbox) = test_state();
        handle_inbound(&state, text(&guest(7, "Boris"), "what's up")).await;

        let hint = outbox.last_to(7).unwrap();
        assert!(hint.text.starts_with("🤔"));
        assert!(hint.keyboard.is_some());
    }
}
