//! Everything the administrator does from the chat: deciding on requests,
//! replying to guests and browsing the panel lists.

use crate::db::queries::{self, StatusChange};
use crate::models::{Booking, BookingStatus, ReviewStatus};
use crate::services::messaging::{acknowledge, deliver, OutgoingMessage};
use crate::services::reply_modes::ReplyTarget;
use crate::services::{keyboards, texts};
use crate::state::AppState;

const UPCOMING_LIMIT: i64 = 20;
const REJECTED_LIMIT: i64 = 10;
const REVIEWS_LIMIT: i64 = 50;

const LOAD_FAILED: &str = "❌ Could not load the data. Please try again later.";

/// Sends to the configured administrator. Skipped when none is configured.
pub async fn notify_admin(state: &AppState, message: OutgoingMessage) -> Option<i64> {
    if state.config.admin_chat_id == 0 {
        tracing::warn!("ADMIN_CHAT_ID is not set, dropping administrator notification");
        return None;
    }
    deliver(state.messaging(), state.config.admin_chat_id, message).await
}

async fn send_panel_text(state: &AppState, chat_id: i64, text: impl Into<String>) {
    let message = OutgoingMessage::markdown(text).with_menu(keyboards::admin_menu());
    deliver(state.messaging(), chat_id, message).await;
}

pub async fn open_panel(state: &AppState, chat_id: i64) {
    send_panel_text(state, chat_id, texts::welcome_admin(&state.config.venue)).await;
}

async fn remove_buttons(state: &AppState, chat_id: i64, message_id: Option<i64>) {
    let Some(message_id) = message_id else {
        return;
    };
    if let Err(e) = state.messaging().edit_buttons(chat_id, message_id, None).await {
        tracing::warn!(chat_id, message_id, error = %e, "failed to remove action buttons");
    }
}

/// Approves or rejects a pending request and tells the guest.
pub async fn decide(
    state: &AppState,
    chat_id: i64,
    callback_id: &str,
    message_id: Option<i64>,
    booking_id: i64,
    decision: BookingStatus,
) {
    let change = {
        let conn = state.db();
        queries::transition_booking(&conn, booking_id, decision)
    };

    let notice = match change {
        Ok(StatusChange::Applied(booking)) => {
            tracing::info!(booking_id, status = decision.as_str(), "booking decided");
            notify_guest_of_decision(state, &booking).await;
            remove_buttons(state, chat_id, message_id).await;
            match decision {
                BookingStatus::Approved => "✅ Booking approved".to_string(),
                _ => "❌ Booking rejected".to_string(),
            }
        }
        Ok(StatusChange::Refused(booking)) => {
            tracing::info!(booking_id, status = booking.status.as_str(), "booking already decided");
            remove_buttons(state, chat_id, message_id).await;
            format!("⚠️ This booking is already {}", booking.status.label())
        }
        Ok(StatusChange::NotFound) => "❌ Booking not found".to_string(),
        Err(e) => {
            tracing::error!(booking_id, error = %e, "failed to update booking status");
            "❌ Something went wrong".to_string()
        }
    };
    acknowledge(state.messaging(), callback_id, Some(&notice)).await;
}

async fn notify_guest_of_decision(state: &AppState, booking: &Booking) {
    let text = match booking.status {
        BookingStatus::Approved => texts::approval_notice(booking, &state.config.venue),
        _ => texts::rejection_notice(booking, &state.config.venue),
    };
    if deliver(state.messaging(), booking.guest_id, OutgoingMessage::markdown(text))
        .await
        .is_none()
    {
        tracing::warn!(booking_id = booking.id, guest = booking.guest_id, "guest not told about decision");
    }
}

/// Arms booking-reply mode and asks the administrator for the text.
pub async fn start_booking_reply(
    state: &AppState,
    admin_id: i64,
    chat_id: i64,
    callback_id: &str,
    booking_id: i64,
) {
    let booking = {
        let conn = state.db();
        queries::get_booking(&conn, booking_id)
    };

    match booking {
        Ok(Some(booking)) => {
            state.reply_modes.set(admin_id, ReplyTarget::Booking(booking_id));
            tracing::info!(booking_id, "awaiting administrator reply");
            let prompt = OutgoingMessage::markdown(texts::reply_prompt_for_booking(&booking));
            deliver(state.messaging(), chat_id, prompt).await;
            acknowledge(state.messaging(), callback_id, None).await;
        }
        Ok(None) => {
            acknowledge(state.messaging(), callback_id, Some("❌ Booking not found")).await;
        }
        Err(e) => {
            tracing::error!(booking_id, error = %e, "failed to load booking");
            acknowledge(state.messaging(), callback_id, Some("❌ Something went wrong")).await;
        }
    }
}

/// Stores the administrator's reply on the booking and relays it.
pub async fn relay_booking_reply(
    state: &AppState,
    admin_id: i64,
    chat_id: i64,
    booking_id: i64,
    text: &str,
) {
    let stored = {
        let conn = state.db();
        queries::set_admin_reply(&conn, booking_id, admin_id, text)
    };

    let booking = match stored {
        Ok(Some(booking)) => booking,
        Ok(None) => {
            send_panel_text(state, chat_id, "❌ Booking not found").await;
            return;
        }
        Err(e) => {
            tracing::error!(booking_id, error = %e, "failed to store administrator reply");
            send_panel_text(state, chat_id, "❌ Could not save the reply").await;
            return;
        }
    };

    let relay = OutgoingMessage::markdown(texts::booking_reply_relay(text, &state.config.venue));
    let outcome = match deliver(state.messaging(), booking.guest_id, relay).await {
        Some(_) => {
            tracing::info!(booking_id, guest = booking.guest_id, "administrator reply relayed");
            format!("✅ Reply delivered to {}", texts::escape_markdown(&booking.name))
        }
        None => "❌ Could not deliver the reply. The guest may have blocked the bot.".to_string(),
    };
    send_panel_text(state, chat_id, outcome).await;
}

pub async fn show_pending_bookings(state: &AppState, chat_id: i64) {
    let bookings = {
        let conn = state.db();
        queries::get_bookings_by_status(&conn, BookingStatus::Pending)
    };
    let bookings = match bookings {
        Ok(bookings) => bookings,
        Err(e) => {
            tracing::error!(error = %e, "failed to list pending bookings");
            return send_panel_text(state, chat_id, LOAD_FAILED).await;
        }
    };

    if bookings.is_empty() {
        return send_panel_text(state, chat_id, "✅ No bookings are waiting for a decision").await;
    }

    send_panel_text(
        state,
        chat_id,
        format!("⏳ *Bookings awaiting a decision: {}*", bookings.len()),
    )
    .await;
    for booking in &bookings {
        let card = OutgoingMessage::markdown(texts::admin_booking_card(booking, "⏳ *Booking*"))
            .with_inline(keyboards::booking_actions(booking.id));
        deliver(state.messaging(), chat_id, card).await;
    }
}

async fn show_booking_list(
    state: &AppState,
    chat_id: i64,
    bookings: anyhow::Result<Vec<Booking>>,
    heading: &str,
    empty: &str,
) {
    let bookings = match bookings {
        Ok(bookings) => bookings,
        Err(e) => {
            tracing::error!(error = %e, "failed to list bookings");
            return send_panel_text(state, chat_id, LOAD_FAILED).await;
        }
    };

    if bookings.is_empty() {
        return send_panel_text(state, chat_id, empty).await;
    }

    send_panel_text(state, chat_id, format!("{heading}: {}*", bookings.len())).await;
    for booking in &bookings {
        let card = OutgoingMessage::markdown(texts::admin_booking_card(booking, "📋 *Booking*"));
        deliver(state.messaging(), chat_id, card).await;
    }
}

pub async fn show_upcoming_bookings(state: &AppState, chat_id: i64) {
    let today = state.config.local_now().date();
    let bookings = {
        let conn = state.db();
        queries::get_upcoming_bookings(&conn, today, UPCOMING_LIMIT)
    };
    show_booking_list(
        state,
        chat_id,
        bookings,
        "✅ *Upcoming bookings",
        "📭 No upcoming bookings",
    )
    .await;
}

pub async fn show_rejected_bookings(state: &AppState, chat_id: i64) {
    let bookings = {
        let conn = state.db();
        queries::get_recent_bookings_by_status(&conn, BookingStatus::Rejected, REJECTED_LIMIT)
    };
    show_booking_list(
        state,
        chat_id,
        bookings,
        "❌ *Recently rejected bookings",
        "📭 No rejected bookings",
    )
    .await;
}

pub async fn show_pending_reviews(state: &AppState, chat_id: i64) {
    let reviews = {
        let conn = state.db();
        queries::get_reviews_by_status(&conn, ReviewStatus::Pending, REVIEWS_LIMIT)
    };
    let reviews = match reviews {
        Ok(reviews) => reviews,
        Err(e) => {
            tracing::error!(error = %e, "failed to list pending reviews");
            return send_panel_text(state, chat_id, LOAD_FAILED).await;
        }
    };

    if reviews.is_empty() {
        return send_panel_text(state, chat_id, "✅ No reviews are waiting for moderation").await;
    }

    send_panel_text(
        state,
        chat_id,
        format!("💬 *Reviews awaiting moderation: {}*", reviews.len()),
    )
    .await;
    for review in &reviews {
        let card = OutgoingMessage::markdown(texts::review_card(review, "⭐ *Review*"))
            .with_inline(keyboards::review_actions(review));
        deliver(state.messaging(), chat_id, card).await;
    }
}

pub async fn show_stats(state: &AppState, chat_id: i64) {
    let today = state.config.local_now().date();
    let report = {
        let conn = state.db();
        queries::get_stats_report(&conn, today)
    };
    match report {
        Ok(report) => send_panel_text(state, chat_id, texts::stats_report(&report)).await,
        Err(e) => {
            tracing::error!(error = %e, "failed to build statistics");
            send_panel_text(state, chat_id, LOAD_FAILED).await;
        }
    }
}
