//! The six-step booking dialog.
//!
//! [`apply`] is the pure transition function; the async functions around it
//! talk to the guest, keep the session store current and persist the
//! finished booking.

use chrono::{Datelike, NaiveDate};

use crate::db::queries;
use crate::models::{Advance, BookingSession, BookingStep, NewBooking, Sender};
use crate::services::admin::notify_admin;
use crate::services::calendar::{month_keyboard, shift_month};
use crate::services::messaging::{acknowledge, deliver, discard, OutgoingMessage};
use crate::services::validation::{self, ValidationError};
use crate::services::{keyboards, texts};
use crate::state::AppState;

/// One answer from the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepInput<'a> {
    /// A day picked on the calendar.
    Date(NaiveDate),
    Text(&'a str),
    SkipComment,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("❌ Please answer the current step first")]
    OutOfOrder,

    #[error("❌ Your booking session has expired. Please start again.")]
    Expired,
}

/// Feeds one answer into the dialog. Invalid answers leave the step as is.
pub fn apply(
    step: &BookingStep,
    input: StepInput<'_>,
    guest_id: i64,
    today: NaiveDate,
) -> Result<Advance, StepError> {
    let next = match (step, input) {
        (BookingStep::AwaitingDate, StepInput::Date(date)) => BookingStep::AwaitingTime {
            date: validation::validate_date(date, today)?,
        },
        (BookingStep::AwaitingDate, StepInput::Text(text)) => BookingStep::AwaitingTime {
            date: validation::validate_date(validation::parse_date(text)?, today)?,
        },
        (BookingStep::AwaitingTime { date }, StepInput::Text(text)) => {
            let time = validation::validate_time(validation::parse_time(text)?, *date)?;
            BookingStep::AwaitingGuests { date: *date, time }
        }
        (BookingStep::AwaitingGuests { date, time }, StepInput::Text(text)) => {
            BookingStep::AwaitingName {
                date: *date,
                time: *time,
                guests: validation::validate_guests(text)?,
            }
        }
        (BookingStep::AwaitingName { date, time, guests }, StepInput::Text(text)) => {
            BookingStep::AwaitingPhone {
                date: *date,
                time: *time,
                guests: *guests,
                name: validation::validate_name(text)?,
            }
        }
        (
            BookingStep::AwaitingPhone {
                date,
                time,
                guests,
                name,
            },
            StepInput::Text(text),
        ) => BookingStep::AwaitingComment {
            date: *date,
            time: *time,
            guests: *guests,
            name: name.clone(),
            phone: validation::normalize_phone(text)?,
        },
        (
            BookingStep::AwaitingComment {
                date,
                time,
                guests,
                name,
                phone,
            },
            StepInput::Text(_) | StepInput::SkipComment,
        ) => {
            let comment = match input {
                StepInput::Text(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                _ => None,
            };
            return Ok(Advance::Complete(NewBooking {
                guest_id,
                name: name.clone(),
                phone: phone.clone(),
                date: *date,
                time: *time,
                guests: *guests,
                comment,
            }));
        }
        _ => return Err(StepError::OutOfOrder),
    };
    Ok(Advance::Next(next))
}

/// The message asking for whatever `step` waits for.
fn prompt_for(step: &BookingStep, today: NaiveDate) -> OutgoingMessage {
    let message = OutgoingMessage::markdown(texts::step_prompt(step));
    match step {
        BookingStep::AwaitingDate => {
            message.with_inline(month_keyboard(today.year(), today.month(), today))
        }
        BookingStep::AwaitingTime { date } => message.with_menu(keyboards::time_menu(*date)),
        BookingStep::AwaitingComment { .. } => message.with_menu(keyboards::comment_menu()),
        BookingStep::AwaitingGuests { .. }
        | BookingStep::AwaitingName { .. }
        | BookingStep::AwaitingPhone { .. } => message.with_menu(keyboards::cancel_menu()),
    }
}

fn main_menu(state: &AppState, sender: &Sender) -> Vec<Vec<String>> {
    keyboards::main_menu(state.config.is_admin(sender.id))
}

async fn clear_artifacts(state: &AppState, chat_id: i64, artifacts: &[i64]) {
    for message_id in artifacts {
        discard(state.messaging(), chat_id, *message_id).await;
    }
}

/// Sends a message that belongs to the dialog, so it is cleaned up with it.
async fn send_artifact(state: &AppState, guest_id: i64, chat_id: i64, message: OutgoingMessage) {
    if let Some(message_id) = deliver(state.messaging(), chat_id, message).await {
        if !state.sessions.record_artifact(guest_id, message_id) {
            discard(state.messaging(), chat_id, message_id).await;
        }
    }
}

/// Opens a new dialog, discarding any unfinished one.
pub async fn start(state: &AppState, sender: &Sender, chat_id: i64) {
    if state.config.is_admin(sender.id) {
        let message = OutgoingMessage::markdown(
            "⛔ *The administrator cannot book tables through the bot*\n\n\
             Use a separate test account to try the booking flow.",
        )
        .with_menu(main_menu(state, sender));
        deliver(state.messaging(), chat_id, message).await;
        return;
    }

    let now = state.config.local_now();
    let (session, previous) = state.sessions.start(sender.id, chat_id, now);
    if let Some(previous) = previous {
        clear_artifacts(state, previous.chat_id, &previous.artifacts).await;
    }

    tracing::info!(guest = sender.id, "booking started");
    send_artifact(
        state,
        sender.id,
        chat_id,
        prompt_for(&session.step, now.date()),
    )
    .await;
}

async fn advance(
    state: &AppState,
    sender: &Sender,
    chat_id: i64,
    input: StepInput<'_>,
) -> Result<(), StepError> {
    let now = state.config.local_now();
    let session = state.sessions.get(sender.id).ok_or(StepError::Expired)?;

    match apply(&session.step, input, sender.id, now.date())? {
        Advance::Next(step) => {
            let prompt = prompt_for(&step, now.date());
            let message_id = deliver(state.messaging(), chat_id, prompt).await;

            match state
                .sessions
                .compare_and_set(sender.id, session.revision, step.clone(), now)
            {
                Ok(_) => {
                    tracing::info!(guest = sender.id, step = step.as_str(), "booking step advanced");
                    if let Some(message_id) = message_id {
                        state.sessions.record_artifact(sender.id, message_id);
                    }
                }
                Err(conflict) => {
                    tracing::warn!(guest = sender.id, error = %conflict, "discarding stale booking step");
                    if let Some(message_id) = message_id {
                        discard(state.messaging(), chat_id, message_id).await;
                    }
                }
            }
        }
        Advance::Complete(booking) => complete(state, sender, chat_id, session, booking).await,
    }
    Ok(())
}

async fn complete(
    state: &AppState,
    sender: &Sender,
    chat_id: i64,
    snapshot: BookingSession,
    new_booking: NewBooking,
) {
    let session = match state.sessions.remove_if_current(sender.id, snapshot.revision) {
        Ok(session) => session,
        Err(conflict) => {
            tracing::warn!(guest = sender.id, error = %conflict, "booking already completed or cancelled");
            return;
        }
    };
    clear_artifacts(state, chat_id, &session.artifacts).await;

    let created = {
        let conn = state.db();
        queries::create_booking(&conn, &new_booking)
    };

    match created {
        Ok(booking) => {
            tracing::info!(booking_id = booking.id, guest = sender.id, "booking created");

            let receipt = OutgoingMessage::markdown(texts::booking_receipt(&booking, &state.config.venue))
                .with_menu(main_menu(state, sender));
            deliver(state.messaging(), chat_id, receipt).await;

            let card = OutgoingMessage::markdown(texts::admin_booking_card(
                &booking,
                "📋 *NEW BOOKING REQUEST*",
            ))
            .with_inline(keyboards::booking_actions(booking.id));
            notify_admin(state, card).await;
        }
        Err(e) => {
            tracing::error!(guest = sender.id, error = %e, "failed to save booking");
            let message = OutgoingMessage::plain(
                "❌ Something went wrong while saving your booking. Please start again.",
            )
            .with_menu(main_menu(state, sender));
            deliver(state.messaging(), chat_id, message).await;
        }
    }
}

async fn report_error(state: &AppState, sender: &Sender, chat_id: i64, error: &StepError) {
    match error {
        StepError::Expired => {
            let message = OutgoingMessage::plain(error.to_string()).with_menu(main_menu(state, sender));
            deliver(state.messaging(), chat_id, message).await;
        }
        StepError::Invalid(_) | StepError::OutOfOrder => {
            send_artifact(state, sender.id, chat_id, OutgoingMessage::plain(error.to_string()))
                .await;
        }
    }
}

/// Free text while a dialog is open.
pub async fn handle_text(state: &AppState, sender: &Sender, chat_id: i64, text: &str) {
    if let Err(e) = advance(state, sender, chat_id, StepInput::Text(text)).await {
        tracing::debug!(guest = sender.id, error = %e, "booking answer rejected");
        report_error(state, sender, chat_id, &e).await;
    }
}

pub async fn skip_comment(state: &AppState, sender: &Sender, chat_id: i64) {
    if let Err(e) = advance(state, sender, chat_id, StepInput::SkipComment).await {
        report_error(state, sender, chat_id, &e).await;
    }
}

/// A day pressed on the calendar. Problems are shown as a callback notice.
pub async fn pick_date(
    state: &AppState,
    sender: &Sender,
    chat_id: i64,
    callback_id: &str,
    date: NaiveDate,
) {
    match advance(state, sender, chat_id, StepInput::Date(date)).await {
        Ok(()) => {
            let notice = format!("✅ {} selected", date.format("%d.%m.%Y"));
            acknowledge(state.messaging(), callback_id, Some(&notice)).await;
        }
        Err(e) => {
            tracing::debug!(guest = sender.id, error = %e, "calendar day refused");
            acknowledge(state.messaging(), callback_id, Some(&e.to_string())).await;
        }
    }
}

/// Pages the calendar `delta` months from the one on display, never
/// earlier than the current month.
pub async fn navigate(
    state: &AppState,
    sender: &Sender,
    chat_id: i64,
    callback_id: &str,
    message_id: Option<i64>,
    (year, month): (i32, u32),
    delta: i32,
) {
    let now = state.config.local_now();
    let today = now.date();
    let current = (today.year(), today.month());
    let target = shift_month(year, month, delta).max(current);

    if let Some(message_id) = message_id.filter(|_| target != (year, month)) {
        let keyboard = month_keyboard(target.0, target.1, today);
        if let Err(e) = state
            .messaging()
            .edit_buttons(chat_id, message_id, Some(&keyboard))
            .await
        {
            tracing::warn!(chat_id, message_id, error = %e, "failed to page calendar");
        }
    }
    state.sessions.touch(sender.id, now);
    acknowledge(state.messaging(), callback_id, None).await;
}

/// Ends the dialog on request, removing everything it sent.
pub async fn cancel(state: &AppState, sender: &Sender, chat_id: i64) {
    let text = match state.sessions.remove(sender.id) {
        Some(session) => {
            clear_artifacts(state, session.chat_id, &session.artifacts).await;
            tracing::info!(guest = sender.id, step = session.step.as_str(), "booking cancelled");
            "❌ Booking cancelled"
        }
        None => "❌ No active booking found",
    };
    let message = OutgoingMessage::plain(text).with_menu(main_menu(state, sender));
    deliver(state.messaging(), chat_id, message).await;
}

/// The cancel button under the calendar.
pub async fn cancel_from_calendar(
    state: &AppState,
    sender: &Sender,
    chat_id: i64,
    callback_id: &str,
    message_id: Option<i64>,
) {
    let owned_by_session = state
        .sessions
        .get(sender.id)
        .zip(message_id)
        .is_some_and(|(session, id)| session.artifacts.contains(&id));
    if let Some(message_id) = message_id.filter(|_| !owned_by_session) {
        discard(state.messaging(), chat_id, message_id).await;
    }

    acknowledge(state.messaging(), callback_id, None).await;
    cancel(state, sender, chat_id).await;
}

/// Returns to date selection, keeping nothing but the session itself.
pub async fn back_to_calendar(state: &AppState, sender: &Sender, chat_id: i64) {
    let Some(session) = state.sessions.get(sender.id) else {
        start(state, sender, chat_id).await;
        return;
    };

    let now = state.config.local_now();
    let step = BookingStep::AwaitingDate;
    let message_id = deliver(state.messaging(), chat_id, prompt_for(&step, now.date())).await;

    match state
        .sessions
        .compare_and_set(sender.id, session.revision, step, now)
    {
        Ok(_) => {
            tracing::info!(guest = sender.id, "booking returned to calendar");
            if let Some(message_id) = message_id {
                state.sessions.record_artifact(sender.id, message_id);
            }
        }
        Err(conflict) => {
            tracing::warn!(guest = sender.id, error = %conflict, "discarding stale calendar reset");
            if let Some(message_id) = message_id {
                discard(state.messaging(), chat_id, message_id).await;
            }
        }
    }
}
