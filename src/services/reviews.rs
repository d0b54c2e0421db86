use crate::db::queries::{self, StatusChange};
use crate::models::{NewReview, ReviewDraft, ReviewStatus, Sender};
use crate::services::admin::notify_admin;
use crate::services::messaging::{acknowledge, deliver, discard, OutgoingMessage};
use crate::services::reply_modes::ReplyTarget;
use crate::services::{keyboards, texts};
use crate::state::AppState;

pub async fn start(state: &AppState, chat_id: i64) {
    let message = OutgoingMessage::markdown(texts::rating_prompt(&state.config.venue))
        .with_inline(keyboards::rating_keyboard());
    deliver(state.messaging(), chat_id, message).await;
}

/// Rating picked: replace the rating keyboard with the text prompt.
pub async fn choose_rating(
    state: &AppState,
    sender: &Sender,
    chat_id: i64,
    callback_id: &str,
    message_id: Option<i64>,
    rating: u8,
) {
    state.review_drafts.put(sender.id, ReviewDraft { rating });
    tracing::info!(guest = sender.id, rating, "review rating chosen");

    if let Some(message_id) = message_id {
        discard(state.messaging(), chat_id, message_id).await;
    }
    let prompt = OutgoingMessage::markdown(texts::review_text_prompt(rating));
    deliver(state.messaging(), chat_id, prompt).await;
    acknowledge(state.messaging(), callback_id, None).await;
}

/// Persists the drafted review with `text`, or without text when skipped.
pub async fn submit(state: &AppState, sender: &Sender, chat_id: i64, text: Option<&str>) {
    let menu = keyboards::main_menu(state.config.is_admin(sender.id));

    let Some(draft) = state.review_drafts.take(sender.id) else {
        let message = OutgoingMessage::plain("There is no review in progress.").with_menu(menu);
        deliver(state.messaging(), chat_id, message).await;
        return;
    };

    let new_review = NewReview {
        guest_id: sender.id,
        name: sender.display_name.clone(),
        rating: draft.rating,
        text: text.map(str::trim).unwrap_or_default().to_string(),
    };
    let created = {
        let conn = state.db();
        queries::create_review(&conn, &new_review)
    };

    let review = match created {
        Ok(review) => review,
        Err(e) => {
            tracing::error!(guest = sender.id, error = %e, "failed to save review");
            let message =
                OutgoingMessage::plain("❌ Could not save your review. Please try again.")
                    .with_menu(menu);
            deliver(state.messaging(), chat_id, message).await;
            return;
        }
    };
    tracing::info!(review_id = review.id, guest = sender.id, rating = review.rating, "review saved");

    let thanks = OutgoingMessage::markdown(
        "✅ *Thank you for your review!*\n\nIt will appear after moderation. ❤️",
    )
    .with_menu(menu);
    deliver(state.messaging(), chat_id, thanks).await;

    let card = OutgoingMessage::markdown(texts::review_card(&review, "⭐ *NEW REVIEW*"))
        .with_inline(keyboards::review_actions(&review));
    notify_admin(state, card).await;
}

/// Publishes or rejects a pending review.
pub async fn moderate(
    state: &AppState,
    chat_id: i64,
    callback_id: &str,
    message_id: Option<i64>,
    review_id: i64,
    verdict: ReviewStatus,
) {
    let change = {
        let conn = state.db();
        queries::transition_review(&conn, review_id, verdict)
    };

    let notice = match change {
        Ok(StatusChange::Applied(_)) => {
            tracing::info!(review_id, status = verdict.as_str(), "review moderated");
            match verdict {
                ReviewStatus::Published => "✅ Review published",
                _ => "❌ Review rejected",
            }
        }
        Ok(StatusChange::Refused(_)) => "⚠️ This review has already been moderated",
        Ok(StatusChange::NotFound) => "❌ Review not found",
        Err(e) => {
            tracing::error!(review_id, error = %e, "failed to moderate review");
            acknowledge(state.messaging(), callback_id, Some("❌ Something went wrong")).await;
            return;
        }
    };

    if let Some(message_id) = message_id {
        if let Err(e) = state.messaging().edit_buttons(chat_id, message_id, None).await {
            tracing::warn!(review_id, error = %e, "failed to remove moderation buttons");
        }
    }
    acknowledge(state.messaging(), callback_id, Some(notice)).await;
}

/// Arms review-reply mode and asks the administrator for the text.
pub async fn start_reply(
    state: &AppState,
    admin_id: i64,
    chat_id: i64,
    callback_id: &str,
    message_id: Option<i64>,
    review_id: i64,
) {
    let review = {
        let conn = state.db();
        queries::get_review(&conn, review_id)
    };

    let review = match review {
        Ok(Some(review)) => review,
        Ok(None) => {
            acknowledge(state.messaging(), callback_id, Some("❌ Review not found")).await;
            return;
        }
        Err(e) => {
            tracing::error!(review_id, error = %e, "failed to load review");
            acknowledge(state.messaging(), callback_id, Some("❌ Something went wrong")).await;
            return;
        }
    };

    state.reply_modes.set(admin_id, ReplyTarget::Review(review_id));
    if let Some(message_id) = message_id {
        if let Err(e) = state.messaging().edit_buttons(chat_id, message_id, None).await {
            tracing::warn!(review_id, error = %e, "failed to remove moderation buttons");
        }
    }
    let prompt = OutgoingMessage::markdown(texts::reply_prompt_for_review(&review));
    deliver(state.messaging(), chat_id, prompt).await;
    acknowledge(state.messaging(), callback_id, None).await;
}

pub async fn relay_reply(state: &AppState, chat_id: i64, review_id: i64, text: &str) {
    let review = {
        let conn = state.db();
        queries::get_review(&conn, review_id)
    };

    let outcome = match review {
        Ok(Some(review)) => {
            let relay = OutgoingMessage::markdown(texts::review_reply_relay(text));
            match deliver(state.messaging(), review.guest_id, relay).await {
                Some(_) => {
                    tracing::info!(review_id, guest = review.guest_id, "review reply relayed");
                    "✅ Reply sent to the guest"
                }
                None => "❌ Could not deliver the reply. The guest may have blocked the bot.",
            }
        }
        Ok(None) => "❌ Review not found",
        Err(e) => {
            tracing::error!(review_id, error = %e, "failed to load review");
            "❌ Something went wrong"
        }
    };

    let message = OutgoingMessage::plain(outcome).with_menu(keyboards::admin_menu());
    deliver(state.messaging(), chat_id, message).await;
}
