use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::errors::AppError;
use crate::services::dispatch;
use crate::services::messaging::telegram::Update;
use crate::state::AppState;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Answers 200 for every authenticated update, handled or not.
pub async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Result<StatusCode, AppError> {
    // No secret means polling mode, where nothing should arrive here.
    let expected = &state.config.webhook_secret;
    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if expected.is_empty() || provided != expected {
        tracing::warn!(update_id = update.update_id, "webhook call with a bad secret token");
        return Err(AppError::Unauthorized);
    }

    let update_id = update.update_id;
    match update.into_inbound() {
        Some(inbound) => dispatch::handle_inbound(&state, inbound).await,
        None => tracing::debug!(update_id, "ignoring unsupported update"),
    }
    Ok(StatusCode::OK)
}
