pub mod telegram;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::Callback;

/// One inline action button. The payload is always produced from a typed
/// [`Callback`], so every button the bot sends parses back on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback: &Callback) -> Self {
        Self {
            text: text.into(),
            callback_data: callback.payload(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.rows.push(buttons);
        self
    }

    pub fn push_row(&mut self, buttons: Vec<InlineButton>) {
        self.rows.push(buttons);
    }

    /// Every button payload, row by row.
    pub fn payloads(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .flatten()
            .map(|button| button.callback_data.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Persistent menu buttons; pressing one sends its label as text.
    Reply(Vec<Vec<String>>),
    Inline(InlineKeyboard),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub keyboard: Option<Keyboard>,
    /// Render `text` as Markdown.
    pub markdown: bool,
}

impl OutgoingMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            markdown: false,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            markdown: true,
        }
    }

    pub fn with_menu(mut self, rows: Vec<Vec<String>>) -> Self {
        self.keyboard = Some(Keyboard::Reply(rows));
        self
    }

    pub fn with_inline(mut self, keyboard: InlineKeyboard) -> Self {
        self.keyboard = Some(Keyboard::Inline(keyboard));
        self
    }

    pub fn inline_keyboard(&self) -> Option<&InlineKeyboard> {
        match &self.keyboard {
            Some(Keyboard::Inline(keyboard)) => Some(keyboard),
            _ => None,
        }
    }
}

#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// Sends a message and returns the transport's id for it.
    async fn send_message(&self, chat_id: i64, message: &OutgoingMessage) -> anyhow::Result<i64>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> anyhow::Result<()>;

    /// Replaces the inline buttons under a sent message; `None` removes them.
    async fn edit_buttons(
        &self,
        chat_id: i64,
        message_id: i64,
        keyboard: Option<&InlineKeyboard>,
    ) -> anyhow::Result<()>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> anyhow::Result<()>;
}

/// Sends a message where delivery failure is not fatal to the caller.
pub async fn deliver(
    messaging: &dyn MessagingProvider,
    chat_id: i64,
    message: OutgoingMessage,
) -> Option<i64> {
    match messaging.send_message(chat_id, &message).await {
        Ok(message_id) => Some(message_id),
        Err(e) => {
            tracing::error!(chat_id, error = %e, "failed to deliver message");
            None
        }
    }
}

/// Best-effort delete; the message may already be gone.
pub async fn discard(messaging: &dyn MessagingProvider, chat_id: i64, message_id: i64) -> bool {
    match messaging.delete_message(chat_id, message_id).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(chat_id, message_id, error = %e, "failed to delete message");
            false
        }
    }
}

/// Best-effort callback acknowledgement.
pub async fn acknowledge(messaging: &dyn MessagingProvider, callback_id: &str, text: Option<&str>) {
    if let Err(e) = messaging.answer_callback(callback_id, text).await {
        tracing::warn!(callback_id, error = %e, "failed to answer callback");
    }
}
