use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{InlineKeyboard, Keyboard, MessagingProvider, OutgoingMessage};
use crate::models::{Inbound, Sender};

const API_BASE: &str = "https://api.telegram.org";

/// Bot API client over HTTPS + JSON.
pub struct TelegramClient {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, API_BASE.to_string())
    }

    pub fn with_base_url(token: String, base_url: String) -> Self {
        Self {
            token,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> anyhow::Result<T> {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);

        let response: ApiResponse<T> = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to call Telegram {method}"))?
            .json()
            .await
            .with_context(|| format!("invalid Telegram {method} response"))?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => bail!(
                "Telegram {method} failed: {}",
                description.unwrap_or_else(|| "no description".to_string())
            ),
        }
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> anyhow::Result<Vec<Update>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    pub async fn set_webhook(&self, url: &str, secret: &str) -> anyhow::Result<()> {
        let mut body = json!({
            "url": url,
            "allowed_updates": ["message", "callback_query"],
        });
        if !secret.is_empty() {
            body["secret_token"] = json!(secret);
        }
        let _: bool = self.call("setWebhook", body).await?;
        Ok(())
    }

    pub async fn delete_webhook(&self) -> anyhow::Result<()> {
        let _: bool = self.call("deleteWebhook", json!({})).await?;
        Ok(())
    }
}

#[async_trait]
impl MessagingProvider for TelegramClient {
    async fn send_message(&self, chat_id: i64, message: &OutgoingMessage) -> anyhow::Result<i64> {
        let sent: Message = self.call("sendMessage", send_body(chat_id, message)).await?;
        Ok(sent.message_id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> anyhow::Result<()> {
        let _: bool = self
            .call(
                "deleteMessage",
                json!({ "chat_id": chat_id, "message_id": message_id }),
            )
            .await?;
        Ok(())
    }

    async fn edit_buttons(
        &self,
        chat_id: i64,
        message_id: i64,
        keyboard: Option<&InlineKeyboard>,
    ) -> anyhow::Result<()> {
        let mut body = json!({ "chat_id": chat_id, "message_id": message_id });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = inline_markup(keyboard);
        }
        // Returns the edited message, or `true` for inline messages.
        let _: Value = self.call("editMessageReplyMarkup", body).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> anyhow::Result<()> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        let _: bool = self.call("answerCallbackQuery", body).await?;
        Ok(())
    }
}

fn send_body(chat_id: i64, message: &OutgoingMessage) -> Value {
    let mut body = json!({ "chat_id": chat_id, "text": message.text });
    if message.markdown {
        body["parse_mode"] = json!("Markdown");
    }
    match &message.keyboard {
        Some(Keyboard::Reply(rows)) => {
            let keyboard: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect())
                .collect();
            body["reply_markup"] = json!({ "keyboard": keyboard, "resize_keyboard": true });
        }
        Some(Keyboard::Inline(keyboard)) => {
            body["reply_markup"] = inline_markup(keyboard);
        }
        None => {}
    }
    body
}

fn inline_markup(keyboard: &InlineKeyboard) -> Value {
    json!({ "inline_keyboard": keyboard.rows })
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

// ── Inbound updates ──

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl User {
    fn display_name(&self) -> String {
        let full = match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        };
        let full = full.trim();
        if !full.is_empty() {
            return full.to_string();
        }
        self.username.clone().unwrap_or_else(|| "Guest".to_string())
    }

    fn sender(&self) -> Sender {
        Sender {
            id: self.id,
            display_name: self.display_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

impl Update {
    /// Converts the update into a transport-neutral event. Updates the bot
    /// does not handle (stickers, edits, channel posts) yield `None`.
    pub fn into_inbound(self) -> Option<Inbound> {
        if let Some(query) = self.callback_query {
            let chat_id = query
                .message
                .as_ref()
                .map(|m| m.chat.id)
                .unwrap_or(query.from.id);
            return Some(Inbound::Callback {
                id: query.id,
                sender: query.from.sender(),
                chat_id,
                message_id: query.message.map(|m| m.message_id),
                data: query.data.unwrap_or_default(),
            });
        }

        let message = self.message?;
        let sender = message.from.as_ref()?.sender();
        Some(Inbound::Text {
            sender,
            chat_id: message.chat.id,
            text: message.text?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Callback;
    use crate::services::messaging::InlineButton;

    #[test]
    fn test_text_update_becomes_inbound_text() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 10,
            "message": {
                "message_id": 5,
                "from": { "id": 42, "first_name": "Anna", "last_name": "Petrova" },
                "chat": { "id": 42 },
                "text": "📅 Book a table"
            }
        }))
        .unwrap();

        let inbound = update.into_inbound().unwrap();
        assert_eq!(
            inbound,
            Inbound::Text {
                sender: Sender {
                    id: 42,
                    display_name: "Anna Petrova".to_string()
                },
                chat_id: 42,
                text: "📅 Book a table".to_string(),
            }
        );
    }

    #[test]
    fn test_callback_update_keeps_message_id() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 11,
            "callback_query": {
                "id": "cb-1",
                "from": { "id": 7, "first_name": "", "username": "boris" },
                "message": { "message_id": 99, "chat": { "id": 7 } },
                "data": "admin_approve_3"
            }
        }))
        .unwrap();

        match update.into_inbound().unwrap() {
            Inbound::Callback {
                id,
                sender,
                chat_id,
                message_id,
                data,
            } => {
                assert_eq!(id, "cb-1");
                assert_eq!(sender.display_name, "boris");
                assert_eq!(chat_id, 7);
                assert_eq!(message_id, Some(99));
                assert_eq!(data, "admin_approve_3");
            }
            other => panic!("expected callback, got {other:?}"),
        }
    }

    #[test]
    fn test_updates_without_text_are_skipped() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 12,
            "message": {
                "message_id": 6,
                "from": { "id": 42, "first_name": "Anna" },
                "chat": { "id": 42 }
            }
        }))
        .unwrap();
        assert!(update.into_inbound().is_none());
    }

    #[test]
    fn test_send_body_with_inline_keyboard() {
        let keyboard = InlineKeyboard::new().row(vec![
            InlineButton::new("✅ Approve", &Callback::AdminApprove(3)),
            InlineButton::new("❌ Reject", &Callback::AdminReject(3)),
        ]);
        let message = OutgoingMessage::markdown("*New booking*").with_inline(keyboard);

        let body = send_body(1, &message);
        assert_eq!(body["parse_mode"], "Markdown");
        assert_eq!(
            body["reply_markup"]["inline_keyboard"][0][1]["callback_data"],
            "admin_reject_3"
        );
    }

    #[test]
    fn test_send_body_with_menu() {
        let message =
            OutgoingMessage::plain("Welcome").with_menu(vec![vec!["📅 Book a table".to_string()]]);

        let body = send_body(1, &message);
        assert!(body.get("parse_mode").is_none());
        assert_eq!(body["reply_markup"]["keyboard"][0][0]["text"], "📅 Book a table");
        assert_eq!(body["reply_markup"]["resize_keyboard"], true);
    }
}
