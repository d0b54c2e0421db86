use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: i64,
    pub display_name: String,
}

/// A transport-neutral inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text {
        sender: Sender,
        chat_id: i64,
        text: String,
    },
    Callback {
        id: String,
        sender: Sender,
        chat_id: i64,
        message_id: Option<i64>,
        data: String,
    },
}

impl Inbound {
    pub fn sender(&self) -> &Sender {
        match self {
            Inbound::Text { sender, .. } | Inbound::Callback { sender, .. } => sender,
        }
    }
}
