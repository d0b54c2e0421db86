use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use crate::config::{AppConfig, VenueInfo};
use crate::db::{self, queries};
use crate::models::{Booking, BookingStatus, NewBooking, Sender};
use crate::services::messaging::{InlineKeyboard, MessagingProvider, OutgoingMessage};
use crate::state::AppState;

pub const ADMIN_ID: i64 = 1000;

/// Everything the bot tried to do through the transport.
#[derive(Default)]
pub struct Outbox {
    next_id: AtomicI64,
    sent: Mutex<Vec<(i64, i64, OutgoingMessage)>>,
    deleted: Mutex<Vec<(i64, i64)>>,
    edited: Mutex<Vec<(i64, i64, Option<InlineKeyboard>)>>,
    answered: Mutex<Vec<(String, Option<String>)>>,
    unreachable: Mutex<HashSet<i64>>,
}

impl Outbox {
    /// Makes every send to `chat_id` fail.
    pub fn block(&self, chat_id: i64) {
        self.unreachable.lock().unwrap().insert(chat_id);
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<OutgoingMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(chat, _, _)| *chat == chat_id)
            .map(|(_, _, message)| message.clone())
            .collect()
    }

    pub fn last_to(&self, chat_id: i64) -> Option<OutgoingMessage> {
        self.sent_to(chat_id).pop()
    }

    pub fn deleted_in(&self, chat_id: i64) -> Vec<i64> {
        self.deleted
            .lock()
            .unwrap()
            .iter()
            .filter(|(chat, _)| *chat == chat_id)
            .map(|(_, id)| *id)
            .collect()
    }

    pub fn edits(&self) -> Vec<(i64, i64, Option<InlineKeyboard>)> {
        self.edited.lock().unwrap().clone()
    }

    pub fn last_answer(&self) -> Option<(String, Option<String>)> {
        self.answered.lock().unwrap().last().cloned()
    }
}

struct RecordingMessenger {
    outbox: Arc<Outbox>,
}

#[async_trait]
impl MessagingProvider for RecordingMessenger {
    async fn send_message(&self, chat_id: i64, message: &OutgoingMessage) -> anyhow::Result<i64> {
        if self.outbox.unreachable.lock().unwrap().contains(&chat_id) {
            anyhow::bail!("Forbidden: bot was blocked by the user {chat_id}");
        }
        let id = self.outbox.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.outbox
            .sent
            .lock()
            .unwrap()
            .push((chat_id, id, message.clone()));
        Ok(id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> anyhow::Result<()> {
        self.outbox
            .deleted
            .lock()
            .unwrap()
            .push((chat_id, message_id));
        Ok(())
    }

    async fn edit_buttons(
        &self,
        chat_id: i64,
        message_id: i64,
        keyboard: Option<&InlineKeyboard>,
    ) -> anyhow::Result<()> {
        self.outbox
            .edited
            .lock()
            .unwrap()
            .push((chat_id, message_id, keyboard.cloned()));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> anyhow::Result<()> {
        self.outbox
            .answered
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        bot_token: String::new(),
        admin_chat_id: ADMIN_ID,
        webhook_url: String::new(),
        webhook_secret: String::new(),
        utc_offset_minutes: 120,
        venue: VenueInfo::default(),
    }
}

pub fn test_state() -> (Arc<AppState>, Arc<Outbox>) {
    test_state_with(test_config())
}

pub fn test_state_with(config: AppConfig) -> (Arc<AppState>, Arc<Outbox>) {
    let outbox = Arc::new(Outbox::default());
    let messaging = RecordingMessenger {
        outbox: Arc::clone(&outbox),
    };
    let conn = db::init_db(":memory:").unwrap();
    let state = Arc::new(AppState::new(conn, config, Box::new(messaging)));
    (state, outbox)
}

pub fn guest(id: i64, name: &str) -> Sender {
    Sender {
        id,
        display_name: name.to_string(),
    }
}

/// Stores a booking for `guest_id` and moves it to `status`.
pub fn seed_booking(
    state: &AppState,
    guest_id: i64,
    date: NaiveDate,
    time: NaiveTime,
    status: BookingStatus,
) -> Booking {
    let conn = state.db();
    let booking = queries::create_booking(
        &conn,
        &NewBooking {
            guest_id,
            name: "Anna".to_string(),
            phone: "+7 (912) 345-67-89".to_string(),
            date,
            time,
            guests: 2,
            comment: None,
        },
    )
    .unwrap();
    if status == BookingStatus::Pending {
        return booking;
    }
    match queries::transition_booking(&conn, booking.id, status).unwrap() {
        queries::StatusChange::Applied(booking) => booking,
        other => panic!("could not seed booking as {status:?}: {other:?}"),
    }
}
