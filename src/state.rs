use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::messaging::MessagingProvider;
use crate::services::reply_modes::ReplyModes;
use crate::services::sessions::{ReviewDrafts, SessionStore};

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub messaging: Box<dyn MessagingProvider>,
    pub sessions: SessionStore,
    pub review_drafts: ReviewDrafts,
    pub reply_modes: ReplyModes,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig, messaging: Box<dyn MessagingProvider>) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            messaging,
            sessions: SessionStore::new(),
            review_drafts: ReviewDrafts::new(),
            reply_modes: ReplyModes::new(),
        }
    }

    /// Locks the connection. Never hold the guard across an `.await`.
    pub fn db(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn messaging(&self) -> &dyn MessagingProvider {
        self.messaging.as_ref()
    }
}
