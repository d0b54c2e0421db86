use std::env;

use chrono::{Duration, NaiveDateTime, Utc};

use crate::errors::AppError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub bot_token: String,
    pub admin_chat_id: i64,
    pub webhook_url: String,
    pub webhook_secret: String,
    pub utc_offset_minutes: i32,
    pub venue: VenueInfo,
}

/// Venue details quoted in guest-facing messages.
#[derive(Clone, Debug)]
pub struct VenueInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub description: String,
    pub entertainment: String,
}

impl Default for VenueInfo {
    fn default() -> Self {
        Self {
            name: "Lounge Bar on Uralskaya".to_string(),
            address: "11 Uralskaya St, Kaliningrad".to_string(),
            phone: "+7(4012)63-69-39".to_string(),
            description: "A cosy lounge bar with a game console, Xbox and board games. \
                          The perfect place to unwind with friends!"
                .to_string(),
            entertainment: "🎮 Game console\n🎯 Xbox\n♟️ Board games".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = VenueInfo::default();
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "tablebook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            bot_token: env::var("BOT_TOKEN").unwrap_or_default(),
            admin_chat_id: env::var("ADMIN_CHAT_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            webhook_url: env::var("WEBHOOK_URL").unwrap_or_default(),
            webhook_secret: env::var("WEBHOOK_SECRET").unwrap_or_default(),
            utc_offset_minutes: env::var("VENUE_UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            venue: VenueInfo {
                name: env::var("VENUE_NAME").unwrap_or(defaults.name),
                address: env::var("VENUE_ADDRESS").unwrap_or(defaults.address),
                phone: env::var("VENUE_PHONE").unwrap_or(defaults.phone),
                description: env::var("VENUE_DESCRIPTION").unwrap_or(defaults.description),
                entertainment: env::var("VENUE_ENTERTAINMENT").unwrap_or(defaults.entertainment),
            },
        }
    }

    /// Settings the bot cannot start without.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.bot_token.is_empty() {
            return Err(AppError::Config("BOT_TOKEN must be set".to_string()));
        }
        if !(-720..=840).contains(&self.utc_offset_minutes) {
            return Err(AppError::Config(format!(
                "VENUE_UTC_OFFSET_MINUTES out of range: {}",
                self.utc_offset_minutes
            )));
        }
        if self.admin_chat_id == 0 {
            tracing::warn!("ADMIN_CHAT_ID is not set; booking requests will not reach anyone");
        }
        Ok(())
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_chat_id != 0 && user_id == self.admin_chat_id
    }

    /// Wall-clock time at the venue.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::minutes(self.utc_offset_minutes as i64)
    }
}
