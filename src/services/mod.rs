pub mod admin;
pub mod booking_flow;
pub mod calendar;
pub mod dispatch;
pub mod janitor;
pub mod keyboards;
pub mod messaging;
pub mod polling;
pub mod reminders;
pub mod reply_modes;
pub mod reviews;
pub mod sessions;
pub mod texts;
pub mod validation;
