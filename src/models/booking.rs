use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Storage format for reservation dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Format guests see and type.
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";
pub const TIME_FORMAT: &str = "%H:%M";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub guest_id: i64,
    pub name: String,
    pub phone: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub guests: u8,
    pub comment: Option<String>,
    pub status: BookingStatus,
    pub admin_reply: Option<String>,
    pub reminder_24h_sent: bool,
    pub reminder_1h_sent: bool,
    pub review_requested: bool,
    /// Written by SQLite, in UTC rather than venue time.
    pub created_at: NaiveDateTime,
}

impl Booking {
    /// The moment the party is expected. Times before noon belong to the
    /// early hours after the booked evening.
    pub fn visit_starts_at(&self) -> NaiveDateTime {
        let day = if self.time < noon() {
            self.date + Duration::days(1)
        } else {
            self.date
        };
        day.and_time(self.time)
    }

    pub fn display_date(&self) -> String {
        self.date.format(DISPLAY_DATE_FORMAT).to_string()
    }

    pub fn display_time(&self) -> String {
        self.time.format(TIME_FORMAT).to_string()
    }
}

pub(crate) fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Everything collected by the booking dialog, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub guest_id: i64,
    pub name: String,
    pub phone: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub guests: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    CancelledByGuest,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::CancelledByGuest => "cancelled_by_guest",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "approved" => Some(BookingStatus::Approved),
            "rejected" => Some(BookingStatus::Rejected),
            "cancelled_by_guest" => Some(BookingStatus::CancelledByGuest),
            _ => None,
        }
    }

    /// Statuses only move forward; nothing ever returns to pending.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Approved)
                | (BookingStatus::Pending, BookingStatus::Rejected)
                | (BookingStatus::Pending, BookingStatus::CancelledByGuest)
                | (BookingStatus::Approved, BookingStatus::CancelledByGuest)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "awaiting a decision",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::CancelledByGuest => "cancelled by the guest",
        }
    }
}

/// The two reminder passes; each has its own sent flag on the booking row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    DayBefore,
    HourBefore,
}

impl ReminderKind {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            ReminderKind::DayBefore => "reminder_24h_sent",
            ReminderKind::HourBefore => "reminder_1h_sent",
        }
    }
}
