use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::NewBooking;

/// Where a guest is in the booking dialog. Each step carries exactly the
/// answers collected so far, so a finished dialog always has every field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingStep {
    AwaitingDate,
    AwaitingTime {
        date: NaiveDate,
    },
    AwaitingGuests {
        date: NaiveDate,
        time: NaiveTime,
    },
    AwaitingName {
        date: NaiveDate,
        time: NaiveTime,
        guests: u8,
    },
    AwaitingPhone {
        date: NaiveDate,
        time: NaiveTime,
        guests: u8,
        name: String,
    },
    AwaitingComment {
        date: NaiveDate,
        time: NaiveTime,
        guests: u8,
        name: String,
        phone: String,
    },
}

impl BookingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStep::AwaitingDate => "awaiting_date",
            BookingStep::AwaitingTime { .. } => "awaiting_time",
            BookingStep::AwaitingGuests { .. } => "awaiting_guests",
            BookingStep::AwaitingName { .. } => "awaiting_name",
            BookingStep::AwaitingPhone { .. } => "awaiting_phone",
            BookingStep::AwaitingComment { .. } => "awaiting_comment",
        }
    }

    /// 1-based position shown to the guest as "Step N of 6".
    pub fn number(&self) -> u8 {
        match self {
            BookingStep::AwaitingDate => 1,
            BookingStep::AwaitingTime { .. } => 2,
            BookingStep::AwaitingGuests { .. } => 3,
            BookingStep::AwaitingName { .. } => 4,
            BookingStep::AwaitingPhone { .. } => 5,
            BookingStep::AwaitingComment { .. } => 6,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            BookingStep::AwaitingDate => None,
            BookingStep::AwaitingTime { date }
            | BookingStep::AwaitingGuests { date, .. }
            | BookingStep::AwaitingName { date, .. }
            | BookingStep::AwaitingPhone { date, .. }
            | BookingStep::AwaitingComment { date, .. } => Some(*date),
        }
    }
}

pub const TOTAL_STEPS: u8 = 6;

/// In-progress booking dialog for one guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingSession {
    pub chat_id: i64,
    pub step: BookingStep,
    /// Messages sent during the dialog, removed when it ends.
    pub artifacts: Vec<i64>,
    pub last_activity: NaiveDateTime,
    /// Bumped by the session store on every successful write.
    pub revision: u64,
}

impl BookingSession {
    pub fn new(chat_id: i64, now: NaiveDateTime) -> Self {
        Self {
            chat_id,
            step: BookingStep::AwaitingDate,
            artifacts: Vec::new(),
            last_activity: now,
            revision: 0,
        }
    }

    pub fn idle_seconds(&self, now: NaiveDateTime) -> i64 {
        (now - self.last_activity).num_seconds()
    }
}

/// Result of feeding one answer into the dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next(BookingStep),
    Complete(NewBooking),
}
