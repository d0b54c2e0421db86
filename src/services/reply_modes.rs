use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// What the administrator's next free-text message answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyTarget {
    Booking(i64),
    Review(i64),
}

#[derive(Debug, Default, Clone, Copy)]
struct Slots {
    booking: Option<i64>,
    review: Option<i64>,
}

/// One pending booking reply and one pending review reply per administrator.
/// Setting a target overwrites the previous one of the same kind.
#[derive(Default)]
pub struct ReplyModes {
    slots: Mutex<HashMap<i64, Slots>>,
}

impl ReplyModes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, admin_id: i64, target: ReplyTarget) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = slots.entry(admin_id).or_default();
        match target {
            ReplyTarget::Booking(id) => entry.booking = Some(id),
            ReplyTarget::Review(id) => entry.review = Some(id),
        }
    }

    pub fn is_active(&self, admin_id: i64) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(&admin_id)
            .is_some_and(|s| s.booking.is_some() || s.review.is_some())
    }

    /// Consumes the pending target; a booking reply is served before a
    /// review reply.
    pub fn take(&self, admin_id: i64) -> Option<ReplyTarget> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = slots.get_mut(&admin_id)?;

        let target = if let Some(id) = entry.booking.take() {
            ReplyTarget::Booking(id)
        } else {
            ReplyTarget::Review(entry.review.take()?)
        };

        if entry.booking.is_none() && entry.review.is_none() {
            slots.remove(&admin_id);
        }
        Some(target)
    }
}
