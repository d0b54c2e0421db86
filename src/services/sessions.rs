//! In-memory conversation state shared by the dispatcher and the janitor.
//!
//! Booking sessions are written with a revision check: a handler reads a
//! snapshot, works on it without holding the lock, and commits only if no
//! one else (another update from the same guest, or the janitor) changed
//! the session in between.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;

use crate::models::{BookingSession, BookingStep, ReviewDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionConflict {
    #[error("session no longer exists")]
    Gone,

    #[error("session changed concurrently (expected revision {expected}, found {found})")]
    Stale { expected: u64, found: u64 },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, BookingSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the guest's session, if any.
    pub fn get(&self, guest_id: i64) -> Option<BookingSession> {
        lock(&self.sessions).get(&guest_id).cloned()
    }

    pub fn contains(&self, guest_id: i64) -> bool {
        lock(&self.sessions).contains_key(&guest_id)
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opens a fresh session, returning whatever session it replaced so the
    /// caller can clean up its messages.
    pub fn start(
        &self,
        guest_id: i64,
        chat_id: i64,
        now: NaiveDateTime,
    ) -> (BookingSession, Option<BookingSession>) {
        let mut sessions = lock(&self.sessions);
        let mut session = BookingSession::new(chat_id, now);
        let previous = sessions.remove(&guest_id);
        if let Some(previous) = &previous {
            session.revision = previous.revision + 1;
        }
        sessions.insert(guest_id, session.clone());
        (session, previous)
    }

    /// Moves the session to `step` if it is still at `expected_revision`.
    pub fn compare_and_set(
        &self,
        guest_id: i64,
        expected_revision: u64,
        step: BookingStep,
        now: NaiveDateTime,
    ) -> Result<BookingSession, SessionConflict> {
        let mut sessions = lock(&self.sessions);
        let session = sessions.get_mut(&guest_id).ok_or(SessionConflict::Gone)?;
        if session.revision != expected_revision {
            return Err(SessionConflict::Stale {
                expected: expected_revision,
                found: session.revision,
            });
        }
        session.step = step;
        session.last_activity = now;
        session.revision += 1;
        Ok(session.clone())
    }

    /// Removes the session if it is still at `expected_revision`.
    pub fn remove_if_current(
        &self,
        guest_id: i64,
        expected_revision: u64,
    ) -> Result<BookingSession, SessionConflict> {
        let mut sessions = lock(&self.sessions);
        match sessions.get(&guest_id) {
            None => Err(SessionConflict::Gone),
            Some(session) if session.revision != expected_revision => {
                Err(SessionConflict::Stale {
                    expected: expected_revision,
                    found: session.revision,
                })
            }
            Some(_) => sessions.remove(&guest_id).ok_or(SessionConflict::Gone),
        }
    }

    pub fn remove(&self, guest_id: i64) -> Option<BookingSession> {
        lock(&self.sessions).remove(&guest_id)
    }

    /// Remembers a message sent during the dialog. Returns false when the
    /// session is gone, in which case the caller owns the message.
    pub fn record_artifact(&self, guest_id: i64, message_id: i64) -> bool {
        match lock(&self.sessions).get_mut(&guest_id) {
            Some(session) => {
                session.artifacts.push(message_id);
                true
            }
            None => false,
        }
    }

    /// Refreshes the activity timestamp without changing the step.
    pub fn touch(&self, guest_id: i64, now: NaiveDateTime) {
        if let Some(session) = lock(&self.sessions).get_mut(&guest_id) {
            session.last_activity = now;
        }
    }

    /// Removes and returns every session idle for longer than `ttl_secs`.
    pub fn evict_idle(&self, now: NaiveDateTime, ttl_secs: i64) -> Vec<(i64, BookingSession)> {
        let mut sessions = lock(&self.sessions);
        let expired: Vec<i64> = sessions
            .iter()
            .filter(|(_, session)| session.idle_seconds(now) > ttl_secs)
            .map(|(guest_id, _)| *guest_id)
            .collect();

        expired
            .into_iter()
            .filter_map(|guest_id| sessions.remove(&guest_id).map(|s| (guest_id, s)))
            .collect()
    }
}

/// Ratings waiting for review text, keyed by guest.
#[derive(Default)]
pub struct ReviewDrafts {
    drafts: Mutex<HashMap<i64, ReviewDraft>>,
}

impl ReviewDrafts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) a draft; a second rating overwrites the first.
    pub fn put(&self, guest_id: i64, draft: ReviewDraft) {
        lock(&self.drafts).insert(guest_id, draft);
    }

    pub fn contains(&self, guest_id: i64) -> bool {
        lock(&self.drafts).contains_key(&guest_id)
    }

    /// Consumes the draft. Only one caller ever gets it.
    pub fn take(&self, guest_id: i64) -> Option<ReviewDraft> {
        lock(&self.drafts).remove(&guest_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 10)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    fn time_step() -> BookingStep {
        BookingStep::AwaitingTime {
            date: NaiveDate::from_ymd_opt(2025, 6, 13).unwrap(),
        }
    }

    #[test]
    fn test_compare_and_set_advances_revision() {
        let store = SessionStore::new();
        let (session, previous) = store.start(1, 1, now());
        assert!(previous.is_none());

        let updated = store
            .compare_and_set(1, session.revision, time_step(), now())
            .unwrap();
        assert_eq!(updated.revision, session.revision + 1);
        assert_eq!(store.get(1).unwrap().step, time_step());
    }

    #[test]
    fn test_stale_write_is_refused() {
        let store = SessionStore::new();
        let (session, _) = store.start(1, 1, now());
        store
            .compare_and_set(1, session.revision, time_step(), now())
            .unwrap();

        let second = store.compare_and_set(1, session.revision, BookingStep::AwaitingDate, now());
        assert!(matches!(second, Err(SessionConflict::Stale { .. })));
        assert_eq!(store.get(1).unwrap().step, time_step());
    }

    #[test]
    fn test_write_after_eviction_is_refused() {
        let store = SessionStore::new();
        let (session, _) = store.start(1, 1, now());
        store.remove(1);

        assert_eq!(
            store.compare_and_set(1, session.revision, time_step(), now()),
            Err(SessionConflict::Gone)
        );
        assert!(!store.record_artifact(1, 55));
    }

    #[test]
    fn test_restart_returns_previous_session() {
        let store = SessionStore::new();
        store.start(1, 1, now());
        store.record_artifact(1, 10);
        store.record_artifact(1, 11);

        let (fresh, previous) = store.start(1, 1, now());
        assert_eq!(previous.unwrap().artifacts, vec![10, 11]);
        assert!(fresh.artifacts.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_evicts_only_sessions_past_ttl() {
        let store = SessionStore::new();
        let t = now();
        store.start(1, 1, t - Duration::seconds(1801));
        store.start(2, 2, t - Duration::seconds(1700));
        store.start(3, 3, t - Duration::seconds(1800));

        let evicted = store.evict_idle(t, 1800);
        let ids: Vec<i64> = evicted.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1]);
        assert!(store.contains(2));
        assert!(store.contains(3));
    }

    #[test]
    fn test_remove_if_current() {
        let store = SessionStore::new();
        let (session, _) = store.start(1, 1, now());
        store.touch(1, now());

        assert!(store.remove_if_current(1, session.revision + 5).is_err());
        assert!(store.remove_if_current(1, session.revision).is_ok());
        assert!(store.is_empty());
    }

    #[test]
    fn test_review_draft_is_consumed_once() {
        let drafts = ReviewDrafts::new();
        drafts.put(9, ReviewDraft { rating: 4 });
        drafts.put(9, ReviewDraft { rating: 5 });

        assert_eq!(drafts.take(9), Some(ReviewDraft { rating: 5 }));
        assert_eq!(drafts.take(9), None);
    }
}
