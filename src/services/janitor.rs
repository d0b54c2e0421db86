use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::services::messaging::discard;
use crate::state::AppState;

pub const SWEEP_PERIOD: Duration = Duration::from_secs(300);
/// Seconds of inactivity after which a booking dialog is dropped.
pub const SESSION_TTL_SECS: i64 = 1800;

pub async fn run(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(SWEEP_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = IntervalStream::new(interval);

    tracing::info!(period_secs = SWEEP_PERIOD.as_secs(), ttl_secs = SESSION_TTL_SECS, "session janitor started");
    while ticks.next().await.is_some() {
        let evicted = sweep(&state, state.config.local_now()).await;
        if evicted > 0 {
            tracing::info!(evicted, remaining = state.sessions.len(), "idle booking sessions evicted");
        }
    }
}

/// Drops every session idle past the TTL along with the messages it sent.
/// The guest is not told.
pub async fn sweep(state: &AppState, now: NaiveDateTime) -> usize {
    let expired = state.sessions.evict_idle(now, SESSION_TTL_SECS);
    for (guest_id, session) in &expired {
        tracing::debug!(
            guest = guest_id,
            step = session.step.as_str(),
            idle_secs = session.idle_seconds(now),
            "booking session expired"
        );
        for message_id in &session.artifacts {
            discard(state.messaging(), session.chat_id, *message_id).await;
        }
    }
    expired.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_sweep_respects_ttl() {
        let (state, outbox) = test_state();
        let now = state.config.local_now();

        state.sessions.start(1, 11, now - ChronoDuration::seconds(1801));
        state.sessions.record_artifact(1, 500);
        state.sessions.start(2, 22, now - ChronoDuration::seconds(1700));
        state.sessions.record_artifact(2, 600);

        assert_eq!(sweep(&state, now).await, 1);

        assert!(!state.sessions.contains(1));
        assert!(state.sessions.contains(2));
        assert_eq!(outbox.deleted_in(11), vec![500]);
        assert!(outbox.deleted_in(22).is_empty());
    }

    #[tokio::test]
    async fn test_exactly_ttl_survives() {
        let (state, _outbox) = test_state();
        let now = state.config.local_now();
        state.sessions.start(1, 11, now - ChronoDuration::seconds(SESSION_TTL_SECS));

        assert_eq!(sweep(&state, now).await, 0);
        assert_eq!(state.sessions.len(), 1);
    }
}
