//! Per-turn polling state machine.
//!
//! A turn runs from a successful dispatch until a reply is accepted,
//! the turn ceiling expires, or the turn is cancelled. The runner owns
//! the single poll timer; cadence comes from [`PollCadence`] and
//! dedup/cursor discipline from [`PollCursor`]. Feed errors are
//! transient by design: they are logged and the schedule continues,
//! trading a slightly stale view for availability.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use quotewire_types::message::Message;

use crate::cadence::PollCadence;
use crate::cursor::PollCursor;
use crate::feed::ReplyFeed;

/// Lifecycle of a chat turn, as surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Dispatching,
    Polling,
    Delivered,
    TimedOut,
    Errored,
}

/// How a turn's polling phase ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// At least one new reply was accepted; polling stops for this turn.
    Delivered(Vec<Message>),
    /// The ceiling expired with no new reply. The reply may simply be
    /// late; the background cadence keeps watching.
    TimedOut,
    /// The turn was cancelled (session reset, shutdown).
    Cancelled,
}

/// Drives the polling phase of a turn against a [`ReplyFeed`].
#[derive(Debug, Clone)]
pub struct TurnRunner {
    cadence: PollCadence,
    ceiling: Duration,
}

impl TurnRunner {
    pub fn new(cadence: PollCadence, ceiling: Duration) -> Self {
        Self { cadence, ceiling }
    }

    /// Poll until a new reply is accepted, the ceiling expires, or
    /// `cancel` fires.
    ///
    /// The cursor advances only on acceptance, so a timed-out turn
    /// leaves `since` where the next poll can still pick up the late
    /// reply.
    pub async fn run<F: ReplyFeed>(
        &self,
        feed: &F,
        session_id: &str,
        cursor: &mut PollCursor,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let deadline = tokio::time::Instant::now() + self.ceiling;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let mut hinted_delay = None;

            match feed.fetch(session_id, cursor.since()).await {
                Ok(polled) => {
                    let fresh = cursor.accept(polled, Utc::now());
                    if !fresh.is_empty() {
                        return TurnOutcome::Delivered(fresh);
                    }
                }
                Err(err) => {
                    if let quotewire_types::error::FeedError::Status {
                        retry_after: Some(secs),
                        ..
                    } = &err
                    {
                        hinted_delay = Some(Duration::from_secs(*secs));
                    }
                    warn!(session_id, attempt, error = %err, "poll failed, keeping schedule");
                }
            }

            let mut delay = self.cadence.next_delay(attempt);
            if let Some(hint) = hinted_delay {
                delay = delay.max(hint);
            }

            if tokio::time::Instant::now() + delay >= deadline {
                return TurnOutcome::TimedOut;
            }

            tokio::select! {
                _ = cancel.cancelled() => return TurnOutcome::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// One background poll between turns: same feed, same cursor
/// discipline, no schedule of its own (the caller owns the timer).
/// Errors are logged and swallowed; returns the newly accepted replies.
pub async fn poll_once<F: ReplyFeed>(
    feed: &F,
    session_id: &str,
    cursor: &mut PollCursor,
) -> Vec<Message> {
    match feed.fetch(session_id, cursor.since()).await {
        Ok(polled) => cursor.accept(polled, Utc::now()),
        Err(err) => {
            warn!(session_id, error = %err, "background poll failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use quotewire_types::error::FeedError;
    use quotewire_types::message::Sender;

    /// Feed that replays a scripted sequence of poll results, then
    /// returns empty forever.
    struct ScriptedFeed {
        script: Mutex<VecDeque<Result<Vec<Message>, FeedError>>>,
    }

    impl ScriptedFeed {
        fn new(script: Vec<Result<Vec<Message>, FeedError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    impl ReplyFeed for ScriptedFeed {
        async fn fetch(
            &self,
            _session_id: &str,
            _since: chrono::DateTime<Utc>,
        ) -> Result<Vec<Message>, FeedError> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn msg(id: &str) -> Message {
        Message {
            id: id.to_string(),
            text: "a reply".to_string(),
            sender: Sender::Ai,
            timestamp: Utc::now(),
            session_id: "quote_session_test".to_string(),
            status: None,
        }
    }

    fn runner(ceiling: Duration) -> TurnRunner {
        TurnRunner::new(PollCadence::default(), ceiling)
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_stops_the_turn() {
        let feed = ScriptedFeed::new(vec![Ok(vec![]), Ok(vec![msg("a")])]);
        let mut cursor = PollCursor::new(Utc::now());
        let cancel = CancellationToken::new();

        let outcome = runner(Duration::from_secs(60))
            .run(&feed, "quote_session_test", &mut cursor, &cancel)
            .await;

        match outcome {
            TurnOutcome::Delivered(fresh) => {
                assert_eq!(fresh.len(), 1);
                assert_eq!(fresh[0].id, "a");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(cursor.has_seen("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_do_not_halt_the_loop() {
        let feed = ScriptedFeed::new(vec![
            Err(FeedError::Status {
                status: 408,
                retry_after: Some(3),
            }),
            Err(FeedError::Transport("connection reset".to_string())),
            Ok(vec![msg("late")]),
        ]);
        let mut cursor = PollCursor::new(Utc::now());
        let cancel = CancellationToken::new();

        let outcome = runner(Duration::from_secs(60))
            .run(&feed, "quote_session_test", &mut cursor, &cancel)
            .await;

        assert!(matches!(outcome, TurnOutcome::Delivered(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_feed_times_out_without_advancing_cursor() {
        let feed = ScriptedFeed::new(vec![]);
        let start = Utc::now();
        let mut cursor = PollCursor::new(start);
        let cancel = CancellationToken::new();

        let outcome = runner(Duration::from_secs(10))
            .run(&feed, "quote_session_test", &mut cursor, &cancel)
            .await;

        assert!(matches!(outcome, TurnOutcome::TimedOut));
        assert_eq!(cursor.since(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_the_turn() {
        let feed = ScriptedFeed::new(vec![]);
        let mut cursor = PollCursor::new(Utc::now());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = runner(Duration::from_secs(60))
            .run(&feed, "quote_session_test", &mut cursor, &cancel)
            .await;

        assert!(matches!(outcome, TurnOutcome::Cancelled));
    }

    #[tokio::test]
    async fn background_poll_shares_dedup_with_turn_loop() {
        // A reply delivered during a turn must not be re-delivered by
        // the background poll even though the feed returns it again.
        let feed = ScriptedFeed::new(vec![Ok(vec![msg("a")]), Ok(vec![msg("a"), msg("b")])]);
        let mut cursor = PollCursor::new(Utc::now());
        let cancel = CancellationToken::new();

        let outcome = runner(Duration::from_secs(60))
            .run(&feed, "quote_session_test", &mut cursor, &cancel)
            .await;
        assert!(matches!(outcome, TurnOutcome::Delivered(_)));

        let background = poll_once(&feed, "quote_session_test", &mut cursor).await;
        let ids: Vec<&str> = background.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test]
    async fn background_poll_swallows_errors() {
        let feed = ScriptedFeed::new(vec![Err(FeedError::Transport("down".to_string()))]);
        let mut cursor = PollCursor::new(Utc::now());
        let accepted = poll_once(&feed, "quote_session_test", &mut cursor).await;
        assert!(accepted.is_empty());
    }
}
