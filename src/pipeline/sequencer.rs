//! Timed delivery of parsed segments to a display surface.
//!
//! One sequence runs at a time per sequencer. A sequence shows a typing
//! indicator for the configured duration, then hands each segment to the sink
//! after its display delay and schedules retraction for segments that carry
//! one. Cancelling stops the running sequence and every pending retraction but
//! never takes back messages that were already shown.

use super::segment::MessageSegment;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Rendering surface driven by [`MessageDisplaySequencer`].
pub trait DisplaySink: Send + Sync {
    fn add_message<'a>(&'a self, segment: &'a MessageSegment) -> SinkFuture<'a>;

    fn retract_message<'a>(&'a self, id: &'a str) -> SinkFuture<'a>;

    fn typing_started(&self, speaker: &str);

    fn typing_ended(&self);
}

struct SequencerState {
    displaying: bool,
    generation: u64,
    /// Parent of every sequence and retraction token handed out since the
    /// last cancel.
    root: CancellationToken,
}

pub struct MessageDisplaySequencer {
    sink: Arc<dyn DisplaySink>,
    typing_duration: Duration,
    state: Mutex<SequencerState>,
}

impl MessageDisplaySequencer {
    pub fn new(sink: Arc<dyn DisplaySink>, typing_duration: Duration) -> Self {
        Self {
            sink,
            typing_duration,
            state: Mutex::new(SequencerState {
                displaying: false,
                generation: 0,
                root: CancellationToken::new(),
            }),
        }
    }

    pub fn is_displaying(&self) -> bool {
        self.lock_state().displaying
    }

    /// Show `segments` in order. Returns `false` without doing anything when
    /// a sequence is already running or there is nothing to show.
    pub async fn display_messages(&self, segments: Vec<MessageSegment>) -> bool {
        let Some(first) = segments.first() else {
            return false;
        };

        let (generation, token) = {
            let mut state = self.lock_state();
            if state.displaying {
                tracing::debug!(
                    count = segments.len(),
                    "display already in progress; dropping segments"
                );
                return false;
            }
            state.displaying = true;
            state.generation += 1;
            (state.generation, state.root.child_token())
        };

        self.sink.typing_started(&first.original_sender);
        let typed = sleep_unless_cancelled(self.typing_duration, &token).await;
        self.sink.typing_ended();

        if typed {
            self.run_sequence(segments, &token).await;
        }

        let mut state = self.lock_state();
        if state.generation == generation {
            state.displaying = false;
        }
        true
    }

    /// Stop the running sequence and drop every pending retraction.
    pub fn cancel(&self) {
        let mut state = self.lock_state();
        state.root.cancel();
        state.root = CancellationToken::new();
        if state.displaying {
            tracing::debug!("display sequence cancelled");
        }
        state.displaying = false;
    }

    pub fn destroy(&self) {
        self.cancel();
    }

    async fn run_sequence(&self, segments: Vec<MessageSegment>, token: &CancellationToken) {
        for segment in segments {
            if token.is_cancelled() {
                return;
            }
            if !segment.display_delay.is_zero()
                && !sleep_unless_cancelled(segment.display_delay, token).await
            {
                return;
            }

            self.sink.add_message(&segment).await;

            if let Some(after) = segment.retract_after {
                self.schedule_retraction(segment.id, after, token.clone());
            }
        }
    }

    fn schedule_retraction(&self, id: String, after: Duration, token: CancellationToken) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if sleep_unless_cancelled(after, &token).await {
                sink.retract_message(&id).await;
            }
        });
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SequencerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MessageDisplaySequencer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// `true` if the full duration elapsed, `false` if `token` fired first.
async fn sleep_unless_cancelled(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        () = token.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}
