use std::time::Duration;

use tickseq_core::{
    HistoryId, HistoryRef, HistorySequencer, IntervalSequencer, RepeatableExactSequencer,
    SequenceError, SequencerAction, SequencerCore, SeriesRef, UsabilityChange,
};
use tickseq_types::{Badness, HistorySequencerConfig, IntervalSequencerConfig, Tick};

use crate::timer::UsableTimeoutTimer;

/// Runs a [`HistorySequencer`] on tokio.
///
/// The coordinator is synchronous; whenever it queues timer work the host
/// executes it on a tokio task. Fired timeouts are handed back through
/// [`SequencerHost::process_next_timeout`] or
/// [`SequencerHost::process_ready_timeouts`], so all coordinator state stays on
/// the caller's task. The host is `!Send`: drive it from a current-thread
/// runtime or a `LocalSet`.
pub struct SequencerHost<S: SequencerCore> {
    sequencer: HistorySequencer<S>,
    timer: UsableTimeoutTimer,
}

/// Builder for [`SequencerHost`].
#[derive(Debug, Clone, Default)]
pub struct SequencerHostBuilder {
    config: HistorySequencerConfig,
}

impl SequencerHostBuilder {
    /// Builder with the default 1500 ms usable timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Debounce delay applied while more than one history is unusable.
    #[must_use]
    pub const fn usable_timeout(mut self, delay: Duration) -> Self {
        self.config.usable_timeout = delay;
        self
    }

    /// Replace the whole coordinator configuration.
    #[must_use]
    pub const fn config(mut self, config: HistorySequencerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build a host around `core`.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the usable timeout is zero.
    pub fn build<S: SequencerCore>(self, core: S) -> Result<SequencerHost<S>, SequenceError> {
        if self.config.usable_timeout.is_zero() {
            return Err(SequenceError::invalid_config(
                "usable timeout must be greater than zero",
            ));
        }
        Ok(SequencerHost {
            sequencer: HistorySequencer::new(core, self.config),
            timer: UsableTimeoutTimer::new(),
        })
    }

    /// Build a host around a new interval sequencer.
    ///
    /// # Errors
    /// As [`SequencerHostBuilder::build`].
    pub fn build_interval(
        self,
        config: IntervalSequencerConfig,
    ) -> Result<SequencerHost<IntervalSequencer>, SequenceError> {
        self.build(IntervalSequencer::new(config))
    }

    /// Build a host around a new repeatable-exact sequencer.
    ///
    /// # Errors
    /// As [`SequencerHostBuilder::build`].
    pub fn build_repeatable_exact(
        self,
    ) -> Result<SequencerHost<RepeatableExactSequencer>, SequenceError> {
        self.build(RepeatableExactSequencer::new())
    }
}

impl SequencerHost<IntervalSequencer> {
    /// Start building a host.
    #[must_use]
    pub fn builder() -> SequencerHostBuilder {
        SequencerHostBuilder::new()
    }
}

impl<S: SequencerCore> SequencerHost<S> {
    /// The coordinator.
    pub const fn sequencer(&self) -> &HistorySequencer<S> {
        &self.sequencer
    }

    /// The coordinator, mutably (for binding series and subscriptions).
    ///
    /// Timer work queued through this handle runs on the next host call.
    pub const fn sequencer_mut(&mut self) -> &mut HistorySequencer<S> {
        &mut self.sequencer
    }

    /// Whether a usable timeout is scheduled and has not fired yet.
    pub fn has_pending_timeout(&self) -> bool {
        self.timer.is_pending()
    }

    /// Open a histories bracket; see [`HistorySequencer::begin_histories_change`].
    pub const fn begin_histories_change(&mut self) {
        self.sequencer.begin_histories_change();
    }

    /// Close a histories bracket and run whatever timer work it queued.
    ///
    /// # Errors
    /// As [`HistorySequencer::end_histories_change`].
    pub fn end_histories_change(&mut self) -> Result<(), SequenceError> {
        let result = self.sequencer.end_histories_change();
        self.run_actions();
        result
    }

    /// Register a history with the coordinator.
    ///
    /// # Errors
    /// As [`HistorySequencer::register_history`].
    pub fn register_history(&mut self, history: HistoryRef<S>) -> Result<HistoryId, SequenceError> {
        let result = self.sequencer.register_history(history);
        self.run_actions();
        result
    }

    /// Deregister a history.
    ///
    /// # Errors
    /// As [`HistorySequencer::deregister_history`].
    pub fn deregister_history(&mut self, id: HistoryId) -> Result<(), SequenceError> {
        let result = self.sequencer.deregister_history(id);
        self.run_actions();
        result
    }

    /// Replace a history's badness.
    ///
    /// # Errors
    /// As [`HistorySequencer::set_history_badness`].
    pub fn set_history_badness(
        &mut self,
        id: HistoryId,
        badness: Badness,
    ) -> Result<UsabilityChange, SequenceError> {
        let result = self.sequencer.set_history_badness(id, badness);
        self.run_actions();
        result
    }

    /// Mark a history unusable.
    ///
    /// # Errors
    /// As [`HistorySequencer::set_history_unusable`].
    pub fn set_history_unusable(
        &mut self,
        id: HistoryId,
        badness: Badness,
    ) -> Result<UsabilityChange, SequenceError> {
        let result = self.sequencer.set_history_unusable(id, badness);
        self.run_actions();
        result
    }

    /// Mark a history good.
    ///
    /// # Errors
    /// As [`HistorySequencer::set_history_good`].
    pub fn set_history_good(&mut self, id: HistoryId) -> Result<UsabilityChange, SequenceError> {
        let result = self.sequencer.set_history_good(id);
        self.run_actions();
        result
    }

    /// Stage `tick` into every series in `series`, then add it to the
    /// sequencer, all inside one change bracket. Stages are discarded when the
    /// tick is rejected or fails.
    ///
    /// # Errors
    /// Propagates `NextIntervalUndefined` from an interval sequencer.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", skip(self, series), fields(series = series.len()))
    )]
    pub fn ingest(&mut self, series: &[SeriesRef<S::Point>], tick: &Tick) -> Result<bool, SequenceError> {
        self.sequencer.begin_change();
        for s in series {
            s.borrow_mut().stage_tick(tick);
        }
        let result = self.sequencer.add_tick(tick.date_time, tick.repeat_index);
        if !matches!(result, Ok(true)) {
            #[cfg(feature = "tracing")]
            tracing::debug!(at = %tick.date_time.utc, ok = result.is_ok(), "tick not placed; stages discarded");
            for s in series {
                s.borrow_mut().discard_staged_tick();
            }
        }
        self.sequencer.end_change();
        self.run_actions();
        result
    }

    /// Wait for the next usable timeout and hand it to the coordinator.
    ///
    /// Returns the fired transaction id, or `None` if the timer channel is
    /// gone. Waits forever when nothing is scheduled; pair with
    /// [`SequencerHost::has_pending_timeout`] or a `tokio::time::timeout`.
    ///
    /// # Errors
    /// As [`HistorySequencer::process_all_histories_usable_timeout`].
    pub async fn process_next_timeout(&mut self) -> Result<Option<u64>, SequenceError> {
        let Some(transaction_id) = self.timer.fired().await else {
            return Ok(None);
        };
        self.process_timeout(transaction_id).map(|()| Some(transaction_id))
    }

    /// Process every timeout that has already fired without waiting.
    /// Returns how many were processed.
    ///
    /// # Errors
    /// Stops at the first coordinator error.
    pub fn process_ready_timeouts(&mut self) -> Result<usize, SequenceError> {
        let mut processed = 0;
        while let Some(transaction_id) = self.timer.try_fired() {
            self.process_timeout(transaction_id)?;
            processed += 1;
        }
        Ok(processed)
    }

    fn process_timeout(&mut self, transaction_id: u64) -> Result<(), SequenceError> {
        let result = self
            .sequencer
            .process_all_histories_usable_timeout(transaction_id);
        self.run_actions();
        result
    }

    fn run_actions(&mut self) {
        for action in self.sequencer.drain_actions() {
            match action {
                SequencerAction::ScheduleUsableTimeout {
                    transaction_id,
                    delay,
                } => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        transaction_id,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "scheduling usable timeout"
                    );
                    self.timer.schedule(transaction_id, delay);
                }
                SequencerAction::CancelUsableTimeout { transaction_id } => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(transaction_id, "cancelling usable timeout");
                    self.timer.cancel(transaction_id);
                }
            }
        }
    }
}
