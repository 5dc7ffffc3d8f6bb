use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use super::{IntervalSequencer, RepeatableExactSequencer, SequencerCore};
use crate::SequenceError;
use crate::event::{MultiEvent, Notification, SubscriptionId};
use crate::history::{HistoryRef, HistoryStatus, UsabilityChange};
use crate::types::{Badness, HistorySequencerConfig, SourceDateTime};

/// Identifier assigned to a history when it is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HistoryId(u64);

impl HistoryId {
    /// Raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "history#{}", self.0)
    }
}

/// Timer work the coordinator hands to its runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerAction {
    /// Call [`HistorySequencer::process_all_histories_usable_timeout`] with
    /// `transaction_id` once `delay` has elapsed.
    ScheduleUsableTimeout {
        /// Generation guarding the callback.
        transaction_id: u64,
        /// Debounce delay.
        delay: Duration,
    },
    /// The scheduled timeout with this id is obsolete and may be aborted.
    CancelUsableTimeout {
        /// Generation of the obsolete timer.
        transaction_id: u64,
    },
}

/// Notifications fired by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistorySequencerEvent {
    /// Outermost change bracket opened.
    ChangeBegun,
    /// Outermost change bracket closed.
    ChangeEnded,
    /// Reload pass one finished; the sequencer holds every boundary.
    SequencerLoaded,
    /// Reload finished; every series is filled.
    AllEngineSeriesLoaded,
}

struct RegisteredHistory<S: SequencerCore> {
    id: HistoryId,
    history: HistoryRef<S>,
    usable: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct HistoriesBatch {
    registrations: usize,
    deregistrations: usize,
    became_loadable: usize,
    became_unusable: usize,
}

impl HistoriesBatch {
    const fn is_empty(&self) -> bool {
        self.registrations == 0
            && self.deregistrations == 0
            && self.became_loadable == 0
            && self.became_unusable == 0
    }
}

#[derive(Debug, Default)]
struct UsableTimeout {
    active: bool,
    transaction_id: u64,
    registrations_while_active: usize,
    became_loadable_while_active: bool,
}

#[derive(Default)]
struct CoordinatorEvents {
    change_begun: MultiEvent<Notification>,
    change_ended: MultiEvent<Notification>,
    sequencer_loaded: MultiEvent<Notification>,
    all_engine_series_loaded: MultiEvent<Notification>,
}

impl CoordinatorEvents {
    const fn get_mut(&mut self, event: HistorySequencerEvent) -> &mut MultiEvent<Notification> {
        match event {
            HistorySequencerEvent::ChangeBegun => &mut self.change_begun,
            HistorySequencerEvent::ChangeEnded => &mut self.change_ended,
            HistorySequencerEvent::SequencerLoaded => &mut self.sequencer_loaded,
            HistorySequencerEvent::AllEngineSeriesLoaded => &mut self.all_engine_series_loaded,
        }
    }
}

/// Coordinates a sequencer with the histories feeding it.
///
/// All mutation is bracketed: [`HistorySequencer::begin_change`] /
/// [`HistorySequencer::end_change`] nest and only the outermost pair fires
/// notifications. Registration and usability changes are batched the same
/// way; when the outermost batch closes the coordinator decides whether to
/// reload every series now, defer, or arm the usable timeout. The timeout is
/// not run here: it is queued as a [`SequencerAction`] for the runtime, which
/// later calls [`HistorySequencer::process_all_histories_usable_timeout`].
pub struct HistorySequencer<S: SequencerCore> {
    core: S,
    config: HistorySequencerConfig,
    histories: Vec<RegisteredHistory<S>>,
    next_history_id: u64,
    unusable_count: usize,
    change_depth: u32,
    histories_change_depth: u32,
    batch: HistoriesBatch,
    timeout: UsableTimeout,
    actions: Vec<SequencerAction>,
    events: CoordinatorEvents,
}

/// Coordinator over an [`IntervalSequencer`].
pub type IntervalHistorySequencer = HistorySequencer<IntervalSequencer>;

/// Coordinator over a [`RepeatableExactSequencer`].
pub type RepeatableExactHistorySequencer = HistorySequencer<RepeatableExactSequencer>;

impl<S: SequencerCore + fmt::Debug> fmt::Debug for HistorySequencer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistorySequencer")
            .field("core", &self.core)
            .field("histories", &self.histories.len())
            .field("unusable_count", &self.unusable_count)
            .field("change_depth", &self.change_depth)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<S: SequencerCore> HistorySequencer<S> {
    /// Wrap `core`.
    pub fn new(core: S, config: HistorySequencerConfig) -> Self {
        Self {
            core,
            config,
            histories: Vec::new(),
            next_history_id: 1,
            unusable_count: 0,
            change_depth: 0,
            histories_change_depth: 0,
            batch: HistoriesBatch::default(),
            timeout: UsableTimeout::default(),
            actions: Vec::new(),
            events: CoordinatorEvents::default(),
        }
    }

    /// The wrapped sequencer.
    pub const fn core(&self) -> &S {
        &self.core
    }

    /// The wrapped sequencer, mutably (for binding series).
    pub const fn core_mut(&mut self) -> &mut S {
        &mut self.core
    }

    /// Coordination settings.
    pub const fn config(&self) -> &HistorySequencerConfig {
        &self.config
    }

    /// Subscribe to one of the coordinator's notifications.
    pub fn subscribe(
        &mut self,
        event: HistorySequencerEvent,
        handler: Rc<Notification>,
    ) -> SubscriptionId {
        self.events.get_mut(event).subscribe(handler)
    }

    /// Remove a subscription made with [`HistorySequencer::subscribe`].
    pub fn unsubscribe(&mut self, event: HistorySequencerEvent, id: SubscriptionId) -> bool {
        self.events.get_mut(event).unsubscribe(id)
    }

    /// Open a change bracket.
    pub fn begin_change(&mut self) {
        self.change_depth += 1;
        if self.change_depth == 1 {
            self.events.change_begun.fire();
        }
    }

    /// Close a change bracket.
    pub fn end_change(&mut self) {
        let Some(depth) = self.change_depth.checked_sub(1) else {
            #[cfg(feature = "tracing")]
            tracing::warn!("end_change without begin_change");
            return;
        };
        self.change_depth = depth;
        if depth == 0 {
            self.events.change_ended.fire();
        }
    }

    /// Whether a change bracket is open.
    pub const fn changing(&self) -> bool {
        self.change_depth > 0
    }

    /// Whether a histories bracket is open.
    pub const fn histories_changing(&self) -> bool {
        self.histories_change_depth > 0
    }

    /// Whether a full reload is running.
    pub fn all_series_loading(&self) -> bool {
        self.core.loading_flag().get()
    }

    /// Register a tick instant inside a change bracket.
    pub fn add_date_time(&mut self, date_time: SourceDateTime, repeat_index: u32) -> bool {
        self.begin_change();
        let accepted = self.core.add_date_time(date_time, repeat_index);
        self.end_change();
        accepted
    }

    /// Drive a tick through the sequencer inside a change bracket.
    ///
    /// # Errors
    /// Propagates `NextIntervalUndefined` from an interval sequencer.
    pub fn add_tick(
        &mut self,
        date_time: SourceDateTime,
        repeat_index: u32,
    ) -> Result<bool, SequenceError> {
        self.begin_change();
        let result = self.core.add_tick(date_time, repeat_index);
        self.end_change();
        result
    }

    /// Remove every point from the sequencer.
    pub fn clear(&mut self) {
        self.core.clear();
    }

    /// Number of sequencer points.
    pub fn point_count(&self) -> usize {
        self.core.point_count()
    }

    /// Offset of the newest sequencer point.
    pub fn last_source_timezone_offset(&self) -> Option<chrono::FixedOffset> {
        self.core.last_source_timezone_offset()
    }

    /// Number of registered histories.
    pub fn history_count(&self) -> usize {
        self.histories.len()
    }

    /// Number of registered histories that are not usable.
    pub const fn unusable_history_count(&self) -> usize {
        self.unusable_count
    }

    /// Registered history by id.
    pub fn history(&self, id: HistoryId) -> Option<&HistoryRef<S>> {
        self.histories
            .iter()
            .find(|r| r.id == id)
            .map(|r| &r.history)
    }

    /// Whether the usable timeout is armed.
    pub const fn usable_timeout_active(&self) -> bool {
        self.timeout.active
    }

    /// Current timer generation.
    pub const fn usable_timeout_transaction_id(&self) -> u64 {
        self.timeout.transaction_id
    }

    /// Take the timer work queued since the last call.
    pub fn drain_actions(&mut self) -> Vec<SequencerAction> {
        std::mem::take(&mut self.actions)
    }

    /// Register `history`. Outside a histories bracket the batch closes
    /// immediately, so this may reload.
    ///
    /// # Errors
    /// `HistoryAlreadyRegistered` if the same history instance is already
    /// registered; reload errors propagate (the history stays registered).
    pub fn register_history(&mut self, history: HistoryRef<S>) -> Result<HistoryId, SequenceError> {
        if let Some(existing) = self
            .histories
            .iter()
            .find(|r| std::ptr::addr_eq(Rc::as_ptr(&r.history), Rc::as_ptr(&history)))
        {
            return Err(SequenceError::HistoryAlreadyRegistered {
                history: existing.id.get(),
            });
        }
        let id = HistoryId(self.next_history_id);
        self.next_history_id += 1;
        let usable = history.borrow().usable();

        self.begin_histories_change();
        if usable {
            self.batch.became_loadable += 1;
        } else {
            self.unusable_count += 1;
        }
        self.batch.registrations += 1;
        self.histories.push(RegisteredHistory {
            id,
            history,
            usable,
        });
        self.end_histories_change()?;
        Ok(id)
    }

    /// Deregister a history, detach and clear its series. Always reloads.
    ///
    /// Only the bindings the history hands over through
    /// [`SequenceHistory::take_series_bindings`] are detached; any other
    /// series it bound must be unbound by the caller beforehand.
    ///
    /// # Errors
    /// `HistoryNotRegistered` for an unknown id; reload errors propagate.
    ///
    /// [`SequenceHistory::take_series_bindings`]: crate::history::SequenceHistory::take_series_bindings
    pub fn deregister_history(&mut self, id: HistoryId) -> Result<(), SequenceError> {
        let index = self.position(id)?;
        self.begin_histories_change();
        let removed = self.histories.remove(index);
        if !removed.usable {
            self.unusable_count -= 1;
        }
        let bindings = {
            let mut history = removed.history.borrow_mut();
            let bindings = history.take_series_bindings();
            history.clear_series();
            bindings
        };
        for binding in bindings {
            self.core.unbind_series(binding);
        }
        self.batch.deregistrations += 1;
        self.end_histories_change()
    }

    /// Replace a history's badness and react to any usability transition.
    /// Returns the transition as the coordinator counted it.
    ///
    /// # Errors
    /// `HistoryNotRegistered` for an unknown id; reload errors propagate.
    pub fn set_history_badness(
        &mut self,
        id: HistoryId,
        badness: Badness,
    ) -> Result<UsabilityChange, SequenceError> {
        self.update_history_status(id, |status| status.set_badness(badness))
    }

    /// Mark a history unusable.
    ///
    /// # Errors
    /// As [`HistorySequencer::set_history_badness`].
    pub fn set_history_unusable(
        &mut self,
        id: HistoryId,
        badness: Badness,
    ) -> Result<UsabilityChange, SequenceError> {
        self.update_history_status(id, |status| status.set_unusable(badness))
    }

    /// Mark a history good.
    ///
    /// # Errors
    /// As [`HistorySequencer::set_history_badness`].
    pub fn set_history_good(&mut self, id: HistoryId) -> Result<UsabilityChange, SequenceError> {
        self.update_history_status(id, HistoryStatus::set_good)
    }

    /// Re-read a history's usability after its status was changed directly
    /// through [`SequenceHistory::status_mut`].
    ///
    /// # Errors
    /// As [`HistorySequencer::set_history_badness`].
    ///
    /// [`SequenceHistory::status_mut`]: crate::history::SequenceHistory::status_mut
    pub fn refresh_history_usability(&mut self, id: HistoryId) -> Result<UsabilityChange, SequenceError> {
        self.update_history_status(id, |_| UsabilityChange::Unchanged)
    }

    /// Handle the usable timeout firing for `transaction_id`. Ids from
    /// cancelled or superseded timers are ignored.
    ///
    /// # Errors
    /// `UsableTimeoutInactive` when the current timer already fired; reload
    /// errors propagate.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self)))]
    pub fn process_all_histories_usable_timeout(
        &mut self,
        transaction_id: u64,
    ) -> Result<(), SequenceError> {
        if transaction_id != self.timeout.transaction_id {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                current = self.timeout.transaction_id,
                "stale usable timeout ignored"
            );
            return Ok(());
        }
        if !self.timeout.active {
            return Err(SequenceError::UsableTimeoutInactive { transaction_id });
        }
        self.timeout.active = false;
        if self.timeout.registrations_while_active > 0 && self.timeout.became_loadable_while_active {
            self.start_usable_timeout();
            return Ok(());
        }
        if self.loadable_count() > 0 {
            self.load_all_series()
        } else {
            Ok(())
        }
    }

    /// Rebuild the sequencer and every series from the usable histories.
    ///
    /// Series notifications are suppressed for the duration; consumers see
    /// [`HistorySequencerEvent::SequencerLoaded`] and
    /// [`HistorySequencerEvent::AllEngineSeriesLoaded`] instead. The loading
    /// flag and change bracket are always restored, even on error.
    ///
    /// # Errors
    /// The first error returned by a history aborts the reload.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self), fields(histories = self.histories.len()))
    )]
    pub fn load_all_series(&mut self) -> Result<(), SequenceError> {
        self.cancel_usable_timeout();
        self.begin_change();
        let loading = self.core.loading_flag().clone();
        loading.set(true);
        let result = self.reload();
        loading.set(false);
        if result.is_ok() {
            self.events.all_engine_series_loaded.fire();
        }
        self.end_change();
        result
    }

    fn reload(&mut self) -> Result<(), SequenceError> {
        let histories: Vec<(HistoryRef<S>, bool)> = self
            .histories
            .iter()
            .map(|r| (Rc::clone(&r.history), r.usable))
            .collect();

        for (history, _) in &histories {
            let mut history = history.borrow_mut();
            history.clear_series();
            history.status_mut().set_all_series_loaded(false);
        }
        self.core.clear();

        for (history, usable) in &histories {
            if *usable {
                history
                    .borrow_mut()
                    .load_all_tick_date_times(&mut self.core)?;
            }
        }
        self.events.sequencer_loaded.fire();

        for (history, _) in &histories {
            history.borrow_mut().initialise_series(self.core.points());
        }
        for (history, usable) in &histories {
            if *usable {
                let mut history = history.borrow_mut();
                history.load_all_engine_series(&mut self.core)?;
                history.status_mut().set_all_series_loaded(true);
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(points = self.core.point_count(), "all series reloaded");
        Ok(())
    }

    fn position(&self, id: HistoryId) -> Result<usize, SequenceError> {
        self.histories
            .iter()
            .position(|r| r.id == id)
            .ok_or(SequenceError::HistoryNotRegistered { history: id.get() })
    }

    fn loadable_count(&self) -> usize {
        self.histories.iter().filter(|r| r.usable).count()
    }

    /// Apply `update` to a history's status and count the transition.
    ///
    /// The transition is taken against the usability the coordinator last
    /// recorded, not the one `update` reports: a status changed directly in
    /// between makes the two differ, and only the former keeps
    /// `unusable_count` consistent.
    fn update_history_status<F>(
        &mut self,
        id: HistoryId,
        update: F,
    ) -> Result<UsabilityChange, SequenceError>
    where
        F: FnOnce(&mut HistoryStatus) -> UsabilityChange,
    {
        let index = self.position(id)?;
        self.begin_histories_change();
        let (_reported, usable) = {
            let mut history = self.histories[index].history.borrow_mut();
            let reported = update(history.status_mut());
            (reported, history.usable())
        };
        let entry = &mut self.histories[index];
        let change = match (entry.usable, usable) {
            (false, true) => UsabilityChange::BecameUsable,
            (true, false) => UsabilityChange::BecameUnusable,
            _ => UsabilityChange::Unchanged,
        };
        #[cfg(feature = "tracing")]
        if _reported != change {
            tracing::debug!(
                history = id.get(),
                reported = ?_reported,
                ?change,
                "status was changed outside the coordinator"
            );
        }
        entry.usable = usable;
        match change {
            UsabilityChange::BecameUsable => {
                self.unusable_count -= 1;
                self.batch.became_loadable += 1;
            }
            UsabilityChange::BecameUnusable => {
                self.unusable_count += 1;
                self.batch.became_unusable += 1;
            }
            UsabilityChange::Unchanged => {}
        }
        self.end_histories_change().map(|()| change)
    }

    /// Open a histories bracket. Registrations, deregistrations and
    /// usability changes made inside it are decided on together when the
    /// outermost bracket closes, so a burst of registrations reloads once.
    /// Brackets nest.
    pub const fn begin_histories_change(&mut self) {
        self.histories_change_depth += 1;
    }

    /// Close a histories bracket. Closing the outermost one reloads, defers
    /// or arms the usable timeout for everything batched inside it.
    ///
    /// # Errors
    /// Reload errors propagate.
    pub fn end_histories_change(&mut self) -> Result<(), SequenceError> {
        let Some(depth) = self.histories_change_depth.checked_sub(1) else {
            #[cfg(feature = "tracing")]
            tracing::warn!("end_histories_change without begin_histories_change");
            return Ok(());
        };
        self.histories_change_depth = depth;
        if depth > 0 {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.batch);
        if self.timeout.active {
            self.timeout.registrations_while_active += batch.registrations;
            self.timeout.became_loadable_while_active |= batch.became_loadable > 0;
        }
        if batch.deregistrations > 0 {
            return self.load_all_series();
        }
        if batch.is_empty() {
            return Ok(());
        }
        match self.unusable_count {
            0 if self.loadable_count() > 0 => self.load_all_series(),
            0 | 1 => Ok(()),
            _ => {
                if !self.timeout.active {
                    self.start_usable_timeout();
                }
                Ok(())
            }
        }
    }

    fn start_usable_timeout(&mut self) {
        self.timeout.transaction_id += 1;
        self.timeout.active = true;
        self.timeout.registrations_while_active = 0;
        self.timeout.became_loadable_while_active = false;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            transaction_id = self.timeout.transaction_id,
            unusable = self.unusable_count,
            "usable timeout armed"
        );
        self.actions.push(SequencerAction::ScheduleUsableTimeout {
            transaction_id: self.timeout.transaction_id,
            delay: self.config.usable_timeout,
        });
    }

    fn cancel_usable_timeout(&mut self) {
        if !self.timeout.active {
            return;
        }
        let transaction_id = self.timeout.transaction_id;
        self.timeout.active = false;
        self.timeout.transaction_id += 1;
        self.actions
            .push(SequencerAction::CancelUsableTimeout { transaction_id });
    }
}
