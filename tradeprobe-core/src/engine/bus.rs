//! Event bus: the single channel between the data source and every observer.
//!
//! One bus is built at startup and shared by `Arc` with each component that
//! publishes or subscribes. Dispatch is synchronous: a top-level `publish`
//! returns only after every subscribed observer handled the event.
//!
//! Publishing from inside a handler never recurses into other observers.
//! The event is queued instead and delivered by the next `drain`, which pops
//! pending events in causal order (timestamp, then kind rank, then FIFO) until
//! nothing is left and finally delivers one `QueueDrained` sentinel. This is
//! what lets every observer see all of a tick's market events before any
//! signal, order or fill derived from them.

use crate::domain::{Event, EventKind, QueueDrainedEvent, Timestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use thiserror::Error;

/// Capability of anything that wants to receive events.
pub trait Observer: Send {
    /// React to one event. May publish further events on a bus it holds.
    fn handle(&mut self, event: &Event) -> Result<(), HandlerError>;

    /// Name used in logs and dispatch errors.
    fn name(&self) -> &str;
}

/// Observers are shared with the bus behind a mutex; the bus keeps only a
/// weak reference.
pub type SharedObserver = Arc<Mutex<dyn Observer>>;

/// Failure reported by an observer's handler.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<crate::domain::EventError> for HandlerError {
    fn from(err: crate::domain::EventError) -> Self {
        HandlerError::with_source("invalid event", err)
    }
}

impl From<BusError> for HandlerError {
    fn from(err: BusError) -> Self {
        HandlerError::with_source("publish failed", err)
    }
}

#[derive(Debug, Error)]
pub enum BusError {
    /// An observer's handler failed. The pending queue was cleared.
    #[error("observer '{observer}' failed on {event}: {source}")]
    Dispatch {
        observer: String,
        event: Box<Event>,
        #[source]
        source: HandlerError,
        /// Pending events dropped when the bus was reset after the failure.
        discarded: usize,
    },

    #[error("observer '{observer}' is poisoned by an earlier panic")]
    Poisoned { observer: String },

    #[error("bus is closed, refused {event}")]
    Closed { event: Box<Event> },

    #[error("cannot publish {event} while the drained signal is being delivered")]
    Sealed { event: Box<Event> },

    #[error("{operation} called while a dispatch is already in progress")]
    Reentrant { operation: &'static str },
}

/// How one event is fanned out to its observers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// One observer after another, in registration order, on the caller's thread.
    #[default]
    Sequential,
    /// Every observer of the event on its own rayon worker; returns once all
    /// of them have returned. Call order among observers is unspecified.
    Parallel,
}

struct Subscriber {
    id: usize,
    observer: Weak<Mutex<dyn Observer>>,
    kinds: BTreeSet<EventKind>,
}

impl Subscriber {
    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.iter().any(|k| k.accepts(kind))
    }
}

/// Queue entry ordered so that `BinaryHeap` pops the causally earliest event.
struct Pending {
    event: Event,
    seq: u64,
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.event
            .causal_cmp(&other.event)
            .then_with(|| self.seq.cmp(&other.seq))
            .reverse()
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Pending {}

#[derive(Default)]
struct BusState {
    queue: BinaryHeap<Pending>,
    subscribers: Vec<Subscriber>,
    next_seq: u64,
    /// Set while observers are being called; publishes are deferred.
    dispatching: bool,
    /// Set while the drained sentinel is delivered; publishes are refused.
    sealed: bool,
    closed: bool,
    last_timestamp: Option<Timestamp>,
    dispatched_total: u64,
}

/// Process-wide publish/subscribe channel.
pub struct EventBus {
    state: Mutex<BusState>,
    mode: DispatchMode,
}

impl EventBus {
    pub fn new(mode: DispatchMode) -> Self {
        Self {
            state: Mutex::new(BusState::default()),
            mode,
        }
    }

    /// A sequential bus ready to be shared.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new(DispatchMode::Sequential))
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    // Bus state is only ever touched in short, panic-free critical sections,
    // so a poisoned lock still holds consistent data.
    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe `observer` to `kind`. Registering the same pair twice is a no-op.
    ///
    /// Observers are notified in the order of their first registration.
    pub fn register<O: Observer + 'static>(&self, observer: &Arc<Mutex<O>>, kind: EventKind) {
        let id = Arc::as_ptr(observer) as *const () as usize;
        let mut state = self.state();
        if let Some(existing) = state.subscribers.iter_mut().find(|s| s.id == id) {
            existing.kinds.insert(kind);
            return;
        }
        let shared: SharedObserver = observer.clone();
        state.subscribers.push(Subscriber {
            id,
            observer: Arc::downgrade(&shared),
            kinds: BTreeSet::from([kind]),
        });
    }

    /// Kinds `observer` is subscribed to, empty if it never registered.
    pub fn subscriptions<O: Observer + 'static>(&self, observer: &Arc<Mutex<O>>) -> Vec<EventKind> {
        let id = Arc::as_ptr(observer) as *const () as usize;
        self.state()
            .subscribers
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.kinds.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of live registered observers.
    pub fn subscriber_count(&self) -> usize {
        self.state()
            .subscribers
            .iter()
            .filter(|s| s.observer.strong_count() > 0)
            .count()
    }

    /// Publish an event.
    ///
    /// From outside a dispatch the event is delivered before this returns.
    /// From inside a handler it is queued for the next [`drain`](Self::drain).
    pub fn publish(&self, event: impl Into<Event>) -> Result<(), BusError> {
        let event = event.into();
        {
            let mut state = self.state();
            if state.sealed {
                return Err(BusError::Sealed {
                    event: Box::new(event),
                });
            }
            if state.dispatching {
                let seq = state.next_seq;
                state.next_seq += 1;
                state.queue.push(Pending { event, seq });
                return Ok(());
            }
            if state.closed {
                tracing::warn!(%event, "publish refused, bus is closed");
                return Err(BusError::Closed {
                    event: Box::new(event),
                });
            }
            state.dispatching = true;
        }
        let _guard = DispatchGuard { bus: self };
        self.deliver(&event).map_err(|err| self.reset_after(err))
    }

    /// Deliver `event` to its observers right away, bypassing the queue.
    pub fn notify(&self, event: &Event) -> Result<(), BusError> {
        {
            let mut state = self.state();
            if state.dispatching {
                return Err(BusError::Reentrant {
                    operation: "notify",
                });
            }
            state.dispatching = true;
        }
        let _guard = DispatchGuard { bus: self };
        self.deliver(event).map_err(|err| self.reset_after(err))
    }

    /// Dispatch pending events until the queue is empty, then deliver exactly
    /// one `QueueDrained` sentinel, which is also returned.
    ///
    /// Handlers of the sentinel cannot publish: after `drain` returns the
    /// queue is empty.
    pub fn drain(&self) -> Result<QueueDrainedEvent, BusError> {
        {
            let mut state = self.state();
            if state.dispatching {
                return Err(BusError::Reentrant { operation: "drain" });
            }
            state.dispatching = true;
        }
        let _guard = DispatchGuard { bus: self };

        let mut dispatched = 0;
        loop {
            let next = self.state().queue.pop();
            let Some(pending) = next else { break };
            self.deliver(&pending.event)
                .map_err(|err| self.reset_after(err))?;
            dispatched += 1;
        }

        let sentinel = {
            let mut state = self.state();
            state.sealed = true;
            QueueDrainedEvent {
                timestamp: state.last_timestamp,
                dispatched,
            }
        };
        self.deliver(&Event::QueueDrained(sentinel.clone()))
            .map_err(|err| self.reset_after(err))?;
        tracing::trace!(dispatched, "bus drained");
        Ok(sentinel)
    }

    /// Number of events waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Total events delivered since the bus was built, sentinels excluded.
    pub fn dispatched_total(&self) -> u64 {
        self.state().dispatched_total
    }

    /// Refuse further top-level publishes. Events published by handlers of an
    /// in-flight dispatch are still queued so the current drain can finish.
    pub fn close(&self) {
        self.state().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Live observers subscribed to `kind`, in registration order.
    fn targets(&self, event: &Event) -> Vec<SharedObserver> {
        let kind = event.kind();
        let mut state = self.state();
        let before = state.subscribers.len();
        state.subscribers.retain(|s| s.observer.strong_count() > 0);
        let pruned = before - state.subscribers.len();
        if pruned > 0 {
            tracing::debug!(pruned, "dropped observers removed from the bus");
        }
        if kind != EventKind::QueueDrained {
            if let Some(ts) = event.timestamp() {
                state.last_timestamp = Some(state.last_timestamp.map_or(ts, |last| last.max(ts)));
            }
            state.dispatched_total += 1;
        }
        state
            .subscribers
            .iter()
            .filter(|s| s.wants(kind))
            .filter_map(|s| s.observer.upgrade())
            .collect()
    }

    /// Call every target of `event`. The state lock is not held meanwhile.
    fn deliver(&self, event: &Event) -> Result<(), BusError> {
        let targets = self.targets(event);
        match self.mode {
            DispatchMode::Sequential => {
                for target in &targets {
                    call(target, event)?;
                }
                Ok(())
            }
            DispatchMode::Parallel => {
                let failures: Mutex<Vec<(usize, BusError)>> = Mutex::new(Vec::new());
                rayon::scope(|scope| {
                    for (i, target) in targets.iter().enumerate() {
                        let failures = &failures;
                        scope.spawn(move |_| {
                            if let Err(err) = call(target, event) {
                                failures
                                    .lock()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .push((i, err));
                            }
                        });
                    }
                });
                let mut failures = failures.into_inner().unwrap_or_else(PoisonError::into_inner);
                failures.sort_by_key(|(i, _)| *i);
                let mut failures = failures.into_iter().map(|(_, err)| err);
                match failures.next() {
                    Some(first) => {
                        for other in failures {
                            tracing::error!(error = %other, "additional observer failure");
                        }
                        Err(first)
                    }
                    None => Ok(()),
                }
            }
        }
    }

    /// Leave the bus empty after a failed dispatch and record how much was lost.
    fn reset_after(&self, mut err: BusError) -> BusError {
        let dropped = {
            let mut state = self.state();
            let n = state.queue.len();
            state.queue.clear();
            n
        };
        if let BusError::Dispatch { discarded, .. } = &mut err {
            *discarded = dropped;
        }
        tracing::error!(error = %err, discarded = dropped, "dispatch failed, pending events discarded");
        err
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DispatchMode::Sequential)
    }
}

/// Clears the dispatch flags when a dispatch ends, on every exit path.
struct DispatchGuard<'a> {
    bus: &'a EventBus,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.bus.state();
        state.dispatching = false;
        state.sealed = false;
    }
}

fn call(target: &SharedObserver, event: &Event) -> Result<(), BusError> {
    let mut observer = match target.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            return Err(BusError::Poisoned {
                observer: poisoned.get_ref().name().to_string(),
            })
        }
    };
    observer
        .handle(event)
        .map_err(|source| BusError::Dispatch {
            observer: observer.name().to_string(),
            event: Box::new(event.clone()),
            source,
            discarded: 0,
        })
}
