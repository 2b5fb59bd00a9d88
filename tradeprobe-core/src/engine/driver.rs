//! Simulation driver: owns the clock and steps the run tick by tick.
//!
//! Per tick:
//! 1. Running: publish the tick's bar for every symbol that has one
//! 2. Draining: drain the bus, which resolves every derived signal, order and
//!    fill and ends with the `QueueDrained` sentinel
//! 3. Advancing: move the clock to the data source's next tick, or terminate
//!
//! A failed observer halts the run on the spot. Ticks are never retried or
//! skipped.

use super::bus::{BusError, EventBus, HandlerError};
use super::clock::ClockTracker;
use crate::data::DataHandler;
use crate::domain::{Event, EventKind, Timestamp};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Driver lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriverState {
    Init,
    Running,
    Draining,
    Advancing,
    Terminated,
}

/// Why a run ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The next tick was at or past the end boundary.
    EndReached,
    /// Every symbol ran out of data before the end boundary.
    DataExhausted,
    /// A stop was requested through a [`StopHandle`].
    Stopped,
}

/// What a finished run reports back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub start: Timestamp,
    pub end: Timestamp,
    pub final_clock: Timestamp,
    pub ticks_processed: usize,
    /// Market events published plus derived events drained.
    pub events_dispatched: u64,
    pub reason: TerminationReason,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("start {start} is after end {end}")]
    InvalidWindow { start: Timestamp, end: Timestamp },

    #[error("tick {tick}: observer '{observer}' failed on {event} ({discarded} pending discarded): {source}")]
    Dispatch {
        tick: Timestamp,
        observer: String,
        event: Box<Event>,
        #[source]
        source: HandlerError,
        /// Queued events of the tick that were dropped with the failure.
        discarded: usize,
    },

    #[error("tick {tick}: {source}")]
    Bus {
        tick: Timestamp,
        #[source]
        source: BusError,
    },

    #[error("tick {tick}: bus drained without delivering the drained signal")]
    MissingDrainSignal { tick: Timestamp },

    #[error("run already terminated")]
    AlreadyTerminated,
}

impl DriverError {
    fn at(tick: Timestamp, err: BusError) -> Self {
        match err {
            BusError::Dispatch {
                observer,
                event,
                source,
                discarded,
            } => DriverError::Dispatch {
                tick,
                observer,
                event,
                source,
                discarded,
            },
            other => DriverError::Bus { tick, source: other },
        }
    }
}

/// Requests a graceful stop from any thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Steps a [`DataHandler`] through a shared [`EventBus`] between `start` and `end`.
pub struct SimulationDriver<D: DataHandler> {
    bus: Arc<EventBus>,
    data: D,
    start: Timestamp,
    end: Timestamp,
    clock: Timestamp,
    state: DriverState,
    tracker: Arc<Mutex<ClockTracker>>,
    stop: StopHandle,
    ticks: usize,
    events: u64,
}

impl<D: DataHandler> SimulationDriver<D> {
    /// Set the clock to `start`, subscribe the clock tracker to every event
    /// kind and skip data before `start`.
    pub fn new(
        bus: Arc<EventBus>,
        mut data: D,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Self, DriverError> {
        if start > end {
            return Err(DriverError::InvalidWindow { start, end });
        }
        let tracker = Arc::new(Mutex::new(ClockTracker::new()));
        bus.register(&tracker, EventKind::Any);
        data.advance_to(start);

        Ok(Self {
            bus,
            data,
            start,
            end,
            clock: start,
            state: DriverState::Init,
            tracker,
            stop: StopHandle::default(),
            ticks: 0,
            events: 0,
        })
    }

    pub fn clock(&self) -> Timestamp {
        self.clock
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn ticks_processed(&self) -> usize {
        self.ticks
    }

    /// Run until the end boundary, data exhaustion or a stop request.
    pub fn run(&mut self) -> Result<RunSummary, DriverError> {
        if self.state == DriverState::Terminated {
            return Err(DriverError::AlreadyTerminated);
        }
        tracing::info!(
            start = %self.start,
            end = %self.end,
            symbols = self.data.symbol_list().len(),
            "starting simulation"
        );

        let result = self.step_until_done();
        self.state = DriverState::Terminated;
        self.bus.close();

        match &result {
            Ok(summary) => tracing::info!(
                final_clock = %summary.final_clock,
                ticks = summary.ticks_processed,
                events = summary.events_dispatched,
                reason = ?summary.reason,
                "simulation finished"
            ),
            Err(err) => tracing::error!(error = %err, "simulation aborted"),
        }
        result
    }

    fn step_until_done(&mut self) -> Result<RunSummary, DriverError> {
        let mut tick = match self.next_tick() {
            Ok(tick) => tick,
            Err(reason) => return Ok(self.summary(reason)),
        };

        loop {
            self.state = DriverState::Running;
            let stopped = self.publish_bars(tick)?;

            self.state = DriverState::Draining;
            self.drain(tick)?;
            self.ticks += 1;
            tracing::debug!(tick = %tick, ticks = self.ticks, "tick complete");

            if stopped || self.stop.is_stopped() {
                self.clock = self.clock.max(tick);
                return Ok(self.summary(TerminationReason::Stopped));
            }

            self.state = DriverState::Advancing;
            tick = match self.next_tick() {
                Ok(next) => {
                    self.clock = next;
                    next
                }
                Err(reason) => return Ok(self.summary(reason)),
            };
        }
    }

    /// Next tick to process, or why the run is over. Updates the clock on
    /// termination.
    fn next_tick(&mut self) -> Result<Timestamp, TerminationReason> {
        if self.stop.is_stopped() {
            return Err(TerminationReason::Stopped);
        }
        match self.data.current_tick() {
            None => {
                let last = self.lock_tracker().last_market();
                if let Some(last) = last {
                    self.clock = self.clock.max(last).min(self.end);
                }
                Err(TerminationReason::DataExhausted)
            }
            Some(next) if next >= self.end => {
                self.clock = self.end;
                Err(TerminationReason::EndReached)
            }
            Some(next) => Ok(next),
        }
    }

    /// Publish every bar of `tick`. Returns true if a stop cut the tick short.
    fn publish_bars(&mut self, tick: Timestamp) -> Result<bool, DriverError> {
        for bar in self.data.next_bars() {
            if self.stop.is_stopped() {
                self.bus.close();
                return Ok(true);
            }
            self.bus
                .publish(bar)
                .map_err(|err| DriverError::at(tick, err))?;
            self.events += 1;
        }
        Ok(false)
    }

    fn drain(&mut self, tick: Timestamp) -> Result<(), DriverError> {
        let before = self.lock_tracker().drained();
        let drained = self.bus.drain().map_err(|err| DriverError::at(tick, err))?;
        if self.lock_tracker().drained() != before + 1 {
            return Err(DriverError::MissingDrainSignal { tick });
        }
        self.events += drained.dispatched as u64;
        Ok(())
    }

    fn lock_tracker(&self) -> std::sync::MutexGuard<'_, ClockTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn summary(&self, reason: TerminationReason) -> RunSummary {
        RunSummary {
            start: self.start,
            end: self.end,
            final_clock: self.clock,
            ticks_processed: self.ticks,
            events_dispatched: self.events,
            reason,
        }
    }
}
