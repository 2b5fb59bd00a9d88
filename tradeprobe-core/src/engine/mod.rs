//! Event distribution and the simulation clock.
//!
//! The driver pulls bars from a data handler and publishes them on the bus;
//! the bus fans every event out to its observers and, once per tick, drains
//! the events they derived:
//!
//! 1. Running: market events for the tick
//! 2. Draining: signals, orders and fills, then the drained sentinel
//! 3. Advancing: clock moves to the next tick

pub mod bus;
pub mod clock;
pub mod driver;

pub use bus::{BusError, DispatchMode, EventBus, HandlerError, Observer, SharedObserver};
pub use clock::ClockTracker;
pub use driver::{
    DriverError, DriverState, RunSummary, SimulationDriver, StopHandle, TerminationReason,
};
