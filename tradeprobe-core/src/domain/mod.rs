//! Event model: the immutable values that flow from the data source to observers.

pub mod bar;
pub mod event;
pub mod fill;
pub mod order;
pub mod signal;

pub use bar::MarketEvent;
pub use event::{Event, EventError, EventKind, QueueDrainedEvent};
pub use fill::FillEvent;
pub use order::{Direction, OrderEvent};
pub use signal::{SignalEvent, SignalType};

/// Simulation time. Daily bars use midnight.
pub type Timestamp = chrono::NaiveDateTime;
