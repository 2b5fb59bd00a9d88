//! Data replay: raw series in, time-ordered market events out.

pub mod align;
pub mod multi;
pub mod provider;
pub mod replay;

pub use align::{align_symbols, AlignedData, AlignedSeries};
pub use multi::MultiSource;
pub use provider::{DataError, DataHandler, RawBar, SeriesLoader};
pub use replay::{ReplaySource, SymbolStep};
