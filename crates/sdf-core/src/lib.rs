//! Epochs, bin grids and event placement for exact spike-density estimation
//!
//! This crate holds the data model shared by the estimator: half-open
//! epochs that bound where events are valid, regular bin grids built per
//! epoch, binary-search placement of events into home bins, and the
//! [`EventSource`] seam through which callers hand over spike timestamps.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod error;
pub mod epoch;
pub mod grid;
pub mod source;

// Re-export essential types
pub use error::{GridError, Result};
pub use epoch::{contiguous_runs, validate_epochs, validate_sorted_events, Epoch};
pub use grid::{BinGrid, EpochGrid, PartialBin, Placement, BIN_COUNT_TOLERANCE, MAX_BINS_PER_EPOCH};
pub use source::{EpochEvents, EventSource, SortedEvents};

/// Core crate version for compatibility checking
pub const CORE_VERSION: u32 = 1;
