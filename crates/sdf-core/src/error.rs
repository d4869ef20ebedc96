//! Error types for epochs, bin grids and event placement

use thiserror::Error;

/// Result type for grid operations
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors that can occur while building grids or placing events
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// Bin width is not a positive finite number
    #[error("Invalid bin width: {ds} (expected a finite value > 0)")]
    InvalidBinWidth {
        /// Offending bin width
        ds: f64,
    },

    /// Epoch has no extent
    #[error("Empty epoch: [{start}, {stop}) (expected finite bounds with start < stop)")]
    EmptyEpoch {
        /// Epoch start
        start: f64,
        /// Epoch stop
        stop: f64,
    },

    /// Event does not lie inside the epoch it was supplied for
    #[error("Event at {time} out of bounds for epoch [{start}, {stop})")]
    EventOutOfBounds {
        /// Event timestamp
        time: f64,
        /// Epoch start
        start: f64,
        /// Epoch stop
        stop: f64,
    },

    /// Epochs or events are not monotonically ordered
    #[error("Unsorted input: {what} at index {index} ({previous} followed by {current})")]
    UnsortedInput {
        /// Which sequence is out of order
        what: &'static str,
        /// Index of the offending element
        index: usize,
        /// Value preceding the offending element
        previous: f64,
        /// Offending value
        current: f64,
    },

    /// Epoch would need more bins than a grid can address
    #[error("Epoch [{start}, {stop}) with bin width {ds} exceeds {limit} bins")]
    TooManyBins {
        /// Epoch start
        start: f64,
        /// Epoch stop
        stop: f64,
        /// Bin width
        ds: f64,
        /// Maximum bins per epoch
        limit: usize,
    },

    /// Per-epoch event lists do not line up with the epochs
    #[error("Event source provides {found} epoch lists, expected {expected}")]
    EpochCountMismatch {
        /// Number of epochs
        expected: usize,
        /// Number of event lists
        found: usize,
    },
}

impl GridError {
    /// Create an invalid bin width error
    pub fn invalid_bin_width(ds: f64) -> Self {
        Self::InvalidBinWidth { ds }
    }

    /// Create an empty epoch error
    pub fn empty_epoch(start: f64, stop: f64) -> Self {
        Self::EmptyEpoch { start, stop }
    }

    /// Create an out-of-bounds event error
    pub fn event_out_of_bounds(time: f64, start: f64, stop: f64) -> Self {
        Self::EventOutOfBounds { time, start, stop }
    }

    /// Create an unsorted input error
    pub fn unsorted(what: &'static str, index: usize, previous: f64, current: f64) -> Self {
        Self::UnsortedInput {
            what,
            index,
            previous,
            current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = GridError::invalid_bin_width(0.0);
        assert!(matches!(err, GridError::InvalidBinWidth { .. }));

        let err = GridError::unsorted("events", 3, 0.5, 0.25);
        assert!(matches!(err, GridError::UnsortedInput { index: 3, .. }));
    }

    #[test]
    fn test_error_display() {
        let err = GridError::event_out_of_bounds(1.0, 0.0, 1.0);
        let msg = format!("{}", err);
        assert!(msg.contains("Event at 1 out of bounds"));
        assert!(msg.contains("[0, 1)"));
    }
}
