//! Half-open epochs bounding where events are valid

use crate::error::{GridError, Result};
use core::fmt;
use core::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Half-open time interval `[start, stop)`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "(f64, f64)", into = "(f64, f64)"))]
pub struct Epoch {
    start: f64,
    stop: f64,
}

impl Epoch {
    /// Create a new epoch, rejecting empty or non-finite intervals
    pub fn new(start: f64, stop: f64) -> Result<Self> {
        if !start.is_finite() || !stop.is_finite() || stop <= start {
            return Err(GridError::empty_epoch(start, stop));
        }
        Ok(Self { start, stop })
    }

    /// Epoch start (inclusive)
    pub const fn start(&self) -> f64 {
        self.start
    }

    /// Epoch stop (exclusive)
    pub const fn stop(&self) -> f64 {
        self.stop
    }

    /// Length of the epoch
    pub fn duration(&self) -> f64 {
        self.stop - self.start
    }

    /// Check whether `t` lies in `[start, stop)`
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.stop
    }

    /// Check whether `next` begins exactly where this epoch ends
    pub fn is_contiguous_with(&self, next: &Epoch) -> bool {
        self.stop == next.start
    }

    /// Fail with `EventOutOfBounds` unless `t` lies in the epoch
    pub fn check_event(&self, t: f64) -> Result<()> {
        if self.contains(t) {
            Ok(())
        } else {
            Err(GridError::event_out_of_bounds(t, self.start, self.stop))
        }
    }
}

impl TryFrom<(f64, f64)> for Epoch {
    type Error = GridError;

    fn try_from((start, stop): (f64, f64)) -> Result<Self> {
        Self::new(start, stop)
    }
}

impl From<Epoch> for (f64, f64) {
    fn from(epoch: Epoch) -> Self {
        (epoch.start, epoch.stop)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

/// Check that epochs are sorted and pairwise disjoint.
///
/// Touching epochs (`prev.stop == next.start`) are allowed; any overlap or
/// reordering is reported against the later epoch.
pub fn validate_epochs(epochs: &[Epoch]) -> Result<()> {
    for (index, pair) in epochs.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.start < prev.stop {
            return Err(GridError::unsorted("epochs", index + 1, prev.stop, next.start));
        }
    }
    Ok(())
}

/// Group epoch indices into maximal runs of contiguous epochs.
///
/// Runs are returned in epoch order and together cover `0..epochs.len()`.
pub fn contiguous_runs(epochs: &[Epoch]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut run_start = 0;
    for k in 1..epochs.len() {
        if !epochs[k - 1].is_contiguous_with(&epochs[k]) {
            runs.push(run_start..k);
            run_start = k;
        }
    }
    if !epochs.is_empty() {
        runs.push(run_start..epochs.len());
    }
    runs
}

/// Check that event timestamps are monotonically non-decreasing
pub fn validate_sorted_events(events: &[f64]) -> Result<()> {
    if let Some(&first) = events.first() {
        if first.is_nan() {
            return Err(GridError::unsorted("events", 0, f64::NAN, first));
        }
    }
    for (index, pair) in events.windows(2).enumerate() {
        // NaN never compares, so it is caught here as well
        if !(pair[1] >= pair[0]) {
            return Err(GridError::unsorted("events", index + 1, pair[0], pair[1]));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(start: f64, stop: f64) -> Epoch {
        Epoch::new(start, stop).unwrap()
    }

    #[test]
    fn test_epoch_validation() {
        assert!(Epoch::new(0.0, 1.0).is_ok());
        assert!(matches!(Epoch::new(1.0, 1.0), Err(GridError::EmptyEpoch { .. })));
        assert!(matches!(Epoch::new(2.0, 1.0), Err(GridError::EmptyEpoch { .. })));
        assert!(Epoch::new(0.0, f64::INFINITY).is_err());
        assert!(Epoch::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_half_open_bounds() {
        let e = ep(0.0, 1.0);
        assert!(e.contains(0.0));
        assert!(e.contains(0.999));
        assert!(!e.contains(1.0));
        assert!(!e.contains(-1e-12));
        assert!(!e.contains(f64::NAN));
        assert!(matches!(e.check_event(1.0), Err(GridError::EventOutOfBounds { .. })));
    }

    #[test]
    fn test_validate_epochs() {
        assert!(validate_epochs(&[]).is_ok());
        assert!(validate_epochs(&[ep(0.0, 1.0), ep(1.0, 2.0), ep(3.0, 4.0)]).is_ok());

        let err = validate_epochs(&[ep(0.0, 1.0), ep(0.5, 2.0)]).unwrap_err();
        assert!(matches!(err, GridError::UnsortedInput { what: "epochs", index: 1, .. }));

        assert!(validate_epochs(&[ep(2.0, 3.0), ep(0.0, 1.0)]).is_err());
    }

    #[test]
    fn test_contiguous_runs() {
        let epochs = [ep(0.0, 1.0), ep(1.0, 2.0), ep(2.5, 3.0), ep(3.0, 4.0), ep(5.0, 6.0)];
        assert_eq!(contiguous_runs(&epochs), vec![0..2, 2..4, 4..5]);
        assert!(contiguous_runs(&[]).is_empty());
    }

    #[test]
    fn test_validate_sorted_events() {
        assert!(validate_sorted_events(&[0.1, 0.1, 0.2]).is_ok());
        let err = validate_sorted_events(&[0.1, 0.3, 0.2]).unwrap_err();
        assert!(matches!(err, GridError::UnsortedInput { what: "events", index: 2, .. }));
        assert!(validate_sorted_events(&[0.1, f64::NAN]).is_err());
        let err = validate_sorted_events(&[f64::NAN]).unwrap_err();
        assert!(matches!(err, GridError::UnsortedInput { index: 0, .. }));
    }
}
