//! Event sources: where per-epoch spike timestamps come from

use crate::{
    epoch::{validate_sorted_events, Epoch},
    error::{GridError, Result},
};
use std::borrow::Cow;

/// Interface for per-epoch event timestamps.
///
/// Implementations hand out sorted timestamps for each epoch. `validate` is
/// called once with the full epoch list before any epoch is read, so an
/// estimator can fail without producing partial output.
pub trait EventSource: Sync {
    /// Total number of events held by the source
    fn n_events(&self) -> usize;

    /// Sorted events of epoch `k`
    fn epoch_events(&self, k: usize, epoch: &Epoch) -> &[f64];

    /// Check ordering and epoch membership of every event
    fn validate(&self, epochs: &[Epoch]) -> Result<()>;
}

/// A flat, sorted list of timestamps sliced per epoch by binary search
#[derive(Debug, Clone, PartialEq)]
pub struct SortedEvents<'a> {
    times: Cow<'a, [f64]>,
}

impl<'a> SortedEvents<'a> {
    /// Borrow already sorted timestamps
    pub fn new(times: &'a [f64]) -> Result<Self> {
        validate_sorted_events(times)?;
        Ok(Self {
            times: Cow::Borrowed(times),
        })
    }

    /// Take ownership of timestamps in any order
    pub fn from_unsorted(mut times: Vec<f64>) -> Result<SortedEvents<'static>> {
        if let Some(index) = times.iter().position(|t| t.is_nan()) {
            let previous = if index > 0 { times[index - 1] } else { f64::NAN };
            return Err(GridError::unsorted("events", index, previous, times[index]));
        }
        times.sort_by(f64::total_cmp);
        Ok(SortedEvents {
            times: Cow::Owned(times),
        })
    }

    /// All timestamps
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    fn slice_for(&self, epoch: &Epoch) -> (usize, usize) {
        let from = self.times.partition_point(|&t| t < epoch.start());
        let to = self.times.partition_point(|&t| t < epoch.stop());
        (from, to)
    }
}

impl EventSource for SortedEvents<'_> {
    fn n_events(&self) -> usize {
        self.times.len()
    }

    fn epoch_events(&self, _k: usize, epoch: &Epoch) -> &[f64] {
        let (from, to) = self.slice_for(epoch);
        &self.times[from..to]
    }

    fn validate(&self, epochs: &[Epoch]) -> Result<()> {
        // Every event must fall inside exactly one epoch; walk both sorted
        // sequences together and report the first event left uncovered.
        let mut next = 0;
        for epoch in epochs {
            let (from, to) = self.slice_for(epoch);
            if from > next {
                return Err(GridError::event_out_of_bounds(
                    self.times[next],
                    epoch.start(),
                    epoch.stop(),
                ));
            }
            next = next.max(to);
        }
        if next < self.times.len() {
            let (start, stop) = epochs
                .last()
                .map(|e| (e.start(), e.stop()))
                .unwrap_or((f64::NAN, f64::NAN));
            return Err(GridError::event_out_of_bounds(self.times[next], start, stop));
        }
        Ok(())
    }
}

/// One sorted timestamp list per epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochEvents<'a> {
    lists: Vec<&'a [f64]>,
}

impl<'a> EpochEvents<'a> {
    /// Wrap per-epoch lists; lists are checked against epochs in `validate`
    pub fn new(lists: Vec<&'a [f64]>) -> Self {
        Self { lists }
    }

    /// Number of epoch lists
    pub fn n_lists(&self) -> usize {
        self.lists.len()
    }
}

impl EventSource for EpochEvents<'_> {
    fn n_events(&self) -> usize {
        self.lists.iter().map(|l| l.len()).sum()
    }

    fn epoch_events(&self, k: usize, _epoch: &Epoch) -> &[f64] {
        self.lists[k]
    }

    fn validate(&self, epochs: &[Epoch]) -> Result<()> {
        if self.lists.len() != epochs.len() {
            return Err(GridError::EpochCountMismatch {
                expected: epochs.len(),
                found: self.lists.len(),
            });
        }
        for (list, epoch) in self.lists.iter().zip(epochs) {
            validate_sorted_events(list)?;
            // Sorted, so the extremes bound the whole list
            if let (Some(&first), Some(&last)) = (list.first(), list.last()) {
                epoch.check_event(first)?;
                epoch.check_event(last)?;
            }
        }
        Ok(())
    }
}
