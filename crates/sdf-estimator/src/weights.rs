//! Exact kernel mass of a single event over its reachable bins

use crate::{kernel::ScaledKernel, policy::ClippedMass};
use core::ops::Range;
use sdf_core::{BinGrid, Placement};
use smallvec::SmallVec;

/// Per-event weight storage; windows of up to 32 bins stay on the stack
pub type WeightVec = SmallVec<[f64; 32]>;

/// Kernel mass one event places on the global bin grid
#[derive(Debug, Clone, PartialEq)]
pub struct EventWeights {
    /// Event timestamp
    pub time: f64,
    /// Index of the epoch holding the event
    pub epoch: usize,
    /// Home bin (local to the epoch) and offset from its center
    pub placement: Placement,
    /// Global index of the home bin, if the event has one
    pub home_bin: Option<usize>,
    /// Global index of `weights[0]`
    pub first_bin: usize,
    /// Mass per reachable bin, starting at `first_bin`
    pub weights: WeightVec,
    /// Mass lost outside the reachable bins
    pub clipped: ClippedMass,
}

impl EventWeights {
    /// Sum of retained weights
    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Global bins covered by `weights`
    pub fn bins(&self) -> Range<usize> {
        self.first_bin..self.first_bin + self.weights.len()
    }

    /// `(global bin, weight)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.bins().zip(self.weights.iter().copied())
    }
}

/// Compute the weights of the event at `t` in epoch `epoch`.
///
/// Only bins inside `span` receive mass. Each bin gets the exact integral of
/// the truncated kernel over its interval, so sub-bin timing is preserved
/// regardless of bin width.
pub(crate) fn event_weights(
    kernel: &ScaledKernel,
    grid: &BinGrid,
    epoch: usize,
    span: Range<usize>,
    t: f64,
) -> sdf_core::Result<EventWeights> {
    let placement = grid.epoch_grid(epoch).place(t)?;
    let home_bin = placement
        .home_bin
        .map(|local| grid.bin_range(epoch).start + local);

    let reach = kernel.reach();
    let bins = grid.overlapping(span.clone(), t - reach, t + reach);
    let weights: WeightVec = bins
        .clone()
        .map(|g| {
            let (lo, hi) = grid.bounds(g);
            kernel.mass(t, lo, hi)
        })
        .collect();

    let clipped = if span.is_empty() {
        ClippedMass {
            below: kernel.mass(t, f64::NEG_INFINITY, t),
            above: kernel.mass(t, t, f64::INFINITY),
        }
    } else {
        let (span_lo, _) = grid.bounds(span.start);
        let (_, span_hi) = grid.bounds(span.end - 1);
        ClippedMass {
            below: kernel.mass(t, f64::NEG_INFINITY, span_lo),
            above: kernel.mass(t, span_hi, f64::INFINITY),
        }
    };

    Ok(EventWeights {
        time: t,
        epoch,
        placement,
        home_bin,
        first_bin: bins.start,
        weights,
        clipped,
    })
}
