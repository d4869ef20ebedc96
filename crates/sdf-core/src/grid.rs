//! Regular bin grids over epochs and event-to-bin placement
//!
//! A grid is built per epoch from a bin width `ds`: full bins start at
//! `start + i * ds`. What happens to the trailing remainder of an epoch is
//! chosen explicitly through [`PartialBin`] because it changes the number of
//! output bins. The global [`BinGrid`] concatenates epoch grids in epoch order
//! and keeps flat arrays of bin bounds so callers can search bins across
//! epochs by binary search.

use crate::{
    epoch::{validate_epochs, Epoch},
    error::{GridError, Result},
};
use core::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest number of bins a single epoch may be divided into
pub const MAX_BINS_PER_EPOCH: usize = u32::MAX as usize;

/// Slack (in bins) used when flooring `duration / ds`, so that
/// `0.3 / 0.1 = 2.9999999999999996` still yields three bins
pub const BIN_COUNT_TOLERANCE: f64 = 1e-9;

/// Handling of the trailing partial bin of an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PartialBin {
    /// Drop the remainder; the last edge satisfies `stop - e_n < ds`
    #[default]
    Drop,
    /// Keep the remainder as a final, shorter bin ending at `stop`
    Keep,
}

/// Home bin of an event and its offset from that bin's center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Local bin index with `e_i <= t < e_{i+1}`; `None` when the event lies
    /// in a dropped trailing partial bin
    pub home_bin: Option<usize>,
    /// Signed distance `t - center` of the (possibly virtual) home bin
    pub offset: f64,
}

/// Bin edges of a single epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochGrid {
    epoch: Epoch,
    ds: f64,
    edges: Vec<f64>,
}

impl EpochGrid {
    /// Build the grid of one epoch
    pub fn new(epoch: Epoch, ds: f64, partial: PartialBin) -> Result<Self> {
        check_bin_width(ds)?;
        let start = epoch.start();
        let stop = epoch.stop();
        if start + ds <= start {
            // Width below the float resolution at this time offset
            return Err(GridError::invalid_bin_width(ds));
        }

        let ratio = epoch.duration() / ds;
        if !ratio.is_finite() || ratio > MAX_BINS_PER_EPOCH as f64 {
            return Err(GridError::TooManyBins {
                start,
                stop,
                ds,
                limit: MAX_BINS_PER_EPOCH,
            });
        }

        let slack = BIN_COUNT_TOLERANCE.max(4.0 * f64::EPSILON * ratio);
        let n_full = (ratio + slack).floor() as usize;

        let mut edges: Vec<f64> = (0..=n_full).map(|i| start + i as f64 * ds).collect();

        // A last full edge within rounding distance of `stop` lands on it
        // exactly, and never beyond it.
        let snap = (slack * ds).max(4.0 * f64::EPSILON * stop.abs());
        let last = edges.len() - 1;
        if last > 0 && (edges[last] > stop || stop - edges[last] <= snap) {
            edges[last] = stop;
        }

        if partial == PartialBin::Keep && edges[last] < stop {
            edges.push(stop);
        }
        // Widths below the float spacing near the epoch collapse adjacent edges
        if !edges.windows(2).all(|w| w[0] < w[1]) {
            return Err(GridError::invalid_bin_width(ds));
        }

        log::trace!(
            "epoch {} with ds={} -> {} bins ({:?})",
            epoch,
            ds,
            edges.len() - 1,
            partial
        );

        Ok(Self { epoch, ds, edges })
    }

    /// Epoch covered by this grid
    pub fn epoch(&self) -> &Epoch {
        &self.epoch
    }

    /// Nominal bin width
    pub fn bin_width(&self) -> f64 {
        self.ds
    }

    /// Number of bins (edges minus one)
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Monotonic bin edges, `n_bins() + 1` values
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Bin centers
    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    /// Locate the home bin of `t` by binary search over the edges.
    ///
    /// Fails with `EventOutOfBounds` unless `t` lies in `[start, stop)`.
    pub fn place(&self, t: f64) -> Result<Placement> {
        self.epoch.check_event(t)?;

        // edges[0] == start <= t, so at least one edge precedes t
        let bin = self.edges.partition_point(|&e| e <= t) - 1;
        if bin < self.n_bins() {
            let center = 0.5 * (self.edges[bin] + self.edges[bin + 1]);
            Ok(Placement {
                home_bin: Some(bin),
                offset: t - center,
            })
        } else {
            let center = self.edges[bin] + 0.5 * self.ds;
            Ok(Placement {
                home_bin: None,
                offset: t - center,
            })
        }
    }
}

/// Bin grid over an ordered set of epochs
#[derive(Debug, Clone, PartialEq)]
pub struct BinGrid {
    epochs: Vec<EpochGrid>,
    /// `offsets[k]..offsets[k + 1]` are the global bins of epoch `k`
    offsets: Vec<usize>,
    lefts: Vec<f64>,
    rights: Vec<f64>,
}

impl BinGrid {
    /// Build grids for sorted, disjoint epochs
    pub fn build(epochs: &[Epoch], ds: f64, partial: PartialBin) -> Result<Self> {
        check_bin_width(ds)?;
        validate_epochs(epochs)?;

        let mut grids = Vec::with_capacity(epochs.len());
        let mut offsets = Vec::with_capacity(epochs.len() + 1);
        let mut lefts = Vec::new();
        let mut rights = Vec::new();
        offsets.push(0);

        for epoch in epochs {
            let grid = EpochGrid::new(*epoch, ds, partial)?;
            lefts.extend(grid.edges.iter().take(grid.n_bins()).copied());
            rights.extend(grid.edges.iter().skip(1).copied());
            offsets.push(lefts.len());
            grids.push(grid);
        }

        log::debug!(
            "built bin grid: {} epochs, {} bins, ds={}",
            grids.len(),
            lefts.len(),
            ds
        );

        Ok(Self {
            epochs: grids,
            offsets,
            lefts,
            rights,
        })
    }

    /// Total number of bins across all epochs
    pub fn total_bins(&self) -> usize {
        self.lefts.len()
    }

    /// Number of epochs
    pub fn n_epochs(&self) -> usize {
        self.epochs.len()
    }

    /// Grid of epoch `k`
    pub fn epoch_grid(&self, k: usize) -> &EpochGrid {
        &self.epochs[k]
    }

    /// All epoch grids in order
    pub fn epoch_grids(&self) -> &[EpochGrid] {
        &self.epochs
    }

    /// Global bin range of epoch `k`
    pub fn bin_range(&self, k: usize) -> Range<usize> {
        self.offsets[k]..self.offsets[k + 1]
    }

    /// Global bin range covering epochs `first..end`
    pub fn span(&self, epochs: Range<usize>) -> Range<usize> {
        self.offsets[epochs.start]..self.offsets[epochs.end]
    }

    /// Bounds `[left, right)` of global bin `g`
    pub fn bounds(&self, g: usize) -> (f64, f64) {
        (self.lefts[g], self.rights[g])
    }

    /// Left edges of all bins
    pub fn lefts(&self) -> &[f64] {
        &self.lefts
    }

    /// Right edges of all bins
    pub fn rights(&self) -> &[f64] {
        &self.rights
    }

    /// Centers of all bins
    pub fn centers(&self) -> Vec<f64> {
        self.lefts
            .iter()
            .zip(&self.rights)
            .map(|(l, r)| 0.5 * (l + r))
            .collect()
    }

    /// Widths of all bins
    pub fn widths(&self) -> Vec<f64> {
        self.lefts
            .iter()
            .zip(&self.rights)
            .map(|(l, r)| r - l)
            .collect()
    }

    /// Bins inside `span` whose interval intersects `(lo, hi)`
    pub fn overlapping(&self, span: Range<usize>, lo: f64, hi: f64) -> Range<usize> {
        let first = span.start + self.rights[span.clone()].partition_point(|&r| r <= lo);
        let end = span.start + self.lefts[span.clone()].partition_point(|&l| l < hi);
        first..end.max(first)
    }
}

fn check_bin_width(ds: f64) -> Result<()> {
    if !(ds > 0.0) || !ds.is_finite() {
        return Err(GridError::invalid_bin_width(ds));
    }
    Ok(())
}
