//! Density arrays and estimation results

use core::ops::{Index, Range};
use sdf_core::BinGrid;

/// Dense per-bin density values in global grid order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DensityArray {
    values: Vec<f64>,
}

impl DensityArray {
    /// Zero-filled array with one value per bin
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    /// Wrap existing values
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the array has no bins
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values as a slice
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Mutable values
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Sum over all bins
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Values of a global bin range
    pub fn range(&self, bins: Range<usize>) -> &[f64] {
        &self.values[bins]
    }

    /// Add `values` into bins starting at `first`
    pub fn add_at(&mut self, first: usize, values: &[f64]) {
        for (dst, v) in self.values[first..first + values.len()].iter_mut().zip(values) {
            *dst += v;
        }
    }

    /// Consume into the underlying vector
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

impl Index<usize> for DensityArray {
    type Output = f64;

    fn index(&self, bin: usize) -> &f64 {
        &self.values[bin]
    }
}

/// Density of one event series together with the grid it lives on
#[derive(Debug, Clone, PartialEq)]
pub struct DensityEstimate {
    pub(crate) density: DensityArray,
    pub(crate) grid: BinGrid,
    pub(crate) n_events: usize,
    pub(crate) discarded_mass: f64,
}

impl DensityEstimate {
    /// Per-bin density (expected event count per bin)
    pub fn density(&self) -> &DensityArray {
        &self.density
    }

    /// Per-bin values as a slice
    pub fn values(&self) -> &[f64] {
        self.density.as_slice()
    }

    /// Grid the density is aligned to
    pub fn grid(&self) -> &BinGrid {
        &self.grid
    }

    /// Number of events that were smoothed
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Kernel mass that fell outside every reachable bin
    pub fn discarded_mass(&self) -> f64 {
        self.discarded_mass
    }

    /// Total retained mass
    pub fn total_mass(&self) -> f64 {
        self.density.total()
    }

    /// Values belonging to epoch `k`
    pub fn epoch(&self, k: usize) -> &[f64] {
        self.density.range(self.grid.bin_range(k))
    }

    /// Bin centers, for aligning values to time
    pub fn centers(&self) -> Vec<f64> {
        self.grid.centers()
    }

    /// Bin edges of epoch `k`
    pub fn edges(&self, k: usize) -> &[f64] {
        self.grid.epoch_grid(k).edges()
    }

    /// Events per unit time: each bin's mass divided by its width
    pub fn to_rate(&self) -> Vec<f64> {
        self.density
            .as_slice()
            .iter()
            .zip(self.grid.widths())
            .map(|(mass, width)| mass / width)
            .collect()
    }

    /// Split into density and grid
    pub fn into_parts(self) -> (DensityArray, BinGrid) {
        (self.density, self.grid)
    }
}

/// Densities of several event series sharing one grid
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationDensity {
    pub(crate) grid: BinGrid,
    pub(crate) rows: Vec<DensityArray>,
    pub(crate) n_events: Vec<usize>,
    pub(crate) discarded_mass: Vec<f64>,
}

impl PopulationDensity {
    /// Number of series
    pub fn n_series(&self) -> usize {
        self.rows.len()
    }

    /// Shared grid
    pub fn grid(&self) -> &BinGrid {
        &self.grid
    }

    /// Density of series `i`
    pub fn row(&self, i: usize) -> &DensityArray {
        &self.rows[i]
    }

    /// All rows in input order
    pub fn rows(&self) -> &[DensityArray] {
        &self.rows
    }

    /// Event count of series `i`
    pub fn n_events(&self, i: usize) -> usize {
        self.n_events[i]
    }

    /// Discarded mass of series `i`
    pub fn discarded_mass(&self, i: usize) -> f64 {
        self.discarded_mass[i]
    }

    /// Mean density across series, bin by bin
    pub fn mean(&self) -> DensityArray {
        let mut mean = DensityArray::zeros(self.grid.total_bins());
        if self.rows.is_empty() {
            return mean;
        }
        for row in &self.rows {
            mean.add_at(0, row.as_slice());
        }
        let n = self.rows.len() as f64;
        for v in mean.as_mut_slice() {
            *v /= n;
        }
        mean
    }

    /// Row `i` as a standalone estimate
    pub fn estimate(&self, i: usize) -> DensityEstimate {
        DensityEstimate {
            density: self.rows[i].clone(),
            grid: self.grid.clone(),
            n_events: self.n_events[i],
            discarded_mass: self.discarded_mass[i],
        }
    }
}
