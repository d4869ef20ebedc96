//! Edge policy: containment, clipped-mass disposal and normalization
//!
//! The three axes are independent and chosen at call time. Containment
//! decides which bins an event may reach; normalization decides whether
//! window masses are rescaled before clipping; disposal decides what happens
//! to mass that falls outside the reachable bins.

use crate::error::{EstimatorError, Result};
use core::ops::Range;
use sdf_core::{contiguous_runs, BinGrid, Epoch};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which bins an event's kernel mass may reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Containment {
    /// Only the bins of the event's own epoch
    #[default]
    WithinEpoch,
    /// Bins of every epoch in the contiguous run around the event's epoch
    AcrossEpoch,
}

/// What to do with kernel mass clipped at the edge of the reachable bins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Disposal {
    /// Drop clipped mass
    #[default]
    Natural,
    /// Fold clipped mass onto the boundary bin (not available yet)
    ClampAtEdge,
    /// Mirror clipped mass back into the valid region (not available yet)
    Reflect,
}

/// Whether per-event window masses are rescaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Normalization {
    /// Keep raw masses; truncated and clipped mass is lost
    #[default]
    Natural,
    /// Divide by the truncated window mass so an unclipped event sums to one
    RenormalizeToWindow,
}

/// Kernel mass an event lost on either side of its reachable bins
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClippedMass {
    /// Mass before the first reachable bin
    pub below: f64,
    /// Mass after the last reachable bin
    pub above: f64,
}

impl ClippedMass {
    /// Total clipped mass
    pub fn total(&self) -> f64 {
        self.below + self.above
    }
}

impl Disposal {
    /// Apply the disposal rule to one event's weights.
    ///
    /// `weights` covers the reachable bins in order. Whatever is not
    /// redistributed stays in `clipped` and counts as discarded.
    pub fn apply(&self, _weights: &mut [f64], _clipped: &mut ClippedMass) -> Result<()> {
        match self {
            Disposal::Natural => Ok(()),
            Disposal::ClampAtEdge | Disposal::Reflect => self.validate(),
        }
    }

    /// Fail unless the variant has an implementation
    pub fn validate(&self) -> Result<()> {
        match self {
            Disposal::Natural => Ok(()),
            Disposal::ClampAtEdge => Err(EstimatorError::unsupported_policy("clamp_at_edge")),
            Disposal::Reflect => Err(EstimatorError::unsupported_policy("reflect")),
        }
    }
}

/// Combined edge policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EdgePolicy {
    /// Within- or across-epoch containment
    pub containment: Containment,
    /// Disposal of clipped mass
    pub disposal: Disposal,
    /// Window normalization
    pub normalization: Normalization,
}

impl EdgePolicy {
    /// Set containment
    pub fn with_containment(mut self, containment: Containment) -> Self {
        self.containment = containment;
        self
    }

    /// Set disposal
    pub fn with_disposal(mut self, disposal: Disposal) -> Self {
        self.disposal = disposal;
        self
    }

    /// Set normalization
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Validate the combination
    pub fn validate(&self) -> Result<()> {
        self.disposal.validate()
    }

    /// Whether window masses are rescaled to one
    pub fn renormalizes(&self) -> bool {
        self.normalization == Normalization::RenormalizeToWindow
    }

    /// Global bin span reachable from each epoch
    pub fn spans(&self, epochs: &[Epoch], grid: &BinGrid) -> Vec<Range<usize>> {
        match self.containment {
            Containment::WithinEpoch => (0..epochs.len()).map(|k| grid.bin_range(k)).collect(),
            Containment::AcrossEpoch => {
                let mut spans = Vec::with_capacity(epochs.len());
                for run in contiguous_runs(epochs) {
                    let span = grid.span(run.clone());
                    spans.extend(run.map(|_| span.clone()));
                }
                spans
            }
        }
    }
}
