//! Exact kernel-mass spike-density estimation
//!
//! This crate turns spike timestamps into a continuous density sampled on a
//! regular bin grid. Each event contributes the analytic integral of a
//! truncated kernel over every bin it reaches, so the result keeps sub-bin
//! timing instead of smoothing a histogram. Epoch boundaries are explicit:
//! an [`EdgePolicy`] decides whether mass may spill into contiguous epochs,
//! whether windows are renormalized, and what happens to clipped mass.
//!
//! ```no_run
//! use sdf_estimator::{DensityEstimator, Epoch, SortedEvents};
//!
//! # fn main() -> sdf_estimator::Result<()> {
//! let estimator = DensityEstimator::builder().bin_width(0.01).sigma(0.02).build()?;
//! let epochs = [Epoch::new(0.0, 1.0)?, Epoch::new(1.0, 2.0)?];
//! let spikes = SortedEvents::new(&[0.12, 0.5, 1.73])?;
//! let estimate = estimator.estimate(&epochs, &spikes)?;
//! let rate = estimate.to_rate();
//! # let _ = rate;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export essential types from the grid layer
pub use sdf_core::{
    BinGrid, Epoch, EpochEvents, EpochGrid, EventSource, GridError, PartialBin, Placement,
    SortedEvents,
};

// Core modules
pub mod error;
pub mod kernel;
pub mod policy;
pub mod weights;
pub mod density;
pub mod config;
pub mod estimator;

// Re-export essential types
pub use error::{EstimatorError, Result};
pub use kernel::{
    Epanechnikov, Gaussian, Kernel, KernelFamily, KernelSpec, ScaledKernel, Triangular,
    DEFAULT_SIGMA, DEFAULT_TRUNCATION,
};
pub use policy::{ClippedMass, Containment, Disposal, EdgePolicy, Normalization};
pub use weights::{EventWeights, WeightVec};
pub use density::{DensityArray, DensityEstimate, PopulationDensity};
pub use config::{EstimatorConfig, DEFAULT_BIN_WIDTH, DEFAULT_EVENTS_PER_TASK};
pub use estimator::{DensityEstimator, DensityEstimatorBuilder};

/// Estimator crate version for compatibility checking
pub const ESTIMATOR_VERSION: u32 = 1;
