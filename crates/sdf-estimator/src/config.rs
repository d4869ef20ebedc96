//! Estimator configuration
//!
//! A configuration fixes everything about an estimate except the data: bin
//! width, partial-bin handling, kernel and edge policy. With the `serde`
//! feature it round-trips through TOML:
//!
//! ```toml
//! bin_width = 0.01
//! partial_bin = "keep"
//!
//! [kernel]
//! family = "gaussian"
//! sigma = 0.025
//! truncation = 4.0
//!
//! [policy]
//! containment = "across_epoch"
//! normalization = "renormalize_to_window"
//! ```

use crate::{
    error::{EstimatorError, Result},
    kernel::KernelSpec,
    policy::EdgePolicy,
};
use sdf_core::PartialBin;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use std::path::Path;

/// Default bin width (seconds when timestamps are in seconds)
pub const DEFAULT_BIN_WIDTH: f64 = 0.01;

/// Default upper bound on events handled by one accumulation task
pub const DEFAULT_EVENTS_PER_TASK: usize = 4096;

/// Full estimator configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EstimatorConfig {
    /// Output bin width
    pub bin_width: f64,
    /// Trailing partial bin handling
    pub partial_bin: PartialBin,
    /// Maximum events per accumulation task
    pub events_per_task: usize,
    /// Kernel family, scale and truncation
    pub kernel: KernelSpec,
    /// Edge policy
    pub policy: EdgePolicy,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            bin_width: DEFAULT_BIN_WIDTH,
            partial_bin: PartialBin::Drop,
            events_per_task: DEFAULT_EVENTS_PER_TASK,
            kernel: KernelSpec::default(),
            policy: EdgePolicy::default(),
        }
    }
}

impl EstimatorConfig {
    /// Set bin width
    pub fn with_bin_width(mut self, bin_width: f64) -> Self {
        self.bin_width = bin_width;
        self
    }

    /// Set partial bin handling
    pub fn with_partial_bin(mut self, partial_bin: PartialBin) -> Self {
        self.partial_bin = partial_bin;
        self
    }

    /// Set kernel
    pub fn with_kernel(mut self, kernel: KernelSpec) -> Self {
        self.kernel = kernel;
        self
    }

    /// Set edge policy
    pub fn with_policy(mut self, policy: EdgePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set task size
    pub fn with_events_per_task(mut self, events_per_task: usize) -> Self {
        self.events_per_task = events_per_task;
        self
    }

    /// Validate all parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.bin_width > 0.0) || !self.bin_width.is_finite() {
            return Err(sdf_core::GridError::invalid_bin_width(self.bin_width).into());
        }
        self.kernel.validate()?;
        self.policy.validate()?;
        if self.events_per_task == 0 {
            return Err(EstimatorError::invalid_config(
                "events_per_task must be at least 1",
            ));
        }
        Ok(())
    }

    /// Number of bins on each side of a home bin that can receive mass
    pub fn window_radius_bins(&self) -> usize {
        self.kernel.window_radius_bins(self.bin_width)
    }
}

#[cfg(feature = "serde")]
impl EstimatorConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| EstimatorError::invalid_config(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            EstimatorError::invalid_config(format!("Failed to serialize config: {}", e))
        })
    }

    /// Load configuration from file; a missing file yields the defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = self.to_toml_string()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}
