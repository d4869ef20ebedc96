//! Error types for the density estimator

use thiserror::Error;

/// Result type for estimator operations
pub type Result<T> = std::result::Result<T, EstimatorError>;

/// Errors that can occur while configuring or running the estimator
#[derive(Error, Debug)]
pub enum EstimatorError {
    /// Grid, epoch or event placement error
    #[error("Grid error: {source}")]
    Grid {
        #[from]
        /// Source grid error
        source: sdf_core::GridError,
    },

    /// Kernel scale or truncation out of range
    #[error("Invalid kernel spec {parameter}: {value} (expected {constraint})")]
    InvalidKernelSpec {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Edge policy variant declared but not available
    #[error("Unsupported edge policy: {policy}")]
    UnsupportedPolicy {
        /// Name of the selected policy
        policy: String,
    },

    /// Invalid estimator configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for invalid configuration
        reason: String,
    },

    /// I/O error while reading or writing a configuration file
    #[error("I/O error: {source}")]
    Io {
        #[from]
        /// Source I/O error
        source: std::io::Error,
    },
}

impl EstimatorError {
    /// Create an invalid kernel spec error
    pub fn invalid_kernel(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidKernelSpec {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create an unsupported policy error
    pub fn unsupported_policy(policy: impl Into<String>) -> Self {
        Self::UnsupportedPolicy {
            policy: policy.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Underlying grid error, if any
    pub fn grid_error(&self) -> Option<&sdf_core::GridError> {
        match self {
            Self::Grid { source } => Some(source),
            _ => None,
        }
    }
}
