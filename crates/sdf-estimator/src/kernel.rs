//! Smoothing kernels and their truncated support
//!
//! Kernels are expressed in standardized units (`z = (x - t) / sigma`) with
//! unit variance, so `sigma` means the standard deviation for every family.
//! The estimator only needs the cumulative distribution function: the mass a
//! kernel centered at `t` places in `[a, b)` is `F(zb) - F(za)`.

use crate::error::{EstimatorError, Result};
use core::f64::consts::SQRT_2;
use core::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default truncation radius in standard deviations
pub const DEFAULT_TRUNCATION: f64 = 4.0;

/// Default kernel scale (same units as timestamps)
pub const DEFAULT_SIGMA: f64 = 0.05;

/// A symmetric, unit-variance probability kernel
pub trait Kernel: Send + Sync + fmt::Debug {
    /// Standardized cumulative distribution function
    fn cdf(&self, z: f64) -> f64;

    /// Half-width of the support in standard deviations, `None` if unbounded
    fn support(&self) -> Option<f64> {
        None
    }

    /// Short kernel name for logs and errors
    fn name(&self) -> &'static str;
}

/// Gaussian kernel, `F(z) = Φ(z)`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gaussian;

impl Kernel for Gaussian {
    fn cdf(&self, z: f64) -> f64 {
        // erfc keeps precision in the lower tail where 1 + erf would cancel
        0.5 * libm::erfc(-z / SQRT_2)
    }

    fn name(&self) -> &'static str {
        "gaussian"
    }
}

/// Epanechnikov (parabolic) kernel scaled to unit variance
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Epanechnikov;

impl Epanechnikov {
    /// Support half-width giving unit variance
    pub const HALF_WIDTH: f64 = 2.236_067_977_499_79; // sqrt(5)
}

impl Kernel for Epanechnikov {
    fn cdf(&self, z: f64) -> f64 {
        let x = (z / Self::HALF_WIDTH).clamp(-1.0, 1.0);
        0.5 + 0.75 * x - 0.25 * x * x * x
    }

    fn support(&self) -> Option<f64> {
        Some(Self::HALF_WIDTH)
    }

    fn name(&self) -> &'static str {
        "epanechnikov"
    }
}

/// Triangular kernel scaled to unit variance
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Triangular;

impl Triangular {
    /// Support half-width giving unit variance
    pub const HALF_WIDTH: f64 = 2.449_489_742_783_178; // sqrt(6)
}

impl Kernel for Triangular {
    fn cdf(&self, z: f64) -> f64 {
        let x = (z / Self::HALF_WIDTH).clamp(-1.0, 1.0);
        if x < 0.0 {
            0.5 * (1.0 + x) * (1.0 + x)
        } else {
            1.0 - 0.5 * (1.0 - x) * (1.0 - x)
        }
    }

    fn support(&self) -> Option<f64> {
        Some(Self::HALF_WIDTH)
    }

    fn name(&self) -> &'static str {
        "triangular"
    }
}

/// Built-in kernel families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum KernelFamily {
    /// Gaussian kernel
    #[default]
    Gaussian,
    /// Epanechnikov kernel
    Epanechnikov,
    /// Triangular kernel
    Triangular,
}

impl KernelFamily {
    /// Shared kernel implementation for this family
    pub fn kernel(&self) -> Arc<dyn Kernel> {
        match self {
            KernelFamily::Gaussian => Arc::new(Gaussian),
            KernelFamily::Epanechnikov => Arc::new(Epanechnikov),
            KernelFamily::Triangular => Arc::new(Triangular),
        }
    }
}

/// Kernel family, scale and truncation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KernelSpec {
    /// Kernel family
    pub family: KernelFamily,
    /// Standard deviation of the kernel, in timestamp units
    pub sigma: f64,
    /// Truncation radius in standard deviations
    pub truncation: f64,
}

impl Default for KernelSpec {
    fn default() -> Self {
        Self {
            family: KernelFamily::Gaussian,
            sigma: DEFAULT_SIGMA,
            truncation: DEFAULT_TRUNCATION,
        }
    }
}

impl KernelSpec {
    /// Gaussian kernel with default truncation
    pub fn gaussian(sigma: f64) -> Self {
        Self {
            sigma,
            ..Default::default()
        }
    }

    /// Set the kernel family
    pub fn with_family(mut self, family: KernelFamily) -> Self {
        self.family = family;
        self
    }

    /// Set the truncation radius (standard deviations)
    pub fn with_truncation(mut self, truncation: f64) -> Self {
        self.truncation = truncation;
        self
    }

    /// Validate scale and truncation
    pub fn validate(&self) -> Result<()> {
        if !(self.sigma > 0.0) || !self.sigma.is_finite() {
            return Err(EstimatorError::invalid_kernel(
                "sigma",
                self.sigma.to_string(),
                "finite > 0",
            ));
        }
        if !(self.truncation > 0.0) || !self.truncation.is_finite() {
            return Err(EstimatorError::invalid_kernel(
                "truncation",
                self.truncation.to_string(),
                "finite > 0",
            ));
        }
        Ok(())
    }

    /// Number of bins on each side of the home bin that can receive mass
    pub fn window_radius_bins(&self, ds: f64) -> usize {
        (self.truncation * self.sigma / ds).ceil() as usize
    }
}

/// A validated kernel bound to its scale and truncation.
///
/// `mass` integrates the truncated kernel centered at `t` over `[lo, hi)`.
/// With `renormalize` set, masses are divided by the total truncated mass
/// so that a window lying entirely on retained bins sums to one.
#[derive(Debug, Clone)]
pub struct ScaledKernel {
    kernel: Arc<dyn Kernel>,
    sigma: f64,
    /// Effective radius in standard deviations
    radius: f64,
    window_mass: f64,
    scale: f64,
}

impl ScaledKernel {
    /// Bind a kernel to a validated spec
    pub fn new(kernel: Arc<dyn Kernel>, spec: &KernelSpec, renormalize: bool) -> Result<Self> {
        spec.validate()?;
        let radius = match kernel.support() {
            Some(support) => spec.truncation.min(support),
            None => spec.truncation,
        };
        let window_mass = kernel.cdf(radius) - kernel.cdf(-radius);
        if !(window_mass > 0.0) {
            return Err(EstimatorError::invalid_kernel(
                "truncation",
                spec.truncation.to_string(),
                format!("a window holding positive {} mass", kernel.name()),
            ));
        }
        let scale = if renormalize { 1.0 / window_mass } else { 1.0 };
        Ok(Self {
            kernel,
            sigma: spec.sigma,
            radius,
            window_mass,
            scale,
        })
    }

    /// Truncation half-width in timestamp units
    pub fn reach(&self) -> f64 {
        self.radius * self.sigma
    }

    /// Raw kernel mass inside the truncation window
    pub fn window_mass(&self) -> f64 {
        self.window_mass
    }

    /// Total mass one unclipped event contributes
    pub fn event_mass(&self) -> f64 {
        self.window_mass * self.scale
    }

    /// Kernel name
    pub fn name(&self) -> &'static str {
        self.kernel.name()
    }

    /// Truncated, possibly renormalized mass of `[lo, hi)` for an event at `t`
    pub fn mass(&self, t: f64, lo: f64, hi: f64) -> f64 {
        let z_lo = ((lo - t) / self.sigma).max(-self.radius);
        let z_hi = ((hi - t) / self.sigma).min(self.radius);
        if z_hi <= z_lo {
            return 0.0;
        }
        let mass = (self.kernel.cdf(z_hi) - self.kernel.cdf(z_lo)) * self.scale;
        mass.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernels() -> [Arc<dyn Kernel>; 3] {
        [Arc::new(Gaussian), Arc::new(Epanechnikov), Arc::new(Triangular)]
    }

    #[test]
    fn test_gaussian_cdf_values() {
        let g = Gaussian;
        assert!((g.cdf(0.0) - 0.5).abs() < 1e-15);
        assert!((g.cdf(1.0) - 0.841_344_746_068_542_9).abs() < 1e-12);
        assert!((g.cdf(-1.96) - 0.024_997_895_148_220_435).abs() < 1e-12);
        assert!(g.cdf(-40.0) >= 0.0);
        assert_eq!(g.cdf(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_cdfs_are_symmetric_and_monotone() {
        for k in kernels() {
            assert!((k.cdf(0.0) - 0.5).abs() < 1e-15, "{}", k.name());
            let mut prev = k.cdf(-5.0);
            for i in -49..=50 {
                let z = i as f64 * 0.1;
                let f = k.cdf(z);
                assert!(f >= prev, "{} not monotone at {}", k.name(), z);
                assert!((f + k.cdf(-z) - 1.0).abs() < 1e-12);
                prev = f;
            }
        }
    }

    #[test]
    fn test_compact_kernels_have_unit_variance() {
        // Integrate z^2 dF numerically from the CDF
        for k in [Arc::new(Epanechnikov) as Arc<dyn Kernel>, Arc::new(Triangular)] {
            let a = k.support().unwrap();
            let n = 20_000;
            let h = 2.0 * a / n as f64;
            let var: f64 = (0..n)
                .map(|i| {
                    let lo = -a + i as f64 * h;
                    let mid = lo + 0.5 * h;
                    mid * mid * (k.cdf(lo + h) - k.cdf(lo))
                })
                .sum();
            assert!((var - 1.0).abs() < 1e-6, "{} variance {}", k.name(), var);
            assert_eq!(k.cdf(a), 1.0);
            assert_eq!(k.cdf(-a), 0.0);
        }
    }

    #[test]
    fn test_spec_validation() {
        assert!(KernelSpec::default().validate().is_ok());
        for sigma in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = KernelSpec::gaussian(sigma).validate().unwrap_err();
            assert!(matches!(err, EstimatorError::InvalidKernelSpec { .. }));
        }
        let err = KernelSpec::gaussian(0.1).with_truncation(0.0).validate().unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::InvalidKernelSpec { ref parameter, .. } if parameter == "truncation"
        ));
    }

    #[test]
    fn test_window_radius_bins() {
        let spec = KernelSpec::gaussian(0.05);
        assert_eq!(spec.window_radius_bins(0.05), 4);
        assert_eq!(spec.window_radius_bins(0.03), 7);
        assert_eq!(spec.window_radius_bins(1.0), 1);
    }

    #[test]
    fn test_scaled_kernel_masses() {
        let spec = KernelSpec::gaussian(0.1);
        let natural = ScaledKernel::new(Arc::new(Gaussian), &spec, false).unwrap();
        let whole = natural.mass(0.0, f64::NEG_INFINITY, f64::INFINITY);
        let expected = libm::erf(4.0 / SQRT_2);
        assert!((whole - expected).abs() < 1e-14);
        assert!((natural.mass(0.0, 0.0, 10.0) - 0.5 * expected).abs() < 1e-14);
        // Beyond the truncation radius nothing is left
        assert_eq!(natural.mass(0.0, 0.41, 1.0), 0.0);
        assert_eq!(natural.mass(0.0, 0.2, 0.1), 0.0);

        let renormalized = ScaledKernel::new(Arc::new(Gaussian), &spec, true).unwrap();
        let whole = renormalized.mass(0.0, f64::NEG_INFINITY, f64::INFINITY);
        assert!((whole - 1.0).abs() < 1e-15);
        assert!((renormalized.event_mass() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_compact_support_caps_radius() {
        let spec = KernelSpec::gaussian(1.0).with_family(KernelFamily::Epanechnikov);
        let k = ScaledKernel::new(spec.family.kernel(), &spec, false).unwrap();
        assert!((k.reach() - Epanechnikov::HALF_WIDTH).abs() < 1e-15);
        assert_eq!(k.window_mass(), 1.0);
    }
}
