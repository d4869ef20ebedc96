//! Density estimator: grid construction, task planning and accumulation

use crate::{
    config::EstimatorConfig,
    density::{DensityArray, DensityEstimate, PopulationDensity},
    error::{EstimatorError, Result},
    kernel::{Kernel, KernelFamily, KernelSpec, ScaledKernel},
    policy::{Containment, Disposal, EdgePolicy, Normalization},
    weights::{self, EventWeights},
};
use core::ops::Range;
use sdf_core::{BinGrid, Epoch, EventSource, GridError, PartialBin};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A run of events from one epoch, smoothed as a unit
#[derive(Debug, Clone, Copy)]
struct Task<'a> {
    epoch: usize,
    events: &'a [f64],
}

/// Mass a task deposits on a contiguous block of global bins
#[derive(Debug)]
struct Partial {
    first_bin: usize,
    values: Vec<f64>,
    discarded: f64,
}

/// Exact kernel-mass spike density estimator.
///
/// Every event contributes the analytic integral of its truncated kernel over
/// each bin it reaches, so the estimate keeps sub-bin timing and never passes
/// through an intermediate histogram. Estimation is a pure function of its
/// inputs; the estimator itself holds only configuration.
#[derive(Debug, Clone)]
pub struct DensityEstimator {
    config: EstimatorConfig,
    kernel: Arc<dyn Kernel>,
    scaled: ScaledKernel,
    parallel: bool,
}

impl DensityEstimator {
    /// Create an estimator using the configured kernel family
    pub fn new(config: EstimatorConfig) -> Result<Self> {
        let kernel = config.kernel.family.kernel();
        Self::with_parts(config, kernel, true)
    }

    /// Start a builder with default configuration
    pub fn builder() -> DensityEstimatorBuilder {
        DensityEstimatorBuilder::new()
    }

    /// Replace the kernel with a custom implementation
    pub fn with_kernel(self, kernel: Arc<dyn Kernel>) -> Result<Self> {
        Self::with_parts(self.config, kernel, self.parallel)
    }

    fn with_parts(
        config: EstimatorConfig,
        kernel: Arc<dyn Kernel>,
        parallel: bool,
    ) -> Result<Self> {
        config.validate()?;
        let renormalize = config.policy.renormalizes();
        let scaled = ScaledKernel::new(kernel.clone(), &config.kernel, renormalize)?;
        log::debug!(
            "density estimator: {} kernel, sigma={}, reach={}, ds={}",
            kernel.name(),
            config.kernel.sigma,
            scaled.reach(),
            config.bin_width
        );
        Ok(Self {
            config,
            kernel,
            scaled,
            parallel,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Kernel in use
    pub fn kernel(&self) -> &Arc<dyn Kernel> {
        &self.kernel
    }

    /// Kernel bound to the configured scale and truncation
    pub fn scaled_kernel(&self) -> &ScaledKernel {
        &self.scaled
    }

    /// Whether accumulation tasks may run on the rayon pool
    pub fn is_parallel(&self) -> bool {
        self.parallel && cfg!(feature = "parallel")
    }

    /// Build the bin grid this estimator uses for `epochs`
    pub fn grid(&self, epochs: &[Epoch]) -> Result<BinGrid> {
        Ok(BinGrid::build(
            epochs,
            self.config.bin_width,
            self.config.partial_bin,
        )?)
    }

    /// Smooth one event series onto the grid of `epochs`
    pub fn estimate<S>(&self, epochs: &[Epoch], events: &S) -> Result<DensityEstimate>
    where
        S: EventSource + ?Sized,
    {
        let grid = self.grid(epochs)?;
        events.validate(epochs)?;
        let spans = self.config.policy.spans(epochs, &grid);
        let (density, discarded_mass) = self.accumulate(epochs, &grid, &spans, events)?;

        log::info!(
            "smoothed {} events into {} bins, discarded mass {:.6}",
            events.n_events(),
            grid.total_bins(),
            discarded_mass
        );

        Ok(DensityEstimate {
            density,
            grid,
            n_events: events.n_events(),
            discarded_mass,
        })
    }

    /// Smooth several event series onto one shared grid.
    ///
    /// All series are validated before any is smoothed, so an invalid series
    /// anywhere fails the whole call.
    pub fn estimate_population<S>(
        &self,
        epochs: &[Epoch],
        series: &[S],
    ) -> Result<PopulationDensity>
    where
        S: EventSource,
    {
        let grid = self.grid(epochs)?;
        for events in series {
            events.validate(epochs)?;
        }
        let spans = self.config.policy.spans(epochs, &grid);

        let mut rows = Vec::with_capacity(series.len());
        let mut n_events = Vec::with_capacity(series.len());
        let mut discarded_mass = Vec::with_capacity(series.len());
        for events in series {
            let (density, discarded) = self.accumulate(epochs, &grid, &spans, events)?;
            rows.push(density);
            n_events.push(events.n_events());
            discarded_mass.push(discarded);
        }

        log::info!(
            "smoothed {} series ({} events) into {} bins each",
            series.len(),
            n_events.iter().sum::<usize>(),
            grid.total_bins()
        );

        Ok(PopulationDensity {
            grid,
            rows,
            n_events,
            discarded_mass,
        })
    }

    /// Naive per-bin event counts on the same grid.
    ///
    /// This is the limit of the smoothed estimate as sigma goes to zero.
    /// Events without a home bin (in a dropped trailing partial bin) are not
    /// counted and are reported as discarded mass.
    pub fn histogram<S>(&self, epochs: &[Epoch], events: &S) -> Result<DensityEstimate>
    where
        S: EventSource + ?Sized,
    {
        let grid = self.grid(epochs)?;
        events.validate(epochs)?;

        let mut counts = DensityArray::zeros(grid.total_bins());
        let mut discarded_mass = 0.0;
        for (k, epoch) in epochs.iter().enumerate() {
            let offset = grid.bin_range(k).start;
            let epoch_grid = grid.epoch_grid(k);
            for &t in events.epoch_events(k, epoch) {
                match epoch_grid.place(t)?.home_bin {
                    Some(bin) => counts.as_mut_slice()[offset + bin] += 1.0,
                    None => discarded_mass += 1.0,
                }
            }
        }

        Ok(DensityEstimate {
            density: counts,
            grid,
            n_events: events.n_events(),
            discarded_mass,
        })
    }

    /// Weights a single event at `t` places on the grid of `epochs`
    pub fn event_weights(&self, epochs: &[Epoch], t: f64) -> Result<EventWeights> {
        let grid = self.grid(epochs)?;
        let k = epochs.partition_point(|e| e.stop() <= t);
        match epochs.get(k) {
            Some(epoch) if epoch.contains(t) => {}
            Some(epoch) => {
                return Err(GridError::event_out_of_bounds(t, epoch.start(), epoch.stop()).into())
            }
            None => {
                let (start, stop) = epochs
                    .last()
                    .map(|e| (e.start(), e.stop()))
                    .unwrap_or((f64::NAN, f64::NAN));
                return Err(GridError::event_out_of_bounds(t, start, stop).into());
            }
        }

        let spans = self.config.policy.spans(epochs, &grid);
        let mut w = weights::event_weights(&self.scaled, &grid, k, spans[k].clone(), t)?;
        self.config.policy.disposal.apply(&mut w.weights, &mut w.clipped)?;
        Ok(w)
    }

    fn plan<'a, S>(&self, epochs: &[Epoch], events: &'a S) -> Vec<Task<'a>>
    where
        S: EventSource + ?Sized,
    {
        let mut tasks = Vec::new();
        for (k, epoch) in epochs.iter().enumerate() {
            for chunk in events
                .epoch_events(k, epoch)
                .chunks(self.config.events_per_task)
            {
                tasks.push(Task {
                    epoch: k,
                    events: chunk,
                });
            }
        }
        tasks
    }

    fn accumulate<S>(
        &self,
        epochs: &[Epoch],
        grid: &BinGrid,
        spans: &[Range<usize>],
        events: &S,
    ) -> Result<(DensityArray, f64)>
    where
        S: EventSource + ?Sized,
    {
        let tasks = self.plan(epochs, events);
        log::debug!(
            "accumulating {} events in {} tasks",
            events.n_events(),
            tasks.len()
        );

        let partials = self.run_tasks(grid, spans, &tasks)?;

        // Fixed summation order keeps the result independent of scheduling
        let mut density = DensityArray::zeros(grid.total_bins());
        let mut discarded = 0.0;
        for partial in &partials {
            density.add_at(partial.first_bin, &partial.values);
            discarded += partial.discarded;
        }
        Ok((density, discarded))
    }

    #[cfg(feature = "parallel")]
    fn run_tasks(
        &self,
        grid: &BinGrid,
        spans: &[Range<usize>],
        tasks: &[Task<'_>],
    ) -> Result<Vec<Partial>> {
        if self.parallel {
            tasks
                .par_iter()
                .map(|task| self.run_task(grid, spans, task))
                .collect()
        } else {
            tasks
                .iter()
                .map(|task| self.run_task(grid, spans, task))
                .collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_tasks(
        &self,
        grid: &BinGrid,
        spans: &[Range<usize>],
        tasks: &[Task<'_>],
    ) -> Result<Vec<Partial>> {
        tasks
            .iter()
            .map(|task| self.run_task(grid, spans, task))
            .collect()
    }

    fn run_task(&self, grid: &BinGrid, spans: &[Range<usize>], task: &Task<'_>) -> Result<Partial> {
        let span = spans[task.epoch].clone();
        let (first, last) = match (task.events.first(), task.events.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                return Ok(Partial {
                    first_bin: span.start,
                    values: Vec::new(),
                    discarded: 0.0,
                })
            }
        };

        // Every event window of a sorted task lies inside this block
        let reach = self.scaled.reach();
        let block = grid.overlapping(span.clone(), first - reach, last + reach);
        let mut values = vec![0.0; block.len()];
        let mut discarded = 0.0;
        let event_mass = self.scaled.event_mass();

        for &t in task.events {
            let mut w = weights::event_weights(&self.scaled, grid, task.epoch, span.clone(), t)?;
            self.config.policy.disposal.apply(&mut w.weights, &mut w.clipped)?;
            // Includes mass lost in dropped partial bins between contiguous epochs
            discarded += (event_mass - w.total()).max(0.0);
            if w.weights.is_empty() {
                continue;
            }
            let offset = w.first_bin - block.start;
            for (dst, v) in values[offset..offset + w.weights.len()].iter_mut().zip(&w.weights) {
                *dst += v;
            }
        }

        Ok(Partial {
            first_bin: block.start,
            values,
            discarded,
        })
    }
}

/// Builder for configuring a [`DensityEstimator`]
#[derive(Debug, Clone)]
pub struct DensityEstimatorBuilder {
    config: EstimatorConfig,
    kernel: Option<Arc<dyn Kernel>>,
    parallel: bool,
}

impl DensityEstimatorBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self {
            config: EstimatorConfig::default(),
            kernel: None,
            parallel: true,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: EstimatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bin width
    pub fn bin_width(mut self, ds: f64) -> Self {
        self.config.bin_width = ds;
        self
    }

    /// Set trailing partial bin handling
    pub fn partial_bin(mut self, partial: PartialBin) -> Self {
        self.config.partial_bin = partial;
        self
    }

    /// Set the full kernel spec
    pub fn kernel_spec(mut self, spec: KernelSpec) -> Self {
        self.config.kernel = spec;
        self
    }

    /// Set the kernel standard deviation
    pub fn sigma(mut self, sigma: f64) -> Self {
        self.config.kernel.sigma = sigma;
        self
    }

    /// Set the truncation radius in standard deviations
    pub fn truncation(mut self, truncation: f64) -> Self {
        self.config.kernel.truncation = truncation;
        self
    }

    /// Select a built-in kernel family
    pub fn family(mut self, family: KernelFamily) -> Self {
        self.config.kernel.family = family;
        self
    }

    /// Use a custom kernel instead of the configured family
    pub fn custom_kernel(mut self, kernel: Arc<dyn Kernel>) -> Self {
        self.kernel = Some(kernel);
        self
    }

    /// Set the whole edge policy
    pub fn policy(mut self, policy: EdgePolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Set containment
    pub fn containment(mut self, containment: Containment) -> Self {
        self.config.policy.containment = containment;
        self
    }

    /// Set disposal of clipped mass
    pub fn disposal(mut self, disposal: Disposal) -> Self {
        self.config.policy.disposal = disposal;
        self
    }

    /// Set normalization
    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.config.policy.normalization = normalization;
        self
    }

    /// Set the maximum number of events per task
    pub fn events_per_task(mut self, n: usize) -> Self {
        self.config.events_per_task = n;
        self
    }

    /// Run all tasks on the calling thread
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Validate and build the estimator
    pub fn build(self) -> Result<DensityEstimator> {
        let kernel = match self.kernel {
            Some(kernel) => kernel,
            None => self.config.kernel.family.kernel(),
        };
        DensityEstimator::with_parts(self.config, kernel, self.parallel)
    }
}

impl Default for DensityEstimatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<EstimatorConfig> for DensityEstimatorBuilder {
    fn from(config: EstimatorConfig) -> Self {
        Self::new().with_config(config)
    }
}

impl TryFrom<EstimatorConfig> for DensityEstimator {
    type Error = EstimatorError;

    fn try_from(config: EstimatorConfig) -> Result<Self> {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdf_core::{EpochEvents, SortedEvents};

    fn ep(start: f64, stop: f64) -> Epoch {
        Epoch::new(start, stop).unwrap()
    }

    #[test]
    fn test_builder_validates() {
        assert!(DensityEstimator::builder().build().is_ok());
        assert!(matches!(
            DensityEstimator::builder().sigma(0.0).build(),
            Err(EstimatorError::InvalidKernelSpec { .. })
        ));
        assert!(matches!(
            DensityEstimator::builder().disposal(Disposal::ClampAtEdge).build(),
            Err(EstimatorError::UnsupportedPolicy { .. })
        ));
        assert!(matches!(
            DensityEstimator::builder().bin_width(-0.1).build(),
            Err(EstimatorError::Grid { .. })
        ));
    }

    #[test]
    fn test_tasks_split_by_epoch_and_size() {
        let estimator = DensityEstimator::builder().events_per_task(2).build().unwrap();
        let epochs = [ep(0.0, 1.0), ep(1.0, 2.0)];
        let times = [0.1, 0.2, 0.3, 0.4, 0.5, 1.5];
        let source = SortedEvents::new(&times).unwrap();

        let tasks = estimator.plan(&epochs, &source);
        let shape: Vec<(usize, usize)> = tasks.iter().map(|t| (t.epoch, t.events.len())).collect();
        assert_eq!(shape, vec![(0, 2), (0, 2), (0, 1), (1, 1)]);
    }

    #[test]
    fn test_partial_block_covers_task_windows() {
        let estimator = DensityEstimator::builder()
            .bin_width(0.1)
            .sigma(0.05)
            .build()
            .unwrap();
        let epochs = [ep(0.0, 10.0)];
        let grid = estimator.grid(&epochs).unwrap();
        let spans = estimator.config().policy.spans(&epochs, &grid);

        let events = [2.0, 2.55, 3.0];
        let task = Task {
            epoch: 0,
            events: &events,
        };
        let partial = estimator.run_task(&grid, &spans, &task).unwrap();
        // 1.8 .. 3.2 touches bins 18..32
        assert_eq!(partial.first_bin, 18);
        assert_eq!(partial.values.len(), 14);
        let expected = 3.0 * estimator.scaled_kernel().event_mass();
        let total: f64 = partial.values.iter().sum();
        assert!((total - expected).abs() < 1e-12);
        assert!(partial.discarded < 1e-12);
    }

    #[test]
    fn test_histogram_counts_home_bins() {
        let estimator = DensityEstimator::builder().bin_width(0.25).build().unwrap();
        let epochs = [ep(0.0, 1.1)];
        let times = [0.0, 0.1, 0.3, 0.99, 1.05];
        let source = SortedEvents::new(&times).unwrap();

        let hist = estimator.histogram(&epochs, &source).unwrap();
        assert_eq!(hist.values(), &[2.0, 1.0, 0.0, 1.0]);
        // 1.05 sits in the dropped remainder [1.0, 1.1)
        assert_eq!(hist.discarded_mass(), 1.0);
        assert_eq!(hist.n_events(), 5);
    }

    #[test]
    fn test_event_weights_lookup() {
        let estimator = DensityEstimator::builder()
            .bin_width(0.1)
            .sigma(0.02)
            .build()
            .unwrap();
        let epochs = [ep(0.0, 1.0), ep(2.0, 3.0)];

        let w = estimator.event_weights(&epochs, 2.45).unwrap();
        assert_eq!(w.epoch, 1);
        assert_eq!(w.home_bin, Some(14));

        for t in [1.5, 3.0, -0.1, f64::NAN] {
            let err = estimator.event_weights(&epochs, t).unwrap_err();
            assert!(matches!(
                err.grid_error(),
                Some(GridError::EventOutOfBounds { .. })
            ));
        }
    }

    #[test]
    fn test_invalid_events_fail_before_output() {
        let estimator = DensityEstimator::builder().bin_width(0.1).build().unwrap();
        let epochs = [ep(0.0, 1.0), ep(1.0, 2.0)];
        let a = [0.5];
        let b = [2.5];
        let source = EpochEvents::new(vec![&a, &b]);
        let err = estimator.estimate(&epochs, &source).unwrap_err();
        assert!(matches!(
            err.grid_error(),
            Some(GridError::EventOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_custom_kernel() {
        #[derive(Debug)]
        struct Uniform;
        impl Kernel for Uniform {
            fn cdf(&self, z: f64) -> f64 {
                let a = 3f64.sqrt();
                ((z + a) / (2.0 * a)).clamp(0.0, 1.0)
            }
            fn support(&self) -> Option<f64> {
                Some(3f64.sqrt())
            }
            fn name(&self) -> &'static str {
                "uniform"
            }
        }

        let estimator = DensityEstimator::builder()
            .bin_width(0.1)
            .sigma(0.1)
            .custom_kernel(Arc::new(Uniform))
            .build()
            .unwrap();
        assert_eq!(estimator.kernel().name(), "uniform");

        let epochs = [ep(0.0, 2.0)];
        let times = [1.0];
        let est = estimator
            .estimate(&epochs, &SortedEvents::new(&times).unwrap())
            .unwrap();
        assert!((est.total_mass() - 1.0).abs() < 1e-12);
    }
}
