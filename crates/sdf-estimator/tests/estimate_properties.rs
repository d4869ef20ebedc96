use proptest::prelude::*;
use sdf_estimator::{
    Containment, DensityEstimator, DensityEstimatorBuilder, Epoch, Normalization, SortedEvents,
};

/// Epochs built from (duration, contiguous, gap) triples, plus events placed
/// by (epoch choice, fraction of duration)
fn epochs_and_events() -> impl Strategy<Value = (Vec<Epoch>, Vec<f64>)> {
    (
        -50.0f64..50.0,
        prop::collection::vec((0.2f64..5.0, any::<bool>(), 0.01f64..1.0), 1..5),
        prop::collection::vec((0usize..5, 0.0f64..1.0), 0..150),
    )
        .prop_map(|(origin, shapes, picks)| {
            let mut epochs = Vec::with_capacity(shapes.len());
            let mut start = origin;
            for (duration, contiguous, gap) in shapes {
                let epoch = Epoch::new(start, start + duration).unwrap();
                start = if contiguous { epoch.stop() } else { epoch.stop() + gap };
                epochs.push(epoch);
            }
            let events: Vec<f64> = picks
                .into_iter()
                .map(|(k, frac)| {
                    let epoch = epochs[k % epochs.len()];
                    epoch.start() + frac * epoch.duration()
                })
                .filter(|&t| epochs.iter().any(|e| e.contains(t)))
                .collect();
            (epochs, events)
        })
}

fn builder(ds: f64, sigma: f64) -> DensityEstimatorBuilder {
    DensityEstimator::builder()
        .bin_width(ds)
        .sigma(sigma)
        .events_per_task(16)
}

proptest! {
    #[test]
    fn density_is_bounded_by_event_count(
        (epochs, events) in epochs_and_events(),
        ds in 0.01f64..0.5,
        sigma in 0.005f64..0.5,
        across in any::<bool>(),
        renormalize in any::<bool>(),
    ) {
        let containment = if across { Containment::AcrossEpoch } else { Containment::WithinEpoch };
        let normalization = if renormalize {
            Normalization::RenormalizeToWindow
        } else {
            Normalization::Natural
        };
        let estimator = builder(ds, sigma)
            .containment(containment)
            .normalization(normalization)
            .build()
            .unwrap();
        let source = SortedEvents::from_unsorted(events).unwrap();
        let est = estimator.estimate(&epochs, &source).unwrap();

        let n = est.n_events() as f64;
        prop_assert!(est.values().iter().all(|&v| v >= 0.0));
        prop_assert!(est.total_mass() <= n * (1.0 + 1e-12) + 1e-12);
        // Retained plus discarded accounts for every event's window
        let accounted = est.total_mass() + est.discarded_mass();
        let expected = n * estimator.scaled_kernel().event_mass();
        prop_assert!((accounted - expected).abs() <= 1e-9 * n.max(1.0));
    }

    #[test]
    fn across_epoch_retains_at_least_as_much(
        (epochs, events) in epochs_and_events(),
        ds in 0.01f64..0.5,
        sigma in 0.005f64..0.5,
    ) {
        let source = SortedEvents::from_unsorted(events).unwrap();
        let within = builder(ds, sigma).build().unwrap().estimate(&epochs, &source).unwrap();
        let across = builder(ds, sigma)
            .containment(Containment::AcrossEpoch)
            .build()
            .unwrap()
            .estimate(&epochs, &source)
            .unwrap();
        prop_assert!(across.total_mass() >= within.total_mass() - 1e-9);
    }

    #[test]
    fn parallel_and_sequential_are_identical(
        (epochs, events) in epochs_and_events(),
        ds in 0.01f64..0.5,
        sigma in 0.005f64..0.5,
    ) {
        let source = SortedEvents::from_unsorted(events).unwrap();
        let a = builder(ds, sigma).build().unwrap().estimate(&epochs, &source).unwrap();
        let sequential = builder(ds, sigma).sequential().build().unwrap();
        let b = sequential.estimate(&epochs, &source).unwrap();
        prop_assert_eq!(a.values(), b.values());
    }

    #[test]
    fn histogram_counts_every_homed_event(
        (epochs, events) in epochs_and_events(),
        ds in 0.01f64..0.5,
    ) {
        let source = SortedEvents::from_unsorted(events).unwrap();
        let hist = builder(ds, 0.05).build().unwrap().histogram(&epochs, &source).unwrap();
        prop_assert!(hist.values().iter().all(|&v| v >= 0.0 && v.fract() == 0.0));
        prop_assert_eq!(hist.total_mass() + hist.discarded_mass(), hist.n_events() as f64);
    }
}
