//! Cooperative cancellation and advisory progress reporting.
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// How many loop iterations may pass between cancellation checks
pub const CANCELLATION_CHECK_INTERVAL: usize = 100;

/// The stages of a detection run, in execution order. Each stage is weighted equally
/// when reporting progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Smoothing = 0,
    MassCoverage,
    RegionsOfInterest,
    ProbeGrid,
    Relaxation,
    SpotFormation,
    Ownership,
    Merging,
    ArtifactPruning,
    Assembly,
}

impl Phase {
    pub const COUNT: usize = 10;

    /// The fraction of the whole run completed when `i` of `n` steps of this phase are done
    pub fn fraction(&self, i: usize, n: usize) -> f32 {
        let within = if n == 0 { 0.0 } else { i as f32 / n as f32 };
        (*self as usize as f32 + within) / Self::COUNT as f32
    }
}

/// Something that observes a detection run and may ask it to stop
pub trait ProgressMonitor {
    /// Whether the run should stop as soon as possible
    fn is_canceled(&self) -> bool {
        false
    }

    /// Report that `fraction` of the run, in `[0, 1]`, is complete. Purely advisory.
    fn set_progress(&self, _fraction: f32) {}

    /// Report progress within `phase`
    fn update(&self, phase: Phase, i: usize, n: usize) {
        self.set_progress(phase.fraction(i, n))
    }
}

/// A monitor that never cancels and ignores progress
impl ProgressMonitor for () {}

/// A shareable cancellation switch that also records the last reported progress.
///
/// Clones share the same state, so a clone handed to another thread can cancel a run.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    canceled: Arc<AtomicBool>,
    progress: Arc<AtomicU32>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    /// The most recently reported progress fraction
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Relaxed))
    }
}

impl ProgressMonitor for CancellationFlag {
    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    fn set_progress(&self, fraction: f32) {
        self.progress.store(fraction.to_bits(), Ordering::Relaxed);
    }
}

/// Whether the `i`-th iteration of a loop should poll for cancellation
#[inline]
pub(crate) fn should_check(i: usize) -> bool {
    i % CANCELLATION_CHECK_INTERVAL == 0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_flag_shared() {
        let flag = CancellationFlag::new();
        let other = flag.clone();
        assert!(!flag.is_canceled());
        other.cancel();
        assert!(flag.is_canceled());

        other.update(Phase::Merging, 5, 10);
        assert!((flag.progress() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_phase_fraction() {
        assert_eq!(Phase::Smoothing.fraction(0, 0), 0.0);
        assert!((Phase::Assembly.fraction(10, 10) - 1.0).abs() < 1e-6);
    }
}
