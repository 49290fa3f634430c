//! Detect chromatographic features in LC-MS and GC-MS runs by probing the
//! retention time × m/z plane with a regular grid.
//!
//! Each scan is smoothed over retention time and thresholded into a [`RoiIndex`]. A grid
//! of probes is laid over the retained data and each probe climbs to the local intensity
//! maximum it falls toward. Probes that meet at the same maximum form a [`Spot`]. Spots
//! claim the data around them, neighboring spots with similar intensities are merged,
//! long background traces are removed, and every spot that still looks like a peak is
//! assembled into a [`GridFeature`] from the raw, unsmoothed data.
//!
//! # Usage
//! ```
//! use mzpeaks::{CentroidPeak, MZPeakSetType};
//! use mzgridmass::{GridMassExtracter, GridMassParams, ScanMap};
//!
//! // Two co-eluting compounds 0.5 m/z apart
//! let mut scans = ScanMap::new("pair.mzML");
//! for i in 0..50 {
//!     let d = (i as f64 - 25.0) / 4.0;
//!     let profile = (-0.5 * d * d).exp();
//!     let peaks: MZPeakSetType<CentroidPeak> = vec![
//!         CentroidPeak::new(300.1234, (1000.0 * profile) as f32, 0),
//!         CentroidPeak::new(300.6234, (900.0 * profile) as f32, 1),
//!     ]
//!     .into_iter()
//!     .collect();
//!     scans.push(i, i as f64 * 0.01, 1, peaks);
//! }
//! let params = GridMassParams::builder()
//!     .mz_tolerance(0.1)
//!     .time_span(0.1, 3.0)
//!     .minimum_height(20.0)
//!     .build()
//!     .unwrap();
//! let extracter = GridMassExtracter::new(params, &scans).unwrap();
//! let features = extracter.extract_features(&()).unwrap();
//! assert_eq!(features.len(), 2);
//! ```
use std::time::Instant;

use mzpeaks::CentroidLike;
use thiserror::Error;

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use crate::params::{DebugLevel, DerivedTolerances, GridMassParams};
use crate::progress::{should_check, Phase, ProgressMonitor};
use crate::scan_map::ScanMap;
use crate::smooth::{SmoothedPoint, TimeSmoother};

pub mod assemble;
pub mod probe;
pub mod roi;
pub mod spot;

pub use assemble::{ChromatogramPoint, FeatureList, GridFeature, PeakAssembler, SpotSummary};
pub use probe::{probe_local_maxima, ConvergedProbe, ProbeGrid, ProbeSeed, Relaxer};
pub use roi::{Datum, DatumIndex, RoiIndex, SpotId, UNASSIGNED};
pub use spot::{Rejection, Spot, SpotBuilder, SpotEvaluation, SpotState};

/// The ways a grid-probing run can fail
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridMassError {
    #[error("The scan set is empty")]
    EmptyScanSet,
    #[error("Retention time decreases at scan {scan_number} ({time} after {previous})")]
    NonMonotonicTime {
        scan_number: usize,
        time: f64,
        previous: f64,
    },
    #[error("The scan set mixes MS levels {0:?}, only one MS level may be used")]
    MixedMSLevels(Vec<u8>),
    #[error("Invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },
    #[error("Could not parse time range {0:?}")]
    InvalidTimeRange(String),
    #[error("Feature detection was canceled")]
    Canceled,
}

/// Runs grid-probing feature detection over one [`ScanMap`].
///
/// Construction validates both the parameters and the scans, so a detector that exists
/// can always run. A run is single threaded and either completes or returns an error
/// without producing any features.
#[derive(Debug, Clone)]
pub struct GridMassExtracter<'a, C: CentroidLike> {
    params: GridMassParams,
    scans: &'a ScanMap<C>,
}

impl<'a, C: CentroidLike> GridMassExtracter<'a, C> {
    pub fn new(params: GridMassParams, scans: &'a ScanMap<C>) -> Result<Self, GridMassError> {
        params.validate()?;
        scans.validate()?;
        Ok(Self { params, scans })
    }

    pub fn params(&self) -> &GridMassParams {
        &self.params
    }

    pub fn scans(&self) -> &ScanMap<C> {
        self.scans
    }

    /// The scan-level tolerances for this run's scan spacing
    pub fn tolerances(&self) -> DerivedTolerances {
        self.params
            .derive_tolerances(self.scans.average_time_spacing())
    }

    fn log_mass_coverage<M: ProgressMonitor + ?Sized>(
        &self,
        smoothed: &[Vec<SmoothedPoint>],
        monitor: &M,
    ) -> Result<(), GridMassError> {
        let n = smoothed.len();
        for (i, points) in smoothed.iter().enumerate() {
            if should_check(i) && monitor.is_canceled() {
                return Err(GridMassError::Canceled);
            }
            if self.params.debug_level >= DebugLevel::Basic {
                match (points.first(), points.last()) {
                    (Some(first), Some(last)) => log::debug!(
                        "Scan {} ({:.3} min): {} masses in {:.4} - {:.4} m/z",
                        self.scans.scan_numbers[i],
                        self.scans.time_axis[i],
                        points.len(),
                        first.mz,
                        last.mz
                    ),
                    _ => log::debug!(
                        "Scan {} ({:.3} min): no masses",
                        self.scans.scan_numbers[i],
                        self.scans.time_axis[i]
                    ),
                }
            }
            monitor.update(Phase::MassCoverage, i, n);
        }
        Ok(())
    }

    /// Smooth the scans and keep the points at least as intense as the height floor,
    /// skipping scans in ignored time ranges
    pub fn build_index<M: ProgressMonitor + ?Sized>(
        &self,
        monitor: &M,
    ) -> Result<RoiIndex, GridMassError> {
        let smoother = TimeSmoother::new(
            self.params.smoothing_time_span,
            self.params.smoothing_mz_window,
            self.params.minimum_height,
        );
        log::info!(
            "Smoothing {} scans of {} over {} min, {} m/z",
            self.scans.len(),
            self.scans.source_name,
            smoother.time_span,
            smoother.mz_window
        );
        let smoothed = smoother.smooth(self.scans, monitor)?;
        self.log_mass_coverage(&smoothed, monitor)?;

        let scan_mask = self.params.ignore_times.scan_mask(self.scans.time_axis());
        if !self.params.ignore_times.is_empty() {
            log::debug!(
                "Ignoring {} scans in {} time ranges",
                scan_mask.iter().filter(|keep| !**keep).count(),
                self.params.ignore_times.ranges.len()
            );
        }
        RoiIndex::from_smoothed(
            self.scans,
            smoothed,
            &scan_mask,
            self.params.minimum_height,
            monitor,
        )
    }

    /// Run every stage up to and including artifact pruning. Returns the index, whose
    /// datums are labeled with their owning spot, and every spot ever formed. Spots that
    /// may become features are in the [`SpotState::Candidate`] state.
    pub fn detect_spots<M: ProgressMonitor + ?Sized>(
        &self,
        monitor: &M,
    ) -> Result<(RoiIndex, Vec<Spot>), GridMassError> {
        let tolerances = self.tolerances();
        log::info!(
            "{:.4} min per scan, peaks span {} to {} scans",
            tolerances.scan_spacing,
            tolerances.tolerance_scans,
            tolerances.max_tolerance_scans
        );

        let mut roi = self.build_index(monitor)?;
        let probes = probe_local_maxima(&roi, &tolerances, self.params.minimum_height, monitor)?;
        let builder = SpotBuilder::new(&self.params, tolerances, self.scans.time_axis());
        let mut spots = builder.form_spots(probes, monitor)?;
        builder.resolve_ownership(&mut roi, &mut spots, monitor)?;
        builder.merge_spots(&mut roi, &mut spots, monitor)?;
        builder.prune_artifacts(&mut spots, monitor)?;
        Ok((roi, spots))
    }

    /// Test every candidate spot and build a feature from each one accepted
    pub fn assemble_features<M: ProgressMonitor + ?Sized>(
        &self,
        roi: &RoiIndex,
        spots: &mut [Spot],
        monitor: &M,
    ) -> Result<FeatureList, GridMassError> {
        let time_axis = self.scans.time_axis();
        let builder = SpotBuilder::new(&self.params, self.tolerances(), time_axis);
        let assembler = PeakAssembler::new(
            &self.scans.source_name,
            time_axis,
            self.params.minimum_height,
        );
        let debug_level = self.params.debug_level;

        let n = spots.len();
        let mut features = Vec::new();
        for (i, spot) in spots.iter_mut().enumerate() {
            if should_check(i) && monitor.is_canceled() {
                return Err(GridMassError::Canceled);
            }
            monitor.update(Phase::Assembly, i, n);
            if spot.state != SpotState::Candidate {
                continue;
            }
            let apex_time = time_axis[spot.apex.scan_index];

            let (evaluation, rejection) = builder.accept(roi, spot);
            if let Some(reason) = rejection {
                spot.state = SpotState::Rejected(reason);
                if debug_level >= DebugLevel::Basic {
                    log::debug!(
                        "Ignoring peak {} {:.4} m/z @ {:.3} min ({reason}), data scans={}, contiguous={}",
                        spot.id,
                        spot.apex.mz,
                        apex_time,
                        evaluation.data_scans,
                        evaluation.contiguous_scans
                    );
                }
                continue;
            }
            spot.state = SpotState::Accepted;

            match assembler.assemble(roi, spot, &evaluation) {
                Ok(feature) => {
                    spot.state = SpotState::FeatureEmitted;
                    if debug_level >= DebugLevel::Basic {
                        log::debug!(
                            "Accepted peak {} {:.4} m/z @ {:.3} min",
                            spot.id,
                            spot.apex.mz,
                            apex_time
                        );
                    }
                    if debug_level >= DebugLevel::Final {
                        log::debug!("{spot}\n\t{}", feature.summary);
                    }
                    features.push(feature);
                }
                Err(reason) => {
                    spot.state = SpotState::Rejected(reason);
                    if debug_level >= DebugLevel::Basic {
                        log::debug!(
                            "Ignoring peak {} {:.4} m/z @ {:.3} min ({reason})",
                            spot.id,
                            spot.apex.mz,
                            apex_time
                        );
                    }
                }
            }
        }
        log::info!(
            "{} peaks accepted in {}",
            features.len(),
            self.scans.source_name
        );
        Ok(FeatureList::new(
            &self.scans.source_name,
            &self.params.suffix,
            features,
        ))
    }

    /// Run the whole pipeline, polling `monitor` for cancellation along the way
    pub fn extract_features<M: ProgressMonitor + ?Sized>(
        &self,
        monitor: &M,
    ) -> Result<FeatureList, GridMassError> {
        let start = Instant::now();
        let (roi, mut spots) = self.detect_spots(monitor)?;
        let features = self.assemble_features(&roi, &mut spots, monitor)?;
        monitor.set_progress(1.0);
        log::debug!(
            "Feature detection on {} took {} ms",
            self.scans.source_name,
            start.elapsed().as_millis()
        );
        Ok(features)
    }
}

/// Detect features in one scan map with `params`
pub fn detect_features<C: CentroidLike>(
    scans: &ScanMap<C>,
    params: &GridMassParams,
) -> Result<FeatureList, GridMassError> {
    GridMassExtracter::new(params.clone(), scans)?.extract_features(&())
}

cfg_if::cfg_if! {
    if #[cfg(feature = "parallelism")] {
        /// Detect features in each of several independent scan maps, running the maps
        /// concurrently. Results are in the same order as `scan_maps`.
        pub fn detect_features_batch<C: CentroidLike + Send + Sync>(
            scan_maps: &[ScanMap<C>],
            params: &GridMassParams,
        ) -> Vec<Result<FeatureList, GridMassError>> {
            scan_maps
                .par_iter()
                .map(|scans| detect_features(scans, params))
                .collect()
        }
    } else {
        /// Detect features in each of several independent scan maps, one after another.
        /// Results are in the same order as `scan_maps`.
        pub fn detect_features_batch<C: CentroidLike + Send + Sync>(
            scan_maps: &[ScanMap<C>],
            params: &GridMassParams,
        ) -> Vec<Result<FeatureList, GridMassError>> {
            scan_maps
                .iter()
                .map(|scans| detect_features(scans, params))
                .collect()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use mzpeaks::{prelude::*, CentroidPeak, MZPeakSetType};
    use rstest::{fixture, rstest};

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::params::IgnoredTimes;
    use crate::progress::CancellationFlag;
    use crate::test_data::{constant_map, gaussian_map, sparse_map, GaussianSignal};

    #[fixture]
    fn params() -> GridMassParams {
        GridMassParams::builder()
            .mz_tolerance(0.1)
            .time_span(0.1, 3.0)
            .minimum_height(20.0)
            .debug_level(DebugLevel::All)
            .build()
            .unwrap()
    }

    fn single_gaussian() -> ScanMap<CentroidPeak> {
        gaussian_map(50, 0.01, &[GaussianSignal::new(300.1234, 25.0, 1000.0, 4.0)])
    }

    fn coeluting_pair() -> ScanMap<CentroidPeak> {
        gaussian_map(
            50,
            0.01,
            &[
                GaussianSignal::new(300.1234, 25.0, 1000.0, 4.0),
                GaussianSignal::new(300.6234, 25.0, 900.0, 4.0),
            ],
        )
    }

    fn staggered() -> ScanMap<CentroidPeak> {
        gaussian_map(
            120,
            0.01,
            &[
                GaussianSignal::new(250.05, 30.0, 5000.0, 5.0),
                GaussianSignal::new(250.05, 90.0, 3000.0, 4.0),
                GaussianSignal::new(512.3, 60.0, 800.0, 3.0),
                GaussianSignal::new(700.7, 45.0, 15.0, 4.0),
            ],
        )
    }

    #[rstest]
    #[test_log::test]
    fn test_single_gaussian(params: GridMassParams) {
        let scans = single_gaussian();
        let extracter = GridMassExtracter::new(params, &scans).unwrap();
        let features = extracter.extract_features(&()).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features.name, "gaussian.mzML gridmass");
        let feature = &features.features[0];
        assert!((feature.mz - 300.1234).abs() < 0.1);
        assert!((feature.summary.apex_time - 0.25).abs() <= 0.01 + 1e-9);
        assert!((feature.apex_time - 0.25).abs() <= 0.01 + 1e-9);
        assert!(feature.area > 0.0);
        assert_eq!(feature.height, 1000.0);
    }

    #[rstest]
    #[test_log::test]
    fn test_coeluting_pair(params: GridMassParams) {
        let scans = coeluting_pair();
        let features = GridMassExtracter::new(params, &scans)
            .unwrap()
            .extract_features(&())
            .unwrap();
        assert_eq!(features.len(), 2);
        assert!((features.features[0].mz - 300.1234).abs() < 0.01);
        assert!((features.features[1].mz - 300.6234).abs() < 0.01);
        let map = features.into_feature_map();
        assert_eq!(map.len(), 2);
    }

    #[rstest]
    #[test_log::test]
    fn test_constant_background_pruned(mut params: GridMassParams) {
        params.max_time_span = 1.0;
        let scans = constant_map(50, 0.05, 400.0, 500.0);
        let extracter = GridMassExtracter::new(params, &scans).unwrap();
        let (roi, mut spots) = extracter.detect_spots(&()).unwrap();
        assert!(!spots.is_empty());
        assert!(spots.iter().any(|s| s.state == SpotState::Tombstoned));
        assert!(spots.iter().all(|s| s.state != SpotState::Candidate));
        let features = extracter.assemble_features(&roi, &mut spots, &()).unwrap();
        assert!(features.is_empty());
    }

    #[rstest]
    #[test_log::test]
    fn test_sparse_signal_rejected(mut params: GridMassParams) {
        params.smoothing_time_span = 0.0;
        let scans = sparse_map(50, 0.01, 400.0, 10..41, 5, 20.0, 5.0);
        let extracter = GridMassExtracter::new(params, &scans).unwrap();
        let (roi, mut spots) = extracter.detect_spots(&()).unwrap();
        let features = extracter.assemble_features(&roi, &mut spots, &()).unwrap();
        assert!(features.is_empty());
        assert!(spots
            .iter()
            .any(|s| s.state == SpotState::Rejected(Rejection::Continuity)));
    }

    #[rstest]
    #[case::single(single_gaussian())]
    #[case::pair(coeluting_pair())]
    #[case::staggered(staggered())]
    #[test_log::test]
    fn test_feature_properties(#[case] scans: ScanMap<CentroidPeak>, params: GridMassParams) {
        let extracter = GridMassExtracter::new(params.clone(), &scans).unwrap();
        let tolerances = extracter.tolerances();
        let features = extracter.extract_features(&()).unwrap();
        assert!(!features.is_empty());
        let mut last_spot = 0;
        for feature in features.iter() {
            assert!(feature.height >= params.minimum_height);
            assert!(feature.area > 1e-6);
            assert!(feature.duration() <= params.max_time_span);
            assert!(feature.len() >= tolerances.tolerance_scans);
            assert!(feature.summary.spot_id > last_spot);
            last_spot = feature.summary.spot_id;
            for point in feature.points.iter() {
                assert!(
                    scans
                        .iter_at_index(point.scan_index)
                        .any(|p| p.mz() == point.mz && p.intensity() == point.intensity),
                    "{point:?} is not a raw data point"
                );
            }
        }
    }

    #[rstest]
    #[test_log::test]
    fn test_staggered(params: GridMassParams) {
        let features = GridMassExtracter::new(params, &staggered())
            .and_then(|e| e.extract_features(&()))
            .unwrap();
        // The 700.7 trace never reaches the height floor after smoothing
        assert_eq!(features.len(), 3);
        let masses: Vec<i64> = features.iter().map(|f| f.mz.round() as i64).collect();
        assert_eq!(masses, vec![250, 250, 512]);
        assert!(features.features[0].apex_time < features.features[1].apex_time);
    }

    #[rstest]
    #[test_log::test]
    fn test_deterministic(params: GridMassParams) {
        let scans = staggered();
        let extracter = GridMassExtracter::new(params, &scans).unwrap();
        let first = extracter.extract_features(&()).unwrap();
        let second = extracter.extract_features(&()).unwrap();
        assert_eq!(first, second);
    }

    #[rstest]
    #[test_log::test]
    fn test_below_height_is_empty(mut params: GridMassParams) {
        params.minimum_height = 2000.0;
        let scans = single_gaussian();
        let features = detect_features(&scans, &params).unwrap();
        assert!(features.is_empty());
    }

    #[rstest]
    #[test_log::test]
    fn test_ignored_times(mut params: GridMassParams) {
        params.ignore_times = "0.1-0.4".parse::<IgnoredTimes>().unwrap();
        let scans = single_gaussian();
        let features = detect_features(&scans, &params).unwrap();
        assert!(features.is_empty());

        params.ignore_times = "0.45-0.49".parse::<IgnoredTimes>().unwrap();
        let features = detect_features(&scans, &params).unwrap();
        assert_eq!(features.len(), 1);
    }

    #[rstest]
    fn test_non_monotonic_time(params: GridMassParams) {
        let mut scans = single_gaussian();
        scans.time_axis[10] = 0.05;
        let err = GridMassExtracter::new(params, &scans).unwrap_err();
        assert_eq!(
            err,
            GridMassError::NonMonotonicTime {
                scan_number: 10,
                time: 0.05,
                previous: 9.0 * 0.01
            }
        );
    }

    #[rstest]
    fn test_invalid_scan_sets(params: GridMassParams) {
        let scans: ScanMap<CentroidPeak> = ScanMap::new("empty.mzML");
        assert_eq!(
            GridMassExtracter::new(params.clone(), &scans).unwrap_err(),
            GridMassError::EmptyScanSet
        );

        let mut scans = single_gaussian();
        scans.push(50, 0.5, 2, MZPeakSetType::new(Vec::new()));
        assert_eq!(
            GridMassExtracter::new(params, &scans).unwrap_err(),
            GridMassError::MixedMSLevels(vec![1, 2])
        );
    }

    #[rstest]
    fn test_canceled(params: GridMassParams) {
        let scans = single_gaussian();
        let extracter = GridMassExtracter::new(params, &scans).unwrap();
        let flag = CancellationFlag::new();
        flag.cancel();
        assert_eq!(extracter.extract_features(&flag), Err(GridMassError::Canceled));
    }

    /// Counts cancellation checks and asks to stop on the `cancel_at`-th one
    #[derive(Debug, Default)]
    struct CancelAfter {
        checks: AtomicUsize,
        cancel_at: Option<usize>,
    }

    impl CancelAfter {
        fn new(cancel_at: usize) -> Self {
            Self {
                checks: AtomicUsize::new(0),
                cancel_at: Some(cancel_at),
            }
        }
    }

    impl ProgressMonitor for CancelAfter {
        fn is_canceled(&self) -> bool {
            let n = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
            self.cancel_at.is_some_and(|at| n >= at)
        }
    }

    #[rstest]
    #[case::pair(coeluting_pair())]
    #[case::staggered(staggered())]
    fn test_canceled_at_every_check(#[case] scans: ScanMap<CentroidPeak>, params: GridMassParams) {
        let extracter = GridMassExtracter::new(params, &scans).unwrap();
        let counter = CancelAfter::default();
        let features = extracter.extract_features(&counter).unwrap();
        assert!(!features.is_empty());
        let total = counter.checks.load(Ordering::Relaxed);
        assert!(total > 0);

        for cancel_at in 1..=total {
            let monitor = CancelAfter::new(cancel_at);
            assert_eq!(
                extracter.extract_features(&monitor),
                Err(GridMassError::Canceled),
                "check {cancel_at} of {total} did not stop the run"
            );
            assert_eq!(monitor.checks.load(Ordering::Relaxed), cancel_at);
        }
    }

    #[rstest]
    fn test_progress_completes(params: GridMassParams) {
        let scans = single_gaussian();
        let extracter = GridMassExtracter::new(params, &scans).unwrap();
        let flag = CancellationFlag::new();
        extracter.extract_features(&flag).unwrap();
        assert_eq!(flag.progress(), 1.0);
    }

    #[rstest]
    #[test_log::test]
    fn test_batch(params: GridMassParams) {
        let maps = vec![single_gaussian(), coeluting_pair()];
        let results = detect_features_batch(&maps, &params);
        let counts: Vec<usize> = results.into_iter().map(|r| r.unwrap().len()).collect();
        assert_eq!(counts, vec![1, 2]);
    }
}
