//! Reduce noise in a [`ScanMap`] by averaging each point with its nearest neighbors
//! in the adjacent scans.
use mzpeaks::CentroidLike;

use crate::gridmass::GridMassError;
use crate::progress::{should_check, Phase, ProgressMonitor};
use crate::scan_map::ScanMap;
use crate::search::{find_first_by, nearest_within};

/// The smallest m/z window smoothing will search in
const MINIMUM_MZ_WINDOW: f64 = 1e-6;

/// A point that survived smoothing, carrying a reference back to the raw peak it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedPoint {
    /// The position of the raw peak within its scan's peak list
    pub index: usize,
    pub mz: f64,
    /// The smoothed intensity
    pub intensity: f32,
}

impl SmoothedPoint {
    pub fn new(index: usize, mz: f64, intensity: f32) -> Self {
        Self {
            index,
            mz,
            intensity,
        }
    }
}

/// A moving-window smoother over retention time.
///
/// For every peak of a scan, the smoothed intensity is the mean of the intensities of
/// the nearest peak within `mz_window` in each scan whose retention time lies within
/// `time_span / 2` of the scan's own. This is nearest-match averaging, the window is
/// never integrated. Points whose smoothed intensity is below `minimum_height` are
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSmoother {
    pub time_span: f64,
    pub mz_window: f64,
    pub minimum_height: f32,
}

impl TimeSmoother {
    pub fn new(time_span: f64, mz_window: f64, minimum_height: f32) -> Self {
        Self {
            time_span,
            mz_window,
            minimum_height,
        }
    }

    /// The inclusive range of scan indices whose time falls within the smoothing window
    /// around scan `scan_index`
    pub fn window_of(&self, time_axis: &[f64], scan_index: usize) -> (usize, usize) {
        let time = time_axis[scan_index];
        let half = self.time_span / 2.0;
        let lo = find_first_by(time_axis, time - half, |t| *t).min(scan_index);
        let mut hi = scan_index;
        while hi + 1 < time_axis.len() && time_axis[hi + 1] <= time + half {
            hi += 1;
        }
        (lo, hi)
    }

    /// Smooth every scan of `scans`, returning one list of surviving points per scan in
    /// ascending m/z order.
    ///
    /// Polls `monitor` every hundred scans and returns [`GridMassError::Canceled`] without
    /// any partial result if asked to stop.
    pub fn smooth<C: CentroidLike, M: ProgressMonitor + ?Sized>(
        &self,
        scans: &ScanMap<C>,
        monitor: &M,
    ) -> Result<Vec<Vec<SmoothedPoint>>, GridMassError> {
        let n = scans.len();
        let arrays: Vec<(Vec<f64>, Vec<f32>)> = (0..n).map(|i| scans.arrays_at(i)).collect();
        let mz_window = self.mz_window.max(MINIMUM_MZ_WINDOW);
        let report_every = (n / 10).max(1);

        let mut smoothed = Vec::with_capacity(n);
        for i in 0..n {
            if should_check(i) && monitor.is_canceled() {
                return Err(GridMassError::Canceled);
            }

            let (lo, hi) = if self.time_span > 0.0 {
                self.window_of(scans.time_axis(), i)
            } else {
                (i, i)
            };

            let (mzs, intensities) = &arrays[i];
            let points = if hi > lo {
                self.average_scan(mzs, intensities, &arrays[lo..=hi], mz_window)
            } else {
                self.threshold_scan(mzs, intensities)
            };
            smoothed.push(points);

            monitor.update(Phase::Smoothing, i, n);
            if i % report_every == 0 {
                log::trace!(
                    "Smoothing {}...{}%",
                    scans.source_name,
                    (i / report_every) * 10
                );
            }
        }
        Ok(smoothed)
    }

    fn threshold_scan(&self, mzs: &[f64], intensities: &[f32]) -> Vec<SmoothedPoint> {
        mzs.iter()
            .zip(intensities.iter())
            .enumerate()
            .filter(|(_, (_, inten))| **inten >= self.minimum_height)
            .map(|(k, (mz, inten))| SmoothedPoint::new(k, *mz, *inten))
            .collect()
    }

    fn average_scan(
        &self,
        mzs: &[f64],
        intensities: &[f32],
        window: &[(Vec<f64>, Vec<f32>)],
        mz_window: f64,
    ) -> Vec<SmoothedPoint> {
        let mut points = Vec::new();
        for (k, (mz, inten)) in mzs.iter().copied().zip(intensities.iter().copied()).enumerate() {
            if inten <= 0.0 {
                continue;
            }
            let mut total = 0.0f64;
            let mut count = 0usize;
            for (neighbor_mzs, neighbor_intensities) in window {
                if let Some(j) = nearest_within(neighbor_mzs, mz, mz_window) {
                    let neighbor = neighbor_intensities[j];
                    if neighbor > 0.0 {
                        total += neighbor as f64;
                        count += 1;
                    }
                }
            }
            let average = if count > 0 {
                (total / count as f64) as f32
            } else {
                0.0
            };
            if average >= self.minimum_height {
                points.push(SmoothedPoint::new(k, mz, average));
            }
        }
        points
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mzpeaks::{CentroidPeak, MZPeakSetType};

    use crate::progress::CancellationFlag;

    fn make_map(rows: &[&[(f64, f32)]], spacing: f64) -> ScanMap<CentroidPeak> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let peaks: MZPeakSetType<CentroidPeak> = row
                    .iter()
                    .map(|(mz, inten)| CentroidPeak::new(*mz, *inten, 0))
                    .collect();
                (i as f64 * spacing, peaks)
            })
            .collect()
    }

    #[test]
    fn test_window() {
        let smoother = TimeSmoother::new(0.05, 0.05, 0.0);
        let times: Vec<f64> = (0..10).map(|i| i as f64 * 0.01).collect();
        assert_eq!(smoother.window_of(&times, 5), (3, 7));
        assert_eq!(smoother.window_of(&times, 0), (0, 2));
        assert_eq!(smoother.window_of(&times, 9), (7, 9));
    }

    #[test]
    fn test_nearest_match_average() {
        let map = make_map(
            &[
                &[(100.0, 30.0), (200.0, 10.0)],
                &[(100.01, 60.0), (200.5, 10.0)],
                &[(99.99, 90.0)],
            ],
            0.01,
        );
        let smoother = TimeSmoother::new(0.05, 0.05, 20.0);
        let points = smoother.smooth(&map, &()).unwrap();
        assert_eq!(points.len(), 3);
        // The middle scan sees all three neighbors
        assert_eq!(points[1].len(), 1);
        assert!((points[1][0].intensity - 60.0).abs() < 1e-4);
        assert_eq!(points[1][0].mz, 100.01);
        // 200 has no neighbors within the window in other scans and stays at 10
        assert!(points[0].iter().all(|p| p.mz < 150.0));
    }

    #[test]
    fn test_zero_span_is_threshold() {
        let map = make_map(&[&[(100.0, 30.0), (200.0, 10.0)], &[(100.0, 5.0)]], 0.01);
        let smoother = TimeSmoother::new(0.0, 0.05, 20.0);
        let points = smoother.smooth(&map, &()).unwrap();
        assert_eq!(points[0], vec![SmoothedPoint::new(0, 100.0, 30.0)]);
        assert!(points[1].is_empty());
    }

    #[test]
    fn test_canceled() {
        let map = make_map(&[&[(100.0, 30.0)]], 0.01);
        let flag = CancellationFlag::new();
        flag.cancel();
        let smoother = TimeSmoother::new(0.05, 0.05, 20.0);
        assert!(matches!(smoother.smooth(&map, &flag), Err(GridMassError::Canceled)));
    }
}
