//! Synthetic LC-MS maps for tests, benchmarks and the demo binary.
use mzpeaks::{CentroidPeak, MZPeakSetType};

use crate::scan_map::ScanMap;

/// A chromatographic signal with a Gaussian elution profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianSignal {
    pub mz: f64,
    /// The scan at which the signal is most intense
    pub center_scan: f64,
    pub height: f32,
    /// The standard deviation of the elution profile, in scans
    pub width_scans: f64,
}

impl GaussianSignal {
    pub fn new(mz: f64, center_scan: f64, height: f32, width_scans: f64) -> Self {
        Self {
            mz,
            center_scan,
            height,
            width_scans,
        }
    }

    pub fn intensity_at(&self, scan_index: usize) -> f32 {
        let d = (scan_index as f64 - self.center_scan) / self.width_scans;
        (self.height as f64 * (-0.5 * d * d).exp()) as f32
    }
}

/// Raw m/z readings wander a little from scan to scan. This is the offset applied
/// at `scan_index`.
pub fn mz_jitter(scan_index: usize) -> f64 {
    [-0.001, 0.0, 0.001][scan_index % 3]
}

fn build_map<F: FnMut(usize) -> Vec<(f64, f32)>>(
    name: &str,
    n_scans: usize,
    spacing: f64,
    mut row: F,
) -> ScanMap<CentroidPeak> {
    let mut map = ScanMap::new(name);
    for i in 0..n_scans {
        let peaks: MZPeakSetType<CentroidPeak> = row(i)
            .into_iter()
            .filter(|(_, inten)| *inten > 0.0)
            .map(|(mz, inten)| CentroidPeak::new(mz, inten, 0))
            .collect();
        map.push(i, i as f64 * spacing, 1, peaks);
    }
    map
}

/// `n_scans` MS1 scans `spacing` minutes apart holding the sum of `signals`
pub fn gaussian_map(n_scans: usize, spacing: f64, signals: &[GaussianSignal]) -> ScanMap<CentroidPeak> {
    build_map("gaussian.mzML", n_scans, spacing, |i| {
        signals
            .iter()
            .map(|s| (s.mz + mz_jitter(i), s.intensity_at(i)))
            .collect()
    })
}

/// A single trace of constant intensity present in every scan
pub fn constant_map(n_scans: usize, spacing: f64, mz: f64, intensity: f32) -> ScanMap<CentroidPeak> {
    build_map("constant.mzML", n_scans, spacing, |_| vec![(mz, intensity)])
}

/// A trace that is `high` on every `period`-th scan of `scans` and `low` elsewhere
pub fn sparse_map(
    n_scans: usize,
    spacing: f64,
    mz: f64,
    scans: std::ops::Range<usize>,
    period: usize,
    high: f32,
    low: f32,
) -> ScanMap<CentroidPeak> {
    build_map("sparse.mzML", n_scans, spacing, |i| {
        let intensity = if scans.contains(&i) && (i - scans.start) % period == 0 {
            high
        } else {
            low
        };
        vec![(mz, intensity)]
    })
}

/// A busier map for benchmarking: `n_signals` Gaussian signals spread over m/z and time
/// on top of a deterministic low-level noise floor
pub fn crowded_map(n_scans: usize, spacing: f64, n_signals: usize) -> ScanMap<CentroidPeak> {
    let signals: Vec<GaussianSignal> = (0..n_signals)
        .map(|k| {
            GaussianSignal::new(
                200.0 + k as f64 * 7.31,
                ((k * 37) % n_scans.max(1)) as f64,
                1000.0 + (k % 7) as f32 * 500.0,
                3.0 + (k % 4) as f64,
            )
        })
        .collect();
    let mut state: u64 = 0x2545F4914F6CDD1D;
    build_map("crowded.mzML", n_scans, spacing, move |i| {
        let mut row: Vec<(f64, f32)> = signals
            .iter()
            .map(|s| (s.mz + mz_jitter(i), s.intensity_at(i)))
            .collect();
        for _ in 0..50 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let mz = 150.0 + (state % 100_000) as f64 / 100.0;
            let intensity = (state >> 40) as f32 % 300.0;
            row.push((mz, intensity));
        }
        row
    })
}
