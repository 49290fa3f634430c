//! Lay a regular grid of probes over the scan × m/z plane and move each one uphill
//! to the local intensity maximum it falls toward.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::gridmass::GridMassError;
use crate::params::DerivedTolerances;
use crate::progress::{should_check, Phase, ProgressMonitor};

use super::roi::RoiIndex;

/// A starting point on the probe grid
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProbeSeed {
    pub mz: f64,
    pub scan_index: usize,
}

impl ProbeSeed {
    pub fn new(mz: f64, scan_index: usize) -> Self {
        Self { mz, scan_index }
    }
}

/// The position a probe settled at after relaxation.
///
/// The converged coordinates are always those of an existing datum.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConvergedProbe {
    pub seed: ProbeSeed,
    pub mz: f64,
    pub scan_index: usize,
    pub intensity: f32,
    /// The arena offset of the datum the probe converged to
    pub datum: usize,
    /// How many times the probe jumped before settling
    pub moves: usize,
}

impl ConvergedProbe {
    /// Whether two probes converged to the same coordinate
    pub fn same_apex(&self, other: &Self) -> bool {
        self.mz == other.mz && self.scan_index == other.scan_index
    }
}

/// A regular grid of [`ProbeSeed`] over `[min_mass, max_mass] × [0, num_scans)`.
///
/// Rows are placed every `by_scan` scans, and every other row is shifted half a cell
/// toward lower m/z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeGrid {
    pub min_mass: f64,
    pub max_mass: f64,
    pub num_scans: usize,
    pub by_mass: f64,
    pub by_scan: usize,
}

impl ProbeGrid {
    pub fn new(min_mass: f64, max_mass: f64, num_scans: usize, by_mass: f64, by_scan: usize) -> Self {
        Self {
            min_mass,
            max_mass,
            num_scans,
            by_mass,
            by_scan: by_scan.max(1),
        }
    }

    /// The number of rows of probes
    pub fn num_rows(&self) -> usize {
        self.num_scans.div_ceil(self.by_scan)
    }

    /// Iterate over the seeds of row `row`
    pub fn row(&self, row: usize) -> impl Iterator<Item = ProbeSeed> + '_ {
        let scan_index = row * self.by_scan;
        let start = if row % 2 == 1 {
            self.min_mass - self.by_mass / 2.0
        } else {
            self.min_mass
        };
        (0usize..)
            .map(move |k| start + k as f64 * self.by_mass)
            .take_while(move |mz| *mz <= self.max_mass)
            .map(move |mz| ProbeSeed::new(mz, scan_index))
    }

    pub fn iter(&self) -> impl Iterator<Item = ProbeSeed> + '_ {
        (0..self.num_rows()).flat_map(move |row| self.row(row))
    }
}

/// Moves probes to their local maximum over a [`RoiIndex`] by steepest ascent.
#[derive(Debug, Clone, Copy)]
pub struct Relaxer<'a> {
    roi: &'a RoiIndex,
    pub scan_radius: usize,
    pub mass_radius: f64,
}

impl<'a> Relaxer<'a> {
    pub fn new(roi: &'a RoiIndex, scan_radius: usize, mass_radius: f64) -> Self {
        Self {
            roi,
            scan_radius,
            mass_radius,
        }
    }

    /// Find the most intense datum in the window around `(mz, scan_index)` that is
    /// strictly more intense than `floor`. Ties go to the first datum visited, which is
    /// the one with the lowest scan index, then the lowest m/z.
    fn strongest_in_window(&self, mz: f64, scan_index: usize, floor: Option<f32>) -> Option<usize> {
        let lo = scan_index.saturating_sub(self.scan_radius);
        let hi = scan_index + self.scan_radius;
        let mut best: Option<(usize, f32)> = floor.map(|f| (usize::MAX, f));
        for idx in self
            .roi
            .window(lo..=hi, mz - self.mass_radius, mz + self.mass_radius)
        {
            let intensity = self.roi.datum(idx).intensity;
            if best.map_or(true, |(_, b)| intensity > b) {
                best = Some((idx, intensity));
            }
        }
        best.map(|(idx, _)| idx).filter(|idx| *idx != usize::MAX)
    }

    /// Relax a probe starting at `seed` until no more intense datum is in reach.
    ///
    /// Returns `None` if the probe never reaches any datum. The probe only moves to a
    /// strictly more intense datum, so it can never revisit a position.
    pub fn relax(&self, seed: ProbeSeed) -> Option<ConvergedProbe> {
        if self.roi.num_scans() == 0 {
            return None;
        }
        let mut mz = seed.mz;
        let mut scan_index = seed.scan_index;
        let mut current: Option<usize> = None;
        let mut moves = 0;
        loop {
            let floor = current.map(|idx| self.roi.datum(idx).intensity);
            match self.strongest_in_window(mz, scan_index, floor) {
                Some(idx) => {
                    let datum = self.roi.datum(idx);
                    if datum.mz == mz && datum.scan_index == scan_index {
                        current = Some(idx);
                        break;
                    }
                    mz = datum.mz;
                    scan_index = datum.scan_index;
                    current = Some(idx);
                    moves += 1;
                }
                None => break,
            }
        }
        current.map(|idx| {
            let datum = self.roi.datum(idx);
            ConvergedProbe {
                seed,
                mz: datum.mz,
                scan_index: datum.scan_index,
                intensity: datum.intensity,
                datum: idx,
                moves,
            }
        })
    }
}

/// Generate the probe grid over `roi` and relax every probe, keeping those that settle
/// on a datum at least `minimum_height` intense. The survivors are returned in grid
/// order.
pub fn probe_local_maxima<M: ProgressMonitor + ?Sized>(
    roi: &RoiIndex,
    tolerances: &DerivedTolerances,
    minimum_height: f32,
    monitor: &M,
) -> Result<Vec<ConvergedProbe>, GridMassError> {
    let Some((min_mass, max_mass)) = roi.mass_range() else {
        return Ok(Vec::new());
    };
    let grid = ProbeGrid::new(
        min_mass,
        max_mass,
        roi.num_scans(),
        tolerances.by_mass,
        tolerances.by_scan,
    );
    log::info!(
        "Creating grid of probes every {:.4} m/z and {} scans",
        grid.by_mass,
        grid.by_scan
    );

    let n_rows = grid.num_rows();
    let mut seeds = Vec::new();
    for row in 0..n_rows {
        if should_check(row) && monitor.is_canceled() {
            return Err(GridMassError::Canceled);
        }
        seeds.extend(grid.row(row));
        monitor.update(Phase::ProbeGrid, row, n_rows);
    }

    let relaxer = Relaxer::new(roi, tolerances.scan_radius, tolerances.mass_radius);
    log::info!(
        "Finding local maxima for {} probes, radius: scans={}, m/z={:.4}",
        seeds.len(),
        relaxer.scan_radius,
        relaxer.mass_radius
    );
    let n = seeds.len();
    let mut converged = Vec::new();
    for (i, seed) in seeds.into_iter().enumerate() {
        if should_check(i) && monitor.is_canceled() {
            return Err(GridMassError::Canceled);
        }
        if let Some(probe) = relaxer.relax(seed) {
            if probe.intensity >= minimum_height {
                converged.push(probe);
            }
        }
        monitor.update(Phase::Relaxation, i, n);
    }
    log::debug!("{} of {} probes converged above the height floor", converged.len(), n);
    Ok(converged)
}
