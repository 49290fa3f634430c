//! The region-of-interest index: every retained, smoothed data point of a run stored
//! in one flat arena, grouped by scan and sorted by m/z within each scan.
use std::ops::RangeInclusive;

use mzpeaks::{prelude::*, CentroidLike};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::gridmass::GridMassError;
use crate::progress::{should_check, Phase, ProgressMonitor};
use crate::scan_map::ScanMap;
use crate::search::find_first_by;
use crate::smooth::SmoothedPoint;

/// Identifies a spot. Zero is reserved for "not assigned to any spot".
pub type SpotId = usize;

/// The [`SpotId`] of a datum no spot has claimed
pub const UNASSIGNED: SpotId = 0;

/// A retained, smoothed measurement along with the raw peak it was derived from
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Datum {
    pub mz: f64,
    /// The smoothed intensity
    pub intensity: f32,
    pub scan_index: usize,
    pub original_mz: f64,
    pub original_intensity: f32,
}

impl Datum {
    pub fn new(
        mz: f64,
        intensity: f32,
        scan_index: usize,
        original_mz: f64,
        original_intensity: f32,
    ) -> Self {
        Self {
            mz,
            intensity,
            scan_index,
            original_mz,
            original_intensity,
        }
    }
}

/// Represents a coordinate in a [`RoiIndex`], a specific datum in a specific scan
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DatumIndex {
    pub scan_index: usize,
    /// The position of the datum within its scan
    pub position: usize,
}

impl DatumIndex {
    pub fn new(scan_index: usize, position: usize) -> Self {
        Self {
            scan_index,
            position,
        }
    }
}

/// A flat arena of [`Datum`] with a parallel array of spot assignments.
///
/// The datums of scan `i` occupy `data[offsets[i]..offsets[i + 1]]` in ascending m/z
/// order. Only the spot assignments change after construction.
#[derive(Debug, Clone, Default)]
pub struct RoiIndex {
    data: Vec<Datum>,
    offsets: Vec<usize>,
    spot_ids: Vec<SpotId>,
}

impl RoiIndex {
    /// Build an index from per-scan lists of points, each in ascending m/z order
    pub fn new(scans: Vec<Vec<Datum>>) -> Self {
        let total: usize = scans.iter().map(|s| s.len()).sum();
        let mut data = Vec::with_capacity(total);
        let mut offsets = Vec::with_capacity(scans.len() + 1);
        offsets.push(0);
        for scan in scans {
            data.extend(scan);
            offsets.push(data.len());
        }
        let spot_ids = vec![UNASSIGNED; data.len()];
        Self {
            data,
            offsets,
            spot_ids,
        }
    }

    /// Build an index from the output of [`TimeSmoother`](crate::smooth::TimeSmoother),
    /// keeping the points of scans enabled in `scan_mask` whose smoothed intensity is at
    /// least `minimum_height`.
    pub fn from_smoothed<C: CentroidLike, M: ProgressMonitor + ?Sized>(
        scans: &ScanMap<C>,
        smoothed: Vec<Vec<SmoothedPoint>>,
        scan_mask: &[bool],
        minimum_height: f32,
        monitor: &M,
    ) -> Result<Self, GridMassError> {
        let n = smoothed.len();
        let mut passed = 0usize;
        let mut not_passed = 0usize;
        let mut rows = Vec::with_capacity(n);
        for (i, points) in smoothed.into_iter().enumerate() {
            if should_check(i) && monitor.is_canceled() {
                return Err(GridMassError::Canceled);
            }
            if !scan_mask.get(i).copied().unwrap_or(true) {
                rows.push(Vec::new());
                continue;
            }
            let peaks = &scans.peak_table()[i];
            let mut row = Vec::with_capacity(points.len());
            for point in points {
                if point.intensity >= minimum_height {
                    let raw = &peaks[point.index];
                    row.push(Datum::new(
                        point.mz,
                        point.intensity,
                        i,
                        raw.mz(),
                        raw.intensity(),
                    ));
                    passed += 1;
                } else {
                    not_passed += 1;
                }
            }
            rows.push(row);
            monitor.update(Phase::RegionsOfInterest, i, n);
        }
        let total = passed + not_passed;
        if total > 0 {
            log::info!(
                "{passed} intensities >= {minimum_height} of {total} ({:.2}%) on {}",
                passed as f64 * 100.0 / total as f64,
                scans.source_name
            );
        }
        Ok(Self::new(rows))
    }

    /// The number of scans covered, including empty ones
    pub fn num_scans(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// The total number of datums stored
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The datums of scan `scan_index` in ascending m/z order
    pub fn scan(&self, scan_index: usize) -> &[Datum] {
        &self.data[self.offsets[scan_index]..self.offsets[scan_index + 1]]
    }

    /// Translate a (scan, position) coordinate into an arena offset
    pub fn flat_index(&self, index: DatumIndex) -> usize {
        self.offsets[index.scan_index] + index.position
    }

    /// Translate an arena offset into a (scan, position) coordinate
    pub fn datum_index(&self, flat_index: usize) -> DatumIndex {
        let scan_index = self.offsets.partition_point(|o| *o <= flat_index) - 1;
        DatumIndex::new(scan_index, flat_index - self.offsets[scan_index])
    }

    pub fn datum(&self, flat_index: usize) -> &Datum {
        &self.data[flat_index]
    }

    pub fn spot_id(&self, flat_index: usize) -> SpotId {
        self.spot_ids[flat_index]
    }

    pub fn set_spot_id(&mut self, flat_index: usize, spot_id: SpotId) {
        self.spot_ids[flat_index] = spot_id;
    }

    /// Rewrite every spot assignment through `f`
    pub fn relabel<F: FnMut(SpotId) -> SpotId>(&mut self, mut f: F) {
        for id in self.spot_ids.iter_mut() {
            if *id != UNASSIGNED {
                *id = f(*id);
            }
        }
    }

    /// The position of the first datum in scan `scan_index` with m/z at least `mz`.
    /// Equal to the scan's length if there is no such datum.
    pub fn find_first_mass(&self, scan_index: usize, mz: f64) -> usize {
        find_first_by(self.scan(scan_index), mz, |d| d.mz)
    }

    /// The smallest and largest m/z of any datum, or `None` when empty
    pub fn mass_range(&self) -> Option<(f64, f64)> {
        if self.data.is_empty() {
            return None;
        }
        Some(self.data.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
            (lo.min(d.mz), hi.max(d.mz))
        }))
    }

    /// Iterate over the arena offsets of every datum in the scans of `scans` with m/z
    /// in `[mz_low, mz_high]`, visiting scans in ascending order and datums within a
    /// scan in ascending m/z order. Scans beyond the end of the index are skipped.
    pub fn window(
        &self,
        scans: RangeInclusive<usize>,
        mz_low: f64,
        mz_high: f64,
    ) -> impl Iterator<Item = usize> + '_ {
        let end = (*scans.end()).min(self.num_scans().saturating_sub(1));
        let start = *scans.start();
        let scans = if self.num_scans() == 0 { 1..=0 } else { start..=end };
        scans.flat_map(move |scan_index| {
            let offset = self.offsets[scan_index];
            let first = self.find_first_mass(scan_index, mz_low);
            self.scan(scan_index)[first..]
                .iter()
                .take_while(move |d| d.mz <= mz_high)
                .enumerate()
                .map(move |(i, _)| offset + first + i)
        })
    }
}
