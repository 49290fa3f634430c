//! The sparse retention time × m/z table a feature detector consumes.
use mzpeaks::{prelude::*, CentroidLike, MZPeakSetType};

use crate::gridmass::GridMassError;

/// A sparse matrix of centroided peaks over retention time, one row per scan.
///
/// Rows are kept in insertion order. Their ordering is not checked until
/// [`ScanMap::validate`] is called, which every detector does before doing any work.
#[derive(Debug, Clone)]
pub struct ScanMap<C: CentroidLike> {
    /// The name of the data file these scans were read from
    pub source_name: String,
    /// The retention time of each row, in minutes
    pub time_axis: Vec<f64>,
    /// The MS level of each row
    pub ms_levels: Vec<u8>,
    /// The instrument's scan number for each row, used to report problems
    pub scan_numbers: Vec<usize>,
    /// The peaks of each row, sorted by m/z
    pub peak_table: Vec<MZPeakSetType<C>>,
}

impl<C: CentroidLike> Default for ScanMap<C> {
    fn default() -> Self {
        Self {
            source_name: String::new(),
            time_axis: Vec::new(),
            ms_levels: Vec::new(),
            scan_numbers: Vec::new(),
            peak_table: Vec::new(),
        }
    }
}

impl<C: CentroidLike> ScanMap<C> {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            ..Default::default()
        }
    }

    /// Append a scan to the end of the map
    pub fn push(&mut self, scan_number: usize, time: f64, ms_level: u8, peaks: MZPeakSetType<C>) {
        self.scan_numbers.push(scan_number);
        self.time_axis.push(time);
        self.ms_levels.push(ms_level);
        self.peak_table.push(peaks);
    }

    pub fn len(&self) -> usize {
        self.time_axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_axis.is_empty()
    }

    pub fn time_axis(&self) -> &[f64] {
        &self.time_axis
    }

    pub fn peak_table(&self) -> &[MZPeakSetType<C>] {
        &self.peak_table
    }

    /// Iterate over the peaks in row `scan_index`
    ///
    /// This function panics if `scan_index` is out of bounds
    pub fn iter_at_index(&self, scan_index: usize) -> impl Iterator<Item = &C> {
        self.peak_table[scan_index].iter()
    }

    /// Check that the map is usable by a detector: it must hold at least one scan,
    /// all scans must share one MS level, and retention time must never decrease.
    pub fn validate(&self) -> Result<(), GridMassError> {
        if self.is_empty() {
            return Err(GridMassError::EmptyScanSet);
        }

        let mut levels: Vec<u8> = self.ms_levels.clone();
        levels.sort_unstable();
        levels.dedup();
        if levels.len() > 1 {
            return Err(GridMassError::MixedMSLevels(levels));
        }

        let mut previous = f64::NEG_INFINITY;
        for (i, time) in self.time_axis.iter().copied().enumerate() {
            if time < previous {
                return Err(GridMassError::NonMonotonicTime {
                    scan_number: self.scan_numbers[i],
                    time,
                    previous,
                });
            }
            previous = time;
        }
        Ok(())
    }

    /// The average retention time covered per scan, `(max - min) / N`
    pub fn average_time_spacing(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let (lo, hi) = crate::arrayops::minmax(&self.time_axis);
        (hi - lo) / self.len() as f64
    }

    /// Copy the m/z and intensity arrays of row `scan_index` out of the peak table
    pub(crate) fn arrays_at(&self, scan_index: usize) -> (Vec<f64>, Vec<f32>) {
        self.iter_at_index(scan_index)
            .map(|p| (p.mz(), p.intensity()))
            .unzip()
    }
}

/// A [`ScanMap`] can be built from an iterator of MS1 (time, peak list) rows. The rows
/// are numbered sequentially from zero.
impl<C: CentroidLike> FromIterator<(f64, MZPeakSetType<C>)> for ScanMap<C> {
    fn from_iter<T: IntoIterator<Item = (f64, MZPeakSetType<C>)>>(iter: T) -> Self {
        let mut this = Self::default();
        for (i, (time, peaks)) in iter.into_iter().enumerate() {
            this.push(i, time, 1, peaks);
        }
        this
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mzpeaks::CentroidPeak;

    fn row(mzs: &[f64]) -> MZPeakSetType<CentroidPeak> {
        mzs.iter()
            .map(|mz| CentroidPeak::new(*mz, 100.0, 0))
            .collect()
    }

    #[test]
    fn test_validate() {
        let empty: ScanMap<CentroidPeak> = ScanMap::new("empty");
        assert!(matches!(empty.validate(), Err(GridMassError::EmptyScanSet)));

        let ok: ScanMap<CentroidPeak> = [(0.0, row(&[100.0])), (0.0, row(&[101.0])), (0.5, row(&[]))]
            .into_iter()
            .collect();
        assert!(ok.validate().is_ok());
        assert!((ok.average_time_spacing() - 0.5 / 3.0).abs() < 1e-12);

        let mut bad: ScanMap<CentroidPeak> = ScanMap::new("bad");
        bad.push(10, 1.0, 1, row(&[100.0]));
        bad.push(11, 1.1, 1, row(&[100.0]));
        bad.push(12, 0.9, 1, row(&[100.0]));
        match bad.validate() {
            Err(GridMassError::NonMonotonicTime { scan_number, .. }) => assert_eq!(scan_number, 12),
            other => panic!("Expected a time ordering error, got {other:?}"),
        }

        let mut mixed: ScanMap<CentroidPeak> = ScanMap::new("mixed");
        mixed.push(1, 1.0, 1, row(&[100.0]));
        mixed.push(2, 1.1, 2, row(&[100.0]));
        assert!(matches!(mixed.validate(), Err(GridMassError::MixedMSLevels(_))));
    }

    #[test]
    fn test_arrays_sorted() {
        let map: ScanMap<CentroidPeak> = [(0.0, row(&[300.0, 100.0, 200.0]))].into_iter().collect();
        let (mzs, ints) = map.arrays_at(0);
        assert_eq!(mzs, vec![100.0, 200.0, 300.0]);
        assert_eq!(ints.len(), 3);
    }
}
