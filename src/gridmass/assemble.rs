//! Turn accepted spots into chromatographic features built from the raw data.
use std::fmt::{self, Display};

use mzpeaks::{feature::Feature, feature_map::FeatureMap, Time, MZ};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::arrayops::{median, minmax, trapz};
use crate::params::TimeRange;

use super::roi::{RoiIndex, SpotId};
use super::spot::{Rejection, Spot, SpotEvaluation};

/// Chromatograms integrating to this area or less are discarded
pub const MINIMUM_AREA: f64 = 1e-6;

/// One raw data point of a feature's chromatogram
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChromatogramPoint {
    pub scan_index: usize,
    pub time: f64,
    pub mz: f64,
    pub intensity: f32,
}

/// A description of the spot a feature was built from
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpotSummary {
    pub spot_id: SpotId,
    pub apex_mz: f64,
    pub apex_time: f64,
    /// The smoothed intensity at the apex
    pub apex_intensity: f32,
    pub probe_count: usize,
    pub data_scans: usize,
    pub contiguous_scans: usize,
    pub contiguous_ratio: f64,
}

impl Display for SpotSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Spot {} {:.4} m/z @ {:.3} min ({:.1}), probes={}, data scans={}, contiguous={} ({:.2})",
            self.spot_id,
            self.apex_mz,
            self.apex_time,
            self.apex_intensity,
            self.probe_count,
            self.data_scans,
            self.contiguous_scans,
            self.contiguous_ratio
        )
    }
}

/// A chromatographic peak found by the grid-probing detector.
///
/// Every point carries the original, unsmoothed m/z and intensity of the data file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridFeature {
    pub source_name: String,
    /// The chromatogram in scan order
    pub points: Vec<ChromatogramPoint>,
    /// The median m/z of the chromatogram's points
    pub mz: f64,
    /// The time of the most intense point
    pub apex_time: f64,
    /// The intensity of the most intense point
    pub height: f32,
    /// The chromatogram integrated over retention time in minutes
    pub area: f64,
    pub rt_range: TimeRange,
    pub summary: SpotSummary,
}

impl GridFeature {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The retention time span in minutes
    pub fn duration(&self) -> f64 {
        self.rt_range.end - self.rt_range.start
    }

    /// Copy the chromatogram into an [`mzpeaks`] feature
    pub fn to_feature(&self) -> Feature<MZ, Time> {
        let mut feature = Feature::default();
        for point in self.points.iter() {
            feature.push_raw(point.mz, point.time, point.intensity);
        }
        feature
    }
}

impl Display for GridFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GridFeature({:.4} m/z, {:.3}-{:.3} min, apex {:.3}, height {:.1}, area {:.3}, {} points)",
            self.mz,
            self.rt_range.start,
            self.rt_range.end,
            self.apex_time,
            self.height,
            self.area,
            self.len()
        )
    }
}

/// The features detected in one data file
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureList {
    /// `"<source name> <suffix>"`
    pub name: String,
    pub source_name: String,
    pub features: Vec<GridFeature>,
}

impl FeatureList {
    pub fn new(source_name: &str, suffix: &str, features: Vec<GridFeature>) -> Self {
        Self {
            name: format!("{source_name} {suffix}"),
            source_name: source_name.to_string(),
            features,
        }
    }

    /// The number of accepted peaks
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GridFeature> {
        self.features.iter()
    }

    /// Convert every feature into an [`mzpeaks`] feature and collect them into a
    /// [`FeatureMap`], which orders them by m/z
    pub fn into_feature_map(self) -> FeatureMap<MZ, Time, Feature<MZ, Time>> {
        FeatureMap::new(self.features.iter().map(|f| f.to_feature()).collect())
    }
}

impl IntoIterator for FeatureList {
    type Item = GridFeature;
    type IntoIter = std::vec::IntoIter<GridFeature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureList {
    type Item = &'a GridFeature;
    type IntoIter = std::slice::Iter<'a, GridFeature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

/// Builds [`GridFeature`]s from accepted spots
#[derive(Debug, Clone, Copy)]
pub struct PeakAssembler<'a> {
    pub source_name: &'a str,
    pub time_axis: &'a [f64],
    pub minimum_height: f32,
}

impl<'a> PeakAssembler<'a> {
    pub fn new(source_name: &'a str, time_axis: &'a [f64], minimum_height: f32) -> Self {
        Self {
            source_name,
            time_axis,
            minimum_height,
        }
    }

    /// Build the chromatogram of `spot` from the raw values behind the per-scan maxima
    /// in `evaluation`
    pub fn assemble(
        &self,
        roi: &RoiIndex,
        spot: &Spot,
        evaluation: &SpotEvaluation,
    ) -> Result<GridFeature, Rejection> {
        let points: Vec<ChromatogramPoint> = evaluation
            .max_datums
            .iter()
            .map(|idx| {
                let datum = roi.datum(*idx);
                ChromatogramPoint {
                    scan_index: datum.scan_index,
                    time: self.time_axis[datum.scan_index],
                    mz: datum.original_mz,
                    intensity: datum.original_intensity,
                }
            })
            .collect();

        let times: Vec<f64> = points.iter().map(|p| p.time).collect();
        let intensities: Vec<f64> = points.iter().map(|p| p.intensity as f64).collect();
        let area = trapz(&times, &intensities);
        if area <= MINIMUM_AREA {
            return Err(Rejection::Area);
        }

        let apex = points
            .iter()
            .fold(None, |best: Option<&ChromatogramPoint>, p| match best {
                Some(b) if b.intensity >= p.intensity => Some(b),
                _ => Some(p),
            })
            .ok_or(Rejection::Area)?;
        if apex.intensity < self.minimum_height {
            return Err(Rejection::Height);
        }

        let mzs: Vec<f64> = points.iter().map(|p| p.mz).collect();
        let (start, end) = minmax(&times);
        let summary = SpotSummary {
            spot_id: spot.id,
            apex_mz: spot.apex.mz,
            apex_time: self.time_axis[spot.apex.scan_index],
            apex_intensity: spot.apex.intensity,
            probe_count: spot.len(),
            data_scans: evaluation.data_scans,
            contiguous_scans: evaluation.contiguous_scans,
            contiguous_ratio: evaluation.contiguous_ratio(),
        };
        Ok(GridFeature {
            source_name: self.source_name.to_string(),
            mz: median(&mzs).unwrap_or(spot.apex.mz),
            apex_time: apex.time,
            height: apex.intensity,
            area,
            rt_range: TimeRange::new(start, end),
            summary,
            points,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mzpeaks::prelude::*;
    use crate::gridmass::probe::ProbeSeed;
    use crate::gridmass::roi::Datum;
    use crate::gridmass::spot::Apex;

    fn make_spot(roi: &mut RoiIndex) -> (Spot, SpotEvaluation) {
        let mut spot = Spot::new(
            1,
            Apex {
                mz: 250.0,
                scan_index: 2,
                intensity: 70.0,
            },
        );
        spot.probes.push(ProbeSeed::new(250.0, 2));
        spot.bounds.include(250.0, 0);
        spot.bounds.include(250.0, 4);
        for i in 0..roi.len() {
            roi.set_spot_id(i, 1);
        }
        let evaluation = SpotEvaluation {
            max_datums: (0..roi.len()).collect(),
            data_scans: roi.len(),
            contiguous_scans: roi.len(),
        };
        (spot, evaluation)
    }

    #[test]
    fn test_assemble_uses_raw_values() {
        let raw = [10.0, 40.0, 100.0, 40.0, 10.0];
        let mut roi = RoiIndex::new(
            raw.iter()
                .enumerate()
                .map(|(i, r)| vec![Datum::new(250.0, 70.0, i, 250.0 + i as f64 * 0.001, *r)])
                .collect(),
        );
        let (spot, evaluation) = make_spot(&mut roi);
        let times = [1.0, 1.1, 1.2, 1.3, 1.4];
        let assembler = PeakAssembler::new("sample.mzML", &times, 20.0);
        let feature = assembler.assemble(&roi, &spot, &evaluation).unwrap();

        assert_eq!(feature.len(), 5);
        assert_eq!(feature.height, 100.0);
        assert!((feature.apex_time - 1.2).abs() < 1e-12);
        assert!((feature.mz - 250.002).abs() < 1e-9);
        assert!((feature.area - 19.0).abs() < 1e-9);
        assert!((feature.duration() - 0.4).abs() < 1e-9);
        assert_eq!(feature.points[0].intensity, 10.0);
        assert_eq!(feature.summary.probe_count, 1);

        let converted = feature.to_feature();
        assert_eq!(converted.len(), 5);
    }

    #[test]
    fn test_assemble_rejects_degenerate() {
        let mut roi = RoiIndex::new(vec![vec![Datum::new(250.0, 70.0, 0, 250.0, 50.0)]]);
        let (spot, evaluation) = make_spot(&mut roi);
        let times = [1.0];
        let assembler = PeakAssembler::new("sample.mzML", &times, 20.0);
        assert_eq!(assembler.assemble(&roi, &spot, &evaluation), Err(Rejection::Area));

        let mut roi = RoiIndex::new(vec![
            vec![Datum::new(250.0, 70.0, 0, 250.0, 5.0)],
            vec![Datum::new(250.0, 70.0, 1, 250.0, 6.0)],
        ]);
        let (spot, evaluation) = make_spot(&mut roi);
        let times = [1.0, 1.1];
        let assembler = PeakAssembler::new("sample.mzML", &times, 20.0);
        assert_eq!(assembler.assemble(&roi, &spot, &evaluation), Err(Rejection::Height));
    }

    #[test]
    fn test_feature_list() {
        let list = FeatureList::new("sample.mzML", "gridmass", Vec::new());
        assert_eq!(list.name, "sample.mzML gridmass");
        assert!(list.is_empty());
        assert_eq!(list.into_feature_map().len(), 0);
    }
}
