//! Configuration for the grid-probing feature detector.
use std::fmt::{self, Display};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::gridmass::GridMassError;

/// How much per-spot diagnostic detail to log
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DebugLevel {
    #[default]
    None,
    /// Report every accepted or rejected spot
    Basic,
    /// Also describe each accepted spot in full
    Final,
    /// Also report every merge and artifact removal
    All,
}

impl FromStr for DebugLevel {
    type Err = GridMassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "no" => Ok(Self::None),
            "basic" => Ok(Self::Basic),
            "final" => Ok(Self::Final),
            "all" => Ok(Self::All),
            _ => Err(GridMassError::InvalidParameter {
                name: "debug_level",
                value: s.to_string(),
            }),
        }
    }
}

/// A closed interval of retention time in minutes. Both edges are included.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Retention time ranges whose scans are left out of feature detection.
///
/// Parses from a comma separated list of `start-end` pairs, e.g. `"1.5-2.0, 10-12"`.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IgnoredTimes {
    pub ranges: Vec<TimeRange>,
}

impl IgnoredTimes {
    pub fn new(ranges: Vec<TimeRange>) -> Self {
        Self { ranges }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, time: f64) -> bool {
        self.ranges.iter().any(|r| r.contains(time))
    }

    /// Build a mask over `time_axis` that is `true` for every scan not covered by any range
    pub fn scan_mask(&self, time_axis: &[f64]) -> Vec<bool> {
        time_axis.iter().map(|t| !self.contains(*t)).collect()
    }
}

impl FromStr for IgnoredTimes {
    type Err = GridMassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for token in s.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (start, end) = token
                .split_once('-')
                .ok_or_else(|| GridMassError::InvalidTimeRange(token.to_string()))?;
            let start: f64 = start
                .trim()
                .parse()
                .map_err(|_| GridMassError::InvalidTimeRange(token.to_string()))?;
            let end: f64 = end
                .trim()
                .parse()
                .map_err(|_| GridMassError::InvalidTimeRange(token.to_string()))?;
            if end < start {
                return Err(GridMassError::InvalidTimeRange(token.to_string()));
            }
            ranges.push(TimeRange::new(start, end));
        }
        Ok(Self::new(ranges))
    }
}

/// The parameters of [`GridMassExtracter`](crate::GridMassExtracter)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridMassParams {
    /// The m/z distance within which two local maxima may belong to the same feature
    pub mz_tolerance: f64,
    /// The shortest retention time span in minutes a feature may cover
    pub min_time_span: f64,
    /// The longest retention time span in minutes a feature may cover. Longer
    /// signals are treated as background.
    pub max_time_span: f64,
    /// The smallest intensity a data point may have to be used
    pub minimum_height: f32,
    /// The width of the retention time smoothing window in minutes
    pub smoothing_time_span: f64,
    /// The m/z window searched for a matching point in neighboring scans when smoothing
    pub smoothing_mz_window: f64,
    /// The min/max apex intensity ratio above which neighboring maxima are joined
    pub intensity_similarity: f64,
    /// Scans whose retention time falls in these ranges contribute no data
    pub ignore_times: IgnoredTimes,
    pub debug_level: DebugLevel,
    /// Appended to the data file's name to name the feature list
    pub suffix: String,
}

impl Default for GridMassParams {
    fn default() -> Self {
        Self {
            mz_tolerance: 0.05,
            min_time_span: 0.1,
            max_time_span: 3.0,
            minimum_height: 5000.0,
            smoothing_time_span: 0.05,
            smoothing_mz_window: 0.05,
            intensity_similarity: 0.5,
            ignore_times: IgnoredTimes::default(),
            debug_level: DebugLevel::None,
            suffix: "gridmass".to_string(),
        }
    }
}

impl GridMassParams {
    pub fn builder() -> GridMassParamsBuilder {
        GridMassParamsBuilder::new()
    }

    /// Check that the parameters describe a usable search
    pub fn validate(&self) -> Result<(), GridMassError> {
        fn invalid(name: &'static str, value: impl Display) -> GridMassError {
            GridMassError::InvalidParameter {
                name,
                value: value.to_string(),
            }
        }

        if !(self.mz_tolerance >= 0.0) {
            return Err(invalid("mz_tolerance", self.mz_tolerance));
        }
        if !(self.min_time_span >= 0.0) {
            return Err(invalid("min_time_span", self.min_time_span));
        }
        if !(self.max_time_span >= self.min_time_span) {
            return Err(invalid("max_time_span", self.max_time_span));
        }
        if !(self.minimum_height >= 0.0) {
            return Err(invalid("minimum_height", self.minimum_height));
        }
        if !(self.smoothing_time_span >= 0.0) {
            return Err(invalid("smoothing_time_span", self.smoothing_time_span));
        }
        if !(self.smoothing_mz_window >= 0.0) {
            return Err(invalid("smoothing_mz_window", self.smoothing_mz_window));
        }
        if !(0.0..=1.0).contains(&self.intensity_similarity) {
            return Err(invalid("intensity_similarity", self.intensity_similarity));
        }
        Ok(())
    }

    /// Derive the scan- and grid-level tolerances for a run whose scans are
    /// `scan_spacing` minutes apart on average
    pub fn derive_tolerances(&self, scan_spacing: f64) -> DerivedTolerances {
        let scans_for = |span: f64| -> usize {
            if scan_spacing > 0.0 {
                ((span / scan_spacing) as usize).max(2)
            } else {
                2
            }
        };
        let tolerance_scans = scans_for(self.min_time_span);
        let max_tolerance_scans = scans_for(self.max_time_span);
        let by_mass = (self.mz_tolerance * 2.0).max(1e-6);
        let by_scan = (tolerance_scans / 4).max(1);
        DerivedTolerances {
            scan_spacing,
            tolerance_scans,
            max_tolerance_scans,
            critical_scans: (tolerance_scans / 2).max(1),
            by_mass,
            by_scan,
            mass_radius: by_mass / 2.0,
            scan_radius: by_scan.saturating_sub(1).max(2),
        }
    }
}

/// Scan and m/z distances derived from [`GridMassParams`] and the scan spacing of one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedTolerances {
    /// Average retention time per scan in minutes
    pub scan_spacing: f64,
    /// The fewest scans a feature may span
    pub tolerance_scans: usize,
    /// The scan distance within which similar spots count toward the same background trace
    pub max_tolerance_scans: usize,
    /// The scan gap across which spots may still be merged
    pub critical_scans: usize,
    /// The probe grid's m/z spacing
    pub by_mass: f64,
    /// The probe grid's scan spacing
    pub by_scan: usize,
    /// The m/z half-width of the relaxation window
    pub mass_radius: f64,
    /// The scan half-width of the relaxation window
    pub scan_radius: usize,
}

/// A builder for configuring [`GridMassParams`]
#[derive(Debug, Clone, Default)]
pub struct GridMassParamsBuilder {
    params: GridMassParams,
}

impl GridMassParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mz_tolerance(&mut self, mz_tolerance: f64) -> &mut Self {
        self.params.mz_tolerance = mz_tolerance;
        self
    }

    pub fn time_span(&mut self, min_time_span: f64, max_time_span: f64) -> &mut Self {
        self.params.min_time_span = min_time_span;
        self.params.max_time_span = max_time_span;
        self
    }

    pub fn minimum_height(&mut self, minimum_height: f32) -> &mut Self {
        self.params.minimum_height = minimum_height;
        self
    }

    pub fn smoothing(&mut self, smoothing_time_span: f64, smoothing_mz_window: f64) -> &mut Self {
        self.params.smoothing_time_span = smoothing_time_span;
        self.params.smoothing_mz_window = smoothing_mz_window;
        self
    }

    pub fn intensity_similarity(&mut self, intensity_similarity: f64) -> &mut Self {
        self.params.intensity_similarity = intensity_similarity;
        self
    }

    pub fn ignore_times(&mut self, ignore_times: IgnoredTimes) -> &mut Self {
        self.params.ignore_times = ignore_times;
        self
    }

    pub fn debug_level(&mut self, debug_level: DebugLevel) -> &mut Self {
        self.params.debug_level = debug_level;
        self
    }

    pub fn suffix(&mut self, suffix: impl Into<String>) -> &mut Self {
        self.params.suffix = suffix.into();
        self
    }

    /// Validate and produce the configured parameters
    pub fn build(&self) -> Result<GridMassParams, GridMassError> {
        self.params.validate()?;
        Ok(self.params.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ignored_times_parse() {
        let times: IgnoredTimes = "1.5-2.0, 10 - 12,".parse().unwrap();
        assert_eq!(times.ranges.len(), 2);
        assert!(times.contains(1.5));
        assert!(times.contains(2.0));
        assert!(times.contains(11.0));
        assert!(!times.contains(2.0001));
        assert!(!times.contains(1.4999));

        let mask = times.scan_mask(&[1.0, 1.5, 2.0, 2.5]);
        assert_eq!(mask, vec![true, false, false, true]);

        assert!("".parse::<IgnoredTimes>().unwrap().is_empty());
        assert!(matches!(
            "1.5".parse::<IgnoredTimes>(),
            Err(GridMassError::InvalidTimeRange(_))
        ));
        assert!(matches!(
            "3-1".parse::<IgnoredTimes>(),
            Err(GridMassError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn test_builder_validates() {
        let params = GridMassParams::builder()
            .mz_tolerance(0.1)
            .time_span(0.1, 3.0)
            .minimum_height(20.0)
            .build()
            .unwrap();
        assert_eq!(params.mz_tolerance, 0.1);
        assert_eq!(params.minimum_height, 20.0);

        let err = GridMassParams::builder()
            .intensity_similarity(1.5)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            GridMassError::InvalidParameter {
                name: "intensity_similarity",
                ..
            }
        ));

        let err = GridMassParams::builder().time_span(2.0, 1.0).build().unwrap_err();
        assert!(matches!(err, GridMassError::InvalidParameter { name: "max_time_span", .. }));
    }

    #[test]
    fn test_derived_tolerances() {
        let params = GridMassParams::builder()
            .mz_tolerance(0.1)
            .time_span(0.1, 3.0)
            .build()
            .unwrap();
        let tol = params.derive_tolerances(0.0098);
        assert_eq!(tol.tolerance_scans, 10);
        assert_eq!(tol.max_tolerance_scans, 306);
        assert_eq!(tol.critical_scans, 5);
        assert_eq!(tol.by_scan, 2);
        assert_eq!(tol.scan_radius, 2);
        assert!((tol.by_mass - 0.2).abs() < 1e-12);
        assert!((tol.mass_radius - 0.1).abs() < 1e-12);

        let degenerate = params.derive_tolerances(0.0);
        assert_eq!(degenerate.tolerance_scans, 2);
        assert_eq!(degenerate.by_scan, 1);
    }

    #[test]
    fn test_debug_level_order() {
        assert!(DebugLevel::All > DebugLevel::Basic);
        assert_eq!("FINAL".parse::<DebugLevel>().unwrap(), DebugLevel::Final);
        assert!("loud".parse::<DebugLevel>().is_err());
    }
}
