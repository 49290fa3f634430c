//! `mzgridmass` detects chromatographic features in LC-MS and GC-MS runs by laying a
//! grid of probes over the retention time × m/z plane and letting each probe climb to
//! the nearest local intensity maximum.
//!
//! The input is a [`ScanMap`], a sparse table of centroided [`mzpeaks`] peak lists over
//! retention time from a single MS level. [`GridMassExtracter`] smooths it, probes it,
//! groups the probes into spots, merges and prunes the spots, and assembles every
//! surviving spot into a [`GridFeature`] whose points are the raw, unsmoothed data.
//!
//! # Usage
//! ```
//! use mzpeaks::{CentroidPeak, MZPeakSetType};
//! use mzgridmass::{GridMassExtracter, GridMassParams, ScanMap};
//!
//! let mut scans = ScanMap::new("run.mzML");
//! for i in 0..50 {
//!     let d = (i as f64 - 25.0) / 4.0;
//!     let intensity = (1000.0 * (-0.5 * d * d).exp()) as f32;
//!     let peaks: MZPeakSetType<CentroidPeak> =
//!         vec![CentroidPeak::new(300.1234, intensity, 0)].into_iter().collect();
//!     scans.push(i, i as f64 * 0.01, 1, peaks);
//! }
//!
//! let params = GridMassParams::builder()
//!     .mz_tolerance(0.1)
//!     .time_span(0.1, 3.0)
//!     .minimum_height(20.0)
//!     .build()
//!     .unwrap();
//! let features = GridMassExtracter::new(params, &scans)
//!     .unwrap()
//!     .extract_features(&())
//!     .unwrap();
//! for feature in features.iter() {
//!     println!("{}", feature);
//! }
//! assert_eq!(features.len(), 1);
//! ```
//!
//! Independent runs can be processed together with [`detect_features_batch`], which uses
//! `rayon` when the `parallelism` feature is enabled.
pub mod arrayops;
pub mod gridmass;
pub mod params;
pub mod prelude;
pub mod progress;
pub mod scan_map;
pub mod search;
pub mod smooth;

#[cfg(any(test, feature = "test-data"))]
#[doc(hidden)]
pub mod test_data;

pub use crate::gridmass::{
    detect_features, detect_features_batch, FeatureList, GridFeature, GridMassError,
    GridMassExtracter,
};
pub use crate::params::{DebugLevel, GridMassParams, GridMassParamsBuilder, IgnoredTimes, TimeRange};
pub use crate::progress::{CancellationFlag, ProgressMonitor};
pub use crate::scan_map::ScanMap;
