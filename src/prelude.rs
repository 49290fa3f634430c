pub use crate::gridmass::{FeatureList, GridFeature, GridMassError, GridMassExtracter};
pub use crate::params::{DebugLevel, GridMassParams};
pub use crate::progress::ProgressMonitor;
pub use crate::scan_map::ScanMap;
