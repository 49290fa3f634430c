use std::env;
use std::time::Instant;

use mzgridmass::test_data::{crowded_map, gaussian_map, GaussianSignal};
use mzgridmass::{DebugLevel, GridMassError, GridMassExtracter, GridMassParams};

fn main() -> Result<(), GridMassError> {
    let debug_level: DebugLevel = env::args()
        .nth(1)
        .map(|s| s.parse::<DebugLevel>())
        .transpose()?
        .unwrap_or_default();

    let params = GridMassParams::builder()
        .mz_tolerance(0.1)
        .time_span(0.1, 3.0)
        .minimum_height(20.0)
        .debug_level(debug_level)
        .build()?;

    let scans = gaussian_map(
        50,
        0.01,
        &[
            GaussianSignal::new(300.1234, 25.0, 1000.0, 4.0),
            GaussianSignal::new(300.6234, 25.0, 900.0, 4.0),
        ],
    );
    let features = GridMassExtracter::new(params.clone(), &scans)?.extract_features(&())?;
    println!("Found {} features in {}", features.len(), features.name);
    for feature in features.iter() {
        println!("\t{}\n\t\t{}", feature, feature.summary);
    }

    let scans = crowded_map(600, 0.01, 200);
    let start = Instant::now();
    let features = GridMassExtracter::new(params, &scans)?.extract_features(&())?;
    println!(
        "Found {} features in {} scans in {} milliseconds",
        features.len(),
        scans.len(),
        start.elapsed().as_millis()
    );
    Ok(())
}
