// cargo run --bin fix-profile --release -- --scenario scenarios/plaza.toml /tmp/fixes.txt

use clap::Parser;
use std::fs::File;
use std::io::prelude::*;
use std::path::PathBuf;

use arengine_lib::{
    geo::{distance, GeoPoint, LocationFix, PositionFilter},
    scenario::Scenario,
};

/// Run a scenario's scripted fixes through the position filter
#[derive(Parser, Debug)]
#[command(version)]
struct Opts {
    /// Scenario configuration toml file
    #[arg(long)]
    scenario: PathBuf,

    /// Override the configured process noise [m/s]
    #[arg(short = 'q', long)]
    process_noise: Option<f64>,

    /// Pass fixes through unfiltered
    #[arg(long)]
    no_filter: bool,

    /// Output file path to write
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();

    let scenario = Scenario::load(&opts.scenario)?;
    let mut config = scenario.engine.filter_config();
    if let Some(q) = opts.process_noise {
        config.process_noise = q;
    }
    if opts.no_filter {
        config.enabled = false;
    }
    let mut filter = PositionFilter::new(config);

    let mut output = File::create(opts.output)?;

    for scripted in scenario.fixes.iter() {
        let fix = LocationFix::from(scripted);
        let filtered = filter.update(&fix);
        let raw = GeoPoint::new(fix.latitude, fix.longitude);
        writeln!(
            &mut output,
            "{} {} {} {} {} {} {}",
            scripted.at.as_secs(),
            fix.latitude,
            fix.longitude,
            filtered.latitude,
            filtered.longitude,
            filter.variance().unwrap_or(0.0),
            distance(raw, filtered).as_meters(),
        )?;
    }

    Ok(())
}
