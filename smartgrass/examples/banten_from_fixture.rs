use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;

use smartgrass::collect::imagery::imagery_collect::FixtureImageryService;
use smartgrass::collect::toll::toll_collect::{DatasetSource, TollRoadCollect};
use smartgrass::report::console::render_summary;
use smartgrass::report::write_report;
use smartgrass::{AnalysisRequest, Pipeline, RunOptions, RunOutcome};

/// Example: offline run over the bundled Banten fixtures
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let table = TollRoadCollect::new(DatasetSource::File(
        "data/fixtures/toll_segments.geojson".into(),
    ))
    .with_cache_dir(None)
    .load()?;
    let imagery = FixtureImageryService::new("data/fixtures/imagery_response.json");
    let pipeline = Pipeline::new(Arc::new(table), Box::new(imagery));

    let end = NaiveDate::from_ymd_opt(2024, 3, 31).context("invalid date")?;
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).context("invalid date")?;
    let request = AnalysisRequest::new("Banten", start, end, 20, 30.0, 0.6)?;
    let options = RunOptions::new(end, 42).with_prediction(true);

    match pipeline.run(&request, &options)? {
        RunOutcome::Completed(report) => {
            println!("{}", render_summary(&report));
            let path = write_report(&report, Path::new("./output"))?;
            println!("Report: {}", path.display());
        }
        other => println!("{}", other.message().unwrap_or_default()),
    }

    Ok(())
}
