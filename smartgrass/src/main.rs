use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use smartgrass::collect::imagery::imagery_collect::{
    FixtureImageryService, HttpImageryService, ImageryService,
};
use smartgrass::collect::toll::toll_collect::TollRoadCollect;
use smartgrass::commons::basic_functions::export_file_name;
use smartgrass::config::Settings;
use smartgrass::report::console::render_summary;
use smartgrass::report::export::{write_points_geojson, write_summary_csv};
use smartgrass::report::write_report;
use smartgrass::{AnalysisError, AnalysisRequest, Pipeline, RunOptions, RunOutcome};

const DEFAULT_WINDOW_DAYS: i64 = 30;

///
/// Find toll-road verges where grass needs cutting.
///
/// Selects the toll-road segments of a region, asks the imagery service for
/// Sentinel-2 pixels whose NDVI is at or above the threshold inside a buffer
/// around them, and summarises the points per segment. A PDF report is
/// written for runs that find vegetation.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "smartgrass")]
#[clap(author, version, about)]
struct SmartGrassOptions {
    /// Province (or part of its name) to analyse, e.g. "Banten".
    #[clap(short, long)]
    province: String,

    /// First day of the imagery window (YYYY-MM-DD). Defaults to 30 days before the end.
    #[clap(long)]
    start: Option<NaiveDate>,

    /// Last day of the imagery window (YYYY-MM-DD), inclusive. Defaults to today.
    #[clap(long)]
    end: Option<NaiveDate>,

    /// Maximum cloudy-pixel percentage of a scene, 0-100.
    #[clap(long, default_value_t = 20)]
    cloud: u8,

    /// Monitoring radius around the road in metres, 10-200.
    #[clap(short, long, default_value_t = 30.0)]
    buffer: f64,

    /// NDVI threshold; pixels at or above it are priority points.
    #[clap(short, long, default_value_t = 0.6)]
    threshold: f64,

    /// Also run the simulated growth prediction.
    #[clap(long)]
    predict: bool,

    /// Seed of the simulated trend and prediction. Defaults to the configured seed.
    #[clap(long)]
    seed: Option<u64>,

    /// Directory for the report and exports. Defaults to the configured directory.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Do not write the PDF report.
    #[clap(long)]
    no_report: bool,

    /// Also export the per-segment table as CSV.
    #[clap(long)]
    csv: bool,

    /// Also export the priority points as GeoJSON.
    #[clap(long)]
    geojson: bool,

    /// Download the toll-road dataset again instead of using the cached copy.
    #[clap(long)]
    refresh_dataset: bool,

    /// Settings file. If not given, smartgrass.toml and config/smartgrass.toml are tried.
    #[clap(short, long)]
    #[clap(env = "SMARTGRASS_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn imagery_service(settings: &Settings) -> Result<Box<dyn ImageryService>> {
    if let Some(fixture) = &settings.imagery.fixture {
        log::info!("Replaying imagery responses from {}", fixture.display());
        return Ok(Box::new(FixtureImageryService::new(fixture)));
    }

    let endpoint = settings.imagery.endpoint.as_ref().context(
        "No imagery service configured: set imagery.endpoint or imagery.fixture \
         (or SMARTGRASS_IMAGERY_ENDPOINT)",
    )?;
    let service = HttpImageryService::new(
        endpoint.clone(),
        settings.imagery_credentials(),
        settings.imagery_timeout(),
    )
    .context("Failed to initialise the imagery client")?;
    Ok(Box::new(service))
}

fn main() -> Result<()> {
    let opts = SmartGrassOptions::parse();
    init_logging(opts.verbose);

    let settings = Settings::load(opts.config.as_deref())?.with_env_overrides();

    // nothing can run without the reference table or the imagery client
    let table = TollRoadCollect::new(settings.dataset_source())
        .with_cache_dir(Some(settings.dataset.cache_dir.clone()))
        .refresh(opts.refresh_dataset)
        .load()
        .context("Failed to load the toll-road dataset")?;
    log::info!("Loaded {} toll-road segments", table.len());
    let pipeline = Pipeline::new(Arc::new(table), imagery_service(&settings)?)
        .with_settings(settings.pipeline_settings());

    let today = Local::now().date_naive();
    let end = opts.end.unwrap_or(today);
    let start = opts
        .start
        .unwrap_or_else(|| end - Duration::days(DEFAULT_WINDOW_DAYS));
    let request = AnalysisRequest::new(
        opts.province.as_str(),
        start,
        end,
        opts.cloud,
        opts.buffer,
        opts.threshold,
    )?;
    let options = RunOptions::new(today, opts.seed.unwrap_or(settings.analysis.seed))
        .with_prediction(opts.predict);

    let outcome = match pipeline.run(&request, &options) {
        Ok(outcome) => outcome,
        Err(AnalysisError::NoRegionMatch(region)) => {
            log::warn!("No toll-road segment found for region '{}'", region);
            println!(
                "Region '{}' not found. Known regions: {}",
                region,
                pipeline.table().regions().join(", ")
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let report = match &outcome {
        RunOutcome::Completed(report) => report,
        other => {
            if let Some(message) = other.message() {
                log::warn!("{}", message);
                println!("{}", message);
            }
            return Ok(());
        }
    };

    println!("{}", render_summary(report));

    let output_dir = opts
        .output
        .clone()
        .unwrap_or_else(|| settings.output.directory.clone());

    if !opts.no_report {
        let path = write_report(report, &output_dir).context("Failed to generate the PDF report")?;
        println!("Report: {}", path.display());
    }
    if opts.csv || opts.geojson {
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    }
    if opts.csv {
        let path = output_dir.join(export_file_name(&request.region, today, "ruas", "csv"));
        write_summary_csv(&report.summaries, &path)?;
        println!("CSV: {}", path.display());
    }
    if opts.geojson {
        let path = output_dir.join(export_file_name(&request.region, today, "titik", "geojson"));
        write_points_geojson(&report.points, &path)?;
        println!("GeoJSON: {}", path.display());
    }

    Ok(())
}
