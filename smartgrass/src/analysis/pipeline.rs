use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use crate::analysis::aggregate::{aggregate, SegmentSummary};
use crate::analysis::kpi::Kpis;
use crate::analysis::prediction::GrowthForecast;
use crate::analysis::priority::PriorityLevel;
use crate::analysis::trend::{simulate_history, TrendSample};
use crate::collect::global_variables::{AREA_PER_POINT_HA, MAX_SAMPLE_POINTS, SAMPLE_SCALE_M};
use crate::collect::imagery::imagery_collect::ImageryService;
use crate::error::AnalysisError;
use crate::geometric::aoi::AreaOfInterest;
use crate::geometric::attribution::{PriorityPoint, SegmentIndex};
use crate::geometric::road::{Segment, SegmentTable};
use crate::geometric::vegetation::{IndexBand, Vegetation, VegetationOutcome};

/// Mixed into the run seed so the growth simulation draws from its own stream
const PREDICTION_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Operator parameters for one run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub region: String,
    pub start: NaiveDate,
    /// Last day of the range, inclusive
    pub end: NaiveDate,
    /// Maximum cloudy-pixel percentage, 0-100
    pub cloud_ceiling: u8,
    /// Monitoring radius around the road, metres
    pub buffer_radius_m: f64,
    pub ndvi_threshold: f64,
}

impl AnalysisRequest {
    pub const MIN_BUFFER_M: f64 = 10.0;
    pub const MAX_BUFFER_M: f64 = 200.0;

    pub fn new(
        region: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        cloud_ceiling: u8,
        buffer_radius_m: f64,
        ndvi_threshold: f64,
    ) -> Result<Self, AnalysisError> {
        let region = region.into().trim().to_string();
        if region.is_empty() {
            return Err(AnalysisError::InvalidRequest(
                "region filter is empty".to_string(),
            ));
        }
        if start > end {
            return Err(AnalysisError::InvalidRequest(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        if cloud_ceiling > 100 {
            return Err(AnalysisError::InvalidRequest(format!(
                "cloud ceiling must be 0-100, got {}",
                cloud_ceiling
            )));
        }
        if !(Self::MIN_BUFFER_M..=Self::MAX_BUFFER_M).contains(&buffer_radius_m) {
            return Err(AnalysisError::InvalidRequest(format!(
                "buffer radius must be {}-{} m, got {}",
                Self::MIN_BUFFER_M,
                Self::MAX_BUFFER_M,
                buffer_radius_m
            )));
        }
        if !(0.0..1.0).contains(&ndvi_threshold) {
            return Err(AnalysisError::InvalidRequest(format!(
                "NDVI threshold must be in [0, 1), got {}",
                ndvi_threshold
            )));
        }

        Ok(AnalysisRequest {
            region,
            start,
            end,
            cloud_ceiling,
            buffer_radius_m,
            ndvi_threshold,
        })
    }

    /// The window sent to the imagery service ends the day after `end`
    pub fn query_end(&self) -> NaiveDate {
        self.end + Duration::days(1)
    }
}

/// Per-run switches that do not change the analysed area
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Also run the simulated growth prediction
    pub predict: bool,
    /// Seed for the simulated trend and prediction
    pub seed: u64,
    /// Date the run is reported under
    pub run_date: NaiveDate,
}

impl RunOptions {
    pub fn new(run_date: NaiveDate, seed: u64) -> Self {
        RunOptions {
            predict: false,
            seed,
            run_date,
        }
    }

    pub fn with_prediction(mut self, predict: bool) -> Self {
        self.predict = predict;
        self
    }
}

/// Constants the pipeline is tuned with
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub area_per_point_ha: f64,
    pub max_points: usize,
    pub scale_m: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            area_per_point_ha: AREA_PER_POINT_HA,
            max_points: MAX_SAMPLE_POINTS,
            scale_m: SAMPLE_SCALE_M,
        }
    }
}

/// Everything a completed run shows to the operator
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub request: AnalysisRequest,
    pub run_date: NaiveDate,
    /// Filtered segments the area of interest was built from
    pub segments: Vec<Segment>,
    pub aoi: AreaOfInterest,
    pub image_count: u64,
    pub points: Vec<PriorityPoint>,
    pub summaries: Vec<SegmentSummary>,
    pub priority: PriorityLevel,
    pub total_area_ha: f64,
    pub kpis: Kpis,
    pub trend: Vec<TrendSample>,
    pub forecast: Option<GrowthForecast>,
    /// Non-fatal problems the operator should see
    pub notices: Vec<String>,
}

impl AnalysisReport {
    pub fn total_points(&self) -> usize {
        self.points.len()
    }

    /// Mean position of the priority points, as (lon, lat)
    pub fn map_center(&self) -> Option<(f64, f64)> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f64;
        let lon = self.points.iter().map(|p| p.lon).sum::<f64>() / n;
        let lat = self.points.iter().map(|p| p.lat).sum::<f64>() / n;
        Some((lon, lat))
    }
}

/// How a run ended. Only `Completed` produces a report.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    NoImagery { segments_matched: usize },
    NoVegetation {
        segments_matched: usize,
        image_count: u64,
        threshold: f64,
    },
    QueryFailed { message: String },
    Completed(Box<AnalysisReport>),
}

impl RunOutcome {
    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            RunOutcome::Completed(report) => Some(report.as_ref()),
            _ => None,
        }
    }

    /// Message for runs that ended without a report
    pub fn message(&self) -> Option<String> {
        match self {
            RunOutcome::NoImagery { .. } => Some(
                "No satellite imagery matches the date range and cloud ceiling".to_string(),
            ),
            RunOutcome::NoVegetation {
                image_count,
                threshold,
                ..
            } => Some(format!(
                "No significant grass area found (NDVI >= {}) in {} images",
                threshold, image_count
            )),
            RunOutcome::QueryFailed { message } => {
                Some(format!("Vegetation analysis failed: {}", message))
            }
            RunOutcome::Completed(_) => None,
        }
    }
}

/// The analysis pipeline with its process-lifetime dependencies.
///
/// Built once at startup; every run borrows the segment table and the
/// imagery service read-only.
pub struct Pipeline {
    table: Arc<SegmentTable>,
    imagery: Box<dyn ImageryService>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(table: Arc<SegmentTable>, imagery: Box<dyn ImageryService>) -> Self {
        Pipeline {
            table,
            imagery,
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn table(&self) -> &SegmentTable {
        &self.table
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn vegetation(&self) -> Vegetation<'_> {
        Vegetation::new(self.imagery.as_ref())
            .with_max_points(self.settings.max_points)
            .with_scale(self.settings.scale_m)
    }

    /// Run the whole analysis once, start to finish.
    ///
    /// A region with no segment is an error and no imagery is queried.
    /// Empty imagery results and remote failures end the run early with the
    /// matching `RunOutcome`.
    pub fn run(
        &self,
        request: &AnalysisRequest,
        options: &RunOptions,
    ) -> Result<RunOutcome, AnalysisError> {
        if self.table.is_empty() {
            return Err(AnalysisError::DatasetNotLoaded);
        }

        let segments = self.table.resolve_region(&request.region)?;
        log::info!(
            "Region '{}': {} toll-road segments",
            request.region,
            segments.len()
        );
        let aoi = AreaOfInterest::build(&segments, request.buffer_radius_m)?;

        let band = IndexBand::at_or_above(request.ndvi_threshold)?;
        let outcome = self.vegetation().run(
            &aoi,
            request.start,
            request.query_end(),
            request.cloud_ceiling,
            band,
        );
        let (image_count, samples) = match outcome {
            VegetationOutcome::Found {
                image_count,
                points,
            } => (image_count, points),
            VegetationOutcome::NoImagery => {
                return Ok(RunOutcome::NoImagery {
                    segments_matched: segments.len(),
                })
            }
            VegetationOutcome::NoVegetation { image_count } => {
                return Ok(RunOutcome::NoVegetation {
                    segments_matched: segments.len(),
                    image_count,
                    threshold: request.ndvi_threshold,
                })
            }
            VegetationOutcome::Failed { message } => {
                return Ok(RunOutcome::QueryFailed { message })
            }
        };

        let index = SegmentIndex::new(&segments, aoi.projection)?;
        let points = index.attribute(&samples);
        let summaries = aggregate(&points, self.settings.area_per_point_ha);
        let total_area_ha = points.len() as f64 * self.settings.area_per_point_ha;
        let priority = PriorityLevel::from_threshold(request.ndvi_threshold);
        let kpis = Kpis::compute(points.len(), total_area_ha);
        let trend = simulate_history(
            total_area_ha,
            options.run_date,
            &mut StdRng::seed_from_u64(options.seed),
        );

        let mut notices = Vec::new();
        let forecast = if options.predict {
            self.forecast(request, options, &aoi, &index, &mut notices)
        } else {
            None
        };

        log::info!(
            "Found {} priority points on {} segments ({:.2} ha, {})",
            points.len(),
            summaries.len(),
            total_area_ha,
            priority
        );

        Ok(RunOutcome::Completed(Box::new(AnalysisReport {
            request: request.clone(),
            run_date: options.run_date,
            segments: segments.into_iter().cloned().collect(),
            aoi,
            image_count,
            points,
            summaries,
            priority,
            total_area_ha,
            kpis,
            trend,
            forecast,
            notices,
        })))
    }

    /// Secondary query over the band just below the threshold, fed to the
    /// simulated growth estimator.
    fn forecast(
        &self,
        request: &AnalysisRequest,
        options: &RunOptions,
        aoi: &AreaOfInterest,
        index: &SegmentIndex<'_>,
        notices: &mut Vec<String>,
    ) -> Option<GrowthForecast> {
        let band = match IndexBand::just_below(request.ndvi_threshold) {
            Ok(band) => band,
            Err(e) => {
                notices.push(format!("Growth prediction skipped: {}", e));
                return None;
            }
        };

        match self.vegetation().run(
            aoi,
            request.start,
            request.query_end(),
            request.cloud_ceiling,
            band,
        ) {
            VegetationOutcome::Found {
                image_count,
                points,
            } => {
                let attributed = index.attribute(&points);
                let mut rng = StdRng::seed_from_u64(options.seed ^ PREDICTION_SEED_SALT);
                Some(GrowthForecast::simulate(
                    &attributed,
                    request.ndvi_threshold,
                    band,
                    options.run_date,
                    image_count,
                    &mut rng,
                ))
            }
            VegetationOutcome::NoImagery => Some(GrowthForecast::empty(band, options.run_date, 0)),
            VegetationOutcome::NoVegetation { image_count } => {
                Some(GrowthForecast::empty(band, options.run_date, image_count))
            }
            VegetationOutcome::Failed { message } => {
                notices.push(format!("Growth prediction query failed: {}", message));
                None
            }
        }
    }
}
