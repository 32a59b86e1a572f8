use chrono::NaiveDate;

use crate::collect::global_variables::{MAX_SAMPLE_POINTS, NDVI_MAX, PREDICTION_BAND_WIDTH};
use crate::collect::imagery::imagery_collect::{ImageryQuery, ImageryService};
use crate::error::AnalysisError;
use crate::geometric::aoi::AreaOfInterest;
use crate::geometric::attribution::SamplePoint;

/// NDVI band `[lower, upper)` selected from the composite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexBand {
    pub lower: f64,
    pub upper: f64,
}

impl IndexBand {
    pub fn new(lower: f64, upper: f64) -> Result<Self, AnalysisError> {
        if !(lower < upper) || !(-1.0..=1.0).contains(&lower) || !(-1.0..=1.0).contains(&upper) {
            return Err(AnalysisError::InvalidRequest(format!(
                "vegetation index band [{}, {}) is empty or out of range",
                lower, upper
            )));
        }
        Ok(IndexBand { lower, upper })
    }

    /// Main query: everything at or above the threshold
    pub fn at_or_above(threshold: f64) -> Result<Self, AnalysisError> {
        Self::new(threshold, NDVI_MAX)
    }

    /// Growth simulation: the band of width 0.15 just below the threshold,
    /// rounded to two decimals (0.6 gives [0.45, 0.6)).
    pub fn just_below(threshold: f64) -> Result<Self, AnalysisError> {
        let lower = ((threshold - PREDICTION_BAND_WIDTH) * 100.0).round() / 100.0;
        Self::new(lower, threshold)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value < self.upper
    }
}

/// Result of one vegetation query. Only `Found` carries points.
#[derive(Debug, Clone, PartialEq)]
pub enum VegetationOutcome {
    /// No scene passed the date and cloud filters
    NoImagery,
    /// Scenes found, but no pixel fell inside the band
    NoVegetation { image_count: u64 },
    Found {
        image_count: u64,
        points: Vec<SamplePoint>,
    },
    /// The remote query failed; treated as zero images and zero points
    Failed { message: String },
}

impl VegetationOutcome {
    pub fn image_count(&self) -> u64 {
        match self {
            VegetationOutcome::NoVegetation { image_count }
            | VegetationOutcome::Found { image_count, .. } => *image_count,
            VegetationOutcome::NoImagery | VegetationOutcome::Failed { .. } => 0,
        }
    }

    pub fn points(&self) -> &[SamplePoint] {
        match self {
            VegetationOutcome::Found { points, .. } => points,
            _ => &[],
        }
    }
}

/// Vegetation query orchestration against an imagery service
pub struct Vegetation<'a> {
    service: &'a dyn ImageryService,
    max_points: usize,
    scale_m: Option<f64>,
}

impl<'a> Vegetation<'a> {
    pub fn new(service: &'a dyn ImageryService) -> Self {
        Vegetation {
            service,
            max_points: MAX_SAMPLE_POINTS,
            scale_m: None,
        }
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn with_scale(mut self, scale_m: f64) -> Self {
        self.scale_m = Some(scale_m);
        self
    }

    /// Query the service for pixels of `band` inside the area of interest.
    ///
    /// Never fails: a remote error is logged and returned as `Failed`.
    pub fn run(
        &self,
        aoi: &AreaOfInterest,
        start: NaiveDate,
        end: NaiveDate,
        cloud_ceiling: u8,
        band: IndexBand,
    ) -> VegetationOutcome {
        let mut query = ImageryQuery::new(
            aoi.region.clone(),
            start,
            end,
            cloud_ceiling,
            band.lower,
            band.upper,
        );
        query.max_points = self.max_points;
        if let Some(scale_m) = self.scale_m {
            query.scale_m = scale_m;
        }

        let response = match self.service.query(&query) {
            Ok(response) => response,
            Err(e) => {
                log::error!("Vegetation query failed: {}", e);
                return VegetationOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        if response.image_count == 0 {
            log::info!("No imagery between {} and {} under {}% cloud", start, end, cloud_ceiling);
            return VegetationOutcome::NoImagery;
        }

        let mut points = response.points;
        if points.is_empty() {
            log::info!(
                "{} images, no pixel with NDVI in [{}, {})",
                response.image_count,
                band.lower,
                band.upper
            );
            return VegetationOutcome::NoVegetation {
                image_count: response.image_count,
            };
        }
        if points.len() > self.max_points {
            log::warn!(
                "Imagery service returned {} samples, keeping the first {}",
                points.len(),
                self.max_points
            );
            points.truncate(self.max_points);
        }

        log::info!(
            "{} images, {} sample points with NDVI in [{}, {})",
            response.image_count,
            points.len(),
            band.lower,
            band.upper
        );
        VegetationOutcome::Found {
            image_count: response.image_count,
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::imagery::imagery_collect::ImageryResponse;
    use crate::error::ImageryError;
    use crate::geometric::road::Segment;
    use approx::assert_relative_eq;
    use geo::{line_string, Geometry};
    use std::cell::RefCell;

    struct Canned {
        response: Result<ImageryResponse, String>,
        seen: RefCell<Vec<(f64, f64)>>,
    }

    impl ImageryService for Canned {
        fn query(&self, query: &ImageryQuery) -> Result<ImageryResponse, ImageryError> {
            self.seen
                .borrow_mut()
                .push((query.index_lower, query.index_upper));
            self.response
                .clone()
                .map_err(|body| ImageryError::Status { status: 403, body })
        }
    }

    fn canned(response: Result<ImageryResponse, String>) -> Canned {
        Canned {
            response,
            seen: RefCell::new(Vec::new()),
        }
    }

    fn aoi() -> AreaOfInterest {
        let s = Segment::new(
            "A",
            Some("Banten".to_string()),
            Geometry::LineString(line_string![(x: 106.0, y: -6.0), (x: 106.01, y: -6.0)]),
        );
        AreaOfInterest::build(&[&s], 30.0).unwrap()
    }

    fn dates() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
    }

    #[test]
    fn test_bands() {
        let primary = IndexBand::at_or_above(0.6).unwrap();
        assert_eq!((primary.lower, primary.upper), (0.6, 1.0));

        let below = IndexBand::just_below(0.6).unwrap();
        assert_relative_eq!(below.lower, 0.45);
        assert_relative_eq!(below.upper, 0.6);
        assert!(below.contains(0.45));
        assert!(!below.contains(0.6));

        assert!(IndexBand::new(0.6, 0.6).is_err());
    }

    #[test]
    fn test_no_imagery() {
        let service = canned(Ok(ImageryResponse::empty()));
        let (start, end) = dates();
        let outcome = Vegetation::new(&service).run(&aoi(), start, end, 20, IndexBand::at_or_above(0.6).unwrap());
        assert_eq!(outcome, VegetationOutcome::NoImagery);
        assert_eq!(service.seen.borrow().as_slice(), &[(0.6, 1.0)]);
    }

    #[test]
    fn test_imagery_without_vegetation() {
        let service = canned(Ok(ImageryResponse {
            image_count: 3,
            points: Vec::new(),
        }));
        let (start, end) = dates();
        let outcome = Vegetation::new(&service).run(&aoi(), start, end, 20, IndexBand::at_or_above(0.6).unwrap());
        assert_eq!(outcome, VegetationOutcome::NoVegetation { image_count: 3 });
        assert_eq!(outcome.image_count(), 3);
        assert!(outcome.points().is_empty());
    }

    #[test]
    fn test_points_are_capped() {
        let points: Vec<SamplePoint> = (0..12)
            .map(|i| SamplePoint::new(106.0 + i as f64 * 0.0005, -6.0))
            .collect();
        let service = canned(Ok(ImageryResponse {
            image_count: 2,
            points,
        }));
        let (start, end) = dates();
        let outcome = Vegetation::new(&service)
            .with_max_points(5)
            .run(&aoi(), start, end, 20, IndexBand::at_or_above(0.6).unwrap());
        assert_eq!(outcome.points().len(), 5);
        assert_eq!(outcome.image_count(), 2);
    }

    #[test]
    fn test_remote_failure_is_not_a_crash() {
        let service = canned(Err("quota exceeded".to_string()));
        let (start, end) = dates();
        let outcome = Vegetation::new(&service).run(&aoi(), start, end, 20, IndexBand::at_or_above(0.6).unwrap());
        match &outcome {
            VegetationOutcome::Failed { message } => assert!(message.contains("quota exceeded")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(outcome.image_count(), 0);
        assert!(outcome.points().is_empty());
    }
}
