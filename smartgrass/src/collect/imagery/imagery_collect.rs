use chrono::NaiveDate;
use geo::{Contains, MultiPolygon, Point};
use geojson::{FeatureCollection, Value};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::collect::global_variables::{
    CLOUD_PROPERTY, IMAGERY_COLLECTION, INDEX_NAME, MAX_SAMPLE_POINTS, NDVI_MAX, NIR_BAND,
    RED_BAND, SAMPLE_SCALE_M,
};
use crate::error::ImageryError;
use crate::geometric::attribution::SamplePoint;

/// Everything the imagery service needs for one vegetation query
#[derive(Debug, Clone)]
pub struct ImageryQuery {
    pub region: MultiPolygon<f64>,
    /// First day of the window (inclusive)
    pub start: NaiveDate,
    /// Last day of the window (exclusive, as the platform's date filter)
    pub end: NaiveDate,
    /// Scenes with a cloudy-pixel percentage at or above this are ignored
    pub cloud_ceiling: u8,
    /// Inclusive lower NDVI bound
    pub index_lower: f64,
    /// Exclusive upper NDVI bound
    pub index_upper: f64,
    pub scale_m: f64,
    pub max_points: usize,
}

impl ImageryQuery {
    pub fn new(
        region: MultiPolygon<f64>,
        start: NaiveDate,
        end: NaiveDate,
        cloud_ceiling: u8,
        index_lower: f64,
        index_upper: f64,
    ) -> Self {
        ImageryQuery {
            region,
            start,
            end,
            cloud_ceiling,
            index_lower,
            index_upper,
            scale_m: SAMPLE_SCALE_M,
            max_points: MAX_SAMPLE_POINTS,
        }
    }

    /// JSON body sent to the query endpoint
    pub fn to_request_body(&self) -> ImageryRequestBody {
        ImageryRequestBody {
            collection: IMAGERY_COLLECTION.to_string(),
            region: geojson::Geometry::new(Value::from(&self.region)),
            start_date: self.start.format("%Y-%m-%d").to_string(),
            end_date: self.end.format("%Y-%m-%d").to_string(),
            cloud_filter: CloudFilter {
                property: CLOUD_PROPERTY.to_string(),
                less_than: self.cloud_ceiling,
            },
            composite: "median".to_string(),
            index: IndexSpec {
                name: INDEX_NAME.to_string(),
                bands: [NIR_BAND.to_string(), RED_BAND.to_string()],
                lower: self.index_lower,
                upper: self.index_upper,
            },
            scale: self.scale_m,
            num_pixels: self.max_points,
            geometries: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageryRequestBody {
    pub collection: String,
    pub region: geojson::Geometry,
    pub start_date: String,
    pub end_date: String,
    pub cloud_filter: CloudFilter,
    pub composite: String,
    pub index: IndexSpec,
    pub scale: f64,
    pub num_pixels: usize,
    pub geometries: bool,
}

#[derive(Debug, Serialize)]
pub struct CloudFilter {
    pub property: String,
    pub less_than: u8,
}

/// Normalized difference index over two bands, kept where `lower <= v < upper`
#[derive(Debug, Serialize)]
pub struct IndexSpec {
    pub name: String,
    pub bands: [String; 2],
    pub lower: f64,
    pub upper: f64,
}

/// Wire form of the service answer: image count plus sampled points
#[derive(Debug, Deserialize)]
struct ImageryResponseBody {
    image_count: u64,
    #[serde(default)]
    points: Option<FeatureCollection>,
}

/// Image count and sampled coordinates for one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageryResponse {
    pub image_count: u64,
    pub points: Vec<SamplePoint>,
}

impl ImageryResponse {
    pub fn empty() -> Self {
        ImageryResponse::default()
    }

    /// Parse a response document. Sample features must be Points.
    pub fn from_json(content: &str) -> Result<Self, ImageryError> {
        let (image_count, samples) = decode_samples(content)?;
        Ok(ImageryResponse {
            image_count,
            points: samples.into_iter().map(|(point, _)| point).collect(),
        })
    }
}

/// Image count plus every sample with its index value, when the feature carries one
fn decode_samples(content: &str) -> Result<(u64, Vec<(SamplePoint, Option<f64>)>), ImageryError> {
    let body: ImageryResponseBody =
        serde_json::from_str(content).map_err(|e| ImageryError::Decode(e.to_string()))?;

    let mut samples = Vec::new();
    if let Some(fc) = body.points {
        for feature in fc.features {
            let index = feature
                .property(INDEX_NAME)
                .and_then(serde_json::Value::as_f64);
            let geometry = feature
                .geometry
                .ok_or_else(|| ImageryError::Decode("sample without geometry".to_string()))?;
            match geometry.value {
                Value::Point(coords) if coords.len() >= 2 => {
                    samples.push((SamplePoint::new(coords[0], coords[1]), index))
                }
                _ => {
                    return Err(ImageryError::Decode(
                        "sample geometries must be Points".to_string(),
                    ))
                }
            }
        }
    }
    Ok((body.image_count, samples))
}

/// The remote-sensing platform, seen as a black box
pub trait ImageryService {
    /// Count the qualifying scenes and sample the pixels whose index falls
    /// in the requested band. One blocking call, no retry.
    fn query(&self, query: &ImageryQuery) -> Result<ImageryResponse, ImageryError>;
}

/// Service credentials, passed through untouched
#[derive(Debug, Clone, Default)]
pub struct ImageryCredentials {
    pub token: Option<String>,
    pub project: Option<String>,
}

/// HTTP client for the imagery query endpoint
pub struct HttpImageryService {
    client: Client,
    endpoint: String,
    credentials: ImageryCredentials,
}

impl HttpImageryService {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: ImageryCredentials,
        timeout: Option<Duration>,
    ) -> Result<Self, ImageryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpImageryService {
            client,
            endpoint: endpoint.into(),
            credentials,
        })
    }

}

impl ImageryService for HttpImageryService {
    fn query(&self, query: &ImageryQuery) -> Result<ImageryResponse, ImageryError> {
        let body = query.to_request_body();
        log::debug!(
            "Imagery query {} .. {} cloud<{} NDVI [{}, {}) -> {}",
            body.start_date,
            body.end_date,
            body.cloud_filter.less_than,
            body.index.lower,
            body.index.upper,
            self.endpoint
        );

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.credentials.token {
            request = request.bearer_auth(token);
        }
        if let Some(project) = &self.credentials.project {
            request = request.header("x-goog-user-project", project);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(ImageryError::Status { status, body });
        }

        let content = response.text()?;
        ImageryResponse::from_json(&content)
    }
}

/// Replays a canned response from disk; used for offline runs and demos.
///
/// Samples are clipped to the query region and index band only. The date
/// window and cloud ceiling are not applied, so the image count and the
/// samples are whatever the file holds.
pub struct FixtureImageryService {
    path: PathBuf,
}

impl FixtureImageryService {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FixtureImageryService {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ImageryService for FixtureImageryService {
    fn query(&self, query: &ImageryQuery) -> Result<ImageryResponse, ImageryError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ImageryError::Fixture(format!("{}: {}", self.path.display(), e)))?;
        let (image_count, samples) = decode_samples(&content)?;
        // samples without an index value only answer the band that ends at the maximum
        let open_band = query.index_upper >= NDVI_MAX;
        let points = samples
            .into_iter()
            .filter(|(_, index)| match index {
                Some(v) => *v >= query.index_lower && *v < query.index_upper,
                None => open_band,
            })
            .filter(|(p, _)| query.region.contains(&Point::new(p.lon, p.lat)))
            .map(|(p, _)| p)
            .collect();
        Ok(ImageryResponse {
            image_count,
            points,
        })
    }
}
