use geo::{Area, BooleanOps, Buffer, Contains, MultiPolygon, Point};

use crate::error::AnalysisError;
use crate::geo_core::{BoundingBox, LocalProjection};
use crate::geometric::road::Segment;

/// Area of interest: the dissolved segment geometries expanded by the
/// monitoring radius. Submitted verbatim as the imagery query region.
#[derive(Debug, Clone)]
pub struct AreaOfInterest {
    /// Region in WGS84 lon/lat; may have several disjoint parts
    pub region: MultiPolygon<f64>,
    /// Metric plane the buffer was computed in, shared with attribution
    pub projection: LocalProjection,
    pub buffer_radius_m: f64,
    pub segment_count: usize,
}

impl AreaOfInterest {
    /// Dissolve `segments` into one shape and expand it by `buffer_radius_m`.
    ///
    /// Each geometry is buffered in a local metric plane and the buffers are
    /// unioned, which gives the same region as buffering the dissolved
    /// union. Disjoint and overlapping inputs are both fine.
    pub fn build(segments: &[&Segment], buffer_radius_m: f64) -> Result<Self, AnalysisError> {
        if segments.is_empty() {
            return Err(AnalysisError::EmptySegmentSet);
        }
        if !(buffer_radius_m.is_finite() && buffer_radius_m > 0.0) {
            return Err(AnalysisError::InvalidRequest(format!(
                "buffer radius must be a positive distance, got {}",
                buffer_radius_m
            )));
        }

        let bbox = BoundingBox::covering(segments.iter().map(|s| &s.geometry)).ok_or_else(
            || AnalysisError::Geometry("matched segments have no coordinates".to_string()),
        )?;
        let projection = LocalProjection::centered_on(&bbox);

        let dissolved = segments
            .iter()
            .map(|s| projection.to_metric(&s.geometry).buffer(buffer_radius_m))
            .reduce(|acc, next| acc.union(&next))
            .unwrap_or_else(|| MultiPolygon::new(Vec::new()));

        if dissolved.0.is_empty() {
            return Err(AnalysisError::Geometry(
                "buffered area of interest is empty".to_string(),
            ));
        }

        log::debug!(
            "Area of interest: {} parts, {:.1} ha from {} segments",
            dissolved.0.len(),
            dissolved.unsigned_area() / 10_000.0,
            segments.len()
        );

        Ok(AreaOfInterest {
            region: projection.to_geographic(&dissolved),
            projection,
            buffer_radius_m,
            segment_count: segments.len(),
        })
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.region.contains(&Point::new(lon, lat))
    }

    /// Area in hectares, measured in the local metric plane
    pub fn area_ha(&self) -> f64 {
        self.projection.to_metric(&self.region).unsigned_area() / 10_000.0
    }
}
