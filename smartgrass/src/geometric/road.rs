use geo::Geometry as GeoGeometry;
use geojson::{Feature, GeoJson};
use serde_json::Value as JsonValue;

use crate::error::{AnalysisError, DatasetError};

/// A named toll-road section
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Section name (dataset field `ruas`)
    pub ruas: String,
    /// Administrative region (dataset field `provinsi`); absent for some rows
    pub provinsi: Option<String>,
    /// Geometry in WGS84 lon/lat
    pub geometry: GeoGeometry<f64>,
}

impl Segment {
    pub fn new(ruas: impl Into<String>, provinsi: Option<String>, geometry: GeoGeometry<f64>) -> Self {
        Segment {
            ruas: ruas.into(),
            provinsi,
            geometry,
        }
    }

    /// Case-insensitive substring match on the region name.
    /// Segments without a region never match.
    pub fn in_region(&self, needle_lowercase: &str) -> bool {
        self.provinsi
            .as_deref()
            .map(|p| p.to_lowercase().contains(needle_lowercase))
            .unwrap_or(false)
    }

    fn from_feature(feature: &Feature) -> Result<Option<Self>, DatasetError> {
        let Some(geometry) = &feature.geometry else {
            return Ok(None);
        };
        let ruas = match feature.property("ruas") {
            Some(value) => match json_text(value) {
                Some(ruas) => ruas,
                None => return Ok(None),
            },
            None => return Ok(None),
        };
        let provinsi = feature.property("provinsi").and_then(json_text);
        let geometry: GeoGeometry<f64> = geometry
            .clone()
            .try_into()
            .map_err(|e: geojson::Error| DatasetError::Parse(e.to_string()))?;

        Ok(Some(Segment::new(ruas, provinsi, geometry)))
    }
}

/// Text content of a property; numbers are kept as their decimal form,
/// null and empty strings are treated as absent.
fn json_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read-only table of every toll-road segment, loaded once per process
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    segments: Vec<Segment>,
}

impl SegmentTable {
    pub fn new(segments: Vec<Segment>) -> Self {
        SegmentTable { segments }
    }

    /// Build the table from a GeoJSON FeatureCollection carrying the
    /// `ruas` and `provinsi` properties.
    ///
    /// A dataset where no feature has one of the two fields is rejected.
    /// Individual features without a geometry or without a name are skipped.
    pub fn from_geojson(geojson: &GeoJson) -> Result<Self, DatasetError> {
        let features = match geojson {
            GeoJson::FeatureCollection(fc) => &fc.features,
            _ => {
                return Err(DatasetError::Parse(
                    "expected a FeatureCollection".to_string(),
                ))
            }
        };

        for field in ["ruas", "provinsi"] {
            if !features.is_empty() && !features.iter().any(|f| f.contains_property(field)) {
                return Err(DatasetError::MissingField(field));
            }
        }

        let mut segments = Vec::with_capacity(features.len());
        let mut skipped = 0usize;
        for feature in features {
            match Segment::from_feature(feature)? {
                Some(segment) => segments.push(segment),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            log::warn!(
                "Skipped {} toll-road features without a geometry or a segment name",
                skipped
            );
        }
        log::info!("Loaded {} toll-road segments", segments.len());

        Ok(SegmentTable { segments })
    }

    pub fn from_geojson_str(content: &str) -> Result<Self, DatasetError> {
        let geojson: GeoJson = content
            .parse()
            .map_err(|e: geojson::Error| DatasetError::Parse(e.to_string()))?;
        Self::from_geojson(&geojson)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Distinct region names, sorted, for operator hints
    pub fn regions(&self) -> Vec<&str> {
        let mut regions: Vec<&str> = self
            .segments
            .iter()
            .filter_map(|s| s.provinsi.as_deref())
            .collect();
        regions.sort_unstable();
        regions.dedup();
        regions
    }

    /// Region Resolver: segments whose region contains `filter`, ignoring case.
    ///
    /// Returns `NoRegionMatch` when nothing matches; the caller must stop
    /// the run instead of querying an empty area.
    pub fn resolve_region(&self, filter: &str) -> Result<Vec<&Segment>, AnalysisError> {
        let needle = filter.trim().to_lowercase();
        let matched: Vec<&Segment> = self
            .segments
            .iter()
            .filter(|s| s.in_region(&needle))
            .collect();

        if matched.is_empty() {
            return Err(AnalysisError::NoRegionMatch(filter.trim().to_string()));
        }
        log::debug!("Region '{}' matched {} segments", filter.trim(), matched.len());
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature",
             "properties": {"ruas": "Jakarta - Tangerang", "provinsi": "DKI Jakarta, Banten"},
             "geometry": {"type": "LineString", "coordinates": [[106.70, -6.20], [106.60, -6.19]]}},
            {"type": "Feature",
             "properties": {"ruas": "Tangerang - Merak", "provinsi": "BANTEN"},
             "geometry": {"type": "MultiLineString", "coordinates": [[[106.40, -6.18], [106.10, -6.05]]]}},
            {"type": "Feature",
             "properties": {"ruas": "Cipularang", "provinsi": "Jawa Barat"},
             "geometry": {"type": "LineString", "coordinates": [[107.40, -6.60], [107.30, -6.80]]}},
            {"type": "Feature",
             "properties": {"ruas": "Tanpa Provinsi", "provinsi": null},
             "geometry": {"type": "LineString", "coordinates": [[107.00, -6.00], [107.10, -6.00]]}},
            {"type": "Feature",
             "properties": {"ruas": null, "provinsi": "Banten"},
             "geometry": {"type": "LineString", "coordinates": [[106.00, -6.00], [106.10, -6.00]]}},
            {"type": "Feature",
             "properties": {"ruas": "Tanpa Geometri", "provinsi": "Banten"},
             "geometry": null}
        ]
    }"#;

    #[test]
    fn test_from_geojson_skips_incomplete_rows() {
        let table = SegmentTable::from_geojson_str(DATASET).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.segments()[3].provinsi, None);
    }

    #[test]
    fn test_resolve_region_case_insensitive_substring() {
        let table = SegmentTable::from_geojson_str(DATASET).unwrap();
        let matched = table.resolve_region("banten").unwrap();
        let names: Vec<&str> = matched.iter().map(|s| s.ruas.as_str()).collect();
        assert_eq!(names, vec!["Jakarta - Tangerang", "Tangerang - Merak"]);

        let matched = table.resolve_region("  JAWA ").unwrap();
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn test_resolve_region_no_match() {
        let table = SegmentTable::from_geojson_str(DATASET).unwrap();
        match table.resolve_region("Papua") {
            Err(AnalysisError::NoRegionMatch(region)) => assert_eq!(region, "Papua"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let content = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"nama": "x", "provinsi": "Banten"},
             "geometry": {"type": "Point", "coordinates": [106.0, -6.0]}}]}"#;
        assert!(matches!(
            SegmentTable::from_geojson_str(content),
            Err(DatasetError::MissingField("ruas"))
        ));
    }

    #[test]
    fn test_regions() {
        let table = SegmentTable::from_geojson_str(DATASET).unwrap();
        assert_eq!(
            table.regions(),
            vec!["BANTEN", "DKI Jakarta, Banten", "Jawa Barat"]
        );
    }
}
