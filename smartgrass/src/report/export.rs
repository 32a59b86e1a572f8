use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use std::fs::File;
use std::path::Path;

use crate::analysis::aggregate::SegmentSummary;
use crate::geometric::attribution::PriorityPoint;

/// Per-segment table as CSV: `ruas,point_count,estimated_area_ha`
pub fn write_summary_csv(summaries: &[SegmentSummary], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for summary in summaries {
        writer.serialize(summary)?;
    }
    writer.flush()?;
    Ok(())
}

/// Attributed priority points as a FeatureCollection with a `ruas` property
pub fn points_feature_collection(points: &[PriorityPoint]) -> FeatureCollection {
    let features = points
        .iter()
        .map(|p| {
            let mut properties = JsonObject::new();
            properties.insert("ruas".to_string(), JsonValue::from(p.ruas.clone()));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![p.lon, p.lat]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn write_points_geojson(points: &[PriorityPoint], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer(file, &points_feature_collection(points))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
