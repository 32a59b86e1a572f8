use serde::Serialize;
use std::collections::BTreeMap;

use crate::geometric::attribution::PriorityPoint;

/// Per-segment aggregate of priority points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub ruas: String,
    pub point_count: usize,
    pub estimated_area_ha: f64,
}

/// Group attributed points by segment.
///
/// Groups start in segment-name order and are then stably sorted by count,
/// highest first, so equal counts keep alphabetical order.
pub fn aggregate(points: &[PriorityPoint], area_per_point_ha: f64) -> Vec<SegmentSummary> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for point in points {
        *counts.entry(point.ruas.as_str()).or_insert(0) += 1;
    }

    let mut summaries: Vec<SegmentSummary> = counts
        .into_iter()
        .map(|(ruas, point_count)| SegmentSummary {
            ruas: ruas.to_string(),
            point_count,
            estimated_area_ha: point_count as f64 * area_per_point_ha,
        })
        .collect();
    summaries.sort_by(|a, b| b.point_count.cmp(&a.point_count));
    summaries
}

pub fn total_points(summaries: &[SegmentSummary]) -> usize {
    summaries.iter().map(|s| s.point_count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn point(ruas: &str) -> PriorityPoint {
        PriorityPoint {
            lon: 106.0,
            lat: -6.0,
            ruas: ruas.to_string(),
        }
    }

    #[test]
    fn test_aggregate_counts_and_order() {
        let points: Vec<PriorityPoint> = ["Merak", "Serpong", "Merak", "Cikupa", "Merak", "Serpong"]
            .iter()
            .map(|r| point(r))
            .collect();
        let summaries = aggregate(&points, 0.01);

        let rows: Vec<(&str, usize)> = summaries
            .iter()
            .map(|s| (s.ruas.as_str(), s.point_count))
            .collect();
        assert_eq!(rows, vec![("Merak", 3), ("Serpong", 2), ("Cikupa", 1)]);
        assert_relative_eq!(summaries[0].estimated_area_ha, 0.03);
        assert_eq!(total_points(&summaries), points.len());
    }

    #[test]
    fn test_equal_counts_keep_name_order() {
        let points: Vec<PriorityPoint> = ["Zeta", "Alfa", "Beta", "Zeta", "Alfa", "Beta"]
            .iter()
            .map(|r| point(r))
            .collect();
        let names: Vec<String> = aggregate(&points, 0.01).into_iter().map(|s| s.ruas).collect();
        assert_eq!(names, vec!["Alfa", "Beta", "Zeta"]);
    }

    #[test]
    fn test_counts_sum_to_total_for_many_shapes() {
        for n in [0usize, 1, 7, 120, 500] {
            let points: Vec<PriorityPoint> = (0..n)
                .map(|i| point(&format!("Ruas {}", i % 13)))
                .collect();
            let summaries = aggregate(&points, 0.01);
            assert_eq!(total_points(&summaries), n);
            assert!(summaries
                .windows(2)
                .all(|w| w[0].point_count >= w[1].point_count));
        }
    }
}
