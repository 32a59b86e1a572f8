use geo::{BoundingRect, Contains, Coord, CoordsIter, Geometry as GeoGeometry, Line, Point, Polygon};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::Serialize;

use crate::error::AnalysisError;
use crate::geo_core::LocalProjection;
use crate::geometric::road::Segment;

/// Distances (m²) closer than this are treated as ties
const TIE_EPSILON_M2: f64 = 1e-6;

/// A sampled coordinate returned by the imagery service
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplePoint {
    pub lon: f64,
    pub lat: f64,
}

impl SamplePoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        SamplePoint { lon, lat }
    }
}

/// A priority location attributed to its nearest segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityPoint {
    pub lon: f64,
    pub lat: f64,
    pub ruas: String,
}

/// One straight edge of a segment geometry, in metres
#[derive(Debug, Clone)]
struct SegmentEdge {
    segment: usize,
    start: [f64; 2],
    end: [f64; 2],
}

impl RTreeObject for SegmentEdge {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.start, self.end)
    }
}

impl PointDistance for SegmentEdge {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        edge_distance_2(self.start, self.end, *point)
    }
}

/// Squared distance from `p` to the closed segment `a`-`b`
fn edge_distance_2(a: [f64; 2], b: [f64; 2], p: [f64; 2]) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len_2 = dx * dx + dy * dy;
    let t = if len_2 == 0.0 {
        0.0
    } else {
        (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len_2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a[0] + t * dx - p[0], a[1] + t * dy - p[1]);
    cx * cx + cy * cy
}

/// Straight edges of a geometry: lines, polygon rings, collection members
pub(crate) fn geometry_lines(geometry: &GeoGeometry<f64>) -> Vec<Line<f64>> {
    fn polygon_lines(polygon: &Polygon<f64>) -> impl Iterator<Item = Line<f64>> + '_ {
        std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .flat_map(|ring| ring.lines())
    }

    match geometry {
        GeoGeometry::Line(line) => vec![*line],
        GeoGeometry::LineString(ls) => ls.lines().collect(),
        GeoGeometry::MultiLineString(mls) => mls.iter().flat_map(|ls| ls.lines()).collect(),
        GeoGeometry::Polygon(polygon) => polygon_lines(polygon).collect(),
        GeoGeometry::MultiPolygon(mp) => mp.iter().flat_map(polygon_lines).collect(),
        GeoGeometry::Rect(rect) => polygon_lines(&rect.to_polygon()).collect(),
        GeoGeometry::Triangle(triangle) => polygon_lines(&triangle.to_polygon()).collect(),
        GeoGeometry::GeometryCollection(gc) => gc.iter().flat_map(geometry_lines).collect(),
        GeoGeometry::Point(_) | GeoGeometry::MultiPoint(_) => Vec::new(),
    }
}

/// Nearest-segment index over the filtered segment set.
///
/// Distances are measured in the metric plane of the area of interest.
/// A point lying inside a polygonal segment is at distance zero from it.
/// When several segments are equally near, the one with the smallest
/// `ruas` wins, then the one listed first.
pub struct SegmentIndex<'a> {
    segments: Vec<&'a Segment>,
    projection: LocalProjection,
    edges: RTree<SegmentEdge>,
    areas: RTree<GeomWithData<Rectangle<[f64; 2]>, usize>>,
    metric_areas: Vec<Option<GeoGeometry<f64>>>,
    rank: Vec<usize>,
}

impl<'a> SegmentIndex<'a> {
    pub fn new(segments: &[&'a Segment], projection: LocalProjection) -> Result<Self, AnalysisError> {
        let mut edges = Vec::new();
        let mut area_envelopes = Vec::new();
        let mut metric_areas = Vec::with_capacity(segments.len());

        for (idx, segment) in segments.iter().enumerate() {
            let metric = projection.to_metric(&segment.geometry);

            let before = edges.len();
            edges.extend(geometry_lines(&metric).into_iter().map(|line| SegmentEdge {
                segment: idx,
                start: [line.start.x, line.start.y],
                end: [line.end.x, line.end.y],
            }));
            if edges.len() == before {
                // point-like geometries have no edges, keep their vertices
                edges.extend(metric.coords_iter().map(|c| SegmentEdge {
                    segment: idx,
                    start: [c.x, c.y],
                    end: [c.x, c.y],
                }));
            }

            let is_areal = matches!(
                metric,
                GeoGeometry::Polygon(_) | GeoGeometry::MultiPolygon(_) | GeoGeometry::Rect(_)
            );
            if is_areal {
                if let Some(rect) = metric.bounding_rect() {
                    area_envelopes.push(GeomWithData::new(
                        Rectangle::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                        idx,
                    ));
                }
                metric_areas.push(Some(metric));
            } else {
                metric_areas.push(None);
            }
        }

        if edges.is_empty() {
            return Err(AnalysisError::Geometry(
                "no segment geometry to attribute points to".to_string(),
            ));
        }

        let mut order: Vec<usize> = (0..segments.len()).collect();
        order.sort_by(|&a, &b| segments[a].ruas.cmp(&segments[b].ruas).then(a.cmp(&b)));
        let mut rank = vec![0; segments.len()];
        for (position, idx) in order.into_iter().enumerate() {
            rank[idx] = position;
        }

        Ok(SegmentIndex {
            segments: segments.to_vec(),
            projection,
            edges: RTree::bulk_load(edges),
            areas: RTree::bulk_load(area_envelopes),
            metric_areas,
            rank,
        })
    }

    /// Position (in the filtered set) of the segment nearest to `point`
    pub fn nearest(&self, point: &SamplePoint) -> usize {
        let c = self.projection.forward(Coord {
            x: point.lon,
            y: point.lat,
        });
        let query = [c.x, c.y];

        let containing = self
            .areas
            .locate_all_at_point(&query)
            .map(|entry| entry.data)
            .filter(|&idx| {
                self.metric_areas[idx]
                    .as_ref()
                    .map(|g| g.contains(&Point::from(c)))
                    .unwrap_or(false)
            })
            .min_by_key(|&idx| self.rank[idx]);

        let mut best = containing;
        let mut best_distance = if best.is_some() { 0.0 } else { f64::INFINITY };
        for (edge, distance) in self.edges.nearest_neighbor_iter_with_distance_2(&query) {
            if distance > best_distance + TIE_EPSILON_M2 {
                break;
            }
            match best {
                Some(current) if self.rank[edge.segment] >= self.rank[current] => {}
                _ => best = Some(edge.segment),
            }
            if best_distance.is_infinite() {
                best_distance = distance;
            }
        }
        best.unwrap_or(0)
    }

    /// Attach every point to its nearest segment. No point is dropped.
    pub fn attribute(&self, points: &[SamplePoint]) -> Vec<PriorityPoint> {
        points
            .iter()
            .map(|p| PriorityPoint {
                lon: p.lon,
                lat: p.lat,
                ruas: self.segments[self.nearest(p)].ruas.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon};

    fn projection() -> LocalProjection {
        LocalProjection::new(106.0, -6.0)
    }

    fn road(name: &str, y: f64) -> Segment {
        Segment::new(
            name,
            Some("Banten".to_string()),
            GeoGeometry::LineString(line_string![(x: 105.99, y: y), (x: 106.01, y: y)]),
        )
    }

    #[test]
    fn test_edge_distance() {
        assert_eq!(edge_distance_2([0.0, 0.0], [10.0, 0.0], [5.0, 3.0]), 9.0);
        assert_eq!(edge_distance_2([0.0, 0.0], [10.0, 0.0], [13.0, 4.0]), 25.0);
        assert_eq!(edge_distance_2([1.0, 1.0], [1.0, 1.0], [4.0, 5.0]), 25.0);
    }

    #[test]
    fn test_attribution_picks_nearest_segment() {
        let north = road("Utara", -5.999);
        let south = road("Selatan", -6.001);
        let index = SegmentIndex::new(&[&north, &south], projection()).unwrap();

        let points = vec![
            SamplePoint::new(106.0, -5.9992),
            SamplePoint::new(106.0, -6.0008),
            SamplePoint::new(106.02, -6.0011),
        ];
        let attributed = index.attribute(&points);
        let names: Vec<&str> = attributed.iter().map(|p| p.ruas.as_str()).collect();
        assert_eq!(names, vec!["Utara", "Selatan", "Selatan"]);
    }

    #[test]
    fn test_ties_prefer_smallest_name() {
        let north = road("Zeta", -5.999);
        let south = road("Alfa", -6.001);
        let index = SegmentIndex::new(&[&north, &south], projection()).unwrap();
        // exactly between both roads
        assert_eq!(index.nearest(&SamplePoint::new(106.0, -6.0)), 1);
    }

    #[test]
    fn test_point_inside_polygon_belongs_to_it() {
        let area = Segment::new(
            "Rest Area",
            Some("Banten".to_string()),
            GeoGeometry::Polygon(polygon![
                (x: 105.99, y: -6.01), (x: 106.01, y: -6.01),
                (x: 106.01, y: -5.99), (x: 105.99, y: -5.99),
            ]),
        );
        let line = road("Jalur", -6.0);
        let index = SegmentIndex::new(&[&line, &area], projection()).unwrap();
        // on the line and inside the polygon: both at distance zero, name decides
        assert_eq!(index.nearest(&SamplePoint::new(106.0, -6.0)), 0);
        // well inside the polygon, far from its boundary but near the line
        assert_eq!(index.nearest(&SamplePoint::new(106.0, -6.0005)), 1);
    }

    #[test]
    fn test_attribution_is_total() {
        let only = road("Tunggal", -6.0);
        let index = SegmentIndex::new(&[&only], projection()).unwrap();
        let points: Vec<SamplePoint> = (0..50)
            .map(|i| SamplePoint::new(105.9 + i as f64 * 0.005, -6.1 + i as f64 * 0.004))
            .collect();
        let attributed = index.attribute(&points);
        assert_eq!(attributed.len(), points.len());
        assert!(attributed.iter().all(|p| p.ruas == "Tunggal"));
    }
}
