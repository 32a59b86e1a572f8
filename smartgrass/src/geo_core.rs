use geo::{BoundingRect, Coord, MapCoords, Rect};
use std::f64::consts::PI;

/// Metres per degree of latitude
const DEG_TO_M_LAT: f64 = 111_320.0;
/// Equatorial circumference in metres, used for metres per degree of longitude
const EARTH_CIRCUMFERENCE_M: f64 = 40_075_000.0;

/// Bounding box structure in WGS84 (EPSG:4326)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64, // min longitude
    pub min_y: f64, // min latitude
    pub max_x: f64, // max longitude
    pub max_y: f64, // max latitude
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_rect(rect: Rect<f64>) -> Self {
        BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }

    /// Smallest box covering every geometry that has at least one coordinate
    pub fn covering<'a, G, I>(geometries: I) -> Option<Self>
    where
        G: BoundingRect<f64> + 'a,
        G::Output: Into<Option<Rect<f64>>>,
        I: IntoIterator<Item = &'a G>,
    {
        geometries
            .into_iter()
            .filter_map(|g| g.bounding_rect().into())
            .map(BoundingBox::from_rect)
            .reduce(|acc, b| acc.union(&b))
    }

    pub fn union(&self, other: &BoundingBox) -> Self {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Centre as (lon, lat)
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

}

/// Local tangent-plane projection between WGS84 degrees and metres.
///
/// The plane is centred on an origin (usually the centre of the area being
/// processed); metres per degree follow the usual spherical approximation:
/// 111 320 m per degree of latitude and 40 075 000·cos(lat)/360 m per
/// degree of longitude. Accurate to well under a metre over the extent of
/// a single province, which is all buffering and nearest-segment lookups
/// need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    origin_lon: f64,
    origin_lat: f64,
    m_per_deg_lon: f64,
    m_per_deg_lat: f64,
}

impl LocalProjection {
    pub fn new(origin_lon: f64, origin_lat: f64) -> Self {
        let m_per_deg_lon = EARTH_CIRCUMFERENCE_M * (origin_lat * PI / 180.0).cos() / 360.0;
        LocalProjection {
            origin_lon,
            origin_lat,
            m_per_deg_lon,
            m_per_deg_lat: DEG_TO_M_LAT,
        }
    }

    pub fn centered_on(bbox: &BoundingBox) -> Self {
        let (lon, lat) = bbox.center();
        LocalProjection::new(lon, lat)
    }

    /// Degrees to metres
    pub fn forward(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (coord.x - self.origin_lon) * self.m_per_deg_lon,
            y: (coord.y - self.origin_lat) * self.m_per_deg_lat,
        }
    }

    /// Metres to degrees
    pub fn inverse(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: coord.x / self.m_per_deg_lon + self.origin_lon,
            y: coord.y / self.m_per_deg_lat + self.origin_lat,
        }
    }

    pub fn to_metric<G>(&self, geometry: &G) -> G::Output
    where
        G: MapCoords<f64, f64>,
    {
        geometry.map_coords(|c| self.forward(c))
    }

    pub fn to_geographic<G>(&self, geometry: &G) -> G::Output
    where
        G: MapCoords<f64, f64>,
    {
        geometry.map_coords(|c| self.inverse(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{line_string, Geometry, Point};

    #[test]
    fn test_bounding_box() {
        let bbox: BoundingBox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(bbox.min_x, 0.0);
        assert_eq!(bbox.max_x, 1.0);
        assert_eq!(bbox.center(), (0.5, 0.5));
    }

    #[test]
    fn test_covering_skips_empty_geometries() {
        let geometries: Vec<Geometry<f64>> = vec![
            Geometry::LineString(line_string![(x: 106.0, y: -6.3), (x: 106.2, y: -6.1)]),
            Geometry::LineString(line_string![]),
            Geometry::Point(Point::new(106.5, -6.0)),
        ];
        let bbox = BoundingBox::covering(geometries.iter()).unwrap();
        assert_eq!(bbox, BoundingBox::new(106.0, -6.3, 106.5, -6.0));
    }

    #[test]
    fn test_covering_nothing() {
        let geometries: Vec<Geometry<f64>> = Vec::new();
        assert!(BoundingBox::covering(geometries.iter()).is_none());
    }

    #[test]
    fn test_projection_scale_near_equator() {
        let proj = LocalProjection::new(106.0, -6.0);
        let east = proj.forward(Coord { x: 106.001, y: -6.0 });
        let north = proj.forward(Coord { x: 106.0, y: -5.999 });
        // ~110.7 m per millidegree of longitude at 6°S
        assert_relative_eq!(east.x, 110.71, epsilon = 0.01);
        assert_relative_eq!(north.y, 111.32, epsilon = 1e-6);
    }

    #[test]
    fn test_projection_roundtrip() {
        let proj = LocalProjection::new(106.4, -6.2);
        let c = Coord { x: 106.47, y: -6.11 };
        let back = proj.inverse(proj.forward(c));
        assert_relative_eq!(back.x, c.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, c.y, epsilon = 1e-12);
    }
}
