use anyhow::{Context, Result};
use geo::{Coord, Geometry as GeoGeometry};
use image::{ImageFormat, Rgb, RgbImage};
use tempfile::NamedTempFile;

use crate::analysis::pipeline::AnalysisReport;
use crate::geo_core::LocalProjection;
use crate::geometric::attribution::geometry_lines;

pub const MAP_WIDTH_PX: u32 = 1000;
pub const MAP_HEIGHT_PX: u32 = 700;

const MARGIN_PX: f64 = 20.0;
const POINT_HALF_SIZE_PX: i64 = 2;

const BACKGROUND: Rgb<u8> = Rgb([245, 245, 240]);
const AOI_COLOR: Rgb<u8> = Rgb([60, 150, 60]);
const ROAD_COLOR: Rgb<u8> = Rgb([70, 70, 80]);
const POINT_COLOR: Rgb<u8> = Rgb([215, 30, 30]);

/// Maps metric coordinates to pixel positions, north up, aspect preserved
struct Viewport {
    projection: LocalProjection,
    min_x: f64,
    max_y: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Viewport {
    fn fit(report: &AnalysisReport, width: u32, height: u32) -> Option<Self> {
        let projection = report.aoi.projection;
        let metric = projection.to_metric(&report.aoi.region);
        let coords = metric
            .0
            .iter()
            .flat_map(|polygon| polygon.exterior().0.iter().copied());

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for c in coords {
            min_x = min_x.min(c.x);
            min_y = min_y.min(c.y);
            max_x = max_x.max(c.x);
            max_y = max_y.max(c.y);
        }
        if !min_x.is_finite() || !max_x.is_finite() {
            return None;
        }

        let span_x = (max_x - min_x).max(1.0);
        let span_y = (max_y - min_y).max(1.0);
        let usable_w = width as f64 - 2.0 * MARGIN_PX;
        let usable_h = height as f64 - 2.0 * MARGIN_PX;
        let scale = (usable_w / span_x).min(usable_h / span_y);

        Some(Viewport {
            projection,
            min_x,
            max_y,
            scale,
            offset_x: MARGIN_PX + (usable_w - span_x * scale) / 2.0,
            offset_y: MARGIN_PX + (usable_h - span_y * scale) / 2.0,
        })
    }

    fn metric_to_pixel(&self, c: Coord<f64>) -> (i64, i64) {
        let px = self.offset_x + (c.x - self.min_x) * self.scale;
        let py = self.offset_y + (self.max_y - c.y) * self.scale;
        (px.round() as i64, py.round() as i64)
    }

    fn lonlat_to_pixel(&self, lon: f64, lat: f64) -> (i64, i64) {
        self.metric_to_pixel(self.projection.forward(Coord { x: lon, y: lat }))
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham line, clipped to the image
fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put(img, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_square(img: &mut RgbImage, center: (i64, i64), half: i64, color: Rgb<u8>) {
    for y in center.1 - half..=center.1 + half {
        for x in center.0 - half..=center.0 + half {
            put(img, x, y, color);
        }
    }
}

/// Static overview map: area of interest outline, matched segments and
/// priority points.
pub fn render_map(report: &AnalysisReport, width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    let viewport = match Viewport::fit(report, width, height) {
        Some(v) => v,
        None => return img,
    };

    let metric_aoi = viewport.projection.to_metric(&report.aoi.region);
    for polygon in metric_aoi.0.iter() {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            for line in ring.lines() {
                draw_line(
                    &mut img,
                    viewport.metric_to_pixel(line.start),
                    viewport.metric_to_pixel(line.end),
                    AOI_COLOR,
                );
            }
        }
    }

    for segment in &report.segments {
        let metric: GeoGeometry<f64> = viewport.projection.to_metric(&segment.geometry);
        for line in geometry_lines(&metric) {
            draw_line(
                &mut img,
                viewport.metric_to_pixel(line.start),
                viewport.metric_to_pixel(line.end),
                ROAD_COLOR,
            );
        }
    }

    for point in &report.points {
        draw_square(
            &mut img,
            viewport.lonlat_to_pixel(point.lon, point.lat),
            POINT_HALF_SIZE_PX,
            POINT_COLOR,
        );
    }

    img
}

/// Render the map into a fresh temp PNG. The file is removed when the
/// returned handle is dropped.
pub fn write_map_png(report: &AnalysisReport) -> Result<NamedTempFile> {
    let img = render_map(report, MAP_WIDTH_PX, MAP_HEIGHT_PX);
    let file = tempfile::Builder::new()
        .prefix("smartgrass_map_")
        .suffix(".png")
        .tempfile()
        .context("Failed to create temporary map file")?;
    img.save_with_format(file.path(), ImageFormat::Png)
        .with_context(|| format!("Failed to write map to {}", file.path().display()))?;
    log::debug!("Map rendered to {}", file.path().display());
    Ok(file)
}
