use chrono::NaiveDate;
use image::DynamicImage;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};

use crate::analysis::aggregate::SegmentSummary;
use crate::commons::basic_functions::{format_date, format_ha};
use crate::error::AnalysisError;
use crate::report::sanitize::sanitize_text;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
const LINE_HEIGHT_MM: f32 = 7.0;
const MAP_MAX_WIDTH_MM: f32 = 180.0;
const MAP_MAX_HEIGHT_MM: f32 = 120.0;

/// Segment table column widths: name, count, area
pub const COLUMN_WIDTHS_MM: [f32; 3] = [110.0, 30.0, 40.0];

const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;

/// Longest segment name that still fits the first column at body size
const NAME_MAX_CHARS: usize = 60;

const LAYER_NAME: &str = "Layer 1";

/// Everything that goes into the downloadable report
pub struct ReportInput {
    pub title: String,
    pub date: NaiveDate,
    /// Operational summary, rendered as `key: value` lines
    pub summary: Vec<(String, String)>,
    pub map: Option<DynamicImage>,
    pub rows: Vec<SegmentSummary>,
}

/// Writes pages top to bottom and starts a new page when one is full
struct PageCursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl<'a> PageCursor<'a> {
    fn new(doc: &'a PdfDocumentReference, layer: PdfLayerReference) -> Self {
        PageCursor {
            doc,
            layer,
            y: PAGE_HEIGHT_MM - MARGIN_MM,
            pages: 1,
        }
    }

    fn remaining(&self) -> f32 {
        self.y - MARGIN_MM
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        self.pages += 1;
    }

    fn ensure(&mut self, height: f32) -> bool {
        if self.remaining() < height {
            self.new_page();
            return true;
        }
        false
    }

    fn text_at(&self, text: &str, size: f32, x: f32, font: &IndirectFontRef) {
        self.layer
            .use_text(sanitize_text(text), size, Mm(x), Mm(self.y), font);
    }

    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        self.ensure(LINE_HEIGHT_MM);
        self.text_at(text, size, MARGIN_MM, font);
        self.y -= LINE_HEIGHT_MM;
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() <= NAME_MAX_CHARS {
        return name.to_string();
    }
    let mut short: String = name.chars().take(NAME_MAX_CHARS - 3).collect();
    short.push_str("...");
    short
}

fn report_err(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Report(e.to_string())
}

/// Lays out the report on A4 pages with the builtin Helvetica fonts
pub struct ReportAssembler;

impl ReportAssembler {
    /// Produce the PDF bytes. Text is sanitized first, so encoding never
    /// fails; anything else that goes wrong is returned as an error.
    pub fn assemble(input: &ReportInput) -> Result<Vec<u8>, AnalysisError> {
        let (doc, page, layer) = PdfDocument::new(
            sanitize_text(&input.title),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            LAYER_NAME,
        );
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(report_err)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(report_err)?;

        let first_layer = doc.get_page(page).get_layer(layer);
        let mut cursor = PageCursor::new(&doc, first_layer);

        // header
        cursor.line(&input.title, TITLE_SIZE, &bold);
        cursor.line(
            &format!("Tanggal: {}", format_date(input.date)),
            BODY_SIZE,
            &regular,
        );
        cursor.gap(LINE_HEIGHT_MM / 2.0);

        cursor.line("Ringkasan Operasional", HEADING_SIZE, &bold);
        for (key, value) in &input.summary {
            cursor.line(&format!("{}: {}", key, value), BODY_SIZE, &regular);
        }
        cursor.gap(LINE_HEIGHT_MM / 2.0);

        if let Some(map) = &input.map {
            Self::place_map(&mut cursor, map);
        }

        cursor.line("Rincian per Ruas", HEADING_SIZE, &bold);
        Self::table_header(&mut cursor, &bold);
        for row in &input.rows {
            if cursor.ensure(LINE_HEIGHT_MM) {
                Self::table_header(&mut cursor, &bold);
            }
            Self::table_row(
                &mut cursor,
                [
                    truncate_name(&row.ruas),
                    row.point_count.to_string(),
                    format_ha(row.estimated_area_ha),
                ],
                &regular,
            );
        }

        log::debug!(
            "Report assembled: {} pages, {} table rows",
            cursor.pages,
            input.rows.len()
        );
        doc.save_to_bytes().map_err(report_err)
    }

    fn place_map(cursor: &mut PageCursor<'_>, map: &DynamicImage) {
        let (width_px, height_px) = (map.width() as f32, map.height() as f32);
        if width_px == 0.0 || height_px == 0.0 {
            return;
        }

        // choose the dpi that makes the image fit the box
        let dpi = (width_px * 25.4 / MAP_MAX_WIDTH_MM).max(height_px * 25.4 / MAP_MAX_HEIGHT_MM);
        let height_mm = height_px * 25.4 / dpi;
        cursor.ensure(height_mm + LINE_HEIGHT_MM);

        let bottom = cursor.y - height_mm;
        Image::from_dynamic_image(map).add_to_layer(
            cursor.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN_MM)),
                translate_y: Some(Mm(bottom)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        cursor.y = bottom - LINE_HEIGHT_MM;
    }

    fn table_header(cursor: &mut PageCursor<'_>, font: &IndirectFontRef) {
        Self::table_row(
            cursor,
            [
                "Ruas Tol".to_string(),
                "Titik".to_string(),
                "Luas (ha)".to_string(),
            ],
            font,
        );
    }

    fn table_row(cursor: &mut PageCursor<'_>, cells: [String; 3], font: &IndirectFontRef) {
        cursor.ensure(LINE_HEIGHT_MM);
        let mut x = MARGIN_MM;
        for (cell, width) in cells.iter().zip(COLUMN_WIDTHS_MM) {
            cursor.text_at(cell, BODY_SIZE, x, font);
            x += width;
        }
        cursor.y -= LINE_HEIGHT_MM;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn input(rows: usize, map: bool) -> ReportInput {
        ReportInput {
            title: "Laporan Pemeliharaan Rumput – Banten".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            summary: vec![
                ("Status Prioritas".to_string(), "PRIORITAS TINGGI".to_string()),
                ("Total Titik".to_string(), rows.to_string()),
            ],
            map: map.then(|| {
                DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([200, 10, 10])))
            }),
            rows: (0..rows)
                .map(|i| SegmentSummary {
                    ruas: format!("Ruas {} ≥ 東", i),
                    point_count: rows - i,
                    estimated_area_ha: (rows - i) as f64 * 0.01,
                })
                .collect(),
        }
    }

    #[test]
    fn test_assemble_produces_pdf() {
        let bytes = ReportAssembler::assemble(&input(3, true)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_tables_paginate() {
        let short = ReportAssembler::assemble(&input(2, false)).unwrap();
        let long = ReportAssembler::assemble(&input(120, false)).unwrap();
        assert!(long.starts_with(b"%PDF"));
        assert!(long.len() > short.len());
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("Cipularang"), "Cipularang");
        let long = "x".repeat(100);
        assert_eq!(truncate_name(&long).chars().count(), NAME_MAX_CHARS);
    }
}
