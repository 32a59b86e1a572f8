pub mod console;
pub mod export;
pub mod map;
pub mod pdf;
pub mod sanitize;

use anyhow::{Context, Result};
use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::analysis::pipeline::AnalysisReport;
use crate::commons::basic_functions::{format_ha, report_file_name};
use crate::report::map::write_map_png;
use crate::report::pdf::{ReportAssembler, ReportInput};

/// Operational summary lines shown at the top of the report
pub fn summary_lines(report: &AnalysisReport) -> Vec<(String, String)> {
    let request = &report.request;
    vec![
        ("Wilayah".to_string(), request.region.clone()),
        (
            "Periode".to_string(),
            format!("{} s/d {}", request.start, request.end),
        ),
        (
            "Status Prioritas".to_string(),
            report.priority.operator_label().to_string(),
        ),
        ("Ambang NDVI".to_string(), format!("{:.2}", request.ndvi_threshold)),
        (
            "Radius Pemantauan".to_string(),
            format!("{} m", request.buffer_radius_m),
        ),
        ("Total Titik".to_string(), report.total_points().to_string()),
        (
            "Estimasi Luas".to_string(),
            format!("{} ha", format_ha(report.total_area_ha)),
        ),
        ("Jumlah Citra".to_string(), report.image_count.to_string()),
        (
            "Kepatuhan SPM".to_string(),
            format!("{:.1} %", report.kpis.compliance_rate),
        ),
    ]
}

/// Build the PDF for a completed run in memory
pub fn build_report(report: &AnalysisReport) -> Result<Vec<u8>> {
    build_report_with_map(report, write_map_png(report)?)
}

/// Build the PDF around an already rendered map. The map file is consumed
/// and deleted before this returns, whether assembly succeeds or not.
pub fn build_report_with_map(report: &AnalysisReport, map_file: NamedTempFile) -> Result<Vec<u8>> {
    let map = image::open(map_file.path())
        .with_context(|| format!("Failed to read back map {}", map_file.path().display()))?;

    let input = ReportInput {
        title: format!("Laporan Pemeliharaan Rumput Tol - {}", report.request.region),
        date: report.run_date,
        summary: summary_lines(report),
        map: Some(map),
        rows: report.summaries.clone(),
    };
    let bytes = ReportAssembler::assemble(&input);
    map_file
        .close()
        .context("Failed to remove the temporary map file")?;
    Ok(bytes?)
}

/// Write the report into `output_dir` under its deterministic file name
pub fn write_report(report: &AnalysisReport, output_dir: &Path) -> Result<PathBuf> {
    let bytes = build_report(report)?;
    create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let path = output_dir.join(report_file_name(&report.request.region, report.run_date));
    write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Report written to {}", path.display());
    Ok(path)
}
