use std::fmt::Write;

use crate::analysis::pipeline::AnalysisReport;
use crate::commons::basic_functions::{format_date, format_ha};

/// Plain-text rendering of a completed run for the terminal
pub fn render_summary(report: &AnalysisReport) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = write_summary(&mut out, report);
    out
}

fn write_summary(out: &mut String, report: &AnalysisReport) -> std::fmt::Result {
    let request = &report.request;
    writeln!(out, "Region            : {}", request.region)?;
    writeln!(
        out,
        "Period            : {} .. {}",
        format_date(request.start),
        format_date(request.end)
    )?;
    writeln!(out, "Priority          : {}", report.priority.operator_label())?;
    writeln!(out, "Total points      : {}", report.total_points())?;
    writeln!(out, "Estimated area    : {} ha", format_ha(report.total_area_ha))?;
    writeln!(out, "Images analysed   : {}", report.image_count)?;
    writeln!(out, "SPM compliance    : {:.1} %", report.kpis.compliance_rate)?;
    if let Some((lon, lat)) = report.map_center() {
        writeln!(out, "Map centre        : {:.5}, {:.5}", lat, lon)?;
    }

    writeln!(out)?;
    writeln!(out, "{:<50} {:>8} {:>10}", "Segment", "Points", "Area (ha)")?;
    for row in &report.summaries {
        writeln!(
            out,
            "{:<50} {:>8} {:>10}",
            row.ruas,
            row.point_count,
            format_ha(row.estimated_area_ha)
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Simulated trend (ha, weekly):")?;
    for sample in &report.trend {
        writeln!(out, "  {}  {:>8}", sample.date, format_ha(sample.area_ha))?;
    }

    if let Some(forecast) = &report.forecast {
        writeln!(out)?;
        writeln!(
            out,
            "Simulated growth, NDVI [{:.2}, {:.2}) at {:.2}/week (not a forecast):",
            forecast.band.0, forecast.band.1, forecast.growth_rate
        )?;
        if forecast.is_empty() {
            writeln!(out, "  no points close to the threshold")?;
        }
        for row in forecast.by_segment() {
            writeln!(
                out,
                "  {:<48} {:>5} pts  earliest {:>2} wk  mean {:.1} wk",
                row.ruas, row.point_count, row.earliest_weeks, row.mean_weeks
            )?;
        }
    }

    for notice in &report.notices {
        writeln!(out, "warning: {}", notice)?;
    }
    Ok(())
}
