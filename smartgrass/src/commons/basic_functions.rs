use chrono::NaiveDate;

/// Lowercase ASCII slug: runs of anything else collapse to one `_`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("wilayah");
    }
    slug
}

/// `laporan_<region>_<YYYYMMDD>.pdf`
pub fn report_file_name(region: &str, date: NaiveDate) -> String {
    format!("laporan_{}_{}.pdf", slugify(region), date.format("%Y%m%d"))
}

/// Same stem as the report, for the side exports
pub fn export_file_name(region: &str, date: NaiveDate, suffix: &str, extension: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        suffix,
        slugify(region),
        date.format("%Y%m%d"),
        extension
    )
}

/// Day-month-year, as printed in the report header
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Fixed two-decimal rendering used by every table
pub fn format_ha(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Banten"), "banten");
        assert_eq!(slugify("  DKI Jakarta "), "dki_jakarta");
        assert_eq!(slugify("Jawa Barat / Jawa Tengah"), "jawa_barat_jawa_tengah");
        assert_eq!(slugify("***"), "wilayah");
    }

    #[test]
    fn test_report_file_name_is_deterministic() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(report_file_name("Banten", date), "laporan_banten_20240305.pdf");
        assert_eq!(report_file_name("Banten", date), report_file_name("banten", date));
        assert_eq!(
            export_file_name("Banten", date, "ruas", "csv"),
            "ruas_banten_20240305.csv"
        );
    }

    #[test]
    fn test_formatting() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(format_date(date), "05-03-2024");
        assert_eq!(format_ha(0.126), "0.13");
        assert_eq!(format_ha(3.0), "3.00");
    }
}
