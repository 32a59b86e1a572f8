//! Simulated growth prediction.
//!
//! This is a placeholder heuristic, not a fitted model: points found in the
//! NDVI band just below the threshold get a random "current" index from that
//! band and are assumed to green up at a fixed weekly rate that only
//! depends on the calendar month. Do not read the output as a forecast.

use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::geometric::attribution::PriorityPoint;
use crate::geometric::vegetation::IndexBand;

/// Weekly NDVI gain during the rainy season (November to April)
pub const WET_SEASON_GROWTH_RATE: f64 = 0.05;
/// Weekly NDVI gain during the dry season (May to October)
pub const DRY_SEASON_GROWTH_RATE: f64 = 0.03;

const WEEKS_EPSILON: f64 = 1e-9;

/// Weekly NDVI growth assumed for a calendar month (1-12)
pub fn growth_rate(month: u32) -> f64 {
    match month {
        11 | 12 | 1 | 2 | 3 | 4 => WET_SEASON_GROWTH_RATE,
        _ => DRY_SEASON_GROWTH_RATE,
    }
}

/// `ceil((threshold - current) / rate)`, never negative
pub fn weeks_to_threshold(threshold: f64, current_index: f64, rate: f64) -> u32 {
    let weeks = ((threshold - current_index) / rate - WEEKS_EPSILON).ceil();
    if weeks.is_finite() && weeks > 0.0 {
        weeks as u32
    } else {
        0
    }
}

/// One point expected to cross the threshold soon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthPrediction {
    pub ruas: String,
    pub lon: f64,
    pub lat: f64,
    pub current_index: f64,
    pub weeks_to_threshold: u32,
    pub expected_date: NaiveDate,
}

/// Roll-up of predictions per segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSummary {
    pub ruas: String,
    pub point_count: usize,
    pub earliest_weeks: u32,
    pub mean_weeks: f64,
}

/// Predictions for one run, soonest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthForecast {
    pub band: (f64, f64),
    pub growth_rate: f64,
    pub image_count: u64,
    pub predictions: Vec<GrowthPrediction>,
}

impl GrowthForecast {
    /// Draw a current index for every point and derive its weeks to threshold
    pub fn simulate<R: Rng>(
        points: &[PriorityPoint],
        threshold: f64,
        band: IndexBand,
        run_date: NaiveDate,
        image_count: u64,
        rng: &mut R,
    ) -> Self {
        let rate = growth_rate(run_date.month());
        let mut predictions: Vec<GrowthPrediction> = points
            .iter()
            .map(|point| {
                let current_index = rng.gen_range(band.lower..band.upper);
                let weeks = weeks_to_threshold(threshold, current_index, rate);
                GrowthPrediction {
                    ruas: point.ruas.clone(),
                    lon: point.lon,
                    lat: point.lat,
                    current_index,
                    weeks_to_threshold: weeks,
                    expected_date: run_date + Duration::weeks(weeks as i64),
                }
            })
            .collect();
        predictions.sort_by_key(|p| p.weeks_to_threshold);

        GrowthForecast {
            band: (band.lower, band.upper),
            growth_rate: rate,
            image_count,
            predictions,
        }
    }

    pub fn empty(band: IndexBand, run_date: NaiveDate, image_count: u64) -> Self {
        GrowthForecast {
            band: (band.lower, band.upper),
            growth_rate: growth_rate(run_date.month()),
            image_count,
            predictions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// Per-segment roll-up, soonest segment first, then by name
    pub fn by_segment(&self) -> Vec<PredictionSummary> {
        let mut groups: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
        for p in &self.predictions {
            groups
                .entry(p.ruas.as_str())
                .or_default()
                .push(p.weeks_to_threshold);
        }

        let mut summaries: Vec<PredictionSummary> = groups
            .into_iter()
            .map(|(ruas, weeks)| PredictionSummary {
                ruas: ruas.to_string(),
                point_count: weeks.len(),
                earliest_weeks: weeks.iter().copied().min().unwrap_or(0),
                mean_weeks: weeks.iter().map(|&w| w as f64).sum::<f64>() / weeks.len() as f64,
            })
            .collect();
        summaries.sort_by_key(|s| s.earliest_weeks);
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn points(n: usize) -> Vec<PriorityPoint> {
        (0..n)
            .map(|i| PriorityPoint {
                lon: 106.0 + i as f64 * 0.001,
                lat: -6.0,
                ruas: if i % 2 == 0 { "Merak" } else { "Cikupa" }.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_weeks_to_threshold() {
        assert_eq!(weeks_to_threshold(0.6, 0.5, 0.05), 2);
        assert_eq!(weeks_to_threshold(0.6, 0.45, 0.05), 3);
        assert_eq!(weeks_to_threshold(0.6, 0.59, 0.03), 1);
        assert_eq!(weeks_to_threshold(0.6, 0.6, 0.05), 0);
        assert_eq!(weeks_to_threshold(0.6, 0.7, 0.05), 0);
    }

    #[test]
    fn test_growth_rate_by_season() {
        assert_eq!(growth_rate(1), WET_SEASON_GROWTH_RATE);
        assert_eq!(growth_rate(12), WET_SEASON_GROWTH_RATE);
        assert_eq!(growth_rate(7), DRY_SEASON_GROWTH_RATE);
        assert!(WET_SEASON_GROWTH_RATE > DRY_SEASON_GROWTH_RATE);
    }

    #[test]
    fn test_simulation_stays_in_band_and_is_seeded() {
        let band = IndexBand::just_below(0.6).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let first = GrowthForecast::simulate(&points(40), 0.6, band, date, 3, &mut StdRng::seed_from_u64(7));
        let second = GrowthForecast::simulate(&points(40), 0.6, band, date, 3, &mut StdRng::seed_from_u64(7));
        assert_eq!(first, second);

        assert_eq!(first.predictions.len(), 40);
        for p in &first.predictions {
            assert!(band.contains(p.current_index));
            // 0.15 band at 0.05 per week: at most three weeks away
            assert!((1..=3).contains(&p.weeks_to_threshold));
            assert_eq!(p.expected_date, date + Duration::weeks(p.weeks_to_threshold as i64));
        }
        assert!(first
            .predictions
            .windows(2)
            .all(|w| w[0].weeks_to_threshold <= w[1].weeks_to_threshold));
    }

    #[test]
    fn test_by_segment() {
        let band = IndexBand::just_below(0.6).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let forecast = GrowthForecast::simulate(&points(10), 0.6, band, date, 1, &mut StdRng::seed_from_u64(1));
        let rollup = forecast.by_segment();
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup.iter().map(|s| s.point_count).sum::<usize>(), 10);
        for s in &rollup {
            assert!(s.mean_weeks >= s.earliest_weeks as f64);
        }
    }
}
