//! Simulated historical trend of the maintenance area.
//!
//! There is no history store; the series is a straight decline from 1.5x
//! the current area to the current area over twelve weeks, plus Gaussian
//! noise with a standard deviation of 10% of the area, clipped at zero.

use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

pub const TREND_WEEKS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendSample {
    pub date: NaiveDate,
    pub area_ha: f64,
}

/// Weekly dates ending on the last Sunday on or before `end`
pub fn weekly_dates(end: NaiveDate, periods: usize) -> Vec<NaiveDate> {
    let last_sunday = end - Duration::days(end.weekday().num_days_from_sunday() as i64);
    (0..periods)
        .rev()
        .map(|back| last_sunday - Duration::weeks(back as i64))
        .collect()
}

pub fn simulate_history<R: Rng>(
    area_ha: f64,
    end: NaiveDate,
    rng: &mut R,
) -> Vec<TrendSample> {
    let dates = weekly_dates(end, TREND_WEEKS);
    let start = area_ha * 1.5;
    let step = (area_ha - start) / (TREND_WEEKS - 1) as f64;
    let noise = Normal::new(0.0, area_ha.abs() * 0.1).ok();

    dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let jitter = noise.as_ref().map(|n| n.sample(&mut *rng)).unwrap_or(0.0);
            TrendSample {
                date,
                area_ha: (start + step * i as f64 + jitter).max(0.0),
            }
        })
        .collect()
}
