use chrono::{DateTime, NaiveDate, TimeZone};
use indexmap::IndexMap;

use super::models::{DailySummary, ForecastSample, TemperatureRange};
use crate::openweather::WeatherCondition;

/// Collapse 3-hour samples into one summary per calendar date.
///
/// Dates are taken in `tz` and emitted in the order they first appear in
/// `samples`; the result is truncated to `days`. Pure and deterministic:
/// no clock is read besides each sample's own timestamp.
pub fn aggregate_daily<Tz: TimeZone>(
    samples: &[ForecastSample],
    tz: &Tz,
    days: usize,
) -> Vec<DailySummary> {
    group_by_date(samples, tz)
        .into_iter()
        .take(days)
        .filter_map(|(date, items)| summarize_day(date, &items))
        .collect()
}

/// Partition samples by local date, preserving first-seen order of dates
fn group_by_date<'a, Tz: TimeZone>(
    samples: &'a [ForecastSample],
    tz: &Tz,
) -> IndexMap<NaiveDate, Vec<&'a ForecastSample>> {
    let mut groups: IndexMap<NaiveDate, Vec<&ForecastSample>> = IndexMap::new();

    for sample in samples {
        let Some(utc) = DateTime::from_timestamp(sample.timestamp, 0) else {
            tracing::debug!(timestamp = sample.timestamp, "Skipping sample with invalid timestamp");
            continue;
        };
        let date = utc.with_timezone(tz).date_naive();
        groups.entry(date).or_default().push(sample);
    }

    groups
}

fn summarize_day(date: NaiveDate, items: &[&ForecastSample]) -> Option<DailySummary> {
    let condition = representative_condition(items)?.clone();
    let n = items.len() as f64;

    let temp_min = items
        .iter()
        .map(|s| s.temperature)
        .fold(f64::INFINITY, f64::min);
    let temp_max = items
        .iter()
        .map(|s| s.temperature)
        .fold(f64::NEG_INFINITY, f64::max);
    let temp_avg = items.iter().map(|s| s.temperature).sum::<f64>() / n;

    let humidity_avg = items.iter().map(|s| s.humidity as f64).sum::<f64>() / n;
    let wind_avg = items.iter().map(|s| s.wind_speed).sum::<f64>() / n;
    let pop_max = items
        .iter()
        .map(|s| s.precipitation_probability)
        .fold(0.0, f64::max);

    Some(DailySummary {
        date,
        temp: TemperatureRange {
            min: temp_min,
            max: temp_max,
            // Keep the mean inside [min, max] despite float summation error
            avg: temp_avg.clamp(temp_min, temp_max),
        },
        condition,
        humidity: humidity_avg.round() as u32,
        wind_speed: wind_avg,
        precipitation_probability: pop_max,
        sample_count: items.len(),
    })
}

/// Mode of the condition codes; on equal counts the code seen first wins.
/// Returns the condition of that code's first sample.
fn representative_condition<'a>(items: &[&'a ForecastSample]) -> Option<&'a WeatherCondition> {
    let mut counts: IndexMap<u32, (usize, &'a WeatherCondition)> = IndexMap::new();
    for &sample in items {
        counts
            .entry(sample.condition.id)
            .or_insert((0, &sample.condition))
            .0 += 1;
    }

    let mut best: Option<(usize, &'a WeatherCondition)> = None;
    for (count, condition) in counts.into_values() {
        // strictly greater: ties keep the earlier code
        if best.map_or(true, |(best_count, _)| count > best_count) {
            best = Some((count, condition));
        }
    }
    best.map(|(_, condition)| condition)
}
