//! Pure dashboard arithmetic shared by the dashboard handlers.

use chrono::{Duration, NaiveDate};
use classsight_models::dashboard::{GradeBucket, GradeDistribution, GradeStats, Kpi, Trend};

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn round1(value: f64) -> f64 {
    round_to(value, 1)
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// The equally long period that ends the day before `start`.
pub fn previous_period(start: NaiveDate, end: NaiveDate) -> (NaiveDate, NaiveDate) {
    let days = (end - start).num_days() + 1;
    (start - Duration::days(days), start - Duration::days(1))
}

/// Averaged metric KPI. A missing or zero previous average yields no delta.
pub fn metric_kpi(label: &str, current: Option<f64>, previous: Option<f64>) -> Option<Kpi> {
    let current = current?;
    let delta = previous.filter(|p| *p != 0.0).map(|p| round1(current - p));
    Some(Kpi {
        label: label.to_string(),
        value: round1(current),
        delta,
        trend: Some(Trend::from_delta(delta)),
    })
}

pub fn sessions_kpi(current: i64, previous: Option<i64>) -> Kpi {
    Kpi {
        label: "Total Sessions".to_string(),
        value: current as f64,
        delta: previous.map(|p| (current - p) as f64),
        trend: None,
    }
}

/// Relative change in percent, 0 when there is nothing to compare against.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        round1((current - previous) / previous * 100.0)
    }
}

pub const GRADE_BUCKETS: usize = 10;

pub fn bucket_label(index: usize) -> String {
    if index + 1 >= GRADE_BUCKETS {
        "90-100".to_string()
    } else {
        format!("{}-{}", index * 10, index * 10 + 9)
    }
}

/// Bucket index for a percentage; 100 lands in the top bucket.
pub fn bucket_index(percentage: f64) -> usize {
    if percentage <= 0.0 || percentage.is_nan() {
        return 0;
    }
    ((percentage / 10.0).floor() as usize).min(GRADE_BUCKETS - 1)
}

/// Ten zero-filled buckets plus summary stats.
pub fn grade_distribution(percentages: &[f64]) -> GradeDistribution {
    let mut totals = [0i64; GRADE_BUCKETS];
    for p in percentages {
        totals[bucket_index(*p)] += 1;
    }
    let items = totals
        .iter()
        .enumerate()
        .map(|(i, count)| GradeBucket { range: bucket_label(i), count: *count })
        .collect();
    GradeDistribution { items, stats: grade_stats(percentages) }
}

pub fn grade_stats(percentages: &[f64]) -> GradeStats {
    if percentages.is_empty() {
        return GradeStats::default();
    }
    let sum: f64 = percentages.iter().sum();
    let min = percentages.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = percentages.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    GradeStats {
        avg: round1(sum / percentages.len() as f64),
        min: round1(min),
        max: round1(max),
        count: percentages.len() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn previous_period_has_same_length() {
        assert_eq!(previous_period(d(2024, 3, 8), d(2024, 3, 14)), (d(2024, 3, 1), d(2024, 3, 7)));
        assert_eq!(previous_period(d(2024, 3, 1), d(2024, 3, 1)), (d(2024, 2, 29), d(2024, 2, 29)));
    }

    #[test]
    fn metric_kpi_deltas() {
        let kpi = metric_kpi("Average Attention", Some(72.456), Some(70.0)).unwrap();
        assert_eq!(kpi.value, 72.5);
        assert_eq!(kpi.delta, Some(2.5));
        assert_eq!(kpi.trend, Some(Trend::Up));

        let kpi = metric_kpi("Average Attendance", Some(80.0), Some(0.0)).unwrap();
        assert_eq!(kpi.delta, None);
        assert_eq!(kpi.trend, Some(Trend::Neutral));

        assert!(metric_kpi("Average Attention", None, Some(1.0)).is_none());
    }

    #[test]
    fn sessions_delta_is_difference() {
        let kpi = sessions_kpi(5, Some(8));
        assert_eq!(kpi.value, 5.0);
        assert_eq!(kpi.delta, Some(-3.0));
    }

    #[test]
    fn percent_change_guards_zero() {
        assert_eq!(percent_change(110.0, 100.0), 10.0);
        assert_eq!(percent_change(50.0, 0.0), 0.0);
    }

    #[test]
    fn buckets() {
        assert_eq!(bucket_label(0), "0-9");
        assert_eq!(bucket_label(8), "80-89");
        assert_eq!(bucket_label(9), "90-100");
        assert_eq!(bucket_index(100.0), 9);
        assert_eq!(bucket_index(89.9), 8);
        assert_eq!(bucket_index(-3.0), 0);

        let dist = grade_distribution(&[95.0, 100.0, 4.0, 55.5]);
        assert_eq!(dist.items.len(), 10);
        assert_eq!(dist.items[0].count, 1);
        assert_eq!(dist.items[9].count, 2);
        assert_eq!(dist.items[5].count, 1);
        assert_eq!(dist.items[6].count, 0);
        assert_eq!(dist.stats.count, 4);
    }

    #[test]
    fn stats() {
        let stats = grade_stats(&[50.0, 75.0, 100.0]);
        assert_eq!(stats.avg, 75.0);
        assert_eq!(stats.min, 50.0);
        assert_eq!(stats.max, 100.0);
        assert_eq!(stats.count, 3);
        assert_eq!(grade_stats(&[]), GradeStats::default());
    }
}
