//! Date helpers for the Saudi school week (Friday to Thursday).

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Utc};

/// Friday..Thursday week containing `date`.
pub fn saudi_week_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let days_since_friday = (date.weekday().num_days_from_monday() + 3) % 7;
    let start = date - Duration::days(days_since_friday as i64);
    (start, start + Duration::days(6))
}

pub fn resolve_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    resolve_date_range_on(start, end, Utc::now().date_naive())
}

/// Missing bounds are filled from the week containing `today`.
pub fn resolve_date_range_on(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let (week_start, week_end) = saudi_week_range(today);
    (start.unwrap_or(week_start), end.unwrap_or(week_end))
}

/// `date_trunc` unit for a dashboard granularity. 30 minute buckets are
/// grouped by hour.
pub fn granularity_to_bucket(granularity: &str) -> &'static str {
    match granularity {
        "30m" | "hour" | "hourly" => "hour",
        "day" | "daily" => "day",
        "week" | "weekly" => "week",
        _ => "day",
    }
}

fn bucket_step(granularity: &str) -> Duration {
    match granularity {
        "30m" => Duration::minutes(30),
        "hour" | "hourly" => Duration::hours(1),
        "week" | "weekly" => Duration::weeks(1),
        _ => Duration::days(1),
    }
}

/// Bucket starts from `start` up to and including `end`.
pub fn time_buckets(start: NaiveDateTime, end: NaiveDateTime, granularity: &str) -> Vec<NaiveDateTime> {
    let step = bucket_step(granularity);
    let mut buckets = Vec::new();
    let mut current = start;
    while current <= end {
        buckets.push(current);
        current += step;
    }
    buckets
}

/// Look-back window for the `timeRange` query parameter; `None` means all time.
pub fn time_range_days(time_range: Option<&str>) -> Option<i64> {
    match time_range.unwrap_or("30d") {
        "7d" => Some(7),
        "90d" => Some(90),
        "all" => None,
        _ => Some(30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn week_runs_friday_to_thursday() {
        // 2024-03-13 is a Wednesday.
        let (start, end) = saudi_week_range(d(2024, 3, 13));
        assert_eq!(start, d(2024, 3, 8));
        assert_eq!(end, d(2024, 3, 14));
        assert_eq!(start.weekday(), chrono::Weekday::Fri);
        assert_eq!(end.weekday(), chrono::Weekday::Thu);
    }

    #[test]
    fn friday_starts_its_own_week() {
        let (start, end) = saudi_week_range(d(2024, 3, 15));
        assert_eq!(start, d(2024, 3, 15));
        assert_eq!(end, d(2024, 3, 21));

        let (start, _) = saudi_week_range(d(2024, 3, 14));
        assert_eq!(start, d(2024, 3, 8));
    }

    #[test]
    fn missing_bounds_default_to_week() {
        let today = d(2024, 3, 13);
        assert_eq!(resolve_date_range_on(None, None, today), (d(2024, 3, 8), d(2024, 3, 14)));
        assert_eq!(
            resolve_date_range_on(Some(d(2024, 1, 1)), None, today),
            (d(2024, 1, 1), d(2024, 3, 14))
        );
        assert_eq!(
            resolve_date_range_on(Some(d(2024, 1, 1)), Some(d(2024, 1, 31)), today),
            (d(2024, 1, 1), d(2024, 1, 31))
        );
    }

    #[test]
    fn granularity_mapping() {
        assert_eq!(granularity_to_bucket("30m"), "hour");
        assert_eq!(granularity_to_bucket("hourly"), "hour");
        assert_eq!(granularity_to_bucket("weekly"), "week");
        assert_eq!(granularity_to_bucket("month"), "day");
    }

    #[test]
    fn buckets_include_end() {
        let start = d(2024, 3, 1).and_hms_opt(8, 0, 0).unwrap();
        let end = d(2024, 3, 1).and_hms_opt(10, 0, 0).unwrap();
        assert_eq!(time_buckets(start, end, "hour").len(), 3);
        assert_eq!(time_buckets(start, end, "30m").len(), 5);
        assert_eq!(time_buckets(end, start, "day").len(), 0);
    }

    #[test]
    fn time_range_defaults_to_thirty_days() {
        assert_eq!(time_range_days(None), Some(30));
        assert_eq!(time_range_days(Some("7d")), Some(7));
        assert_eq!(time_range_days(Some("all")), None);
        assert_eq!(time_range_days(Some("bogus")), Some(30));
    }
}
