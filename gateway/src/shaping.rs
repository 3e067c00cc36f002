//! Reshaping of analytics API payloads for the dashboard charts.

use std::cmp::Ordering;

use classsight_models::dashboard::{CorrelationEntry, LeaderboardEntry, Significance};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Number, Value};
use tracing::warn;

/// Cleans the id arrays of a chart filter body.
///
/// `bootcamp_ids` keeps numbers and numeric strings (as numbers);
/// `instructor_ids` drops nulls and empty strings. Anything else passes through.
pub fn sanitize_filters(body: Value) -> Value {
    let Value::Object(mut map) = body else {
        return body;
    };

    if let Some(Value::Array(ids)) = map.get_mut("bootcamp_ids") {
        let cleaned: Vec<Value> = ids.drain(..).filter_map(numeric_id).collect();
        *ids = cleaned;
    }
    if let Some(Value::Array(ids)) = map.get_mut("instructor_ids") {
        ids.retain(|id| !matches!(id, Value::Null) && id.as_str() != Some(""));
    }

    Value::Object(map)
}

fn numeric_id(value: Value) -> Option<Value> {
    let n = match value {
        Value::Number(n) => return Some(Value::Number(n)),
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    let number = if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Number::from(n as i64)
    } else {
        Number::from_f64(n)?
    };
    Some(Value::Number(number))
}

/// Orders by value, highest first, and assigns competition ranks (1, 2, 2, 4).
pub fn rank_leaderboard(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));

    let mut previous: Option<(f64, i64)> = None;
    for (idx, entry) in entries.iter_mut().enumerate() {
        let rank = match previous {
            Some((value, rank)) if value == entry.value => rank,
            _ => idx as i64 + 1,
        };
        entry.rank = Some(rank);
        previous = Some((entry.value, rank));
    }
    entries
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TierCount {
    pub name: &'static str,
    pub value: usize,
}

const TIERS: [(&str, f64); 4] = [
    ("Top 25%", 0.25),
    ("Second 25%", 0.5),
    ("Third 25%", 0.75),
    ("Bottom 25%", f64::INFINITY),
];

/// Counts ranked entries per quartile of the board length.
pub fn quartile_tiers(entries: &[LeaderboardEntry]) -> Vec<TierCount> {
    let n = entries.len() as f64;
    let mut lower = f64::NEG_INFINITY;
    TIERS
        .iter()
        .map(|&(name, fraction)| {
            let upper = n * fraction;
            let value = entries
                .iter()
                .enumerate()
                .map(|(idx, e)| e.rank.unwrap_or(idx as i64 + 1) as f64)
                .filter(|&rank| rank > lower && rank <= upper)
                .count();
            lower = upper;
            TierCount { name, value }
        })
        .collect()
}

/// Sum-based Pearson coefficient over paired samples; 0 when undefined.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let nf = n as f64;

    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
    let sum_x2: f64 = xs.iter().map(|x| x * x).sum();
    let sum_y2: f64 = ys.iter().map(|y| y * y).sum();

    let numerator = nf * sum_xy - sum_x * sum_y;
    let denominator = ((nf * sum_x2 - sum_x * sum_x) * (nf * sum_y2 - sum_y * sum_y)).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
    None,
}

impl CorrelationStrength {
    pub fn significance(self) -> Significance {
        match self {
            CorrelationStrength::Strong => Significance::High,
            CorrelationStrength::Moderate => Significance::Medium,
            CorrelationStrength::Weak => Significance::Low,
            CorrelationStrength::None => Significance::None,
        }
    }
}

pub fn correlation_strength(r: f64) -> CorrelationStrength {
    let abs = r.abs();
    if abs > 0.7 {
        CorrelationStrength::Strong
    } else if abs > 0.5 {
        CorrelationStrength::Moderate
    } else if abs > 0.3 {
        CorrelationStrength::Weak
    } else {
        CorrelationStrength::None
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CorrelationSummary {
    pub total: usize,
    pub strong: usize,
    pub positive: usize,
    pub negative: usize,
    pub average_strength: f64,
}

pub fn correlation_summary(matrix: &[CorrelationEntry]) -> CorrelationSummary {
    let total = matrix.len();
    let average_strength = if total == 0 {
        0.0
    } else {
        matrix.iter().map(|c| c.correlation.abs()).sum::<f64>() / total as f64
    };

    CorrelationSummary {
        total,
        strong: matrix.iter().filter(|c| c.correlation.abs() > 0.7).count(),
        positive: matrix.iter().filter(|c| c.correlation > 0.3).count(),
        negative: matrix.iter().filter(|c| c.correlation < -0.3).count(),
        average_strength,
    }
}

/// Decodes the array under `key` row by row, skipping rows that do not fit `T`.
fn decode_rows<T: DeserializeOwned>(data: &Value, key: &str) -> Vec<T> {
    let Some(rows) = data.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(row.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(key, index, error = %e, "dropping malformed row");
                None
            }
        })
        .collect()
}

/// Ranks both boards of an upstream leaderboard reply and adds tier counts.
pub fn shape_leaderboards(data: &Value) -> Value {
    let students = rank_leaderboard(decode_rows::<LeaderboardEntry>(data, "leaderboard_students"));
    let instructors = rank_leaderboard(decode_rows::<LeaderboardEntry>(data, "leaderboard_instructors"));

    let mut tiers = Map::new();
    tiers.insert("students".into(), serde_json::json!(quartile_tiers(&students)));
    tiers.insert("instructors".into(), serde_json::json!(quartile_tiers(&instructors)));

    serde_json::json!({
        "leaderboard_students": students,
        "leaderboard_instructors": instructors,
        "tiers": tiers,
    })
}

/// Adds a `summary` block to a correlation analysis reply.
///
/// The scatter coefficient is recomputed from the points so the chart header
/// agrees with what is drawn.
pub fn with_correlation_summary(mut data: Value) -> Value {
    let matrix: Vec<CorrelationEntry> = decode_rows(&data, "matrix");

    let (xs, ys): (Vec<f64>, Vec<f64>) = data
        .get("scatter")
        .and_then(Value::as_array)
        .map(|points| {
            points
                .iter()
                .filter_map(|p| Some((p.get("x_value")?.as_f64()?, p.get("y_value")?.as_f64()?)))
                .unzip()
        })
        .unwrap_or_default();

    let r = pearson(&xs, &ys);
    let strength = correlation_strength(r);
    if let Value::Object(map) = &mut data {
        map.insert(
            "summary".into(),
            serde_json::json!({
                "matrix": correlation_summary(&matrix),
                "scatter_correlation": r,
                "scatter_strength": strength,
                "scatter_significance": strength.significance(),
            }),
        );
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, value: f64) -> LeaderboardEntry {
        LeaderboardEntry { id: id.into(), name: id.to_uppercase(), value, rank: None }
    }

    fn corr(r: f64) -> CorrelationEntry {
        CorrelationEntry {
            variable1: "attendance".into(),
            variable2: "grades".into(),
            correlation: r,
            sample_size: 10,
            significance: Significance::from_coefficient(r),
        }
    }

    #[test]
    fn filters_keep_numeric_ids_only() {
        let body = json!({
            "bootcamp_ids": [1, "2", null, "abc", " 3 ", true, 4.5],
            "instructor_ids": ["a", "", null, "b"],
            "granularity": "daily",
        });
        let cleaned = sanitize_filters(body);
        assert_eq!(cleaned["bootcamp_ids"], json!([1, 2, 3, 4.5]));
        assert_eq!(cleaned["instructor_ids"], json!(["a", "b"]));
        assert_eq!(cleaned["granularity"], "daily");
    }

    #[test]
    fn non_array_filters_untouched() {
        let body = json!({ "bootcamp_ids": "7", "instructor_ids": null });
        assert_eq!(sanitize_filters(body.clone()), body);
        assert_eq!(sanitize_filters(json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn ties_share_competition_rank() {
        let ranked = rank_leaderboard(vec![entry("a", 70.0), entry("b", 90.0), entry("c", 90.0), entry("d", 50.0)]);
        let view: Vec<(&str, Option<i64>)> = ranked.iter().map(|e| (e.id.as_str(), e.rank)).collect();
        assert_eq!(view, vec![("b", Some(1)), ("c", Some(1)), ("a", Some(3)), ("d", Some(4))]);
    }

    #[test]
    fn tiers_split_by_rank_quartile() {
        let board = rank_leaderboard((1..=8).map(|i| entry(&i.to_string(), i as f64)).collect());
        let counts: Vec<usize> = quartile_tiers(&board).iter().map(|t| t.value).collect();
        assert_eq!(counts, vec![2, 2, 2, 2]);
        assert_eq!(quartile_tiers(&board)[3].name, "Bottom 25%");

        let empty: Vec<usize> = quartile_tiers(&[]).iter().map(|t| t.value).collect();
        assert_eq!(empty, vec![0, 0, 0, 0]);
    }

    #[test]
    fn pearson_matches_known_values() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[1.0], &[1.0]), 0.0);
        assert_eq!(pearson(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn strength_thresholds_are_exclusive() {
        assert_eq!(correlation_strength(0.71), CorrelationStrength::Strong);
        assert_eq!(correlation_strength(-0.7), CorrelationStrength::Moderate);
        assert_eq!(correlation_strength(0.5), CorrelationStrength::Weak);
        assert_eq!(correlation_strength(0.3), CorrelationStrength::None);
        assert_eq!(correlation_strength(-0.9).significance(), Significance::High);
    }

    #[test]
    fn summary_counts_matrix() {
        let summary = correlation_summary(&[corr(0.8), corr(-0.4), corr(0.1)]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.strong, 1);
        assert_eq!(summary.positive, 1);
        assert_eq!(summary.negative, 1);
        assert!((summary.average_strength - (1.3 / 3.0)).abs() < 1e-12);
        assert_eq!(correlation_summary(&[]).average_strength, 0.0);
    }

    #[test]
    fn leaderboards_default_to_empty() {
        let shaped = shape_leaderboards(&json!({ "leaderboard_students": [
            { "id": "s1", "name": "Ann", "value": 80.0, "rank": null },
            { "id": "s2", "name": "Bo", "value": 95.0, "rank": null }
        ]}));
        assert_eq!(shaped["leaderboard_students"][0]["id"], "s2");
        assert_eq!(shaped["leaderboard_students"][0]["rank"], 1);
        assert_eq!(shaped["leaderboard_instructors"], json!([]));
        assert_eq!(shaped["tiers"]["students"][0]["value"], 0);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let shaped = shape_leaderboards(&json!({ "leaderboard_students": [
            { "id": "a", "name": "A", "value": 90.0 },
            { "id": "b", "name": "B", "value": 80.0 },
            { "id": "c", "name": "C", "value": null },
            { "id": 7, "name": "D", "value": 70.0 }
        ]}));
        let students = shaped["leaderboard_students"].as_array().unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students[0]["id"], "a");
        assert_eq!(students[1]["rank"], 2);

        let data = json!({
            "scatter": [],
            "matrix": [
                { "variable1": "attendance", "variable2": "grades", "correlation": 0.9, "sample_size": 12, "significance": "high" },
                { "variable1": "attention", "variable2": "grades", "correlation": null, "sample_size": 12, "significance": "low" }
            ]
        });
        let shaped = with_correlation_summary(data);
        assert_eq!(shaped["summary"]["matrix"]["total"], 1);
        assert_eq!(shaped["summary"]["matrix"]["strong"], 1);
    }

    #[test]
    fn correlation_summary_attached() {
        let data = json!({
            "scatter": [
                { "x_value": 1.0, "y_value": 10.0, "label": "a", "size": 1, "category": "x" },
                { "x_value": 2.0, "y_value": 20.0, "label": "b", "size": 1, "category": "x" }
            ],
            "matrix": []
        });
        let shaped = with_correlation_summary(data);
        assert_eq!(shaped["summary"]["scatter_strength"], "strong");
        assert_eq!(shaped["summary"]["scatter_significance"], "high");
        assert_eq!(shaped["summary"]["matrix"]["total"], 0);
    }
}
