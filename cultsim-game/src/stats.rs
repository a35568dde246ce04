//! Outcome aggregation: value distributions, percentiles and text histograms.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::constants::{HISTOGRAM_BAR_WIDTH, PERCENT_PLACES};
use crate::numbers::{
    count_to_f64, floor_f64_to_i64, floor_f64_to_usize, i64_to_f64, round_to_places, usize_to_f64,
};
use crate::result::OutcomeRecord;

/// Count of trials per observed value, ordered by value.
pub type Distribution = BTreeMap<i64, u64>;

/// Numeric field of an [`OutcomeRecord`] that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeField {
    Day,
    /// Bucketed by floor of the final stability.
    Stability,
    Power,
    Successes,
    Failures,
    Attachments,
}

impl OutcomeField {
    pub const REPORTED: [Self; 5] = [
        Self::Day,
        Self::Stability,
        Self::Power,
        Self::Successes,
        Self::Failures,
    ];

    #[must_use]
    pub fn value(self, record: &OutcomeRecord) -> i64 {
        match self {
            Self::Day => i64::from(record.day),
            Self::Stability => floor_f64_to_i64(record.stability),
            Self::Power => record.power,
            Self::Successes => i64::from(record.n_successes),
            Self::Failures => i64::from(record.n_failures),
            Self::Attachments => i64::from(record.attachments),
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Day => "Final day",
            Self::Stability => "End stability",
            Self::Power => "End power",
            Self::Successes => "Number successes",
            Self::Failures => "Number failures",
            Self::Attachments => "Attachments left",
        }
    }
}

/// Tally one field over a set of records.
#[must_use]
pub fn build_distribution(records: &[OutcomeRecord], field: OutcomeField) -> Distribution {
    let mut dist = Distribution::new();
    for record in records {
        *dist.entry(field.value(record)).or_insert(0) += 1;
    }
    dist
}

/// Expand a distribution back into its sorted sample values.
#[must_use]
pub fn expand(dist: &Distribution) -> Vec<i64> {
    dist.iter()
        .flat_map(|(value, count)| {
            std::iter::repeat_n(*value, usize::try_from(*count).unwrap_or(usize::MAX))
        })
        .collect()
}

/// Linear-interpolated percentile of sorted values, `fraction` in `0.0..=1.0`.
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn percentile(sorted: &[i64], fraction: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = usize_to_f64(last) * fraction.clamp(0.0, 1.0);
    let lower = floor_f64_to_usize(rank).min(last);
    let upper = floor_f64_to_usize(rank.ceil()).min(last);
    let low = i64_to_f64(sorted[lower]);
    if lower == upper {
        return Some(low);
    }
    let high = i64_to_f64(sorted[upper]);
    let weight = rank - usize_to_f64(lower);
    Some(low + (high - low) * weight)
}

/// Five-number summary plus mean of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: u64,
    pub min: i64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: i64,
    pub mean: f64,
}

/// Summarize a distribution; `None` when it is empty.
#[must_use]
pub fn summarize(dist: &Distribution) -> Option<Summary> {
    let (&min, _) = dist.first_key_value()?;
    let (&max, _) = dist.last_key_value()?;
    let values = expand(dist);
    let count: u64 = dist.values().sum();
    let total: f64 = dist
        .iter()
        .map(|(value, n)| i64_to_f64(*value) * count_to_f64(*n))
        .sum();
    Some(Summary {
        count,
        min,
        p25: percentile(&values, 0.25)?,
        median: percentile(&values, 0.5)?,
        p75: percentile(&values, 0.75)?,
        max,
        mean: total / count_to_f64(count),
    })
}

/// One bucket of a rendered histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramRow {
    pub value: i64,
    pub count: u64,
    pub percent: f64,
    pub cumulative_percent: f64,
    pub bar: usize,
}

/// Histogram rows for every integer from the smallest to the largest
/// observed value, empty buckets included. Bars scale to the fullest bucket.
#[must_use]
pub fn histogram_rows(dist: &Distribution) -> Vec<HistogramRow> {
    let (Some((&min, _)), Some((&max, _))) = (dist.first_key_value(), dist.last_key_value())
    else {
        return Vec::new();
    };
    let fullest = dist.values().copied().max().unwrap_or(1).max(1);
    let total = dist.values().sum::<u64>().max(1);

    let mut cumulative = 0.0;
    (min..=max)
        .map(|value| {
            let count = dist.get(&value).copied().unwrap_or(0);
            let percent = round_to_places(
                count_to_f64(count) / count_to_f64(total) * 100.0,
                PERCENT_PLACES,
            );
            cumulative += percent;
            let bar = floor_f64_to_usize(
                count_to_f64(count) / count_to_f64(fullest) * usize_to_f64(HISTOGRAM_BAR_WIDTH),
            );
            HistogramRow {
                value,
                count,
                percent,
                cumulative_percent: cumulative,
                bar,
            }
        })
        .collect()
}

/// Summary lines followed by one bar per bucket.
#[must_use]
pub fn render_histogram(dist: &Distribution) -> String {
    let mut out = String::new();
    if let Some(summary) = summarize(dist) {
        out.push_str(&render_summary(&summary));
    }
    for row in histogram_rows(dist) {
        writeln!(out, "{}", render_row(&row)).expect("write histogram row");
    }
    out
}

#[must_use]
pub fn render_summary(summary: &Summary) -> String {
    format!(
        "Vals: {}, {}, {}, {}, {}\nMean: {}\n",
        summary.min, summary.p25, summary.median, summary.p75, summary.max, summary.mean
    )
}

#[must_use]
pub fn render_row(row: &HistogramRow) -> String {
    format!(
        "{:>4}: {:<width$} ({:>6.2}% -> {:>6.2}%)",
        row.value,
        "#".repeat(row.bar),
        row.percent,
        row.cumulative_percent,
        width = HISTOGRAM_BAR_WIDTH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(pairs: &[(i64, u64)]) -> Distribution {
        pairs.iter().copied().collect()
    }

    #[test]
    fn percentile_interpolates_between_neighbors() {
        let values = [10, 20, 30, 40];
        assert_eq!(percentile(&values, 0.0), Some(10.0));
        assert_eq!(percentile(&values, 1.0), Some(40.0));
        assert_eq!(percentile(&values, 0.5), Some(25.0));
        let p25 = percentile(&values, 0.25).unwrap();
        assert!((p25 - 17.5).abs() < 1e-9);
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(percentile(&[7], 0.9), Some(7.0));
    }

    #[test]
    fn summary_matches_expanded_values() {
        let summary = summarize(&dist(&[(1, 1), (2, 2), (5, 1)])).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.min, 1);
        assert_eq!(summary.max, 5);
        assert!((summary.median - 2.0).abs() < 1e-9);
        assert!((summary.mean - 2.5).abs() < 1e-9);
        assert!(summarize(&Distribution::new()).is_none());
    }

    #[test]
    fn histogram_covers_gaps_and_sums_to_hundred() {
        let rows = histogram_rows(&dist(&[(3, 2), (6, 1)]));
        let values: Vec<i64> = rows.iter().map(|row| row.value).collect();
        assert_eq!(values, vec![3, 4, 5, 6]);
        assert_eq!(rows[0].bar, HISTOGRAM_BAR_WIDTH);
        assert_eq!(rows[1].bar, 0);
        assert_eq!(rows[3].bar, HISTOGRAM_BAR_WIDTH / 2);
        let last = rows.last().unwrap();
        assert!((last.cumulative_percent - 100.0).abs() <= 0.5);
    }

    #[test]
    fn histogram_text_has_summary_and_rows() {
        let text = render_histogram(&dist(&[(-2, 1), (0, 3)]));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Vals: -2, -0.5, 0, 0, 0");
        assert_eq!(lines[1], "Mean: -0.5");
        assert_eq!(lines.len(), 5);
        assert!(lines[2].starts_with("  -2: ##########"));
        assert!(lines[4].ends_with("( 75.00% -> 100.00%)"));
    }

    #[test]
    fn stability_buckets_floor_negative_values() {
        let record = OutcomeRecord {
            success: false,
            ending: crate::result::Ending::Destabilized,
            attachments: 4,
            day: 30,
            stability: 39.7,
            power: 350,
            n_successes: 5,
            n_failures: 3,
            insured_retries: 0,
            willpower_pills_left: 0,
            insurance_left: 0,
            log: Vec::new(),
        };
        let below_zero = OutcomeRecord {
            stability: -0.25,
            ..record.clone()
        };
        let stability = build_distribution(&[record, below_zero], OutcomeField::Stability);
        assert_eq!(stability, dist(&[(-1, 1), (39, 1)]));
    }
}
