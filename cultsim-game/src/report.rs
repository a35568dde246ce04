//! Batch report: success tally plus a histogram section per outcome field.
use serde::Serialize;
use std::fmt::Write as _;

use crate::constants::PERCENT_PLACES;
use crate::numbers::{round_to_places, usize_to_f64};
use crate::result::{Ending, OutcomeRecord};
use crate::stats::{
    HistogramRow, OutcomeField, Summary, build_distribution, histogram_rows, render_row,
    render_summary, summarize,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EndingCounts {
    pub cleared: usize,
    pub destabilized: usize,
    pub day_cap: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub title: &'static str,
    pub field: OutcomeField,
    pub summary: Option<Summary>,
    pub histogram: Vec<HistogramRow>,
}

impl ReportSection {
    #[must_use]
    pub fn build(records: &[OutcomeRecord], field: OutcomeField) -> Self {
        let dist = build_distribution(records, field);
        Self {
            title: field.title(),
            field,
            summary: summarize(&dist),
            histogram: histogram_rows(&dist),
        }
    }

    /// Summary and histogram lines without the title.
    #[must_use]
    pub fn render_body(&self) -> String {
        let mut out = self.summary.as_ref().map(render_summary).unwrap_or_default();
        for row in &self.histogram {
            writeln!(out, "{}", render_row(row)).expect("write histogram row");
        }
        out
    }
}

/// Everything printed about one batch, serializable for machine consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    pub seed: u64,
    pub max_days: u32,
    pub trials: usize,
    pub successes: usize,
    pub failures: usize,
    pub success_pct: f64,
    pub endings: EndingCounts,
    pub sections: Vec<ReportSection>,
}

impl BatchReport {
    #[must_use]
    pub fn from_records(records: &[OutcomeRecord], seed: u64, max_days: u32) -> Self {
        let mut endings = EndingCounts::default();
        for record in records {
            match record.ending {
                Ending::Cleared => endings.cleared += 1,
                Ending::Destabilized => endings.destabilized += 1,
                Ending::DayCap => endings.day_cap += 1,
            }
        }
        let trials = records.len();
        let successes = records.iter().filter(|record| record.success).count();
        let success_pct = if trials == 0 {
            0.0
        } else {
            round_to_places(
                usize_to_f64(successes) / usize_to_f64(trials) * 100.0,
                PERCENT_PLACES,
            )
        };
        Self {
            scenario: None,
            seed,
            max_days,
            trials,
            successes,
            failures: trials - successes,
            success_pct,
            endings,
            sections: OutcomeField::REPORTED
                .iter()
                .map(|field| ReportSection::build(records, *field))
                .collect(),
        }
    }

    #[must_use]
    pub fn with_scenario(mut self, name: impl Into<String>) -> Self {
        self.scenario = Some(name.into());
        self
    }

    #[must_use]
    pub fn headline(&self) -> String {
        format!(
            "{} successes, {} failures ({}%)",
            self.successes, self.failures, self.success_pct
        )
    }

    /// Plain-text rendering: headline, then each titled section.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = self.headline();
        out.push('\n');
        for section in &self.sections {
            writeln!(out, "{}:", section.title).expect("write section title");
            out.push_str(&section.render_body());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(success: bool, day: u32, stability: f64) -> OutcomeRecord {
        OutcomeRecord {
            success,
            ending: if success {
                Ending::Cleared
            } else {
                Ending::Destabilized
            },
            attachments: u32::from(!success),
            day,
            stability,
            power: 340,
            n_successes: 9,
            n_failures: 2,
            insured_retries: 0,
            willpower_pills_left: 0,
            insurance_left: 0,
            log: Vec::new(),
        }
    }

    #[test]
    fn headline_counts_successes() {
        let records = [
            record(true, 30, 55.2),
            record(true, 32, 51.0),
            record(false, 40, 39.5),
        ];
        let report = BatchReport::from_records(&records, 4, 200);
        assert_eq!(report.successes, 2);
        assert_eq!(report.failures, 1);
        assert!((report.success_pct - 66.67).abs() < 1e-9);
        assert_eq!(report.headline(), "2 successes, 1 failures (66.67%)");
        assert_eq!(report.endings.destabilized, 1);
        assert_eq!(report.sections.len(), 5);
    }

    #[test]
    fn text_lists_sections_in_order() {
        let report = BatchReport::from_records(&[record(true, 30, 55.2)], 1, 200);
        let text = report.render_text();
        let titles: Vec<&str> = text
            .lines()
            .filter(|line| line.ends_with(':') && !line.starts_with(' '))
            .collect();
        assert_eq!(
            titles,
            vec![
                "Final day:",
                "End stability:",
                "End power:",
                "Number successes:",
                "Number failures:"
            ]
        );
    }

    #[test]
    fn empty_batch_reports_zero_percent() {
        let report = BatchReport::from_records(&[], 0, 200);
        assert_eq!(report.trials, 0);
        assert!(report.success_pct.abs() < f64::EPSILON);
        assert!(report.sections.iter().all(|section| section.summary.is_none()));
    }

    #[test]
    fn json_carries_seed_and_scenario() {
        let report = BatchReport::from_records(&[record(false, 10, 38.0)], 77, 50)
            .with_scenario("odds");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["seed"], 77);
        assert_eq!(json["scenario"], "odds");
        assert_eq!(json["sections"][0]["field"], "day");
    }
}
