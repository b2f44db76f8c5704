//! Run report

use chrono::{DateTime, Utc};
use serde::Serialize;
use snowball_core::Relation;
use snowball_extractor::{PassStats, RankedTuple};
use uuid::Uuid;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The store reached the target count
    Success,
    /// Every stored tuple has been used as a query
    Exhausted,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Exhausted => "exhausted",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one expansion run
#[derive(Debug, Clone, Serialize)]
pub struct ExpansionOutcome {
    pub run_id: Uuid,
    pub relation: Relation,
    pub termination: Termination,

    /// Iterations that reached the search step
    pub iterations: usize,

    /// Queries issued, in order
    pub queries: Vec<String>,

    /// Distinct URLs attempted, including failed fetches
    pub urls_processed: usize,

    /// All stored tuples, highest confidence first
    pub tuples: Vec<RankedTuple>,

    /// Extraction counters summed over every page
    pub stats: PassStats,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExpansionOutcome {
    /// Tuples in report order
    pub fn ranked(&self) -> &[RankedTuple] {
        &self.tuples
    }

    /// Wall-clock duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Report lines, one per tuple
    pub fn report_lines(&self) -> Vec<String> {
        self.tuples.iter().map(format_tuple).collect()
    }
}

/// `Confidence: c | Subject: s | Object: o`
pub fn format_tuple(tuple: &RankedTuple) -> String {
    format!(
        "Confidence: {} \t| Subject: {} \t| Object: {}",
        tuple.confidence, tuple.key.subject, tuple.key.object
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowball_core::TupleKey;

    fn outcome(termination: Termination) -> ExpansionOutcome {
        let now = Utc::now();
        ExpansionOutcome {
            run_id: Uuid::new_v4(),
            relation: Relation::WorkFor,
            termination,
            iterations: 2,
            queries: vec!["bill gates microsoft".to_string()],
            urls_processed: 3,
            tuples: vec![
                RankedTuple {
                    key: TupleKey::new("Bill Gates", "Microsoft", "per:employee_of"),
                    confidence: 0.9,
                },
                RankedTuple {
                    key: TupleKey::new("Satya Nadella", "Microsoft", "per:employee_of"),
                    confidence: 0.8,
                },
            ],
            stats: PassStats::default(),
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_report_lines() {
        let lines = outcome(Termination::Success).report_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "Confidence: 0.9 \t| Subject: Bill Gates \t| Object: Microsoft"
        );
    }

    #[test]
    fn test_termination_display() {
        assert_eq!(Termination::Success.to_string(), "success");
        assert!(!Termination::Exhausted.is_success());
        assert_eq!(outcome(Termination::Exhausted).duration_ms(), 0);
    }
}
