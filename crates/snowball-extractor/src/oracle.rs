//! Keyword relation oracle
//!
//! An offline [`RelationOracle`] that scores a candidate by looking for
//! trigger words in its window. Each pattern belongs to one relation and
//! only applies when the candidate's labels fit that relation's roles.

use snowball_core::{CandidatePair, Prediction, Relation, RelationOracle, Result};

/// Label emitted when no pattern fires
pub const NO_RELATION: &str = "no_relation";

/// Trigger words for one relation
#[derive(Debug, Clone)]
pub struct KeywordPattern {
    /// Relation predicted when a keyword is found
    pub relation: Relation,
    /// Lowercase trigger words or phrases
    pub keywords: Vec<String>,
    /// Confidence score
    pub confidence: f32,
}

/// Keyword-based relation classifier
pub struct KeywordOracle {
    patterns: Vec<KeywordPattern>,
}

impl KeywordOracle {
    /// Create an oracle with the default trigger words
    pub fn new() -> Self {
        let mut oracle = Self::empty();
        oracle.init_patterns();
        oracle
    }

    /// Create an oracle with no patterns; every candidate is `no_relation`
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    fn init_patterns(&mut self) {
        self.add_pattern(
            Relation::SchoolsAttended,
            vec![
                "attended", "graduated", "studied", "alumnus", "alumna", "enrolled", "degree",
                "dropped out",
            ],
            0.80,
        );
        self.add_pattern(
            Relation::WorkFor,
            vec![
                "works", "worked", "employee", "employed", "joined", "founded", "co-founded",
                "ceo", "chairman", "president", "engineer", "hired",
            ],
            0.75,
        );
        self.add_pattern(
            Relation::LiveIn,
            vec!["lives", "lived", "resides", "resided", "moved", "home", "grew up", "born"],
            0.70,
        );
        self.add_pattern(
            Relation::TopMemberEmployees,
            vec![
                "ceo", "founder", "founded", "chairman", "president", "chief", "executive",
                "director", "led by",
            ],
            0.80,
        );
    }

    /// Add a keyword pattern
    pub fn add_pattern(&mut self, relation: Relation, keywords: Vec<&str>, confidence: f32) {
        self.patterns.push(KeywordPattern {
            relation,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            confidence,
        });
    }

    /// Score a single candidate
    pub fn predict(&self, candidate: &CandidatePair) -> Prediction {
        let context = context_text(candidate);

        self.patterns
            .iter()
            .filter(|p| {
                p.relation.is_subject(candidate.subject.label)
                    && p.relation.is_object(candidate.object.label)
            })
            .filter(|p| p.keywords.iter().any(|k| context.contains(&format!(" {k} "))))
            .fold(None::<&KeywordPattern>, |best, p| match best {
                Some(b) if b.confidence >= p.confidence => Some(b),
                _ => Some(p),
            })
            .map(|p| Prediction::new(p.relation.as_str(), p.confidence))
            .unwrap_or_else(|| Prediction::new(NO_RELATION, 1.0))
    }
}

impl Default for KeywordOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RelationOracle for KeywordOracle {
    async fn classify(&self, batch: &[CandidatePair]) -> Result<Vec<Prediction>> {
        Ok(batch.iter().map(|c| self.predict(c)).collect())
    }
}

/// Lowercased tokens from the end of the first entity to the end of the
/// window, padded with spaces for whole-word matching
fn context_text(candidate: &CandidatePair) -> String {
    let first = if candidate.subject.span.start <= candidate.object.span.start {
        &candidate.subject
    } else {
        &candidate.object
    };

    let start = first.span.end.min(candidate.tokens.len());
    let words: Vec<String> = candidate.tokens[start..]
        .iter()
        .map(|t| t.to_lowercase())
        .collect();
    format!(" {} ", words.join(" "))
}
