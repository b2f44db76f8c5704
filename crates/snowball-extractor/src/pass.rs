//! Relation extraction pass
//!
//! Runs one document's tagged sentences through windowing, role assignment
//! and the relation oracle, merging accepted predictions into a
//! [`TupleStore`].

use std::sync::Arc;

use serde::Serialize;
use snowball_core::{
    CandidatePair, EntityLabel, ExtractedTuple, Relation, RelationOracle, Result, SnowballError,
    TaggedSentence,
};

use crate::store::{MergeOutcome, TupleStore};
use crate::window::{EntityPairWindower, LabeledSpan};

/// Sentence progress is logged every this many sentences
const PROGRESS_EVERY: usize = 5;

/// Counters for one pass over a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    /// Sentences examined
    pub sentences: usize,
    /// Role-assigned candidates sent to the oracle
    pub candidates: usize,
    /// Predictions received
    pub predictions: usize,
    /// Predictions that passed relation and threshold filters
    pub accepted: usize,
    /// Accepted tuples whose key was new to the store
    pub added: usize,
}

impl std::ops::AddAssign for PassStats {
    fn add_assign(&mut self, other: Self) {
        self.sentences += other.sentences;
        self.candidates += other.candidates;
        self.predictions += other.predictions;
        self.accepted += other.accepted;
        self.added += other.added;
    }
}

/// Per-sentence extraction pipeline for one target relation
pub struct RelationExtractionPass {
    relation: Relation,
    threshold: f32,
    windower: EntityPairWindower,
    oracle: Arc<dyn RelationOracle>,
}

impl RelationExtractionPass {
    pub fn new(
        relation: Relation,
        threshold: f32,
        windower: EntityPairWindower,
        oracle: Arc<dyn RelationOracle>,
    ) -> Self {
        Self {
            relation,
            threshold,
            windower,
            oracle,
        }
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Labels that may take part in a pair for this relation
    fn interest_labels(&self) -> Vec<EntityLabel> {
        let mut labels = self.relation.subject_labels().to_vec();
        for label in self.relation.object_labels() {
            if !labels.contains(label) {
                labels.push(*label);
            }
        }
        labels
    }

    /// Extract tuples from `sentences` into `store`.
    ///
    /// Oracle failures propagate; they are not isolated per sentence.
    pub async fn run(
        &self,
        sentences: &[TaggedSentence],
        store: &mut TupleStore,
    ) -> Result<PassStats> {
        let interest = self.interest_labels();
        let mut stats = PassStats::default();

        for (index, sentence) in sentences.iter().enumerate() {
            stats.sentences += 1;
            if (index + 1) % PROGRESS_EVERY == 0 {
                tracing::debug!("Processed {} / {} sentences", index + 1, sentences.len());
            }

            let entities: Vec<LabeledSpan> = sentence
                .entities
                .iter()
                .filter_map(LabeledSpan::from_span)
                .filter(|e| self.relation.is_of_interest(e.label))
                .collect();
            if entities.is_empty() {
                continue;
            }

            let pairs = self.windower.pairs(sentence, &entities, &interest)?;
            let candidates = assign_roles(self.relation, &pairs);
            if candidates.is_empty() {
                continue;
            }

            stats += self.classify_sentence(sentence, &candidates, store).await?;
        }

        tracing::info!(
            sentences = stats.sentences,
            accepted = stats.accepted,
            added = stats.added,
            "Unique relations extracted: {} (overall: {})",
            stats.added,
            stats.accepted
        );

        Ok(stats)
    }

    async fn classify_sentence(
        &self,
        sentence: &TaggedSentence,
        candidates: &[CandidatePair],
        store: &mut TupleStore,
    ) -> Result<PassStats> {
        let predictions = self.oracle.classify(candidates).await?;
        if predictions.len() != candidates.len() {
            return Err(SnowballError::OracleError(format!(
                "expected {} predictions, got {}",
                candidates.len(),
                predictions.len()
            )));
        }

        let mut stats = PassStats {
            candidates: candidates.len(),
            predictions: predictions.len(),
            ..Default::default()
        };

        for (candidate, prediction) in candidates.iter().zip(predictions) {
            let relation_matches = self.relation.matches(&prediction.relation);
            let kept = relation_matches && prediction.confidence >= self.threshold;

            tracing::debug!(
                subject = %candidate.subject.text,
                object = %candidate.object.text,
                relation = %prediction.relation,
                confidence = prediction.confidence,
                kept,
                "relation prediction"
            );
            if relation_matches && !kept {
                tracing::debug!(
                    sentence = %sentence.text(),
                    "Confidence below threshold ({}). Skipping",
                    self.threshold
                );
            }
            if !kept {
                continue;
            }

            stats.accepted += 1;
            let tuple = ExtractedTuple::new(
                candidate.subject.text.clone(),
                candidate.object.text.clone(),
                prediction.relation,
                prediction.confidence,
            );

            match store.insert(tuple) {
                MergeOutcome::Inserted => {
                    stats.added += 1;
                    tracing::info!(
                        subject = %candidate.subject.text,
                        object = %candidate.object.text,
                        confidence = prediction.confidence,
                        "Appending new tuple"
                    );
                }
                MergeOutcome::Raised { previous } => {
                    tracing::debug!(
                        subject = %candidate.subject.text,
                        object = %candidate.object.text,
                        previous,
                        "Duplicate tuple with higher confidence, updating"
                    );
                }
                MergeOutcome::Unchanged => {
                    tracing::debug!(
                        subject = %candidate.subject.text,
                        object = %candidate.object.text,
                        "Duplicate tuple with lower confidence, ignoring"
                    );
                }
            }
        }

        Ok(stats)
    }
}

/// Assign subject/object roles to windowed pairs.
///
/// Both orientations are emitted when the labels allow both; ambiguity is
/// left for the oracle to resolve.
pub fn assign_roles(relation: Relation, pairs: &[CandidatePair]) -> Vec<CandidatePair> {
    let mut candidates = Vec::new();

    for pair in pairs {
        let first = pair.subject.label;
        let second = pair.object.label;

        if relation.is_subject(first) && relation.is_object(second) {
            candidates.push(pair.clone());
        }
        if relation.is_subject(second) && relation.is_object(first) {
            candidates.push(pair.swapped());
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowball_core::{EntitySpan, Prediction, Token, TupleKey};
    use std::sync::Mutex;

    /// Oracle answering from a fixed list, recording each batch
    struct ScriptedOracle {
        answers: Mutex<Vec<Vec<Prediction>>>,
        batches: Mutex<Vec<Vec<CandidatePair>>>,
    }

    impl ScriptedOracle {
        fn new(answers: Vec<Vec<Prediction>>) -> Self {
            Self {
                answers: Mutex::new(answers),
                batches: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl RelationOracle for ScriptedOracle {
        async fn classify(&self, batch: &[CandidatePair]) -> Result<Vec<Prediction>> {
            self.batches.lock().unwrap().push(batch.to_vec());
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                return Err(SnowballError::OracleError("no scripted answer".into()));
            }
            Ok(answers.remove(0))
        }
    }

    fn span(text: &str, label: &str, start: usize, end: usize) -> EntitySpan {
        EntitySpan {
            text: text.to_string(),
            label: label.to_string(),
            start,
            end,
        }
    }

    fn sentence(words: &[&str], entities: Vec<EntitySpan>) -> TaggedSentence {
        TaggedSentence {
            tokens: words
                .iter()
                .map(|w| {
                    if *w == "." || *w == "," {
                        Token::punct(*w)
                    } else {
                        Token::word(*w)
                    }
                })
                .collect(),
            entities,
        }
    }

    fn nadella_sentence() -> TaggedSentence {
        sentence(
            &["Satya", "Nadella", "leads", "Microsoft", "."],
            vec![span("Satya Nadella", "PERSON", 0, 2), span("Microsoft", "ORG", 3, 4)],
        )
    }

    fn run(
        relation: Relation,
        threshold: f32,
        oracle: Arc<ScriptedOracle>,
        sentences: &[TaggedSentence],
        store: &mut TupleStore,
    ) -> Result<PassStats> {
        let pass =
            RelationExtractionPass::new(relation, threshold, EntityPairWindower::default(), oracle);
        tokio_test::block_on(pass.run(sentences, store))
    }

    fn labeled_spans(sentence: &TaggedSentence) -> Vec<LabeledSpan> {
        sentence
            .entities
            .iter()
            .filter_map(LabeledSpan::from_span)
            .collect()
    }

    #[test]
    fn test_assign_roles_follows_relation_direction() {
        let windower = EntityPairWindower::default();
        let s = nadella_sentence();
        let entities = labeled_spans(&s);
        let pairs = windower
            .pairs(&s, &entities, &[EntityLabel::Person, EntityLabel::Organization])
            .unwrap();

        let work = assign_roles(Relation::WorkFor, &pairs);
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].subject.text, "Satya Nadella");

        let top = assign_roles(Relation::TopMemberEmployees, &pairs);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].subject.text, "Microsoft");
        assert_eq!(top[0].object.text, "Satya Nadella");
    }

    #[test]
    fn test_assign_roles_skips_same_side_pairs() {
        let windower = EntityPairWindower::default();
        let s = sentence(
            &["Allen", "met", "Gates"],
            vec![span("Allen", "PERSON", 0, 1), span("Gates", "PERSON", 2, 3)],
        );
        let entities = labeled_spans(&s);
        let pairs = windower.pairs(&s, &entities, &[EntityLabel::Person]).unwrap();

        assert_eq!(pairs.len(), 1);
        assert!(assign_roles(Relation::WorkFor, &pairs).is_empty());
    }

    #[test]
    fn test_accepted_prediction_lands_in_store() {
        let oracle = Arc::new(ScriptedOracle::new(vec![vec![Prediction::new(
            "per:employee_of",
            0.92,
        )]]));
        let mut store = TupleStore::new();

        let sentences = [nadella_sentence()];
        let stats = run(Relation::WorkFor, 0.7, oracle.clone(), &sentences, &mut store).unwrap();

        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.added, 1);
        assert_eq!(
            store.confidence(&TupleKey::new("Satya Nadella", "Microsoft", "per:employee_of")),
            Some(0.92)
        );
        assert_eq!(oracle.batches.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_relation_match_is_case_insensitive_but_text_is_kept() {
        let oracle = Arc::new(ScriptedOracle::new(vec![vec![Prediction::new(
            "PER:EMPLOYEE_OF",
            0.8,
        )]]));
        let mut store = TupleStore::new();

        run(Relation::WorkFor, 0.5, oracle, &[nadella_sentence()], &mut store).unwrap();

        let ranked = store.ranked();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].key.relation, "PER:EMPLOYEE_OF");
    }

    #[test]
    fn test_wrong_relation_and_low_confidence_are_dropped() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            vec![Prediction::new("per:schools_attended", 0.99)],
            vec![Prediction::new("per:employee_of", 0.69)],
        ]));
        let mut store = TupleStore::new();
        let sentences = [nadella_sentence(), nadella_sentence()];

        let stats = run(Relation::WorkFor, 0.7, oracle, &sentences, &mut store).unwrap();

        assert_eq!(stats.predictions, 2);
        assert_eq!(stats.accepted, 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let oracle = Arc::new(ScriptedOracle::new(vec![vec![Prediction::new(
            "per:employee_of",
            0.7,
        )]]));
        let mut store = TupleStore::new();

        run(Relation::WorkFor, 0.7, oracle, &[nadella_sentence()], &mut store).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sentences_without_candidates_skip_the_oracle() {
        let oracle = Arc::new(ScriptedOracle::new(Vec::new()));
        let mut store = TupleStore::new();
        let sentences = [
            sentence(&["Nothing", "here", "."], Vec::new()),
            sentence(
                &["In", "1975", "it", "rained"],
                vec![span("1975", "DATE", 1, 2)],
            ),
            sentence(
                &["Allen", "met", "Gates"],
                vec![span("Allen", "PERSON", 0, 1), span("Gates", "PERSON", 2, 3)],
            ),
        ];

        let stats = run(Relation::WorkFor, 0.5, oracle.clone(), &sentences, &mut store).unwrap();

        assert_eq!(stats.sentences, 3);
        assert_eq!(stats.candidates, 0);
        assert!(oracle.batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_one_batch_per_sentence() {
        let oracle = Arc::new(ScriptedOracle::new(vec![vec![
            Prediction::new("per:employee_of", 0.9),
            Prediction::new("per:employee_of", 0.4),
        ]]));
        let mut store = TupleStore::new();
        let s = sentence(
            &["Allen", "and", "Gates", "started", "Microsoft"],
            vec![
                span("Allen", "PERSON", 0, 1),
                span("Gates", "PERSON", 2, 3),
                span("Microsoft", "ORG", 4, 5),
            ],
        );

        let stats = run(Relation::WorkFor, 0.5, oracle.clone(), &[s], &mut store).unwrap();

        let batches = oracle.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(stats.accepted, 1);
        assert_eq!(store.ranked()[0].key.subject, "Allen");
    }

    #[test]
    fn test_prediction_count_mismatch_is_an_oracle_error() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Vec::new()]));
        let mut store = TupleStore::new();

        let sentences = [nadella_sentence()];
        let err = run(Relation::WorkFor, 0.5, oracle, &sentences, &mut store).unwrap_err();
        assert!(matches!(err, SnowballError::OracleError(_)));
    }

    #[test]
    fn test_stats_accumulate() {
        let mut total = PassStats::default();
        total += PassStats {
            sentences: 2,
            candidates: 3,
            predictions: 3,
            accepted: 1,
            added: 1,
        };
        total += PassStats {
            sentences: 1,
            ..Default::default()
        };
        assert_eq!(total.sentences, 3);
        assert_eq!(total.accepted, 1);
    }
}
