//! Entity pair windowing
//!
//! Turns the entities of one sentence into candidate pairs, each carrying the
//! clause-sized token window that encloses both entities. The window is
//! widened from the pair out to the nearest boundary punctuation on either
//! side and rejected when it would exceed the configured width.

use snowball_core::{
    CandidatePair, EntityLabel, EntitySpan, PairEntity, RelativeSpan, Result, SnowballError,
    TaggedSentence,
};

/// Entity span with a normalized label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSpan {
    pub text: String,
    pub label: EntityLabel,
    pub start: usize,
    pub end: usize,
}

impl LabeledSpan {
    pub fn new(text: impl Into<String>, label: EntityLabel, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            label,
            start,
            end,
        }
    }

    /// Normalize a tagger span; `None` when its label is unrecognized
    pub fn from_span(span: &EntitySpan) -> Option<Self> {
        let label = EntityLabel::normalize(&span.label)?;
        Some(Self::new(span.text.clone(), label, span.start, span.end))
    }
}

/// Builds bounded-context candidate pairs from a sentence's entities
#[derive(Debug, Clone, Copy)]
pub struct EntityPairWindower {
    window_size: usize,
}

impl EntityPairWindower {
    pub const DEFAULT_WINDOW_SIZE: usize = 40;

    pub fn new(window_size: usize) -> Self {
        Self { window_size }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Produce candidate pairs for every ordered entity pair `(i, j)`, `i < j`.
    ///
    /// Only entities whose label is in `interest` take part. The first entity
    /// of each pair is reported as `subject` and the second as `object`;
    /// role assignment happens later.
    ///
    /// Errors with [`SnowballError::InternalConsistency`] when an entity span
    /// does not fit the sentence or a zero-width span does not line up with
    /// its token.
    pub fn pairs(
        &self,
        sentence: &TaggedSentence,
        entities: &[LabeledSpan],
        interest: &[EntityLabel],
    ) -> Result<Vec<CandidatePair>> {
        let entities: Vec<&LabeledSpan> = entities
            .iter()
            .filter(|e| interest.contains(&e.label))
            .collect();

        for entity in &entities {
            check_bounds(entity, sentence.len())?;
        }

        let mut pairs = Vec::new();

        for (i, first) in entities.iter().enumerate() {
            for second in &entities[i + 1..] {
                if first.text.to_lowercase() == second.text.to_lowercase() {
                    continue;
                }

                // second must start strictly after first ends
                let Some(gap) = second.start.checked_sub(first.end) else {
                    continue;
                };
                if gap < 1 || gap > self.window_size {
                    continue;
                }

                let left = left_edge(sentence, first.start);
                let right = right_edge(sentence, second.end);
                if right - left > self.window_size {
                    continue;
                }

                let tokens: Vec<String> = sentence.tokens[left..right]
                    .iter()
                    .map(|t| t.text.clone())
                    .collect();

                let subject = relative_entity(first, left, &tokens)?;
                let object = relative_entity(second, left, &tokens)?;

                pairs.push(CandidatePair {
                    tokens,
                    subject,
                    object,
                });
            }
        }

        Ok(pairs)
    }
}

impl Default for EntityPairWindower {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW_SIZE)
    }
}

/// Token just after the nearest boundary punctuation before `start`
fn left_edge(sentence: &TaggedSentence, start: usize) -> usize {
    (0..start)
        .rev()
        .find(|&i| sentence.is_boundary(i))
        .map_or(0, |p| p + 1)
}

/// One past the nearest boundary punctuation at or after `end`
fn right_edge(sentence: &TaggedSentence, end: usize) -> usize {
    (end..sentence.len())
        .find(|&i| sentence.is_boundary(i))
        .map_or(sentence.len(), |p| p + 1)
}

fn check_bounds(entity: &LabeledSpan, sentence_len: usize) -> Result<()> {
    if entity.start > entity.end || entity.end > sentence_len {
        return Err(SnowballError::InternalConsistency(format!(
            "entity {:?} span [{}, {}) does not fit a sentence of {} tokens",
            entity.text, entity.start, entity.end, sentence_len
        )));
    }
    Ok(())
}

fn relative_entity(entity: &LabeledSpan, left: usize, tokens: &[String]) -> Result<PairEntity> {
    let span = RelativeSpan {
        start: entity.start - left,
        end: entity.end - left,
    };

    if span.start == span.end && tokens.get(span.start) != Some(&entity.text) {
        return Err(SnowballError::InternalConsistency(format!(
            "zero-width entity {:?} at window offset {} does not match token {:?}",
            entity.text,
            span.start,
            tokens.get(span.start)
        )));
    }

    Ok(PairEntity {
        text: entity.text.clone(),
        label: entity.label,
        span,
    })
}
