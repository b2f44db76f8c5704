//! Clients for remote tagging and relation classification services
//!
//! Both speak JSON over HTTP. The oracle wire format follows SpanBERT-style
//! examples, where entity spans are `[start, end]` with an inclusive end.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use snowball_core::{
    CandidatePair, OracleConfig, PairEntity, Prediction, RelationOracle, Result, SnowballError,
    TaggedSentence, Tagger, TaggerConfig,
};
use std::time::Duration;

// ============================================================================
// Tagger
// ============================================================================

/// Remote sentence segmentation / NER service client
pub struct HttpTagger {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct TagRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TagResponse {
    sentences: Vec<TaggedSentence>,
}

impl HttpTagger {
    /// Create a new tagger client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SnowballError::TaggerError(format!("Failed to build client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create from config
    pub fn from_config(config: &TaggerConfig) -> Result<Self> {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl Tagger for HttpTagger {
    async fn segment_and_tag(&self, text: &str) -> Result<Vec<TaggedSentence>> {
        let response = self
            .client
            .post(format!("{}/tag", self.base_url))
            .json(&TagRequest { text })
            .send()
            .await
            .map_err(|e| SnowballError::TaggerError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SnowballError::TaggerError(format!("Tagger error: {error_text}")));
        }

        let result: TagResponse = response
            .json()
            .await
            .map_err(|e| SnowballError::TaggerError(format!("Failed to parse response: {e}")))?;

        Ok(result.sentences)
    }
}

// ============================================================================
// Oracle
// ============================================================================

/// Remote relation classifier client
pub struct HttpOracle {
    client: Client,
    base_url: String,
}

/// Entity as `[text, label, [start, end_inclusive]]`
type WireEntity<'a> = (&'a str, &'static str, (usize, usize));

#[derive(Debug, Serialize)]
struct WireExample<'a> {
    tokens: &'a [String],
    subj: WireEntity<'a>,
    obj: WireEntity<'a>,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    examples: Vec<WireExample<'a>>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    /// `[label, confidence]` per example
    predictions: Vec<(String, f32)>,
}

fn wire_entity(entity: &PairEntity) -> WireEntity<'_> {
    let end_inclusive = entity.span.end.max(entity.span.start + 1) - 1;
    (
        entity.text.as_str(),
        entity.label.as_str(),
        (entity.span.start, end_inclusive),
    )
}

fn build_request(batch: &[CandidatePair]) -> PredictRequest<'_> {
    PredictRequest {
        examples: batch
            .iter()
            .map(|candidate| WireExample {
                tokens: &candidate.tokens,
                subj: wire_entity(&candidate.subject),
                obj: wire_entity(&candidate.object),
            })
            .collect(),
    }
}

/// Convert a response body into predictions, checking the count
fn parse_predictions(body: &str, expected: usize) -> Result<Vec<Prediction>> {
    let response: PredictResponse = serde_json::from_str(body)
        .map_err(|e| SnowballError::OracleError(format!("Failed to parse response: {e}")))?;

    if response.predictions.len() != expected {
        return Err(SnowballError::OracleError(format!(
            "expected {expected} predictions, got {}",
            response.predictions.len()
        )));
    }

    Ok(response
        .predictions
        .into_iter()
        .map(|(relation, confidence)| Prediction::new(relation, confidence))
        .collect())
}

impl HttpOracle {
    /// Create a new oracle client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SnowballError::OracleError(format!("Failed to build client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create from config
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl RelationOracle for HttpOracle {
    async fn classify(&self, batch: &[CandidatePair]) -> Result<Vec<Prediction>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(&build_request(batch))
            .send()
            .await
            .map_err(|e| SnowballError::OracleError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SnowballError::OracleError(format!("Oracle error: {error_text}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SnowballError::OracleError(format!("Failed to read response: {e}")))?;

        parse_predictions(&body, batch.len())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use snowball_core::{EntityLabel, RelativeSpan};

    fn gates_candidate() -> CandidatePair {
        CandidatePair {
            tokens: ["Bill", "Gates", "founded", "Microsoft", "."]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            subject: PairEntity {
                text: "Bill Gates".to_string(),
                label: EntityLabel::Person,
                span: RelativeSpan { start: 0, end: 2 },
            },
            object: PairEntity {
                text: "Microsoft".to_string(),
                label: EntityLabel::Organization,
                span: RelativeSpan { start: 3, end: 4 },
            },
        }
    }

    #[test]
    fn test_request_uses_inclusive_span_ends() {
        let batch = vec![gates_candidate()];
        let json = serde_json::to_value(build_request(&batch)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "examples": [{
                    "tokens": ["Bill", "Gates", "founded", "Microsoft", "."],
                    "subj": ["Bill Gates", "PERSON", [0, 1]],
                    "obj": ["Microsoft", "ORGANIZATION", [3, 3]]
                }]
            })
        );
    }

    #[test]
    fn test_parse_predictions() {
        let body = r#"{"predictions": [["per:employee_of", 0.93], ["no_relation", 0.99]]}"#;
        let predictions = parse_predictions(body, 2).unwrap();

        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].relation, "per:employee_of");
        assert!((predictions[0].confidence - 0.93).abs() < 1e-6);
        assert_eq!(predictions[1].relation, "no_relation");
    }

    #[test]
    fn test_prediction_count_mismatch() {
        let body = r#"{"predictions": [["per:employee_of", 0.93]]}"#;
        let err = parse_predictions(body, 2).unwrap_err();
        assert!(matches!(err, SnowballError::OracleError(_)));
    }

    #[test]
    fn test_tag_response_parsing() {
        let body = r#"{
            "sentences": [{
                "tokens": [
                    {"text": "Satya", "is_punct": false},
                    {"text": "Nadella", "is_punct": false},
                    {"text": "leads", "is_punct": false},
                    {"text": "Microsoft", "is_punct": false},
                    {"text": ".", "is_punct": true}
                ],
                "entities": [
                    {"text": "Satya Nadella", "label": "PERSON", "start": 0, "end": 2},
                    {"text": "Microsoft", "label": "ORG", "start": 3, "end": 4}
                ]
            }]
        }"#;

        let response: TagResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.sentences.len(), 1);
        assert!(response.sentences[0].is_boundary(4));
        assert_eq!(response.sentences[0].entities[1].label, "ORG");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let oracle = HttpOracle::new("http://localhost:8002/", Duration::from_secs(5)).unwrap();
        assert_eq!(oracle.base_url, "http://localhost:8002");
    }

    #[test]
    fn test_empty_batch_skips_the_service() {
        let oracle = HttpOracle::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let predictions = tokio_test::block_on(oracle.classify(&[])).unwrap();
        assert!(predictions.is_empty());
    }
}
