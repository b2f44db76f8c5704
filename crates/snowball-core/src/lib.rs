//! Snowball Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the snowball system:
//! - Common error types
//! - Entity labels and the fixed relation table
//! - Tagged sentences, candidate pairs and extracted tuples
//! - Collaborator traits (search, fetch, tagging, relation classification)
//! - Configuration management

pub mod config;
pub mod relation;

pub use config::{
    AppConfig, ConfigError, ExtractionConfig, FetchConfig, LoggingConfig, OracleConfig,
    OracleProvider, SearchConfig, TaggerConfig, TaggerProvider,
};
pub use relation::Relation;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for snowball operations
#[derive(Error, Debug)]
pub enum SnowballError {
    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Tagger error: {0}")]
    TaggerError(String),

    #[error("Oracle error: {0}")]
    OracleError(String),

    /// A broken invariant inside the extraction pipeline, never caused by user input
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SnowballError>;

/// Failure to retrieve a single page.
///
/// These are recoverable at URL granularity: the orchestrator logs them and
/// moves on to the next search result.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error {status}")]
    Http { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode page body: {0}")]
    Decode(String),

    #[error("fetch failed: {0}")]
    Other(String),
}

impl FetchError {
    /// Short classification used in log events
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Http { .. } => "http",
            Self::Network(_) => "network",
            Self::Decode(_) | Self::Other(_) => "other",
        }
    }
}

// ============================================================================
// Entity Labels
// ============================================================================

/// Normalized entity labels understood by the relation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityLabel {
    Person,
    Organization,
    Location,
    City,
    Country,
    StateOrProvince,
    Date,
}

impl EntityLabel {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Organization => "ORGANIZATION",
            Self::Location => "LOCATION",
            Self::City => "CITY",
            Self::Country => "COUNTRY",
            Self::StateOrProvince => "STATE_OR_PROVINCE",
            Self::Date => "DATE",
        }
    }

    /// Normalize a raw tagger label.
    ///
    /// Accepts both the short OntoNotes-style labels a tagger emits
    /// (`ORG`, `GPE`, `LOC`, ...) and the canonical names. Returns `None`
    /// for labels no relation can use.
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PERSON" | "PER" => Some(Self::Person),
            "ORG" | "ORGANIZATION" => Some(Self::Organization),
            "GPE" | "LOC" | "LOCATION" => Some(Self::Location),
            "CITY" => Some(Self::City),
            "COUNTRY" => Some(Self::Country),
            "STATE_OR_PROVINCE" => Some(Self::StateOrProvince),
            "DATE" => Some(Self::Date),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Search and Document Models
// ============================================================================

/// One ranked web search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            snippet: String::new(),
        }
    }
}

/// A single token of a tagged sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,

    /// Whether the token is punctuation that bounds a clause
    #[serde(default)]
    pub is_punct: bool,
}

impl Token {
    pub fn word(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_punct: false,
        }
    }

    pub fn punct(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_punct: true,
        }
    }
}

/// Entity span as produced by a tagger, with sentence-relative token offsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub text: String,

    /// Raw tagger label, normalized later via [`EntityLabel::normalize`]
    pub label: String,

    /// First token of the span
    pub start: usize,

    /// One past the last token of the span
    pub end: usize,
}

/// A segmented sentence with its recognized entities, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedSentence {
    pub tokens: Vec<Token>,
    pub entities: Vec<EntitySpan>,
}

impl TaggedSentence {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Whether the token at `index` is boundary punctuation
    pub fn is_boundary(&self, index: usize) -> bool {
        self.tokens.get(index).is_some_and(|t| t.is_punct)
    }

    /// Sentence text with tokens joined by single spaces
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Extraction Models
// ============================================================================

/// Token span relative to the start of a candidate window (end exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeSpan {
    pub start: usize,
    pub end: usize,
}

/// One side of a candidate pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairEntity {
    pub text: String,
    pub label: EntityLabel,
    pub span: RelativeSpan,
}

/// A bounded token window around two entities, submitted to the oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePair {
    pub tokens: Vec<String>,
    pub subject: PairEntity,
    pub object: PairEntity,
}

impl CandidatePair {
    /// The same window with subject and object roles exchanged
    pub fn swapped(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            subject: self.object.clone(),
            object: self.subject.clone(),
        }
    }
}

/// Oracle output for one candidate pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub relation: String,
    pub confidence: f32,
}

impl Prediction {
    pub fn new(relation: impl Into<String>, confidence: f32) -> Self {
        Self {
            relation: relation.into(),
            confidence,
        }
    }
}

/// Dedup identity of a tuple: exact, case-sensitive strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TupleKey {
    pub subject: String,
    pub object: String,
    pub relation: String,
}

impl TupleKey {
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            relation: relation.into(),
        }
    }

    /// Search query derived from this tuple
    pub fn as_query(&self) -> String {
        format!("{} {}", self.subject, self.object)
    }
}

/// A relation instance accepted from the oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTuple {
    pub subject: String,
    pub object: String,
    pub relation: String,
    /// Extraction confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl ExtractedTuple {
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        relation: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            relation: relation.into(),
            confidence,
        }
    }

    pub fn key(&self) -> TupleKey {
        TupleKey::new(&self.subject, &self.object, &self.relation)
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Web search collaborator
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Ranked HTML results for `query`, at most ten
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Page retrieval collaborator, returning the page's visible text
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> std::result::Result<String, FetchError>;
}

/// Sentence segmentation and named-entity tagging collaborator
#[async_trait::async_trait]
pub trait Tagger: Send + Sync {
    async fn segment_and_tag(&self, text: &str) -> Result<Vec<TaggedSentence>>;
}

/// Relation classifier scoring candidate pairs
#[async_trait::async_trait]
pub trait RelationOracle: Send + Sync {
    /// One prediction per candidate, in input order
    async fn classify(&self, batch: &[CandidatePair]) -> Result<Vec<Prediction>>;
}

// ============================================================================
// Tests
// ============================================================================
