//! Snowball Expansion - Iterative set expansion orchestrator
//!
//! Starting from a seed query, repeatedly searches the web, extracts tuples
//! for the target relation from every unseen page, and reformulates the
//! next query from the best tuple not yet used as one. A run ends when the
//! store reaches the target count or no unused tuple remains.
//!
//! Author: hephaex@gmail.com

pub mod report;

pub use report::{format_tuple, ExpansionOutcome, Termination};

use chrono::Utc;
use snowball_core::{
    Fetcher, Relation, RelationOracle, Result, SearchProvider, SearchResult, SnowballError,
    Tagger, TupleKey,
};
use snowball_extractor::{EntityPairWindower, PassStats, RelationExtractionPass, TupleStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A full result page from the search provider
const FULL_RESULT_PAGE: usize = 10;

// ============================================================================
// Configuration
// ============================================================================

/// Parameters of one expansion run
#[derive(Debug, Clone)]
pub struct ExpansionConfig {
    /// Target relation
    pub relation: Relation,

    /// Minimum oracle confidence for a tuple to be kept
    pub threshold: f32,

    /// First query
    pub seed_query: String,

    /// Number of tuples that ends the run
    pub target_count: usize,

    /// Maximum entity gap and window width, in tokens
    pub window_size: usize,

    /// Per-page fetch timeout
    pub fetch_timeout: Duration,
}

impl ExpansionConfig {
    pub fn new(
        relation: Relation,
        threshold: f32,
        seed_query: impl Into<String>,
        target_count: usize,
    ) -> Self {
        Self {
            relation,
            threshold,
            seed_query: seed_query.into(),
            target_count,
            window_size: EntityPairWindower::DEFAULT_WINDOW_SIZE,
            fetch_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Reject parameters a run cannot use
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SnowballError::ValidationError(format!(
                "threshold must be between 0 and 1, got {}",
                self.threshold
            )));
        }
        if self.target_count == 0 {
            return Err(SnowballError::ValidationError(
                "target count must be at least 1".to_string(),
            ));
        }
        if self.window_size == 0 {
            return Err(SnowballError::ValidationError(
                "window size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// State machine
// ============================================================================

/// Orchestrator states
#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionState {
    /// About to issue a query
    Query(String),
    /// Results of the current query, to be processed in ranked order
    Documents(Vec<SearchResult>),
    /// Compare the store size against the target
    Evaluate,
    /// Pick the next query from the store
    Reformulate,
    /// Terminal
    Done(Termination),
}

/// Iterative set expansion over a search provider
pub struct IterativeSetExpansion {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn Fetcher>,
    tagger: Arc<dyn Tagger>,
    pass: RelationExtractionPass,
    config: ExpansionConfig,

    store: TupleStore,
    used_queries: HashSet<TupleKey>,
    processed_urls: HashSet<String>,
    queries: Vec<String>,
    stats: PassStats,
}

impl IterativeSetExpansion {
    /// Create a new orchestrator
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn Fetcher>,
        tagger: Arc<dyn Tagger>,
        oracle: Arc<dyn RelationOracle>,
        config: ExpansionConfig,
    ) -> Self {
        let pass = RelationExtractionPass::new(
            config.relation,
            config.threshold,
            EntityPairWindower::new(config.window_size),
            oracle,
        );

        Self {
            search,
            fetcher,
            tagger,
            pass,
            config,
            store: TupleStore::new(),
            used_queries: HashSet::new(),
            processed_urls: HashSet::new(),
            queries: Vec::new(),
            stats: PassStats::default(),
        }
    }

    /// Start from an already populated store
    pub fn with_store(mut self, store: TupleStore) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &TupleStore {
        &self.store
    }

    pub fn processed_urls(&self) -> &HashSet<String> {
        &self.processed_urls
    }

    /// Run until success or exhaustion.
    ///
    /// Tagger and oracle failures abort the run; fetch failures only skip
    /// the affected URL.
    pub async fn run(&mut self) -> Result<ExpansionOutcome> {
        self.config.validate()?;

        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        tracing::info!(
            %run_id,
            relation = %self.config.relation,
            threshold = self.config.threshold,
            target = self.config.target_count,
            search = self.search.name(),
            "Expansion started"
        );

        let mut iterations = 0;
        let mut state = ExpansionState::Query(self.config.seed_query.clone());

        let termination = loop {
            state = match state {
                ExpansionState::Query(query) => {
                    if self.target_reached() {
                        ExpansionState::Done(Termination::Success)
                    } else {
                        iterations += 1;
                        tracing::info!(iteration = iterations, %query, "Issuing query");
                        let results = self.search.search(&query).await?;
                        self.queries.push(query);
                        self.log_result_count(results.len());
                        ExpansionState::Documents(results)
                    }
                }
                ExpansionState::Documents(results) => {
                    let total = results.len();
                    for (rank, result) in results.iter().enumerate() {
                        tracing::info!(url = %result.url, "URL ({} / {})", rank + 1, total);
                        self.process_url(&result.url).await?;
                    }
                    ExpansionState::Evaluate
                }
                ExpansionState::Evaluate => {
                    self.log_summary(iterations);
                    if self.target_reached() {
                        ExpansionState::Done(Termination::Success)
                    } else {
                        ExpansionState::Reformulate
                    }
                }
                ExpansionState::Reformulate => match self.next_query() {
                    Some(query) => ExpansionState::Query(query),
                    None => {
                        tracing::warn!("No unused tuples left to query with");
                        ExpansionState::Done(Termination::Exhausted)
                    }
                },
                ExpansionState::Done(termination) => break termination,
            };
        };

        let finished_at = Utc::now();
        tracing::info!(
            %run_id,
            %termination,
            iterations,
            tuples = self.store.len(),
            "Expansion finished"
        );

        Ok(ExpansionOutcome {
            run_id,
            relation: self.config.relation,
            termination,
            iterations,
            queries: self.queries.clone(),
            urls_processed: self.processed_urls.len(),
            tuples: self.store.ranked(),
            stats: self.stats,
            started_at,
            finished_at,
        })
    }

    fn target_reached(&self) -> bool {
        self.store.len() >= self.config.target_count
    }

    /// Fetch, tag and extract one URL unless it was seen before
    async fn process_url(&mut self, url: &str) -> Result<()> {
        if !self.processed_urls.insert(url.to_string()) {
            tracing::info!(url, "URL already processed, skipping");
            return Ok(());
        }

        let text = match self.fetcher.fetch(url, self.config.fetch_timeout).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(url, kind = e.kind(), error = %e, "Failed to fetch URL, skipping");
                return Ok(());
            }
        };

        let sentences = self.tagger.segment_and_tag(&text).await?;
        tracing::info!(url, sentences = sentences.len(), "Annotated webpage");

        let stats = self.pass.run(&sentences, &mut self.store).await?;
        tracing::info!(
            url,
            candidates = stats.candidates,
            accepted = stats.accepted,
            added = stats.added,
            predictions = stats.predictions,
            "Extracted annotations for {} sentences",
            stats.sentences
        );
        self.stats += stats;

        Ok(())
    }

    /// Best stored tuple not yet used as a query, marked as used
    fn next_query(&mut self) -> Option<String> {
        let used = &self.used_queries;
        let best = self.store.best_where(|key| !used.contains(key))?;

        let query = best.key.as_query();
        tracing::info!(
            %query,
            confidence = best.confidence,
            "Reformulated query from best unused tuple"
        );
        self.used_queries.insert(best.key);
        Some(query)
    }

    fn log_result_count(&self, count: usize) {
        if count == 0 {
            tracing::warn!("No search results found for query");
        } else if count < FULL_RESULT_PAGE {
            tracing::warn!(count, "Less than {} search results retrieved", FULL_RESULT_PAGE);
        }
    }

    fn log_summary(&self, iterations: usize) {
        tracing::info!(
            iteration = iterations,
            tuples = self.store.len(),
            "All relations for {}",
            self.config.relation.as_str()
        );
        for tuple in self.store.ranked() {
            tracing::info!("{}", format_tuple(&tuple));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ExpansionConfig::new(Relation::WorkFor, 0.7, "bill gates microsoft", 10);
        assert_eq!(config.window_size, 40);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = ExpansionConfig::new(Relation::WorkFor, 1.5, "q", 10);
        assert!(matches!(config.validate(), Err(SnowballError::ValidationError(_))));

        let config = ExpansionConfig::new(Relation::WorkFor, f32::NAN, "q", 10);
        assert!(config.validate().is_err());

        let config = ExpansionConfig::new(Relation::WorkFor, 0.5, "q", 0);
        assert!(config.validate().is_err());

        let config = ExpansionConfig::new(Relation::WorkFor, 0.0, "q", 1).with_window_size(0);
        assert!(config.validate().is_err());

        let config = ExpansionConfig::new(Relation::WorkFor, 1.0, "q", 1);
        assert!(config.validate().is_ok());
    }
}
