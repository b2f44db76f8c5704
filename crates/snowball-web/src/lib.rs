//! Snowball Web - Collaborator adapters
//!
//! Concrete implementations of the core collaborator traits:
//! - Google Custom Search client
//! - HTTP page fetcher with HTML text extraction
//! - Clients for remote tagger and relation classifier services
//!
//! Author: hephaex@gmail.com

pub mod fetch;
pub mod search;
pub mod services;

pub use fetch::HttpFetcher;
pub use search::GoogleSearch;
pub use services::{HttpOracle, HttpTagger};

use snowball_core::{
    OracleConfig, OracleProvider, RelationOracle, Result, Tagger, TaggerConfig, TaggerProvider,
};
use snowball_extractor::{KeywordOracle, RuleBasedTagger};
use std::sync::Arc;

// ============================================================================
// Factory functions
// ============================================================================

/// Create a tagger from config
pub fn create_tagger(config: &TaggerConfig) -> Result<Arc<dyn Tagger>> {
    match config.provider {
        TaggerProvider::Rule => Ok(Arc::new(RuleBasedTagger::new()?)),
        TaggerProvider::Http => Ok(Arc::new(HttpTagger::from_config(config)?)),
    }
}

/// Create a relation oracle from config
pub fn create_oracle(config: &OracleConfig) -> Result<Arc<dyn RelationOracle>> {
    match config.provider {
        OracleProvider::Keyword => Ok(Arc::new(KeywordOracle::new())),
        OracleProvider::Http => Ok(Arc::new(HttpOracle::from_config(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_collaborators_by_default() {
        let tagger = create_tagger(&TaggerConfig::default()).unwrap();
        let sentences =
            tokio_test::block_on(tagger.segment_and_tag("Satya Nadella leads Microsoft Corp."))
                .unwrap();
        assert_eq!(sentences.len(), 1);

        assert!(create_oracle(&OracleConfig::default()).is_ok());
    }

    #[test]
    fn test_http_collaborators_from_config() {
        let tagger_config = TaggerConfig {
            provider: TaggerProvider::Http,
            ..TaggerConfig::default()
        };
        let oracle_config = OracleConfig {
            provider: OracleProvider::Http,
            ..OracleConfig::default()
        };

        assert!(create_tagger(&tagger_config).is_ok());
        assert!(create_oracle(&oracle_config).is_ok());
    }
}
