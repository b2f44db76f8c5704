//! Snowball Extractor - Relation extraction pipeline
//!
//! Turns tagged sentences into deduplicated relation tuples:
//! - Entity-pair windowing bounded by punctuation
//! - Subject/object role assignment per relation
//! - Batched oracle classification with a confidence threshold
//! - A max-confidence tuple store with stable ranking
//!
//! Also ships offline collaborators ([`RuleBasedTagger`], [`KeywordOracle`])
//! so a run does not require external services.

pub mod oracle;
pub mod pass;
pub mod store;
pub mod tagger;
pub mod window;

pub use oracle::{KeywordOracle, NO_RELATION};
pub use pass::{assign_roles, PassStats, RelationExtractionPass};
pub use store::{MergeOutcome, RankedTuple, TupleStore};
pub use tagger::RuleBasedTagger;
pub use window::{EntityPairWindower, LabeledSpan};
