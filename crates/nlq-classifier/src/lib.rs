//! Intent classification: free-text question -> validated [`nlq_intent::QueryIntent`]
//!
//! Semantic understanding is delegated to an external AI oracle behind the
//! [`ClassificationOracle`] trait; everything around it is deterministic:
//! prompt construction, strict response validation, normalization, and the
//! fixed fallback. `classify` is total — it never surfaces an error.

mod classifier;
mod oracle;
mod prompt;

pub use classifier::IntentClassifier;
pub use oracle::{ClassificationOracle, OpenAiOracle, OracleConfig, OracleError};
pub use prompt::build_system_prompt;
