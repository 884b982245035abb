//! Classification pipeline: prompt, validate, normalize, fall back

use nlq_intent::{
    AggregationType, FilterValue, IntentCategory, QueryIntent, QueryIntentResult, TimeRange,
    UserContext, DEFAULT_TABLE,
};
use nlq_registry::SchemaRegistry;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::oracle::ClassificationOracle;
use crate::prompt::build_system_prompt;

/// Strict decode target for the oracle's JSON. Category is mandatory and
/// must be one of the known strings; everything else is optional and
/// normalized afterwards.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassification {
    category: IntentCategory,
    #[serde(default)]
    tables: Vec<String>,
    #[serde(default)]
    filters: BTreeMap<String, FilterValue>,
    #[serde(default)]
    aggregation_type: Option<AggregationType>,
    #[serde(default)]
    time_range: Option<TimeRange>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    explanation: Option<String>,
}

/// Turns a question into a validated intent, delegating semantics to the
/// oracle. Stateless apart from the prebuilt system prompt.
pub struct IntentClassifier<O> {
    oracle: O,
    system_prompt: String,
}

impl<O: ClassificationOracle> IntentClassifier<O> {
    pub fn new(oracle: O, registry: &SchemaRegistry) -> Self {
        Self {
            oracle,
            system_prompt: build_system_prompt(registry),
        }
    }

    /// Classify a free-text question. Total: every failure path resolves to
    /// the fixed fallback result, never an error.
    pub async fn classify(
        &self,
        question: &str,
        user_context: Option<&UserContext>,
    ) -> QueryIntentResult {
        // Lowercase so classification is case-insensitive
        let question = question.trim().to_lowercase();

        let user_message = match user_context {
            Some(ctx) => format!("{question}\n\nRequesting user role: {}", ctx.role),
            None => question.clone(),
        };

        let raw = match self
            .oracle
            .classify_raw(&self.system_prompt, &user_message)
            .await
        {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "oracle call failed, using fallback intent");
                return QueryIntentResult::oracle_failure(&err.to_string());
            }
        };

        if raw.is_null() {
            warn!("oracle returned null, using fallback intent");
            return QueryIntentResult::fallback("Classifier returned no usable payload");
        }

        match serde_json::from_value::<RawClassification>(raw) {
            Ok(parsed) => {
                let result = normalize(parsed);
                info!(
                    category = ?result.intent.category,
                    confidence = result.confidence,
                    "classified intent"
                );
                result
            }
            Err(err) => {
                warn!(error = %err, "oracle response failed validation, using fallback intent");
                QueryIntentResult::fallback(format!(
                    "Classification response did not match the expected shape: {err}"
                ))
            }
        }
    }
}

/// Apply the defaulting rules: empty tables -> contacts, confidence clamped
/// into [0, 1] (missing confidence reads as middling trust, not certainty).
fn normalize(raw: RawClassification) -> QueryIntentResult {
    let mut tables = raw.tables;
    tables.retain(|t| !t.trim().is_empty());
    if tables.is_empty() {
        tables.push(DEFAULT_TABLE.to_string());
    }

    let confidence = raw.confidence.unwrap_or(0.5).clamp(0.0, 1.0);

    QueryIntentResult {
        intent: QueryIntent {
            category: raw.category,
            tables,
            filters: raw.filters,
            aggregation_type: raw.aggregation_type,
            time_range: raw.time_range.filter(|r| !r.is_empty()),
        },
        confidence,
        explanation: raw
            .explanation
            .unwrap_or_else(|| "Classified by the AI oracle".to_string()),
    }
}
