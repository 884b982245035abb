//! Intent model for the NLQ pipeline
//!
//! Canonical JSON representation of a classified analytics question.
//! The classifier produces a [`QueryIntentResult`], the compiler consumes
//! the [`QueryIntent`] inside it. All types are deterministically
//! serializable so classification output can be logged and replayed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

mod scalar;
pub use scalar::Scalar;

/// Confidence attached to every fallback classification.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Default driving table when a classification names no tables.
pub const DEFAULT_TABLE: &str = "contacts";

/// Closed set of question categories the classifier may emit.
///
/// Anything outside this set is a decode error, which the classifier
/// converts into the fixed fallback rather than passing through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentCategory {
    ContactQuery,
    AccountQuery,
    ActivityQuery,
    QuotationQuery,
    LeadQuery,
    PerformanceQuery,
    AggregationQuery,
    ComparisonQuery,
    TrendQuery,
    PredictionQuery,
}

/// Aggregate functions the compiler can project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    Count,
    Sum,
    Average,
    Max,
    Min,
}

impl AggregationType {
    /// Alias the compiled query projects this aggregate under.
    pub fn alias(&self) -> &'static str {
        match self {
            AggregationType::Count => "count",
            AggregationType::Sum => "sum",
            AggregationType::Average => "average",
            AggregationType::Max => "max",
            AggregationType::Min => "min",
        }
    }
}

/// Comparison operators for a single filter field.
///
/// Mirrors the `$`-prefixed operator object the classifier emits. Several
/// operators may be combined on one field (`{"$gte": 10, "$lte": 20}`).
/// Unknown operator keys are a decode error, not a pass-through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Comparison {
    #[serde(rename = "$gt", default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Scalar>,
    #[serde(rename = "$gte", default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Scalar>,
    #[serde(rename = "$lt", default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Scalar>,
    #[serde(rename = "$lte", default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Scalar>,
    #[serde(rename = "$ne", default, skip_serializing_if = "Option::is_none")]
    pub ne: Option<Scalar>,
    #[serde(rename = "$in", default, skip_serializing_if = "Option::is_none")]
    pub r#in: Option<Vec<Scalar>>,
}

/// A filter entry: bare scalar means equality, an object carries operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Comparison(Comparison),
    Equals(Scalar),
}

/// Optional time window over the driving table's timestamp column.
///
/// Each bound is either an ISO date or a recognized relative phrase
/// ("last N days", "this week", "this month").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl TimeRange {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Structured representation of a free-text analytics question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryIntent {
    pub category: IntentCategory,

    #[serde(default)]
    pub tables: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, FilterValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_type: Option<AggregationType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
}

impl QueryIntent {
    /// The fixed safe intent used whenever classification cannot be trusted.
    pub fn fallback() -> Self {
        Self {
            category: IntentCategory::ContactQuery,
            tables: vec![DEFAULT_TABLE.to_string()],
            filters: BTreeMap::new(),
            aggregation_type: None,
            time_range: None,
        }
    }

    /// Requested tables with duplicates removed (first occurrence wins),
    /// defaulting to `contacts` when the list is empty. The first entry
    /// is the driving table for join-path construction.
    pub fn normalized_tables(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for table in &self.tables {
            if !out.iter().any(|t| t == table) {
                out.push(table.clone());
            }
        }
        if out.is_empty() {
            out.push(DEFAULT_TABLE.to_string());
        }
        out
    }
}

/// Classifier output: the intent plus how much to trust it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryIntentResult {
    pub intent: QueryIntent,
    pub confidence: f64,
    pub explanation: String,
}

impl QueryIntentResult {
    /// Fallback for an oracle transport or API failure.
    pub fn oracle_failure(detail: &str) -> Self {
        Self {
            intent: QueryIntent::fallback(),
            confidence: FALLBACK_CONFIDENCE,
            explanation: format!("Failed to classify intent: {detail}"),
        }
    }

    /// Fallback for a response that arrived but could not be validated.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            intent: QueryIntent::fallback(),
            confidence: FALLBACK_CONFIDENCE,
            explanation: reason.into(),
        }
    }
}

/// Role carried in the caller-supplied user context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Employee,
    DataAnalyst,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Employee => write!(f, "employee"),
            Role::DataAnalyst => write!(f, "data_analyst"),
        }
    }
}

/// Identity of the requesting user, used for row-level visibility.
///
/// Absence of a context withholds privilege: compilation still succeeds,
/// but enforcement is then the caller's contract, not a silent grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: String,
    pub employee_id: String,
    pub role: Role,
}

/// Sort direction for `ORDER BY` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Caller-controlled shaping of the compiled query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
}

/// Compiler output: parameterized Postgres-style SQL.
///
/// Invariant: every literal from a filter, time bound, or security
/// predicate appears in `sql` only as a `$n` placeholder and verbatim in
/// `params` at the matching index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Scalar>,
    pub affected_tables: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_uses_wire_names() {
        let json = serde_json::to_string(&IntentCategory::ContactQuery).unwrap();
        assert_eq!(json, "\"CONTACT_QUERY\"");

        let parsed: IntentCategory = serde_json::from_str("\"AGGREGATION_QUERY\"").unwrap();
        assert_eq!(parsed, IntentCategory::AggregationQuery);
    }

    #[test]
    fn unknown_category_is_a_decode_error() {
        assert!(serde_json::from_str::<IntentCategory>("\"SALES_QUERY\"").is_err());
    }

    #[test]
    fn filter_value_scalar_means_equality() {
        let v: FilterValue = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(v, FilterValue::Equals(Scalar::Text("active".to_string())));
    }

    #[test]
    fn filter_value_operator_object() {
        let v: FilterValue = serde_json::from_str(r#"{"$gte": 10, "$lte": 20}"#).unwrap();
        match v {
            FilterValue::Comparison(cmp) => {
                assert_eq!(cmp.gte, Some(Scalar::Int(10)));
                assert_eq!(cmp.lte, Some(Scalar::Int(20)));
                assert_eq!(cmp.gt, None);
            }
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn filter_value_rejects_unknown_operator() {
        assert!(serde_json::from_str::<FilterValue>(r#"{"$regex": "a.*"}"#).is_err());
    }

    #[test]
    fn intent_decodes_camel_case_wire_shape() {
        let intent: QueryIntent = serde_json::from_str(
            r#"{
                "category": "ACTIVITY_QUERY",
                "tables": ["activities"],
                "filters": {"status": "done", "duration": {"$gt": 30}},
                "aggregationType": "count",
                "timeRange": {"start": "last 7 days"}
            }"#,
        )
        .unwrap();

        assert_eq!(intent.category, IntentCategory::ActivityQuery);
        assert_eq!(intent.aggregation_type, Some(AggregationType::Count));
        assert_eq!(
            intent.time_range.unwrap().start.as_deref(),
            Some("last 7 days")
        );
        assert_eq!(intent.filters.len(), 2);
    }

    #[test]
    fn normalized_tables_defaults_and_dedupes() {
        let mut intent = QueryIntent::fallback();
        intent.tables = vec![];
        assert_eq!(intent.normalized_tables(), vec!["contacts"]);

        intent.tables = vec![
            "activities".to_string(),
            "contacts".to_string(),
            "activities".to_string(),
        ];
        assert_eq!(intent.normalized_tables(), vec!["activities", "contacts"]);
    }

    #[test]
    fn oracle_failure_carries_marker_text() {
        let result = QueryIntentResult::oracle_failure("connection refused");
        assert!(result.explanation.contains("Failed to classify intent"));
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(result.intent.tables, vec!["contacts"]);
    }

    #[test]
    fn sort_direction_accepts_uppercase_alias() {
        let d: SortDirection = serde_json::from_str("\"DESC\"").unwrap();
        assert_eq!(d, SortDirection::Desc);
        assert_eq!(d.as_sql(), "DESC");
    }
}
