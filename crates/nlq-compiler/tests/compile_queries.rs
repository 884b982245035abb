//! End-to-end compilation scenarios: intent + context + options -> SQL

use nlq_compiler::{CompileError, QueryCompiler};
use nlq_intent::{
    AggregationType, Comparison, FilterValue, IntentCategory, OrderBy, QueryIntent, QueryOptions,
    Role, Scalar, SortDirection, TimeRange, UserContext,
};
use nlq_registry::{SchemaRegistry, SecurityPolicy};
use std::collections::BTreeMap;

fn intent(category: IntentCategory, tables: &[&str]) -> QueryIntent {
    QueryIntent {
        category,
        tables: tables.iter().map(|t| t.to_string()).collect(),
        filters: BTreeMap::new(),
        aggregation_type: None,
        time_range: None,
    }
}

fn employee() -> UserContext {
    UserContext {
        user_id: "user-7".to_string(),
        employee_id: "emp-42".to_string(),
        role: Role::Employee,
    }
}

fn admin() -> UserContext {
    UserContext {
        user_id: "user-1".to_string(),
        employee_id: "emp-1".to_string(),
        role: Role::Admin,
    }
}

#[test]
fn how_many_contacts_compiles_to_count() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let mut q = intent(IntentCategory::ContactQuery, &["contacts"]);
    q.aggregation_type = Some(AggregationType::Count);

    let compiled = compiler.compile(&q, None, None).unwrap();
    assert!(compiled.sql.starts_with("SELECT COUNT(*) AS count"));
    assert!(compiled.sql.contains("FROM contacts"));
    assert_eq!(compiled.affected_tables, vec!["contacts"]);
}

#[test]
fn empty_table_list_defaults_to_contacts() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let compiled = compiler
        .compile(&intent(IntentCategory::ContactQuery, &[]), None, None)
        .unwrap();
    assert!(compiled.sql.contains("FROM contacts"));
}

#[test]
fn filter_values_never_appear_in_sql_text() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let hostile = "'; DROP TABLE contacts; --";
    let mut q = intent(IntentCategory::ContactQuery, &["contacts"]);
    q.filters
        .insert("name".to_string(), FilterValue::Equals(hostile.into()));

    let compiled = compiler.compile(&q, None, None).unwrap();
    assert!(!compiled.sql.contains(hostile));
    assert!(compiled.sql.contains("contacts.name = $1"));
    assert_eq!(compiled.params, vec![Scalar::Text(hostile.to_string())]);
}

#[test]
fn duplicate_tables_produce_one_join() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let compiled = compiler
        .compile(
            &intent(IntentCategory::AccountQuery, &["contacts", "accounts", "accounts"]),
            None,
            None,
        )
        .unwrap();

    assert_eq!(compiled.sql.matches("INNER JOIN accounts").count(), 1);
    assert!(compiled
        .sql
        .contains("INNER JOIN accounts ON contacts.account_id = accounts.id"));
    assert_eq!(compiled.affected_tables, vec!["contacts", "accounts"]);
}

#[test]
fn employee_gets_ownership_predicate_admin_does_not() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let q = intent(IntentCategory::ActivityQuery, &["activities"]);

    let scoped = compiler.compile(&q, Some(&employee()), None).unwrap();
    assert!(scoped.sql.contains("activities.created_by = $1"));
    assert_eq!(scoped.params, vec![Scalar::Text("emp-42".to_string())]);

    let unscoped = compiler.compile(&q, Some(&admin()), None).unwrap();
    assert!(!unscoped.sql.contains("created_by"));
    assert!(unscoped.params.is_empty());
}

#[test]
fn missing_context_adds_no_predicate() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let compiled = compiler
        .compile(&intent(IntentCategory::ActivityQuery, &["activities"]), None, None)
        .unwrap();
    assert!(!compiled.sql.contains("created_by"));
}

#[test]
fn relative_time_range_inlines_current_date_interval() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let mut q = intent(IntentCategory::ActivityQuery, &["activities"]);
    q.time_range = Some(TimeRange {
        start: Some("last 7 days".to_string()),
        end: None,
    });

    let compiled = compiler.compile(&q, None, None).unwrap();
    assert!(compiled.sql.contains("activities.created_at >= CURRENT_DATE - INTERVAL '7 days'"));
    assert!(compiled.params.is_empty());
}

#[test]
fn iso_time_bounds_are_parameterized() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let mut q = intent(IntentCategory::QuotationQuery, &["quotations"]);
    q.time_range = Some(TimeRange {
        start: Some("2024-01-01".to_string()),
        end: Some("2024-06-30".to_string()),
    });

    let compiled = compiler.compile(&q, None, None).unwrap();
    assert!(compiled.sql.contains("quotations.created_at >= $1"));
    assert!(compiled.sql.contains("quotations.created_at <= $2"));
    assert_eq!(
        compiled.params,
        vec![
            Scalar::Text("2024-01-01".to_string()),
            Scalar::Text("2024-06-30".to_string()),
        ]
    );
}

#[test]
fn param_order_is_filters_then_security_then_time() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let mut q = intent(IntentCategory::ActivityQuery, &["activities"]);
    q.filters
        .insert("status".to_string(), FilterValue::Equals("done".into()));
    q.time_range = Some(TimeRange {
        start: Some("2024-01-01".to_string()),
        end: None,
    });

    let compiled = compiler.compile(&q, Some(&employee()), None).unwrap();
    assert!(compiled.sql.contains("activities.status = $1"));
    assert!(compiled.sql.contains("activities.created_by = $2"));
    assert!(compiled.sql.contains("activities.created_at >= $3"));
    assert_eq!(
        compiled.params,
        vec![
            Scalar::Text("done".to_string()),
            Scalar::Text("emp-42".to_string()),
            Scalar::Text("2024-01-01".to_string()),
        ]
    );
}

#[test]
fn operator_filters_translate_per_operator() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let mut q = intent(IntentCategory::AccountQuery, &["accounts"]);
    q.filters.insert(
        "engagement_score".to_string(),
        FilterValue::Comparison(Comparison {
            lt: Some(Scalar::Int(50)),
            ..Default::default()
        }),
    );

    let compiled = compiler.compile(&q, None, None).unwrap();
    assert!(compiled.sql.contains("accounts.engagement_score < $1"));
    assert_eq!(compiled.params, vec![Scalar::Int(50)]);
}

#[test]
fn in_filter_emits_one_placeholder_per_element() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let mut q = intent(IntentCategory::LeadQuery, &["leads"]);
    q.filters.insert(
        "status".to_string(),
        FilterValue::Comparison(Comparison {
            r#in: Some(vec!["new".into(), "qualified".into()]),
            ..Default::default()
        }),
    );

    let compiled = compiler.compile(&q, None, None).unwrap();
    assert!(compiled.sql.contains("leads.status IN ($1, $2)"));
    assert_eq!(compiled.params.len(), 2);
}

#[test]
fn count_filter_defers_to_having() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let mut q = intent(IntentCategory::AggregationQuery, &["activities"]);
    q.aggregation_type = Some(AggregationType::Count);
    q.filters.insert(
        "count".to_string(),
        FilterValue::Comparison(Comparison {
            gt: Some(Scalar::Int(5)),
            ..Default::default()
        }),
    );
    let opts = QueryOptions {
        group_by: vec!["activity_type".to_string()],
        ..Default::default()
    };

    let compiled = compiler.compile(&q, None, Some(&opts)).unwrap();
    assert!(compiled
        .sql
        .contains("SELECT activities.activity_type, COUNT(*) AS count"));
    assert!(compiled.sql.contains("GROUP BY activities.activity_type"));
    assert!(compiled.sql.contains("HAVING COUNT(*) > $1"));
    assert!(!compiled.sql.contains("WHERE"));
    assert_eq!(compiled.params, vec![Scalar::Int(5)]);
}

#[test]
fn order_limit_offset_render_after_clauses() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let q = intent(IntentCategory::LeadQuery, &["leads"]);
    let opts = QueryOptions {
        limit: Some(10),
        offset: Some(20),
        order_by: vec![OrderBy {
            field: "score".to_string(),
            direction: SortDirection::Desc,
        }],
        ..Default::default()
    };

    let compiled = compiler.compile(&q, None, Some(&opts)).unwrap();
    assert!(compiled
        .sql
        .ends_with("ORDER BY leads.score DESC LIMIT 10 OFFSET 20"));
}

#[test]
fn order_by_aggregate_alias_is_allowed() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let mut q = intent(IntentCategory::AggregationQuery, &["activities"]);
    q.aggregation_type = Some(AggregationType::Count);
    let opts = QueryOptions {
        group_by: vec!["activity_type".to_string()],
        order_by: vec![OrderBy {
            field: "count".to_string(),
            direction: SortDirection::Desc,
        }],
        ..Default::default()
    };

    let compiled = compiler.compile(&q, None, Some(&opts)).unwrap();
    assert!(compiled.sql.contains("ORDER BY count DESC"));
}

#[test]
fn multi_hop_join_reaches_users_via_sub_accounts() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let compiled = compiler
        .compile(
            &intent(IntentCategory::PerformanceQuery, &["activities", "users"]),
            None,
            None,
        )
        .unwrap();

    assert!(compiled
        .sql
        .contains("INNER JOIN sub_accounts ON activities.sub_account_id = sub_accounts.id"));
    assert!(compiled
        .sql
        .contains("INNER JOIN users ON sub_accounts.assigned_employee_id = users.id"));
    assert_eq!(
        compiled.affected_tables,
        vec!["activities", "sub_accounts", "users"]
    );
}

#[test]
fn unconnectable_table_surfaces_unresolved_join() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let err = compiler
        .compile(
            &intent(IntentCategory::ContactQuery, &["contacts", "warehouses"]),
            None,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, CompileError::UnresolvedJoin { .. }));
}

#[test]
fn qualified_filter_key_targets_joined_table() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let mut q = intent(IntentCategory::AccountQuery, &["contacts", "accounts"]);
    q.filters.insert(
        "accounts.industry".to_string(),
        FilterValue::Equals("fintech".into()),
    );

    let compiled = compiler.compile(&q, None, None).unwrap();
    assert!(compiled.sql.contains("accounts.industry = $1"));
    assert_eq!(compiled.params, vec![Scalar::Text("fintech".to_string())]);
}

#[test]
fn identical_inputs_compile_identically() {
    let registry = SchemaRegistry::crm();
    let policy = SecurityPolicy::crm();
    let compiler = QueryCompiler::new(&registry, &policy);

    let mut q = intent(IntentCategory::ActivityQuery, &["activities", "contacts"]);
    q.filters
        .insert("status".to_string(), FilterValue::Equals("done".into()));
    q.filters.insert(
        "duration_minutes".to_string(),
        FilterValue::Comparison(Comparison {
            gte: Some(Scalar::Int(30)),
            ..Default::default()
        }),
    );

    let first = compiler.compile(&q, Some(&employee()), None).unwrap();
    let second = compiler.compile(&q, Some(&employee()), None).unwrap();
    assert_eq!(first, second);
}
