//! SELECT statement assembly from a classified intent

use nlq_intent::{
    AggregationType, CompiledQuery, FilterValue, QueryIntent, QueryOptions, Scalar, UserContext,
};
use nlq_registry::{SchemaRegistry, SecurityPolicy};
use tracing::{debug, warn};

use crate::error::CompileError;
use crate::join::{resolve_plan, JoinPlan};
use crate::time::{parse_bound, TimeBound};

/// The aggregate expression a query projects, when one is requested.
struct Aggregate {
    alias: &'static str,
    expr: String,
}

/// Compiles a [`QueryIntent`] into a parameterized Postgres SELECT.
///
/// Pure: identical inputs yield an identical [`CompiledQuery`]. Parameter
/// order follows clause order (filters, then security predicates, then
/// time-range bounds, then HAVING).
pub struct QueryCompiler<'a> {
    registry: &'a SchemaRegistry,
    policy: &'a SecurityPolicy,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(registry: &'a SchemaRegistry, policy: &'a SecurityPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn compile(
        &self,
        intent: &QueryIntent,
        user_context: Option<&UserContext>,
        options: Option<&QueryOptions>,
    ) -> Result<CompiledQuery, CompileError> {
        let tables = self.sanitized_tables(intent);
        let plan = resolve_plan(&tables, self.registry)?;
        let plan_tables: Vec<String> = plan.tables().iter().map(|t| t.to_string()).collect();

        let mut params: Vec<Scalar> = Vec::new();
        let mut where_preds: Vec<String> = Vec::new();
        let mut having_filters: Vec<&FilterValue> = Vec::new();

        let aggregate = intent.aggregation_type.map(|agg| self.aggregate_for(agg, &plan));

        // GROUP BY only makes sense against an aggregate projection
        let group_cols = if aggregate.is_some() {
            self.group_columns(options, &plan_tables)
        } else {
            Vec::new()
        };

        // WHERE: intent filters; aggregate-alias keys defer to HAVING
        for (key, value) in &intent.filters {
            if let Some(agg) = &aggregate {
                if key == agg.alias {
                    having_filters.push(value);
                    continue;
                }
            }
            match self.resolve_field(key, &plan_tables) {
                Some(column) => filter_predicates(&column, value, &mut params, &mut where_preds),
                None => warn!(field = %key, "skipping filter on unresolved field"),
            }
        }

        // Row security: ownership predicate per plan table with a mapping
        if let Some(ctx) = user_context {
            for table in &plan_tables {
                if let Some(own) = self.policy.ownership(table, ctx.role) {
                    params.push(Scalar::Text(own.context_field.value(ctx).to_string()));
                    where_preds.push(format!("{}.{} = ${}", table, own.column, params.len()));
                }
            }
        }

        // Time range over the driving table's timestamp column
        if let Some(range) = intent.time_range.as_ref().filter(|r| !r.is_empty()) {
            match self
                .registry
                .get(&plan.driving)
                .and_then(|s| s.time_column())
            {
                Some(col) => {
                    let column = format!("{}.{}", plan.driving, col.name);
                    for (text, op) in [(&range.start, ">="), (&range.end, "<=")] {
                        let Some(text) = text else { continue };
                        match parse_bound(text) {
                            Some(TimeBound::Iso(date)) => {
                                params.push(Scalar::Text(date));
                                where_preds.push(format!("{column} {op} ${}", params.len()));
                            }
                            Some(TimeBound::Expression(expr)) => {
                                where_preds.push(format!("{column} {op} {expr}"));
                            }
                            None => {
                                warn!(bound = %text, "skipping unrecognized time bound");
                            }
                        }
                    }
                }
                None => warn!(table = %plan.driving, "no timestamp column for time range"),
            }
        }

        // HAVING: deferred aggregate-alias filters, re-emitting the
        // aggregate expression (Postgres cannot reference the alias here)
        let mut having_preds: Vec<String> = Vec::new();
        if let Some(agg) = &aggregate {
            for value in having_filters {
                filter_predicates(&agg.expr, value, &mut params, &mut having_preds);
            }
        }

        let sql = self.assemble(
            &plan,
            aggregate.as_ref(),
            &group_cols,
            &where_preds,
            &having_preds,
            options,
            &plan_tables,
        );

        debug!(sql = %sql, params = params.len(), "compiled query");

        Ok(CompiledQuery {
            sql,
            params,
            affected_tables: plan_tables,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        plan: &JoinPlan,
        aggregate: Option<&Aggregate>,
        group_cols: &[String],
        where_preds: &[String],
        having_preds: &[String],
        options: Option<&QueryOptions>,
        plan_tables: &[String],
    ) -> String {
        let select = match aggregate {
            Some(agg) => {
                let mut items = group_cols.to_vec();
                items.push(format!("{} AS {}", agg.expr, agg.alias));
                items.join(", ")
            }
            None => format!("{}.*", plan.driving),
        };

        let mut sql = format!("SELECT {} FROM {}", select, plan.driving);
        for join in &plan.joins {
            sql.push_str(&format!(
                " INNER JOIN {} ON {} = {}",
                join.table, join.on_left, join.on_right
            ));
        }

        if !where_preds.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_preds.join(" AND "));
        }

        if !group_cols.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_cols.join(", "));
        }

        if !having_preds.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&having_preds.join(" AND "));
        }

        if let Some(opts) = options {
            let mut order_items: Vec<String> = Vec::new();
            for entry in &opts.order_by {
                let resolved = match aggregate {
                    Some(agg) if entry.field == agg.alias => Some(agg.alias.to_string()),
                    _ => self.resolve_field(&entry.field, plan_tables),
                };
                match resolved {
                    Some(column) => {
                        order_items.push(format!("{} {}", column, entry.direction.as_sql()))
                    }
                    None => warn!(field = %entry.field, "skipping order by unresolved field"),
                }
            }
            if !order_items.is_empty() {
                sql.push_str(" ORDER BY ");
                sql.push_str(&order_items.join(", "));
            }

            // Compiler-controlled integers, validated non-negative
            if let Some(limit) = opts.limit.filter(|n| *n >= 0) {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
            if let Some(offset) = opts.offset.filter(|n| *n >= 0) {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        sql
    }

    fn aggregate_for(&self, agg: AggregationType, plan: &JoinPlan) -> Aggregate {
        let func = match agg {
            AggregationType::Count => {
                return Aggregate {
                    alias: "count",
                    expr: "COUNT(*)".to_string(),
                }
            }
            AggregationType::Sum => "SUM",
            AggregationType::Average => "AVG",
            AggregationType::Max => "MAX",
            AggregationType::Min => "MIN",
        };

        match self
            .registry
            .get(&plan.driving)
            .and_then(|s| s.first_numeric())
        {
            Some(col) => Aggregate {
                alias: agg.alias(),
                expr: format!("{}({}.{})", func, plan.driving, col.name),
            },
            None => {
                warn!(table = %plan.driving, "no numeric column for aggregation, counting rows");
                Aggregate {
                    alias: "count",
                    expr: "COUNT(*)".to_string(),
                }
            }
        }
    }

    fn group_columns(&self, options: Option<&QueryOptions>, plan_tables: &[String]) -> Vec<String> {
        let Some(opts) = options else {
            return Vec::new();
        };
        opts.group_by
            .iter()
            .filter_map(|field| {
                let resolved = self.resolve_field(field, plan_tables);
                if resolved.is_none() {
                    warn!(field = %field, "skipping group by unresolved field");
                }
                resolved
            })
            .collect()
    }

    /// Resolve a filter/order/group key to a qualified `table.column` drawn
    /// from the registry. Bare names search the plan tables in order,
    /// driving table first. Anything unresolvable returns `None` and is
    /// never rendered into SQL.
    fn resolve_field(&self, key: &str, plan_tables: &[String]) -> Option<String> {
        if let Some((table, column)) = key.split_once('.') {
            let known = plan_tables.iter().any(|t| t == table)
                && self
                    .registry
                    .get(table)
                    .and_then(|s| s.column(column))
                    .is_some();
            return known.then(|| format!("{table}.{column}"));
        }

        plan_tables.iter().find_map(|table| {
            self.registry
                .get(table)
                .and_then(|s| s.column(key))
                .map(|col| format!("{}.{}", table, col.name))
        })
    }

    /// Requested tables with hostile identifiers dropped. Table names are
    /// inlined into FROM/JOIN, so anything that is not a plain identifier
    /// never gets that far.
    fn sanitized_tables(&self, intent: &QueryIntent) -> Vec<String> {
        let mut tables: Vec<String> = intent
            .normalized_tables()
            .into_iter()
            .filter(|t| {
                let ok = is_identifier(t);
                if !ok {
                    warn!(table = %t, "dropping non-identifier table name");
                }
                ok
            })
            .collect();
        if tables.is_empty() {
            tables.push(nlq_intent::DEFAULT_TABLE.to_string());
        }
        tables
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Translate one filter entry into parameterized predicates against
/// `column` (a trusted identifier or aggregate expression).
fn filter_predicates(
    column: &str,
    value: &FilterValue,
    params: &mut Vec<Scalar>,
    out: &mut Vec<String>,
) {
    match value {
        FilterValue::Equals(scalar) => {
            params.push(scalar.clone());
            out.push(format!("{column} = ${}", params.len()));
        }
        FilterValue::Comparison(cmp) => {
            for (op, operand) in [
                (">", &cmp.gt),
                (">=", &cmp.gte),
                ("<", &cmp.lt),
                ("<=", &cmp.lte),
                ("<>", &cmp.ne),
            ] {
                if let Some(scalar) = operand {
                    params.push(scalar.clone());
                    out.push(format!("{column} {op} ${}", params.len()));
                }
            }
            if let Some(set) = &cmp.r#in {
                if set.is_empty() {
                    warn!(column, "skipping $in filter with empty list");
                } else {
                    let placeholders: Vec<String> = set
                        .iter()
                        .map(|scalar| {
                            params.push(scalar.clone());
                            format!("${}", params.len())
                        })
                        .collect();
                    out.push(format!("{column} IN ({})", placeholders.join(", ")));
                }
            }
        }
    }
}
