//! Join resolution over the relationship graph

use crate::error::CompileError;
use nlq_registry::{SchemaRegistry, TableRelationship};

/// One `INNER JOIN` clause: `JOIN table ON on_left = on_right`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEdge {
    pub table: String,
    pub on_left: String,
    pub on_right: String,
}

/// Ordered join plan. `driving` is the `FROM` table; joins are emitted in
/// order, each connecting to a table already in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPlan {
    pub driving: String,
    pub joins: Vec<JoinEdge>,
}

impl JoinPlan {
    /// All tables in the plan, driving table first.
    pub fn tables(&self) -> Vec<&str> {
        let mut out = vec![self.driving.as_str()];
        out.extend(self.joins.iter().map(|j| j.table.as_str()));
        out
    }
}

/// Compute a deduplicated, connected join plan for the requested tables.
///
/// The first table drives. Each subsequent table must reach the plan either
/// through a direct relationship edge or through a single intermediate
/// table; otherwise resolution fails rather than silently dropping the
/// table. Duplicate requests collapse to one entry. Inner joins only.
pub fn resolve_plan(
    tables: &[String],
    registry: &SchemaRegistry,
) -> Result<JoinPlan, CompileError> {
    let mut requested: Vec<&str> = Vec::new();
    for table in tables {
        if !requested.contains(&table.as_str()) {
            requested.push(table);
        }
    }

    let driving = requested
        .first()
        .copied()
        .unwrap_or(nlq_intent::DEFAULT_TABLE)
        .to_string();

    let mut plan = JoinPlan {
        driving,
        joins: Vec::new(),
    };
    let mut included: Vec<String> = vec![plan.driving.clone()];

    for table in requested.iter().skip(1) {
        if included.iter().any(|t| t == table) {
            continue;
        }

        if let Some(rel) = direct_edge(registry, table, &included) {
            plan.joins.push(edge_for(registry, table, rel));
            included.push(table.to_string());
            continue;
        }

        match one_hop(registry, table, &included) {
            Some((via, via_rel, target_rel)) => {
                plan.joins.push(edge_for(registry, &via, via_rel));
                included.push(via);
                plan.joins.push(edge_for(registry, table, target_rel));
                included.push(table.to_string());
            }
            None => {
                return Err(CompileError::UnresolvedJoin {
                    table: table.to_string(),
                })
            }
        }
    }

    Ok(plan)
}

/// Direct relationship between `table` and anything already in the plan.
fn direct_edge<'a>(
    registry: &'a SchemaRegistry,
    table: &str,
    included: &[String],
) -> Option<&'a TableRelationship> {
    included
        .iter()
        .find_map(|present| registry.relationship_between(table, present))
}

/// A registry table that bridges `table` to the plan in exactly one hop.
/// Returns the intermediate plus the two edges, plan-side edge first.
fn one_hop<'a>(
    registry: &'a SchemaRegistry,
    table: &str,
    included: &[String],
) -> Option<(String, &'a TableRelationship, &'a TableRelationship)> {
    for candidate in registry.all_tables() {
        if candidate == table || included.iter().any(|t| t == candidate) {
            continue;
        }
        let Some(target_rel) = registry.relationship_between(candidate, table) else {
            continue;
        };
        if let Some(via_rel) = direct_edge(registry, candidate, included) {
            return Some((candidate.to_string(), via_rel, target_rel));
        }
    }
    None
}

/// Build the join clause for `table` out of a relationship edge. The side
/// holding the foreign key joins against the other side's primary key.
fn edge_for(registry: &SchemaRegistry, table: &str, rel: &TableRelationship) -> JoinEdge {
    let pk_of = |name: &str| {
        registry
            .get(name)
            .map(|s| s.primary_key.clone())
            .unwrap_or_else(|| "id".to_string())
    };

    JoinEdge {
        table: table.to_string(),
        on_left: format!("{}.{}", rel.from_table, rel.foreign_key),
        on_right: format!("{}.{}", rel.to_table, pk_of(&rel.to_table)),
    }
}
