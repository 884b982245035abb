//! Schema registry and row-security policy definitions
//!
//! The registry is the single source of truth for table and column
//! identifiers: the compiler only ever renders identifiers it finds here,
//! which is what keeps filter keys from becoming an injection vector.
//! Both the registry and the policy table are built once at startup and
//! never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod policy;
pub use policy::{ContextField, Ownership, SecurityPolicy};

/// Column type as far as the compiler cares: enough to pick aggregation
/// targets and time-range columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Uuid,
    Integer,
    Numeric,
    Text,
    Boolean,
    Date,
    Timestamp,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Numeric)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::Timestamp)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: String,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// First numeric column, the conventional target for sum/avg/max/min.
    pub fn first_numeric(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.column_type.is_numeric())
    }

    /// Column a time range applies to: `created_at` when present,
    /// otherwise the first date/timestamp column.
    pub fn time_column(&self) -> Option<&ColumnDef> {
        self.column("created_at")
            .or_else(|| self.columns.iter().find(|c| c.column_type.is_temporal()))
    }
}

/// Cardinality of a foreign-key edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// Directed foreign-key edge: `from_table.foreign_key` references the
/// primary key of `to_table`. Traversable in either direction when
/// building a join path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRelationship {
    pub from_table: String,
    pub to_table: String,
    pub foreign_key: String,
    pub kind: RelationshipKind,
}

impl TableRelationship {
    /// True when this edge connects `a` and `b`, in either direction.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.from_table == a && self.to_table == b)
            || (self.from_table == b && self.to_table == a)
    }

    pub fn touches(&self, table: &str) -> bool {
        self.from_table == table || self.to_table == table
    }
}

/// Static description of the CRM database: tables, columns, keys, and the
/// relationship graph. No mutation path after construction.
pub struct SchemaRegistry {
    tables: HashMap<String, TableSchema>,
    order: Vec<String>,
    relationships: Vec<TableRelationship>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            order: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Baseline CRM schema.
    ///
    /// There is deliberately no direct activities -> users edge; that path
    /// exists only through sub_accounts, which exercises the resolver's
    /// one-hop search.
    pub fn crm() -> Self {
        use ColumnType::*;

        let mut registry = Self::new();

        registry.register_table(table(
            "contacts",
            "id",
            &[
                ("id", Uuid),
                ("name", Text),
                ("email", Text),
                ("phone", Text),
                ("account_id", Uuid),
                ("status", Text),
                ("created_at", Timestamp),
            ],
        ));
        registry.register_table(table(
            "accounts",
            "id",
            &[
                ("id", Uuid),
                ("name", Text),
                ("industry", Text),
                ("engagement_score", Numeric),
                ("annual_revenue", Numeric),
                ("created_at", Timestamp),
            ],
        ));
        registry.register_table(table(
            "sub_accounts",
            "id",
            &[
                ("id", Uuid),
                ("account_id", Uuid),
                ("name", Text),
                ("region", Text),
                ("assigned_employee_id", Uuid),
                ("created_at", Timestamp),
            ],
        ));
        registry.register_table(table(
            "activities",
            "id",
            &[
                ("id", Uuid),
                ("contact_id", Uuid),
                ("sub_account_id", Uuid),
                ("activity_type", Text),
                ("subject", Text),
                ("duration_minutes", Integer),
                ("status", Text),
                ("created_by", Uuid),
                ("created_at", Timestamp),
            ],
        ));
        registry.register_table(table(
            "quotations",
            "id",
            &[
                ("id", Uuid),
                ("sub_account_id", Uuid),
                ("contact_id", Uuid),
                ("total_amount", Numeric),
                ("status", Text),
                ("valid_until", Date),
                ("created_by", Uuid),
                ("created_at", Timestamp),
            ],
        ));
        registry.register_table(table(
            "leads",
            "id",
            &[
                ("id", Uuid),
                ("name", Text),
                ("source", Text),
                ("score", Numeric),
                ("status", Text),
                ("assigned_to", Uuid),
                ("created_at", Timestamp),
            ],
        ));
        registry.register_table(table(
            "users",
            "id",
            &[
                ("id", Uuid),
                ("employee_id", Uuid),
                ("full_name", Text),
                ("email", Text),
                ("department", Text),
                ("created_at", Timestamp),
            ],
        ));

        for (from, to, fk, kind) in [
            ("contacts", "accounts", "account_id", RelationshipKind::ManyToOne),
            ("sub_accounts", "accounts", "account_id", RelationshipKind::ManyToOne),
            ("sub_accounts", "users", "assigned_employee_id", RelationshipKind::ManyToOne),
            ("activities", "contacts", "contact_id", RelationshipKind::ManyToOne),
            ("activities", "sub_accounts", "sub_account_id", RelationshipKind::ManyToOne),
            ("quotations", "sub_accounts", "sub_account_id", RelationshipKind::ManyToOne),
            ("quotations", "contacts", "contact_id", RelationshipKind::ManyToOne),
            ("leads", "users", "assigned_to", RelationshipKind::ManyToOne),
        ] {
            registry.register_relationship(TableRelationship {
                from_table: from.to_string(),
                to_table: to.to_string(),
                foreign_key: fk.to_string(),
                kind,
            });
        }

        registry
    }

    pub fn register_table(&mut self, schema: TableSchema) {
        if !self.tables.contains_key(&schema.name) {
            self.order.push(schema.name.clone());
        }
        self.tables.insert(schema.name.clone(), schema);
    }

    pub fn register_relationship(&mut self, relationship: TableRelationship) {
        self.relationships.push(relationship);
    }

    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Resolve schemas for a set of table names. Unknown names are simply
    /// absent from the result; tolerating them is the compiler's call.
    pub fn lookup<'a>(&'a self, names: &[String]) -> HashMap<&'a str, &'a TableSchema> {
        names
            .iter()
            .filter_map(|n| self.tables.get(n.as_str()))
            .map(|schema| (schema.name.as_str(), schema))
            .collect()
    }

    pub fn relationships(&self) -> &[TableRelationship] {
        &self.relationships
    }

    /// Edges touching any of the given tables.
    pub fn relationships_involving(&self, names: &[String]) -> Vec<&TableRelationship> {
        self.relationships
            .iter()
            .filter(|rel| names.iter().any(|n| rel.touches(n)))
            .collect()
    }

    /// The direct edge between two tables, if one exists (either direction).
    pub fn relationship_between(&self, a: &str, b: &str) -> Option<&TableRelationship> {
        self.relationships.iter().find(|rel| rel.connects(a, b))
    }

    /// Table names in registration order.
    pub fn all_tables(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// Prompt-ready markdown rendering of the catalog, fed to the oracle so
    /// its output only references real tables and columns.
    pub fn describe_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("## Database Catalog\n\n");

        for name in &self.order {
            let schema = &self.tables[name];
            md.push_str(&format!("### Table: `{}`\n\n", schema.name));
            md.push_str("| Column | Type |\n|--------|------|\n");
            for col in &schema.columns {
                md.push_str(&format!(
                    "| `{}` | {} |\n",
                    col.name,
                    serde_json::to_string(&col.column_type)
                        .unwrap_or_default()
                        .trim_matches('"')
                ));
            }
            md.push('\n');
        }

        md.push_str("### Relationships\n\n");
        for rel in &self.relationships {
            md.push_str(&format!(
                "- `{}.{}` -> `{}` ({})\n",
                rel.from_table,
                rel.foreign_key,
                rel.to_table,
                serde_json::to_string(&rel.kind)
                    .unwrap_or_default()
                    .trim_matches('"')
            ));
        }

        md
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::crm()
    }
}

fn table(name: &str, pk: &str, columns: &[(&str, ColumnType)]) -> TableSchema {
    TableSchema {
        name: name.to_string(),
        primary_key: pk.to_string(),
        columns: columns
            .iter()
            .map(|(col, ty)| ColumnDef {
                name: col.to_string(),
                column_type: *ty,
            })
            .collect(),
    }
}
