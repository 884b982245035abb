//! Row-level security policy table
//!
//! Maps (table, role) to the ownership column that restricts visible rows.
//! `admin` maps to no predicate anywhere. `data_analyst` gets admin-level
//! visibility: it is a read-only analytics role and row scoping would make
//! cross-team aggregates meaningless.

use nlq_intent::{Role, UserContext};
use std::collections::HashMap;

/// Which field of the user context binds against the ownership column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextField {
    EmployeeId,
    UserId,
}

impl ContextField {
    pub fn value<'a>(&self, ctx: &'a UserContext) -> &'a str {
        match self {
            ContextField::EmployeeId => &ctx.employee_id,
            ContextField::UserId => &ctx.user_id,
        }
    }
}

/// Ownership predicate: `column = <context field>` on a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub column: String,
    pub context_field: ContextField,
}

/// Static (table, role) -> ownership mapping, built once at startup.
pub struct SecurityPolicy {
    rules: HashMap<(String, Role), Ownership>,
}

impl SecurityPolicy {
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Baseline CRM policy.
    pub fn crm() -> Self {
        let mut policy = Self::new();
        for (table, column) in [
            ("activities", "created_by"),
            ("leads", "assigned_to"),
            ("sub_accounts", "assigned_employee_id"),
        ] {
            policy.add_rule(table, Role::Employee, column, ContextField::EmployeeId);
        }
        policy
    }

    pub fn add_rule(&mut self, table: &str, role: Role, column: &str, field: ContextField) {
        self.rules.insert(
            (table.to_string(), role),
            Ownership {
                column: column.to_string(),
                context_field: field,
            },
        );
    }

    /// Ownership predicate for the given table and role, if any.
    pub fn ownership(&self, table: &str, role: Role) -> Option<&Ownership> {
        self.rules.get(&(table.to_string(), role))
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::crm()
    }
}
