//! Query compilation: intent -> parameterized Postgres SQL
//!
//! Pure, non-suspending computation over the schema registry and security
//! policy. Given identical inputs the compiler always produces an identical
//! [`nlq_intent::CompiledQuery`]. The only hard failure is
//! [`CompileError::UnresolvedJoin`]; every other edge case has a defined
//! default.

mod builder;
mod error;
mod join;
mod time;

pub use builder::QueryCompiler;
pub use error::CompileError;
pub use join::{resolve_plan, JoinEdge, JoinPlan};
