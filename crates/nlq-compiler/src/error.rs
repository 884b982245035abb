use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// The requested tables cannot all be connected through the
    /// relationship graph. Callers should surface this as a validation
    /// failure: the request is unsatisfiable, the system is not at fault.
    #[error("cannot join table '{table}' into the query: no relationship path exists")]
    UnresolvedJoin { table: String },
}
