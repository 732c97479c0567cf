//! Engine error taxonomy.
//!
//! Every failure surfaces as a single [`EngineError`] with a human-readable
//! message. The variants exist so callers (and tests) can distinguish the
//! failure kind; no structured error codes are part of the contract.

use thiserror::Error;

use crate::parser::ParseError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed statement, unknown keyword, bad literal.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Missing or duplicate table/column, invalid schema declaration.
    #[error("schema error: {0}")]
    Schema(String),

    /// Value not coercible to the declared column type.
    #[error("type error: {0}")]
    Type(String),

    /// NULL in a NOT NULL column, primary-key or unique violation.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Foreign-key violation under RESTRICT.
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// Underlying blob I/O failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// Shorthand for a missing-table schema error, the most common failure.
    pub(crate) fn no_such_table(table: &str) -> Self {
        Self::Schema(format!("Table '{table}' does not exist"))
    }

    pub(crate) fn no_such_column(column: &str, table: &str) -> Self {
        Self::Schema(format!("Column '{column}' not found in table '{table}'"))
    }
}
