//! Tokenizer and recursive-descent parser for the SQL-like dialect.

pub mod ast;
mod parse;
pub mod token;

pub use ast::{
    ColumnSpec, Condition, CreateTable, Delete, ForeignKeySpec, Insert, Join, JoinOn, Predicate,
    Request, Select, Update,
};
pub use parse::parse;

use thiserror::Error;

/// A parse failure with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} (at offset {offset})")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}
