//! Durable per-table blobs.
//!
//! The engine consumes a key/value blob interface keyed by table name; the
//! blob holds schema, row vector, and index maps, and every save replaces
//! the whole blob. Two backends exist: JSON files on disk and an in-memory
//! map for tests.

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::Index;
use crate::schema::Schema;
use crate::value::Value;

/// A row: column name to value. Every declared column is present; an
/// absent value is stored as an explicit Null.
pub type Row = BTreeMap<String, Value>;

/// The whole persisted state of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub schema: Schema,
    pub rows: Vec<Row>,
    pub indexes: BTreeMap<String, Index>,
}

impl Table {
    /// A fresh table with empty indexes for every declared descriptor.
    pub fn empty(schema: Schema) -> Self {
        let indexes = schema
            .indexes
            .keys()
            .map(|name| (name.clone(), Index::default()))
            .collect();
        Self {
            schema,
            rows: Vec::new(),
            indexes,
        }
    }

    /// Rebuild every index from the current row vector. Used after DELETE,
    /// where compaction shifts positions.
    pub fn rebuild_indexes(&mut self) {
        self.indexes = self
            .schema
            .indexes
            .iter()
            .map(|(name, def)| (name.clone(), Index::build(&def.column, &self.rows)))
            .collect();
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("table '{table}' already exists")]
    AlreadyExists { table: String },

    #[error("table '{table}' does not exist")]
    NotFound { table: String },

    #[error("invalid table name '{name}'")]
    InvalidName { name: String },

    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt table blob '{table}': {message}")]
    Corrupt { table: String, message: String },
}

/// Blob store contract the engine runs against.
///
/// `save` must replace the whole blob; single-table writes are atomic if
/// the backend honors that.
pub trait TableStore {
    fn exists(&self, table: &str) -> bool;

    /// Create a new blob; fails if the table already exists.
    fn create(&self, table: &str, data: &Table) -> Result<(), StorageError>;

    fn load(&self, table: &str) -> Result<Table, StorageError>;

    /// Overwrite the blob for an existing table.
    fn save(&self, table: &str, data: &Table) -> Result<(), StorageError>;

    fn drop(&self, table: &str) -> Result<(), StorageError>;

    /// All table names, lexicographically sorted.
    fn list(&self) -> Result<Vec<String>, StorageError>;
}

/// Table names double as blob keys (and file stems), so they are
/// restricted to identifier characters.
pub(crate) fn valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
