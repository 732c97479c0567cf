//! reldb: a small embedded relational database engine.
//!
//! The engine owns typed tables persisted as per-table blobs, enforces
//! schema and referential constraints, maintains per-column hash indexes,
//! and executes a restricted SQL-like dialect (CREATE/INSERT/SELECT/
//! UPDATE/DELETE with WHERE, LIKE, and inner JOINs).

pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod output;
pub mod parser;
pub mod pattern;
pub mod schema;
pub mod storage;
pub mod value;

// Re-export commonly used types
pub use config::Config;
pub use engine::{Engine, Outcome};
pub use error::EngineError;
pub use parser::{ColumnSpec, Condition, Request, Select, parse};
pub use schema::{FkAction, Schema};
pub use storage::{JsonStore, MemoryStore, Row, Table, TableStore};
pub use value::{ColumnType, Value};
