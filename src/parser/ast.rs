//! Typed request tree.
//!
//! The tree decouples the parser from the executor: each variant carries
//! only what execution needs. The same shapes double as the programmatic
//! entry point, which is strictly richer than the text dialect (foreign
//! keys and multi-condition filters exist only there).

use crate::schema::FkAction;
use crate::value::{ColumnType, Value};

/// A parsed statement mapped to an executor operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    CreateTable(CreateTable),
    Insert(Insert),
    Select(Select),
    Update(Update),
    Delete(Delete),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub table: String,
    pub columns: Vec<ColumnSpec>,
}

/// A column definition as given at creation time, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    /// Defaults to true; schema validation forces primary keys to NOT NULL.
    pub nullable: bool,
    /// Only reachable through the programmatic surface; the text dialect
    /// has no REFERENCES clause.
    pub foreign_key: Option<ForeignKeySpec>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary_key: false,
            auto_increment: false,
            unique: false,
            nullable: true,
            foreign_key: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn references(
        mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        on_delete: FkAction,
    ) -> Self {
        self.foreign_key = Some(ForeignKeySpec {
            references_table: table.into(),
            references_column: column.into(),
            on_delete,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeySpec {
    pub references_table: String,
    pub references_column: String,
    pub on_delete: FkAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    /// Positional, matching declared column order. One short is allowed
    /// when the table has an auto-increment column.
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: String,
    /// Empty means every column of the result schema. Entries may be
    /// qualified `table.column`.
    pub columns: Vec<String>,
    pub joins: Vec<Join>,
    /// All conditions must hold. The text dialect produces at most one.
    pub conditions: Vec<Condition>,
}

impl Select {
    pub fn all(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: String,
    pub on: JoinOn,
}

/// `left_table.left_column = right_table.right_column`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOn {
    pub left_table: String,
    pub left_column: String,
    pub right_table: String,
    pub right_column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// May be qualified `table.column` in joined selects.
    pub column: String,
    pub predicate: Predicate,
}

impl Condition {
    pub fn equals(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::Equals(value),
        }
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::Like(pattern.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals(Value),
    Like(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<(String, Value)>,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub conditions: Vec<Condition>,
}
