//! Table schema: columns, keys, foreign keys, index metadata.
//!
//! A [`Schema`] is validated once at CREATE time and then travels inside
//! the table blob. Foreign keys are recorded but not resolved against the
//! referenced table here; forward references are legal and resolution
//! happens when DELETE enforces them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::EngineError;
use crate::parser::ast::ColumnSpec;
use crate::value::ColumnType;

/// ON DELETE policy of a foreign key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum FkAction {
    #[default]
    Restrict,
    Cascade,
}

/// Foreign-key descriptor attached to a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub references_table: String,
    pub references_column: String,
    pub on_delete: FkAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKey>,
}

/// Hash-index descriptor. One per primary-key or unique column, named
/// `<column>_idx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub column: String,
    pub kind: IndexKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Hash,
}

/// Denormalized foreign key, for fast enumeration during DELETE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FkBinding {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub on_delete: FkAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Declaration order; this is the positional order for INSERT.
    pub columns: Vec<Column>,
    pub primary_key: Option<String>,
    /// Name of the auto-increment column, if any. Always the primary key.
    pub auto_increment: Option<String>,
    pub auto_increment_counter: i64,
    /// Keyed by `<column>_idx`.
    pub indexes: BTreeMap<String, IndexDef>,
    pub foreign_keys: Vec<FkBinding>,
}

impl Schema {
    /// Validate and normalize a column list into a schema.
    pub fn build(specs: &[ColumnSpec]) -> Result<Self, EngineError> {
        if specs.is_empty() {
            return Err(EngineError::Schema(
                "Table must have at least one column".to_string(),
            ));
        }

        let mut schema = Schema {
            columns: Vec::with_capacity(specs.len()),
            primary_key: None,
            auto_increment: None,
            auto_increment_counter: 0,
            indexes: BTreeMap::new(),
            foreign_keys: Vec::new(),
        };

        for spec in specs {
            if spec.name.is_empty() {
                return Err(EngineError::Schema("Column must have a name".to_string()));
            }
            if schema.column(&spec.name).is_some() {
                return Err(EngineError::Schema(format!(
                    "Duplicate column name: '{}'",
                    spec.name
                )));
            }

            if spec.auto_increment {
                if !spec.primary_key {
                    return Err(EngineError::Schema(format!(
                        "AUTO_INCREMENT can only be used with PRIMARY KEY. Column '{}' is not a primary key",
                        spec.name
                    )));
                }
                if spec.ty != ColumnType::Int {
                    return Err(EngineError::Schema(format!(
                        "AUTO_INCREMENT can only be used with INT type. Column '{}' is {}",
                        spec.name, spec.ty
                    )));
                }
            }

            if spec.primary_key {
                if schema.primary_key.is_some() {
                    return Err(EngineError::Schema(
                        "Table can have only one primary key".to_string(),
                    ));
                }
                schema.primary_key = Some(spec.name.clone());
                if spec.auto_increment {
                    schema.auto_increment = Some(spec.name.clone());
                }
            }

            if let Some(fk) = &spec.foreign_key {
                schema.foreign_keys.push(FkBinding {
                    column: spec.name.clone(),
                    references_table: fk.references_table.clone(),
                    references_column: fk.references_column.clone(),
                    on_delete: fk.on_delete,
                });
            }

            // Primary keys are implicitly unique and NOT NULL.
            let unique = spec.unique || spec.primary_key;
            let nullable = spec.nullable && !spec.primary_key;

            if unique {
                schema.indexes.insert(
                    format!("{}_idx", spec.name),
                    IndexDef {
                        column: spec.name.clone(),
                        kind: IndexKind::Hash,
                    },
                );
            }

            schema.columns.push(Column {
                name: spec.name.clone(),
                ty: spec.ty,
                nullable,
                unique,
                foreign_key: spec.foreign_key.as_ref().map(|fk| ForeignKey {
                    references_table: fk.references_table.clone(),
                    references_column: fk.references_column.clone(),
                    on_delete: fk.on_delete,
                }),
            });
        }

        Ok(schema)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Position of a column in declaration order.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Name of the index covering the given column, if one exists.
    pub fn index_on(&self, column: &str) -> Option<&str> {
        self.indexes
            .iter()
            .find(|(_, def)| def.column == column)
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, ty: ColumnType) -> ColumnSpec {
        ColumnSpec::new(name, ty)
    }

    #[test]
    fn test_empty_column_list_rejected() {
        assert!(matches!(
            Schema::build(&[]),
            Err(EngineError::Schema(_))
        ));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let err = Schema::build(&[
            col("id", ColumnType::Int),
            col("id", ColumnType::Text),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate column name"), "{err}");
    }

    #[test]
    fn test_single_primary_key_enforced() {
        let err = Schema::build(&[
            col("a", ColumnType::Int).primary_key(),
            col("b", ColumnType::Int).primary_key(),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("only one primary key"), "{err}");
    }

    #[test]
    fn test_primary_key_implies_unique_and_not_null() {
        let schema = Schema::build(&[
            col("id", ColumnType::Int).primary_key(),
            col("name", ColumnType::Text),
        ])
        .unwrap();
        let id = schema.column("id").unwrap();
        assert!(id.unique);
        assert!(!id.nullable);
        assert_eq!(schema.primary_key.as_deref(), Some("id"));
        let name = schema.column("name").unwrap();
        assert!(name.nullable);
        assert!(!name.unique);
    }

    #[test]
    fn test_auto_increment_requires_int_primary_key() {
        let err = Schema::build(&[col("id", ColumnType::Int).auto_increment()]).unwrap_err();
        assert!(err.to_string().contains("PRIMARY KEY"), "{err}");

        let err =
            Schema::build(&[col("id", ColumnType::Text).primary_key().auto_increment()])
                .unwrap_err();
        assert!(err.to_string().contains("INT type"), "{err}");

        let schema =
            Schema::build(&[col("id", ColumnType::Int).primary_key().auto_increment()]).unwrap();
        assert_eq!(schema.auto_increment.as_deref(), Some("id"));
        assert_eq!(schema.auto_increment_counter, 0);
    }

    #[test]
    fn test_indexes_created_for_key_columns() {
        let schema = Schema::build(&[
            col("id", ColumnType::Int).primary_key(),
            col("email", ColumnType::Text).unique(),
            col("name", ColumnType::Text),
        ])
        .unwrap();
        assert_eq!(schema.indexes.len(), 2);
        assert!(schema.indexes.contains_key("id_idx"));
        assert!(schema.indexes.contains_key("email_idx"));
        assert_eq!(schema.index_on("email"), Some("email_idx"));
        assert_eq!(schema.index_on("name"), None);
    }

    #[test]
    fn test_foreign_keys_denormalized() {
        let schema = Schema::build(&[
            col("id", ColumnType::Int).primary_key(),
            col("user_id", ColumnType::Int).references("users", "id", FkAction::Cascade),
        ])
        .unwrap();
        assert_eq!(schema.foreign_keys.len(), 1);
        let fk = &schema.foreign_keys[0];
        assert_eq!(fk.column, "user_id");
        assert_eq!(fk.references_table, "users");
        assert_eq!(fk.references_column, "id");
        assert_eq!(fk.on_delete, FkAction::Cascade);
    }

    #[test]
    fn test_fk_action_keywords() {
        assert_eq!("restrict".parse::<FkAction>().unwrap(), FkAction::Restrict);
        assert_eq!("CASCADE".parse::<FkAction>().unwrap(), FkAction::Cascade);
        assert_eq!(FkAction::default(), FkAction::Restrict);
    }
}
