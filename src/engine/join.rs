//! Left-deep nested-loop joins.
//!
//! Until the first join is applied the working rows keep the base table's
//! unqualified column keys; the first join requalifies everything to
//! `table.column` and later joins extend that. The ON predicate uses
//! strict value equality and Null never matches anything, including Null.

use super::{Engine, FilterTest};
use crate::error::EngineError;
use crate::parser::ast::Select;
use crate::schema::Schema;
use crate::storage::{Row, TableStore};
use crate::value::{ColumnType, Value};

pub(crate) fn run<S: TableStore>(
    engine: &Engine<S>,
    query: &Select,
) -> Result<Vec<Row>, EngineError> {
    let base = engine.load_table(&query.table)?;
    let mut schemas: Vec<(String, Schema)> = vec![(query.table.clone(), base.schema)];
    let mut working: Vec<Row> = base.rows;
    let mut qualified = false;

    for join in &query.joins {
        let right = engine.load_table(&join.table)?;
        let on = &join.on;

        if on.right_table != join.table {
            return Err(EngineError::Schema(format!(
                "join ON must reference the joined table '{}', not '{}'",
                join.table, on.right_table
            )));
        }
        if !right.schema.has_column(&on.right_column) {
            return Err(EngineError::no_such_column(&on.right_column, &join.table));
        }
        let (_, left_schema) = schemas
            .iter()
            .find(|(name, _)| *name == on.left_table)
            .ok_or_else(|| {
                EngineError::Schema(format!(
                    "join ON references table '{}' which is not part of the join",
                    on.left_table
                ))
            })?;
        if !left_schema.has_column(&on.left_column) {
            return Err(EngineError::no_such_column(&on.left_column, &on.left_table));
        }

        let left_key = format!("{}.{}", on.left_table, on.left_column);
        let (base_name, base_schema) = &schemas[0];

        let mut joined = Vec::new();
        for row in &working {
            let left_value = if qualified {
                row.get(&left_key)
            } else {
                row.get(&on.left_column)
            };
            let Some(left_value) = left_value else {
                continue;
            };
            if left_value.is_null() {
                continue;
            }
            for right_row in &right.rows {
                let right_value = right_row.get(&on.right_column).unwrap_or(&Value::Null);
                if right_value != left_value {
                    continue;
                }
                let mut combined: Row = if qualified {
                    row.clone()
                } else {
                    // First join: requalify the base table's keys.
                    base_schema
                        .column_names()
                        .map(|col| {
                            (
                                format!("{base_name}.{col}"),
                                row.get(col).cloned().unwrap_or(Value::Null),
                            )
                        })
                        .collect()
                };
                for col in right.schema.column_names() {
                    combined.insert(
                        format!("{}.{col}", join.table),
                        right_row.get(col).cloned().unwrap_or(Value::Null),
                    );
                }
                joined.push(combined);
            }
        }

        schemas.push((join.table.clone(), right.schema));
        working = joined;
        qualified = true;
    }

    // WHERE over the joined rows, with the usual filter semantics against
    // the resolved column's type.
    let filters: Vec<(String, FilterTest)> = query
        .conditions
        .iter()
        .map(|cond| {
            let (key, ty) = resolve_column(&schemas, &cond.column)?;
            Ok((key, FilterTest::compile(&cond.predicate, ty)))
        })
        .collect::<Result<_, EngineError>>()?;
    working.retain(|row| {
        filters
            .iter()
            .all(|(key, test)| test.matches(row.get(key).unwrap_or(&Value::Null)))
    });

    project(&schemas, working, &query.columns)
}

/// Resolve a WHERE column against the joined tables: qualified names look
/// up their table directly, unqualified names take the first table in join
/// order that declares the column.
fn resolve_column(
    schemas: &[(String, Schema)],
    column: &str,
) -> Result<(String, ColumnType), EngineError> {
    if let Some((table, col)) = column.split_once('.') {
        let (_, schema) = schemas
            .iter()
            .find(|(name, _)| name == table)
            .ok_or_else(|| {
                EngineError::Schema(format!(
                    "Column '{column}' references table '{table}' which is not part of the join"
                ))
            })?;
        let decl = schema
            .column(col)
            .ok_or_else(|| EngineError::no_such_column(col, table))?;
        Ok((column.to_string(), decl.ty))
    } else {
        schemas
            .iter()
            .find_map(|(table, schema)| {
                schema
                    .column(column)
                    .map(|decl| (format!("{table}.{column}"), decl.ty))
            })
            .ok_or_else(|| {
                EngineError::Schema(format!("Column '{column}' not found in joined tables"))
            })
    }
}

fn project(
    schemas: &[(String, Schema)],
    working: Vec<Row>,
    columns: &[String],
) -> Result<Vec<Row>, EngineError> {
    if columns.is_empty() {
        // `*`: drop the qualification from names declared by exactly one
        // joined table; ambiguous names stay qualified.
        return Ok(working
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(key, value)| {
                        let simplified = match key.split_once('.') {
                            Some((_, col))
                                if schemas
                                    .iter()
                                    .filter(|(_, schema)| schema.has_column(col))
                                    .count()
                                    == 1 =>
                            {
                                Some(col.to_string())
                            }
                            _ => None,
                        };
                        (simplified.unwrap_or(key), value)
                    })
                    .collect()
            })
            .collect());
    }

    // Resolve the requested names once, then project every row.
    let resolved: Vec<(String, String)> = columns
        .iter()
        .map(|requested| {
            resolve_column(schemas, requested).map(|(key, _)| (requested.clone(), key))
        })
        .collect::<Result<_, EngineError>>()?;

    Ok(working
        .into_iter()
        .map(|row| {
            resolved
                .iter()
                .map(|(out, key)| {
                    (
                        out.clone(),
                        row.get(key).cloned().unwrap_or(Value::Null),
                    )
                })
                .collect()
        })
        .collect())
}
