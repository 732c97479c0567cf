//! Query executor.
//!
//! All table state flows through here: operations load the blob, validate,
//! mutate, and save it back. Within one call effects are sequentially
//! consistent; there is no atomicity across tables (a CASCADE touches each
//! child blob separately).

mod fk;
mod join;

use tracing::debug;

use crate::error::EngineError;
use crate::parser::ast::{ColumnSpec, Condition, Predicate, Request, Select};
use crate::parser::parse;
use crate::pattern::LikeMatcher;
use crate::schema::Schema;
use crate::storage::{JsonStore, Row, StorageError, Table, TableStore};
use crate::value::{ColumnType, Value};

/// Result of one executed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created,
    Inserted,
    Rows(Vec<Row>),
    Affected(usize),
    Tables(Vec<String>),
    Dropped,
}

/// The database engine. Owns every table behind its store exclusively;
/// embedders needing concurrency must serialize calls above this layer.
pub struct Engine<S: TableStore = JsonStore> {
    store: S,
}

impl Engine<JsonStore> {
    /// Open an engine over a JSON-file data directory.
    pub fn open(dir: impl Into<std::path::PathBuf>) -> Result<Self, EngineError> {
        Ok(Self::new(JsonStore::open(dir)?))
    }
}

impl<S: TableStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Parse and execute one statement of the text dialect.
    pub fn execute_sql(&self, statement: &str) -> Result<Outcome, EngineError> {
        let request = parse(statement)?;
        self.execute(&request)
    }

    /// Execute a programmatic request.
    pub fn execute(&self, request: &Request) -> Result<Outcome, EngineError> {
        match request {
            Request::CreateTable(ct) => {
                self.create_table(&ct.table, &ct.columns)?;
                Ok(Outcome::Created)
            }
            Request::Insert(ins) => {
                self.insert(&ins.table, &ins.values)?;
                Ok(Outcome::Inserted)
            }
            Request::Select(sel) => self.select(sel).map(Outcome::Rows),
            Request::Update(up) => self
                .update(&up.table, &up.assignments, &up.conditions)
                .map(Outcome::Affected),
            Request::Delete(del) => self
                .delete(&del.table, &del.conditions)
                .map(Outcome::Affected),
        }
    }

    pub fn create_table(&self, name: &str, columns: &[ColumnSpec]) -> Result<(), EngineError> {
        if self.store.exists(name) {
            return Err(EngineError::Schema(format!(
                "Table '{name}' already exists"
            )));
        }
        let schema = Schema::build(columns)?;
        debug!(table = name, columns = schema.columns.len(), "create table");
        self.store.create(name, &Table::empty(schema))?;
        Ok(())
    }

    /// Insert a positional row. One value short is allowed when the table
    /// has an auto-increment column; Null (or the NULL literal) in that
    /// position draws the next counter value.
    pub fn insert(&self, name: &str, values: &[Value]) -> Result<(), EngineError> {
        let mut table = self.load_table(name)?;
        let mut values = values.to_vec();

        let auto_col = table.schema.auto_increment.clone();
        if let Some(col) = &auto_col
            && values.len() == table.schema.columns.len() - 1
            && let Some(pos) = table.schema.column_position(col)
        {
            values.insert(pos, Value::Null);
        }

        if values.len() != table.schema.columns.len() {
            return Err(EngineError::Schema(format!(
                "Column count mismatch: expected {}, got {}",
                table.schema.columns.len(),
                values.len()
            )));
        }

        let mut row = Row::new();
        for (column, raw) in table.schema.columns.iter().zip(&values) {
            let value = if auto_col.as_deref() == Some(column.name.as_str())
                && raw.is_null_literal()
            {
                Value::Int(next_auto_increment(&table))
            } else if raw.is_null_literal() {
                if !column.nullable {
                    return Err(EngineError::Constraint(format!(
                        "Column '{}' cannot be NULL",
                        column.name
                    )));
                }
                Value::Null
            } else {
                column.ty.coerce(raw)?
            };
            row.insert(column.name.clone(), value);
        }

        check_constraints(&table.schema, &table.rows, &row, None)?;

        // Raise the counter so invariant counter >= max(pk) survives
        // explicit inserts as well as generated ones.
        if let Some(col) = &auto_col
            && let Some(Value::Int(pk)) = row.get(col)
            && *pk > table.schema.auto_increment_counter
        {
            table.schema.auto_increment_counter = *pk;
        }

        let pos = table.rows.len();
        let Table {
            schema, indexes, ..
        } = &mut table;
        for (index_name, def) in &schema.indexes {
            if let (Some(index), Some(value)) = (indexes.get_mut(index_name), row.get(&def.column))
            {
                index.add(value, pos);
            }
        }
        debug!(table = name, position = pos, "insert row");
        table.rows.push(row);
        self.store.save(name, &table)?;
        Ok(())
    }

    /// Select rows, via joins when present. A single non-Null equality
    /// condition on an indexed column short-circuits to the index.
    pub fn select(&self, query: &Select) -> Result<Vec<Row>, EngineError> {
        if !query.joins.is_empty() {
            return join::run(self, query);
        }

        let table = self.load_table(&query.table)?;
        let projection: Vec<String> = if query.columns.is_empty() {
            table.schema.column_names().map(str::to_string).collect()
        } else {
            for column in &query.columns {
                if !table.schema.has_column(column) {
                    return Err(EngineError::no_such_column(column, &query.table));
                }
            }
            query.columns.clone()
        };

        let filters = compile_filters(&query.table, &table.schema, &query.conditions)?;
        let matched: Vec<&Row> = match index_lookup(&table, &filters) {
            Some(positions) => positions
                .iter()
                .filter_map(|pos| table.rows.get(*pos))
                .collect(),
            None => table
                .rows
                .iter()
                .filter(|row| row_matches(row, &filters))
                .collect(),
        };

        Ok(matched
            .into_iter()
            .map(|row| {
                projection
                    .iter()
                    .map(|col| {
                        (
                            col.clone(),
                            row.get(col).cloned().unwrap_or(Value::Null),
                        )
                    })
                    .collect()
            })
            .collect())
    }

    /// Update matching rows; every candidate validates before anything is
    /// written. Returns the number of rows changed.
    pub fn update(
        &self,
        name: &str,
        assignments: &[(String, Value)],
        conditions: &[Condition],
    ) -> Result<usize, EngineError> {
        let mut table = self.load_table(name)?;
        for (column, _) in assignments {
            if !table.schema.has_column(column) {
                return Err(EngineError::no_such_column(column, name));
            }
        }

        let filters = compile_filters(name, &table.schema, conditions)?;
        let matched: Vec<usize> = table
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row_matches(row, &filters))
            .map(|(pos, _)| pos)
            .collect();
        if matched.is_empty() {
            return Ok(0);
        }

        let mut new_rows = table.rows.clone();
        for &pos in &matched {
            let mut candidate = table.rows[pos].clone();
            for (column_name, raw) in assignments {
                let column = table
                    .schema
                    .column(column_name)
                    .ok_or_else(|| EngineError::no_such_column(column_name, name))?;
                let value = if raw.is_null_literal() {
                    if !column.nullable {
                        return Err(EngineError::Constraint(format!(
                            "Column '{}' cannot be NULL",
                            column.name
                        )));
                    }
                    Value::Null
                } else {
                    column.ty.coerce(raw)?
                };
                candidate.insert(column_name.clone(), value);
            }
            // The row's own position is excluded from the duplicate scan.
            check_constraints(&table.schema, &table.rows, &candidate, Some(pos))?;
            new_rows[pos] = candidate;
        }

        // Positions are stable under UPDATE, so indexes maintain by diff.
        let Table {
            schema,
            rows,
            indexes,
        } = &mut table;
        for (index_name, def) in &schema.indexes {
            let Some(index) = indexes.get_mut(index_name) else {
                continue;
            };
            for &pos in &matched {
                let old = rows[pos].get(&def.column).unwrap_or(&Value::Null);
                let new = new_rows[pos].get(&def.column).unwrap_or(&Value::Null);
                index.update(old, new, pos);
            }
        }

        debug!(table = name, rows = matched.len(), "update rows");
        table.rows = new_rows;
        self.store.save(name, &table)?;
        Ok(matched.len())
    }

    /// Delete matching rows. Foreign keys are enforced first: the entire
    /// cascade closure is planned before any blob is written, so a RESTRICT
    /// hit anywhere leaves every table unchanged.
    pub fn delete(&self, name: &str, conditions: &[Condition]) -> Result<usize, EngineError> {
        let mut table = self.load_table(name)?;
        let filters = compile_filters(name, &table.schema, conditions)?;

        let mut deleted = Vec::new();
        let mut kept = Vec::new();
        for row in &table.rows {
            if row_matches(row, &filters) {
                deleted.push(row.clone());
            } else {
                kept.push(row.clone());
            }
        }
        if deleted.is_empty() {
            return Ok(0);
        }

        let steps = fk::plan(&self.store, name, &table.schema, &deleted)?;
        for step in steps {
            let mut child = step.data;
            child.rows = child
                .rows
                .into_iter()
                .enumerate()
                .filter(|(pos, _)| !step.remove.contains(pos))
                .map(|(_, row)| row)
                .collect();
            child.rebuild_indexes();
            debug!(
                table = %step.table,
                rows = step.remove.len(),
                "cascade delete"
            );
            self.store.save(&step.table, &child)?;
        }

        debug!(table = name, rows = deleted.len(), "delete rows");
        table.rows = kept;
        // Compaction shifts surviving positions; rebuild wholesale.
        table.rebuild_indexes();
        self.store.save(name, &table)?;
        Ok(deleted.len())
    }

    /// Table names, lexicographically sorted.
    pub fn list_tables(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.store.list()?)
    }

    pub fn drop_table(&self, name: &str) -> Result<(), EngineError> {
        match self.store.drop(name) {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound { .. }) => Err(EngineError::no_such_table(name)),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn load_table(&self, name: &str) -> Result<Table, EngineError> {
        match self.store.load(name) {
            Ok(table) => Ok(table),
            Err(StorageError::NotFound { .. }) => Err(EngineError::no_such_table(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// The underlying blob store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Next value for an auto-increment primary key: one past both the counter
/// and the largest key actually present.
fn next_auto_increment(table: &Table) -> i64 {
    let mut next = table.schema.auto_increment_counter;
    if let Some(col) = &table.schema.auto_increment {
        for row in &table.rows {
            if let Some(Value::Int(pk)) = row.get(col) {
                next = next.max(*pk);
            }
        }
    }
    next + 1
}

/// Primary-key and unique checks for one candidate row. `exclude` is the
/// candidate's own position during UPDATE.
fn check_constraints(
    schema: &Schema,
    rows: &[Row],
    candidate: &Row,
    exclude: Option<usize>,
) -> Result<(), EngineError> {
    if let Some(pk) = &schema.primary_key {
        let pk_value = candidate.get(pk).unwrap_or(&Value::Null);
        if pk_value.is_null() {
            return Err(EngineError::Constraint(format!(
                "Primary key column '{pk}' cannot be NULL"
            )));
        }
        for (pos, row) in rows.iter().enumerate() {
            if Some(pos) == exclude {
                continue;
            }
            if row.get(pk).is_some_and(|v| v.loose_eq(pk_value)) {
                return Err(EngineError::Constraint(format!(
                    "Primary key violation: duplicate value '{pk_value}' in column '{pk}'"
                )));
            }
        }
    }

    for column in schema.columns.iter().filter(|c| c.unique) {
        let value = candidate.get(&column.name).unwrap_or(&Value::Null);
        if value.is_null() {
            continue;
        }
        for (pos, row) in rows.iter().enumerate() {
            if Some(pos) == exclude {
                continue;
            }
            if row.get(&column.name).is_some_and(|v| v.loose_eq(value)) {
                return Err(EngineError::Constraint(format!(
                    "Unique constraint violation: duplicate value '{value}' in column '{}'",
                    column.name
                )));
            }
        }
    }
    Ok(())
}

/// A condition compiled against a column type, ready to test cells.
pub(crate) enum FilterTest {
    /// `col = NULL` matches rows whose value is Null.
    IsNull,
    /// Equality against the value coerced to the column type.
    Eq(Value),
    Like(LikeMatcher),
    /// A value that failed coercion (or an uncompilable pattern) matches
    /// nothing rather than erroring.
    Never,
}

impl FilterTest {
    pub(crate) fn compile(predicate: &Predicate, ty: ColumnType) -> Self {
        match predicate {
            Predicate::Equals(raw) if raw.is_null_literal() => Self::IsNull,
            Predicate::Equals(raw) => match ty.coerce(raw) {
                Ok(value) => Self::Eq(value),
                Err(_) => Self::Never,
            },
            Predicate::Like(pattern) => match LikeMatcher::new(pattern) {
                Some(matcher) => Self::Like(matcher),
                None => Self::Never,
            },
        }
    }

    pub(crate) fn matches(&self, cell: &Value) -> bool {
        match self {
            Self::IsNull => cell.is_null(),
            Self::Eq(value) => value.loose_eq(cell),
            Self::Like(matcher) => matcher.matches(cell),
            Self::Never => false,
        }
    }
}

struct RowFilter {
    column: String,
    test: FilterTest,
}

fn compile_filters(
    table_name: &str,
    schema: &Schema,
    conditions: &[Condition],
) -> Result<Vec<RowFilter>, EngineError> {
    conditions
        .iter()
        .map(|cond| {
            let column = schema
                .column(&cond.column)
                .ok_or_else(|| EngineError::no_such_column(&cond.column, table_name))?;
            Ok(RowFilter {
                column: cond.column.clone(),
                test: FilterTest::compile(&cond.predicate, column.ty),
            })
        })
        .collect()
}

fn row_matches(row: &Row, filters: &[RowFilter]) -> bool {
    filters
        .iter()
        .all(|f| f.test.matches(row.get(&f.column).unwrap_or(&Value::Null)))
}

/// Index route: exactly one filter, an equality on a non-Null value, and
/// an index on that column. Everything else scans.
fn index_lookup<'a>(table: &'a Table, filters: &[RowFilter]) -> Option<&'a [usize]> {
    let [filter] = filters else { return None };
    let FilterTest::Eq(value) = &filter.test else {
        return None;
    };
    let index_name = table.schema.index_on(&filter.column)?;
    let index = table.indexes.get(index_name)?;
    Some(index.lookup(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{ColumnSpec, Select};
    use crate::schema::FkAction;
    use crate::storage::MemoryStore;

    fn engine() -> Engine<MemoryStore> {
        Engine::new(MemoryStore::new())
    }

    fn users(engine: &Engine<MemoryStore>) {
        engine
            .create_table(
                "users",
                &[
                    ColumnSpec::new("id", ColumnType::Int)
                        .primary_key()
                        .auto_increment(),
                    ColumnSpec::new("name", ColumnType::Text),
                    ColumnSpec::new("email", ColumnType::Text).unique(),
                ],
            )
            .unwrap();
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_create_rejects_duplicate_table() {
        let db = engine();
        users(&db);
        let err = db
            .create_table("users", &[ColumnSpec::new("x", ColumnType::Int)])
            .unwrap_err();
        assert!(matches!(err, EngineError::Schema(_)), "{err}");
    }

    #[test]
    fn test_insert_generates_auto_increment_ids() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        // One value short also works: the placeholder slots in.
        db.insert("users", &[text("Bob"), text("b@x")]).unwrap();

        let rows = db.select(&Select::all("users")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], Value::Int(1));
        assert_eq!(rows[1]["id"], Value::Int(2));
    }

    #[test]
    fn test_explicit_pk_raises_counter() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Int(10), text("Ada"), text("a@x")])
            .unwrap();
        db.insert("users", &[Value::Null, text("Bob"), text("b@x")])
            .unwrap();
        let rows = db.select(&Select::all("users")).unwrap();
        assert_eq!(rows[1]["id"], Value::Int(11));
    }

    #[test]
    fn test_insert_column_count_mismatch() {
        let db = engine();
        users(&db);
        let err = db.insert("users", &[text("Ada")]).unwrap_err();
        assert!(err.to_string().contains("Column count mismatch"), "{err}");
    }

    #[test]
    fn test_insert_rejects_null_in_not_null_column() {
        let db = engine();
        db.create_table(
            "t",
            &[
                ColumnSpec::new("id", ColumnType::Int).primary_key(),
                ColumnSpec::new("req", ColumnType::Text).not_null(),
            ],
        )
        .unwrap();
        let err = db.insert("t", &[Value::Int(1), Value::Null]).unwrap_err();
        assert!(matches!(err, EngineError::Constraint(_)), "{err}");
    }

    #[test]
    fn test_unique_violation_is_case_insensitive_and_leaves_table_unchanged() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        let err = db
            .insert("users", &[Value::Null, text("Eve"), text("A@X")])
            .unwrap_err();
        assert!(matches!(err, EngineError::Constraint(_)), "{err}");
        assert_eq!(db.select(&Select::all("users")).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_primary_key_rejected() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Int(1), text("Ada"), text("a@x")])
            .unwrap();
        let err = db
            .insert("users", &[Value::Int(1), text("Bob"), text("b@x")])
            .unwrap_err();
        assert!(err.to_string().contains("Primary key violation"), "{err}");
    }

    #[test]
    fn test_select_filters_text_case_insensitively() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        db.insert("users", &[Value::Null, text("Bob"), text("b@x")])
            .unwrap();

        let mut query = Select::all("users");
        query.columns = vec!["name".to_string()];
        query.conditions = vec![Condition::equals("email", text("A@X"))];
        let rows = db.select(&query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], text("Ada"));
    }

    #[test]
    fn test_select_unknown_column_errors() {
        let db = engine();
        users(&db);
        let mut query = Select::all("users");
        query.columns = vec!["ghost".to_string()];
        assert!(matches!(
            db.select(&query),
            Err(EngineError::Schema(_))
        ));
    }

    #[test]
    fn test_where_coercion_failure_matches_nothing() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        let mut query = Select::all("users");
        query.conditions = vec![Condition::equals("id", text("abc"))];
        assert!(db.select(&query).unwrap().is_empty());
    }

    #[test]
    fn test_where_null_matches_null_cells() {
        let db = engine();
        db.create_table(
            "t",
            &[
                ColumnSpec::new("id", ColumnType::Int).primary_key(),
                ColumnSpec::new("note", ColumnType::Text),
            ],
        )
        .unwrap();
        db.insert("t", &[Value::Int(1), Value::Null]).unwrap();
        db.insert("t", &[Value::Int(2), text("x")]).unwrap();

        let mut query = Select::all("t");
        query.conditions = vec![Condition::equals("note", Value::Null)];
        let rows = db.select(&query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], Value::Int(1));
    }

    #[test]
    fn test_like_predicate() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        db.insert("users", &[Value::Null, text("Bob"), text("b@x")])
            .unwrap();
        let mut query = Select::all("users");
        query.columns = vec!["name".to_string()];
        query.conditions = vec![Condition::like("name", "a%")];
        let rows = db.select(&query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], text("Ada"));
    }

    #[test]
    fn test_indexed_lookup_agrees_with_scan() {
        let db = engine();
        users(&db);
        for (name, email) in [("Ada", "a@x"), ("Bob", "b@x"), ("Cyd", "c@x")] {
            db.insert("users", &[Value::Null, text(name), text(email)])
                .unwrap();
        }
        // email is unique, hence indexed; name is not.
        let mut by_index = Select::all("users");
        by_index.conditions = vec![Condition::equals("email", text("B@X"))];
        let mut by_scan = Select::all("users");
        by_scan.conditions = vec![Condition::like("email", "b@x")];
        assert_eq!(
            db.select(&by_index).unwrap(),
            db.select(&by_scan).unwrap()
        );
    }

    #[test]
    fn test_update_applies_assignments_and_reports_count() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        db.insert("users", &[Value::Null, text("Bob"), text("b@x")])
            .unwrap();

        let count = db
            .update(
                "users",
                &[("name".to_string(), text("Eve"))],
                &[Condition::equals("id", Value::Int(2))],
            )
            .unwrap();
        assert_eq!(count, 1);
        let rows = db.select(&Select::all("users")).unwrap();
        assert_eq!(rows[1]["name"], text("Eve"));
        assert_eq!(rows[0]["name"], text("Ada"));
    }

    #[test]
    fn test_update_without_where_touches_every_row() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        db.insert("users", &[Value::Null, text("Bob"), text("b@x")])
            .unwrap();
        let count = db
            .update("users", &[("name".to_string(), text("anon"))], &[])
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_update_excludes_own_row_from_unique_scan() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        // Re-assigning the same unique value to the same row is fine.
        let count = db
            .update(
                "users",
                &[("email".to_string(), text("a@x"))],
                &[Condition::equals("id", Value::Int(1))],
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_update_unique_collision_with_other_row_fails() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        db.insert("users", &[Value::Null, text("Bob"), text("b@x")])
            .unwrap();
        let err = db
            .update(
                "users",
                &[("email".to_string(), text("a@x"))],
                &[Condition::equals("id", Value::Int(2))],
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Constraint(_)), "{err}");
        // Nothing was written.
        let rows = db.select(&Select::all("users")).unwrap();
        assert_eq!(rows[1]["email"], text("b@x"));
    }

    #[test]
    fn test_update_maintains_index_by_diff() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        db.update(
            "users",
            &[("email".to_string(), text("new@x"))],
            &[Condition::equals("id", Value::Int(1))],
        )
        .unwrap();

        let mut query = Select::all("users");
        query.conditions = vec![Condition::equals("email", text("NEW@X"))];
        assert_eq!(db.select(&query).unwrap().len(), 1);
        let mut stale = Select::all("users");
        stale.conditions = vec![Condition::equals("email", text("a@x"))];
        assert!(db.select(&stale).unwrap().is_empty());
    }

    #[test]
    fn test_delete_with_where_compacts_and_reindexes() {
        let db = engine();
        users(&db);
        for (name, email) in [("Ada", "a@x"), ("Bob", "b@x"), ("Cyd", "c@x")] {
            db.insert("users", &[Value::Null, text(name), text(email)])
                .unwrap();
        }
        let count = db
            .delete("users", &[Condition::equals("id", Value::Int(2))])
            .unwrap();
        assert_eq!(count, 1);

        // Surviving rows shifted down; the index must have followed.
        let mut query = Select::all("users");
        query.conditions = vec![Condition::equals("email", text("c@x"))];
        let rows = db.select(&query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], text("Cyd"));
    }

    #[test]
    fn test_delete_without_where_empties_table() {
        let db = engine();
        users(&db);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        assert_eq!(db.delete("users", &[]).unwrap(), 1);
        assert!(db.select(&Select::all("users")).unwrap().is_empty());
        assert_eq!(db.delete("users", &[]).unwrap(), 0);
    }

    #[test]
    fn test_missing_table_is_a_schema_error() {
        let db = engine();
        assert!(matches!(
            db.select(&Select::all("ghost")),
            Err(EngineError::Schema(_))
        ));
        assert!(matches!(
            db.insert("ghost", &[Value::Int(1)]),
            Err(EngineError::Schema(_))
        ));
    }

    #[test]
    fn test_list_and_drop_tables() {
        let db = engine();
        users(&db);
        db.create_table("a", &[ColumnSpec::new("x", ColumnType::Int)])
            .unwrap();
        assert_eq!(db.list_tables().unwrap(), vec!["a", "users"]);
        db.drop_table("a").unwrap();
        assert_eq!(db.list_tables().unwrap(), vec!["users"]);
        assert!(db.drop_table("a").is_err());
    }

    #[test]
    fn test_execute_sql_round_trip() {
        let db = engine();
        db.execute_sql("CREATE TABLE u (id INT PRIMARY KEY AUTO_INCREMENT, name TEXT)")
            .unwrap();
        db.execute_sql("INSERT INTO u VALUES (NULL, 'Ada')").unwrap();
        let outcome = db.execute_sql("SELECT * FROM u").unwrap();
        let Outcome::Rows(rows) = outcome else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], Value::Int(1));
        assert_eq!(rows[0]["name"], text("Ada"));
    }

    #[test]
    fn test_float_column_accepts_int_but_not_vice_versa() {
        let db = engine();
        db.create_table(
            "m",
            &[
                ColumnSpec::new("id", ColumnType::Int).primary_key(),
                ColumnSpec::new("ratio", ColumnType::Float),
            ],
        )
        .unwrap();
        db.insert("m", &[Value::Int(1), Value::Int(3)]).unwrap();
        let rows = db.select(&Select::all("m")).unwrap();
        assert_eq!(rows[0]["ratio"], Value::Float(3.0));

        let err = db.insert("m", &[Value::Float(2.5), Value::Int(3)]).unwrap_err();
        assert!(matches!(err, EngineError::Type(_)), "{err}");
    }

    // Foreign-key scenarios live here rather than fk.rs because they need
    // the full engine surface.

    fn orders_with_fk(db: &Engine<MemoryStore>, on_delete: FkAction) {
        db.create_table(
            "orders",
            &[
                ColumnSpec::new("id", ColumnType::Int).primary_key(),
                ColumnSpec::new("user_id", ColumnType::Int).references("users", "id", on_delete),
                ColumnSpec::new("total", ColumnType::Float),
            ],
        )
        .unwrap();
    }

    #[test]
    fn test_restrict_blocks_parent_delete() {
        let db = engine();
        users(&db);
        orders_with_fk(&db, FkAction::Restrict);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        db.insert("orders", &[Value::Int(10), Value::Int(1), Value::Float(5.0)])
            .unwrap();

        let err = db
            .delete("users", &[Condition::equals("id", Value::Int(1))])
            .unwrap_err();
        assert!(matches!(err, EngineError::ForeignKey(_)), "{err}");
        // No-op on failure: both tables intact.
        assert_eq!(db.select(&Select::all("users")).unwrap().len(), 1);
        assert_eq!(db.select(&Select::all("orders")).unwrap().len(), 1);
    }

    #[test]
    fn test_cascade_removes_children() {
        let db = engine();
        users(&db);
        orders_with_fk(&db, FkAction::Cascade);
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        db.insert("users", &[Value::Null, text("Bob"), text("b@x")])
            .unwrap();
        for (id, user, total) in [(10, 1, 5.0), (11, 1, 7.0), (12, 2, 3.0)] {
            db.insert(
                "orders",
                &[Value::Int(id), Value::Int(user), Value::Float(total)],
            )
            .unwrap();
        }

        let count = db
            .delete("users", &[Condition::equals("id", Value::Int(1))])
            .unwrap();
        assert_eq!(count, 1);
        let rows = db.select(&Select::all("orders")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], Value::Int(12));
    }

    #[test]
    fn test_cascade_recurses_through_grandchildren() {
        let db = engine();
        users(&db);
        orders_with_fk(&db, FkAction::Cascade);
        db.create_table(
            "items",
            &[
                ColumnSpec::new("id", ColumnType::Int).primary_key(),
                ColumnSpec::new("order_id", ColumnType::Int)
                    .references("orders", "id", FkAction::Cascade),
            ],
        )
        .unwrap();
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        db.insert("orders", &[Value::Int(10), Value::Int(1), Value::Float(5.0)])
            .unwrap();
        db.insert("items", &[Value::Int(100), Value::Int(10)]).unwrap();

        db.delete("users", &[Condition::equals("id", Value::Int(1))])
            .unwrap();
        assert!(db.select(&Select::all("orders")).unwrap().is_empty());
        assert!(db.select(&Select::all("items")).unwrap().is_empty());
    }

    #[test]
    fn test_restrict_deep_in_cascade_aborts_everything() {
        let db = engine();
        users(&db);
        orders_with_fk(&db, FkAction::Cascade);
        db.create_table(
            "invoices",
            &[
                ColumnSpec::new("id", ColumnType::Int).primary_key(),
                ColumnSpec::new("order_id", ColumnType::Int)
                    .references("orders", "id", FkAction::Restrict),
            ],
        )
        .unwrap();
        db.insert("users", &[Value::Null, text("Ada"), text("a@x")])
            .unwrap();
        db.insert("orders", &[Value::Int(10), Value::Int(1), Value::Float(5.0)])
            .unwrap();
        db.insert("invoices", &[Value::Int(7), Value::Int(10)]).unwrap();

        let err = db
            .delete("users", &[Condition::equals("id", Value::Int(1))])
            .unwrap_err();
        assert!(matches!(err, EngineError::ForeignKey(_)), "{err}");
        // The cascade through orders was planned but never applied.
        assert_eq!(db.select(&Select::all("users")).unwrap().len(), 1);
        assert_eq!(db.select(&Select::all("orders")).unwrap().len(), 1);
        assert_eq!(db.select(&Select::all("invoices")).unwrap().len(), 1);
    }

    #[test]
    fn test_cyclic_cascade_terminates() {
        let db = engine();
        db.create_table(
            "a",
            &[
                ColumnSpec::new("id", ColumnType::Int).primary_key(),
                ColumnSpec::new("b_id", ColumnType::Int).references("b", "id", FkAction::Cascade),
            ],
        )
        .unwrap();
        db.create_table(
            "b",
            &[
                ColumnSpec::new("id", ColumnType::Int).primary_key(),
                ColumnSpec::new("a_id", ColumnType::Int).references("a", "id", FkAction::Cascade),
            ],
        )
        .unwrap();
        db.insert("a", &[Value::Int(1), Value::Int(1)]).unwrap();
        db.insert("b", &[Value::Int(1), Value::Int(1)]).unwrap();

        let count = db
            .delete("a", &[Condition::equals("id", Value::Int(1))])
            .unwrap();
        assert_eq!(count, 1);
        assert!(db.select(&Select::all("a")).unwrap().is_empty());
        assert!(db.select(&Select::all("b")).unwrap().is_empty());
    }
}
