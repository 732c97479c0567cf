//! Referential enforcement on DELETE.
//!
//! The cascade closure is planned in full before any blob is written:
//! RESTRICT anywhere in the closure aborts the whole delete, CASCADE marks
//! child rows for removal and recurses on the child's own primary keys.
//! Visited (table, key-set) pairs are memoized so cyclic foreign-key
//! graphs terminate by dedup instead of recursing forever.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::EngineError;
use crate::index::IndexKey;
use crate::schema::{FkAction, FkBinding, Schema};
use crate::storage::{Row, Table, TableStore};

/// One child table write the delete will perform: positions to remove
/// from the row vector as loaded.
#[derive(Debug)]
pub(crate) struct CascadeStep {
    pub table: String,
    pub data: Table,
    pub remove: BTreeSet<usize>,
}

/// Plan the cascade for deleting `deleted_rows` from `root`. Returns the
/// child-table steps; the root's own rows are not part of the plan.
///
/// Without a primary key on the root there is nothing to enforce against.
/// Key membership uses [`IndexKey`], so text keys compare case-folded,
/// consistent with uniqueness elsewhere.
pub(crate) fn plan<S: TableStore>(
    store: &S,
    root: &str,
    root_schema: &Schema,
    deleted_rows: &[Row],
) -> Result<Vec<CascadeStep>, EngineError> {
    let Some(pk_col) = &root_schema.primary_key else {
        return Ok(Vec::new());
    };
    let keys = pk_keys(deleted_rows, pk_col);
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let mut planner = Planner {
        store,
        steps: BTreeMap::new(),
        visited: HashSet::new(),
    };
    planner.cascade(root, pk_col, &keys)?;
    Ok(planner
        .steps
        .into_iter()
        .map(|(table, (data, remove))| CascadeStep {
            table,
            data,
            remove,
        })
        .collect())
}

fn pk_keys(rows: &[Row], pk_col: &str) -> BTreeSet<IndexKey> {
    rows.iter()
        .filter_map(|row| row.get(pk_col))
        .filter_map(IndexKey::for_value)
        .collect()
}

struct Planner<'a, S: TableStore> {
    store: &'a S,
    /// Accumulated removals per child table, with the loaded blob.
    steps: BTreeMap<String, (Table, BTreeSet<usize>)>,
    visited: HashSet<(String, BTreeSet<IndexKey>)>,
}

impl<S: TableStore> Planner<'_, S> {
    fn cascade(
        &mut self,
        parent: &str,
        pk_col: &str,
        keys: &BTreeSet<IndexKey>,
    ) -> Result<(), EngineError> {
        if !self
            .visited
            .insert((parent.to_string(), keys.clone()))
        {
            return Ok(());
        }

        for child_name in self.store.list()? {
            if child_name == parent {
                continue;
            }
            let data = match self.steps.get(&child_name) {
                Some((table, _)) => table.clone(),
                None => self.store.load(&child_name)?,
            };
            let bindings: Vec<FkBinding> = data
                .schema
                .foreign_keys
                .iter()
                .filter(|fk| fk.references_table == parent && fk.references_column == pk_col)
                .cloned()
                .collect();

            for fk in bindings {
                let already: BTreeSet<usize> = self
                    .steps
                    .get(&child_name)
                    .map(|(_, remove)| remove.clone())
                    .unwrap_or_default();
                let matching: Vec<usize> = data
                    .rows
                    .iter()
                    .enumerate()
                    .filter(|(pos, row)| {
                        !already.contains(pos)
                            && row
                                .get(&fk.column)
                                .and_then(IndexKey::for_value)
                                .is_some_and(|key| keys.contains(&key))
                    })
                    .map(|(pos, _)| pos)
                    .collect();
                if matching.is_empty() {
                    continue;
                }

                match fk.on_delete {
                    FkAction::Restrict => {
                        return Err(EngineError::ForeignKey(format!(
                            "Cannot delete or update a parent row: a foreign key constraint \
                             fails ({child_name}.{} -> {parent}.{pk_col})",
                            fk.column
                        )));
                    }
                    FkAction::Cascade => {
                        tracing::debug!(
                            parent,
                            child = %child_name,
                            rows = matching.len(),
                            "cascade planned"
                        );
                        let entry = self
                            .steps
                            .entry(child_name.clone())
                            .or_insert_with(|| (data.clone(), BTreeSet::new()));
                        entry.1.extend(matching.iter().copied());

                        if let Some(child_pk) = data.schema.primary_key.clone() {
                            let child_keys: BTreeSet<IndexKey> = matching
                                .iter()
                                .filter_map(|pos| data.rows[*pos].get(&child_pk))
                                .filter_map(IndexKey::for_value)
                                .collect();
                            if !child_keys.is_empty() {
                                self.cascade(&child_name, &child_pk, &child_keys)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
