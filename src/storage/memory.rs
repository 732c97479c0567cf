//! In-memory blob store, for unit and property tests.

use std::cell::RefCell;
use std::collections::BTreeMap;

use super::{StorageError, Table, TableStore, valid_table_name};

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RefCell<BTreeMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemoryStore {
    fn exists(&self, table: &str) -> bool {
        self.tables.borrow().contains_key(table)
    }

    fn create(&self, table: &str, data: &Table) -> Result<(), StorageError> {
        if !valid_table_name(table) {
            return Err(StorageError::InvalidName {
                name: table.to_string(),
            });
        }
        let mut tables = self.tables.borrow_mut();
        if tables.contains_key(table) {
            return Err(StorageError::AlreadyExists {
                table: table.to_string(),
            });
        }
        tables.insert(table.to_string(), data.clone());
        Ok(())
    }

    fn load(&self, table: &str) -> Result<Table, StorageError> {
        self.tables
            .borrow()
            .get(table)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                table: table.to_string(),
            })
    }

    fn save(&self, table: &str, data: &Table) -> Result<(), StorageError> {
        let mut tables = self.tables.borrow_mut();
        match tables.get_mut(table) {
            Some(slot) => {
                *slot = data.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound {
                table: table.to_string(),
            }),
        }
    }

    fn drop(&self, table: &str) -> Result<(), StorageError> {
        self.tables
            .borrow_mut()
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound {
                table: table.to_string(),
            })
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.tables.borrow().keys().cloned().collect())
    }
}
