//! JSON-file blob store: one `<table>.json` per table under a data
//! directory, replaced atomically via a temp file plus rename.

use std::fs;
use std::path::{Path, PathBuf};

use super::{StorageError, Table, TableStore, valid_table_name};

#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Open (creating if needed) a data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table_path(&self, table: &str) -> Result<PathBuf, StorageError> {
        if !valid_table_name(table) {
            return Err(StorageError::InvalidName {
                name: table.to_string(),
            });
        }
        Ok(self.dir.join(format!("{table}.json")))
    }

    /// Whole-blob replace: write next to the target, then rename over it.
    fn write_blob(&self, table: &str, path: &Path, data: &Table) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(data).map_err(|e| StorageError::Corrupt {
            table: table.to_string(),
            message: e.to_string(),
        })?;
        let tmp = self.dir.join(format!(".{table}.json.tmp"));
        fs::write(&tmp, bytes).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl TableStore for JsonStore {
    fn exists(&self, table: &str) -> bool {
        self.table_path(table)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    fn create(&self, table: &str, data: &Table) -> Result<(), StorageError> {
        let path = self.table_path(table)?;
        if path.exists() {
            return Err(StorageError::AlreadyExists {
                table: table.to_string(),
            });
        }
        self.write_blob(table, &path, data)
    }

    fn load(&self, table: &str) -> Result<Table, StorageError> {
        let path = self.table_path(table)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    table: table.to_string(),
                });
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
            table: table.to_string(),
            message: e.to_string(),
        })
    }

    fn save(&self, table: &str, data: &Table) -> Result<(), StorageError> {
        let path = self.table_path(table)?;
        if !path.is_file() {
            return Err(StorageError::NotFound {
                table: table.to_string(),
            });
        }
        self.write_blob(table, &path, data)
    }

    fn drop(&self, table: &str) -> Result<(), StorageError> {
        let path = self.table_path(table)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                table: table.to_string(),
            }),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut tables = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && valid_table_name(stem)
            {
                tables.push(stem.to_string());
            }
        }
        tables.sort();
        Ok(tables)
    }
}
