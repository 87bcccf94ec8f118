// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Persistent catalog and row storage on sled
//!
//! Layout of one store:
//! - `__databases`: database name -> empty
//! - `__catalog`: `db.table` -> bincode [`TableDef`]
//! - `__meta`: engine-wide settings such as the current database
//! - `data:db.table`: ordering key ++ sequence id -> bincode row
//!
//! sled holds an exclusive lock on its directory, so all handles opened on
//! the same directory within a process share one [`Store`] through a registry
//! of weak references.

use super::error::{SqlError, SqlResult};
use super::types::{encode_key, DataType};
use crate::value::Value;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

pub const DEFAULT_DATABASE: &str = "default";

const DATABASES_TREE: &str = "__databases";
const CATALOG_TREE: &str = "__catalog";
const META_TREE: &str = "__meta";
const CURRENT_DATABASE_KEY: &str = "current_database";

/// Attempts made while a previous instance still holds the directory lock
const OPEN_ATTEMPTS: u32 = 40;
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(50);

static REGISTRY: Lazy<Mutex<HashMap<PathBuf, Weak<Store>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub database: String,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub engine: String,
    /// Indexes into `columns` forming the ordering key
    pub order_key: Vec<usize>,
}

impl TableDef {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

pub struct Store {
    db: sled::Db,
    path: Option<PathBuf>,
    /// Serializes catalog changes across handles sharing this store
    ddl: Mutex<()>,
}

impl Store {
    /// Fresh store discarded when the last reference is dropped
    pub fn temporary() -> SqlResult<Arc<Store>> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Arc::new(Store::init(db, None)?))
    }

    /// Shared store rooted at `dir`
    ///
    /// The directory is created first so every spelling of the same location
    /// (relative, symlinked, trailing slash) resolves to one registry key.
    /// While a previous instance still holds the sled lock the open is retried
    /// with the registry unlocked, so opens of other directories proceed.
    pub fn open(dir: &Path) -> SqlResult<Arc<Store>> {
        let key = registry_key(dir)?;
        let mut attempt = 1;
        loop {
            {
                let mut registry = REGISTRY.lock();
                registry.retain(|_, store| store.strong_count() > 0);
                if let Some(store) = registry.get(&key).and_then(Weak::upgrade) {
                    log::debug!("Reusing open store at {}", key.display());
                    return Ok(store);
                }

                match sled::open(&key) {
                    Ok(db) => {
                        log::debug!("Opened store at {} (attempt {})", key.display(), attempt);
                        let store = Arc::new(Store::init(db, Some(key.clone()))?);
                        registry.insert(key, Arc::downgrade(&store));
                        return Ok(store);
                    }
                    Err(sled::Error::Io(e)) if attempt < OPEN_ATTEMPTS => {
                        log::debug!("Store at {} is busy ({}), retrying", key.display(), e);
                    }
                    Err(e) => return Err(SqlError::Storage(e)),
                }
            }
            std::thread::sleep(OPEN_RETRY_DELAY);
            attempt += 1;
        }
    }

    fn init(db: sled::Db, path: Option<PathBuf>) -> SqlResult<Store> {
        let databases = db.open_tree(DATABASES_TREE)?;
        if !databases.contains_key(DEFAULT_DATABASE)? {
            databases.insert(DEFAULT_DATABASE, Vec::<u8>::new())?;
        }
        Ok(Store {
            db,
            path,
            ddl: Mutex::new(()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn flush(&self) -> SqlResult<()> {
        self.db.flush()?;
        Ok(())
    }

    pub fn current_database(&self) -> SqlResult<String> {
        let meta = self.db.open_tree(META_TREE)?;
        Ok(meta
            .get(CURRENT_DATABASE_KEY)?
            .map(|v| String::from_utf8_lossy(&v).into_owned())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string()))
    }

    pub fn set_current_database(&self, name: &str) -> SqlResult<()> {
        self.require_database(name)?;
        self.db.open_tree(META_TREE)?.insert(CURRENT_DATABASE_KEY, name.as_bytes())?;
        Ok(())
    }

    pub fn database_exists(&self, name: &str) -> SqlResult<bool> {
        Ok(self.db.open_tree(DATABASES_TREE)?.contains_key(name)?)
    }

    pub fn require_database(&self, name: &str) -> SqlResult<()> {
        if self.database_exists(name)? {
            Ok(())
        } else {
            Err(SqlError::UnknownDatabase(name.to_string()))
        }
    }

    pub fn databases(&self) -> SqlResult<Vec<String>> {
        self.db
            .open_tree(DATABASES_TREE)?
            .iter()
            .keys()
            .map(|k| Ok(String::from_utf8_lossy(&k?).into_owned()))
            .collect()
    }

    /// Returns false when the database already existed
    pub fn create_database(&self, name: &str) -> SqlResult<bool> {
        let _guard = self.ddl.lock();
        let databases = self.db.open_tree(DATABASES_TREE)?;
        if databases.contains_key(name)? {
            return Ok(false);
        }
        databases.insert(name, Vec::<u8>::new())?;
        Ok(true)
    }

    /// Drop a database and all its tables; returns false when it did not exist
    pub fn drop_database(&self, name: &str) -> SqlResult<bool> {
        let _guard = self.ddl.lock();
        let databases = self.db.open_tree(DATABASES_TREE)?;
        if databases.remove(name)?.is_none() {
            return Ok(false);
        }
        let catalog = self.db.open_tree(CATALOG_TREE)?;
        let prefix = format!("{}.", name);
        for entry in catalog.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            catalog.remove(&key)?;
            self.db.drop_tree(data_tree_name(&String::from_utf8_lossy(&key)))?;
        }
        if self.current_database()? == name {
            self.db
                .open_tree(META_TREE)?
                .insert(CURRENT_DATABASE_KEY, DEFAULT_DATABASE.as_bytes())?;
        }
        Ok(true)
    }

    pub fn table(&self, database: &str, name: &str) -> SqlResult<Option<TableDef>> {
        let catalog = self.db.open_tree(CATALOG_TREE)?;
        match catalog.get(format!("{}.{}", database, name))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn require_table(&self, database: &str, name: &str) -> SqlResult<TableDef> {
        self.require_database(database)?;
        self.table(database, name)?
            .ok_or_else(|| SqlError::UnknownTable(format!("{}.{}", database, name)))
    }

    pub fn tables(&self, database: &str) -> SqlResult<Vec<String>> {
        self.require_database(database)?;
        let catalog = self.db.open_tree(CATALOG_TREE)?;
        let prefix = format!("{}.", database);
        catalog
            .scan_prefix(prefix.as_bytes())
            .keys()
            .map(|k| {
                let key = k?;
                Ok(String::from_utf8_lossy(&key[prefix.len()..]).into_owned())
            })
            .collect()
    }

    /// Returns false when the table already existed
    pub fn create_table(&self, def: &TableDef) -> SqlResult<bool> {
        let _guard = self.ddl.lock();
        self.require_database(&def.database)?;
        let catalog = self.db.open_tree(CATALOG_TREE)?;
        let key = def.qualified_name();
        if catalog.contains_key(&key)? {
            return Ok(false);
        }
        catalog.insert(key, bincode::serialize(def)?)?;
        Ok(true)
    }

    pub fn drop_table(&self, def: &TableDef) -> SqlResult<()> {
        let _guard = self.ddl.lock();
        let key = def.qualified_name();
        self.db.open_tree(CATALOG_TREE)?.remove(&key)?;
        self.db.drop_tree(data_tree_name(&key))?;
        Ok(())
    }

    pub fn truncate(&self, def: &TableDef) -> SqlResult<()> {
        self.data(def)?.clear()?;
        Ok(())
    }

    /// Append rows; each row must already match the table's column types
    pub fn insert_rows(&self, def: &TableDef, rows: &[Vec<Value>]) -> SqlResult<()> {
        let tree = self.data(def)?;
        let mut batch = sled::Batch::default();
        for row in rows {
            let mut key = Vec::new();
            for &idx in &def.order_key {
                encode_key(&row[idx], &mut key);
            }
            // Sequence id keeps duplicate keys apart in insertion order
            key.extend_from_slice(&self.db.generate_id()?.to_be_bytes());
            batch.insert(key, bincode::serialize(row)?);
        }
        tree.apply_batch(batch)?;
        Ok(())
    }

    /// All rows in ordering-key order, plus the number of stored bytes read
    pub fn scan(&self, def: &TableDef) -> SqlResult<(Vec<Vec<Value>>, u64)> {
        let tree = self.data(def)?;
        let mut rows = Vec::with_capacity(tree.len());
        let mut bytes_read = 0u64;
        for entry in tree.iter() {
            let (_, value) = entry?;
            bytes_read += value.len() as u64;
            rows.push(bincode::deserialize::<Vec<Value>>(&value)?);
        }
        Ok((rows, bytes_read))
    }

    fn data(&self, def: &TableDef) -> SqlResult<sled::Tree> {
        Ok(self.db.open_tree(data_tree_name(&def.qualified_name()))?)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if self.path.is_some() {
            if let Err(e) = self.db.flush() {
                log::warn!("Failed to flush store: {}", e);
            }
        }
    }
}

fn data_tree_name(qualified: &str) -> String {
    format!("data:{}", qualified)
}

/// Canonical location of a store directory, created when missing
fn registry_key(dir: &Path) -> SqlResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    Ok(dir.canonicalize()?)
}
