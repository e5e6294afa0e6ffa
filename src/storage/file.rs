//! File-backed table
//!
//! Every put is appended to the table file; the full table is kept in an
//! in-memory index rebuilt from the file on open.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use crate::error::{CorpError, Result};
use crate::model::Item;
use super::record::{replay, RecordWriter};
use super::Table;

/// Extension of table files
const TABLE_EXTENSION: &str = "tbl";

/// Table persisted as an append-only record file
///
/// ## Concurrency:
/// - `writer`: Mutex, puts are serialized and the index is updated while it
///   is held, so index order matches file order
/// - `index`: RwLock, many concurrent readers
pub struct FileTable {
    name: String,
    path: PathBuf,
    index: RwLock<BTreeMap<String, Item>>,
    writer: Mutex<RecordWriter>,
}

impl FileTable {
    /// Path of the file backing table `name` inside `dir`
    pub fn table_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.{}", name, TABLE_EXTENSION))
    }

    /// Open table `name` in `dir`.
    ///
    /// A missing file is `TableNotFound` unless `create_missing` is set.
    pub fn open(dir: &Path, name: &str, create_missing: bool, sync_writes: bool) -> Result<Self> {
        let path = Self::table_path(dir, name);

        if !path.exists() {
            if !create_missing {
                return Err(CorpError::TableNotFound(name.to_string()));
            }
            fs::create_dir_all(dir)?;
            File::create(&path)?;
            tracing::info!("Created table '{}' at {}", name, path.display());
        }

        let replayed = replay(&path)?;
        let mut index = BTreeMap::new();
        for payload in &replayed.payloads {
            let item: Item = serde_json::from_slice(payload).map_err(|e| {
                CorpError::Corruption(format!("undecodable record in '{}': {}", name, e))
            })?;
            index.insert(item.key()?, item);
        }

        tracing::debug!(
            "Table '{}' replayed: {} records, {} items, last_lsn={}",
            name,
            replayed.payloads.len(),
            index.len(),
            replayed.last_lsn
        );

        let writer = RecordWriter::open(&path, replayed.last_lsn, sync_writes)?;

        Ok(Self {
            name: name.to_string(),
            path,
            index: RwLock::new(index),
            writer: Mutex::new(writer),
        })
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live items
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Table for FileTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<()> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(CorpError::TableNotFound(self.name.clone()))
        }
    }

    fn get_item(&self, key: &str) -> Result<Option<Item>> {
        Ok(self.index.read().get(key).cloned())
    }

    fn put_item(&self, item: Item) -> Result<()> {
        let key = item.key()?;
        let payload = serde_json::to_vec(&item)?;

        let mut writer = self.writer.lock();
        writer.append(&payload)?;
        self.index.write().insert(key, item);
        Ok(())
    }

    fn scan(&self) -> Result<Vec<Item>> {
        Ok(self.index.read().values().cloned().collect())
    }
}
