//! In-memory table
//!
//! BTreeMap-based table with RwLock for concurrency.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::error::{CorpError, Result};
use crate::model::Item;
use super::Table;

/// Table held in process memory
pub struct MemoryTable {
    name: String,

    /// id → item
    items: RwLock<BTreeMap<String, Item>>,

    /// When false every call fails as if the service were unreachable
    available: AtomicBool,
}

impl MemoryTable {
    /// Create an empty, reachable table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Make the table reachable or unreachable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored items (ignores reachability)
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CorpError::Unavailable(format!(
                "Table '{}' is unreachable",
                self.name
            )))
        }
    }
}

impl Table for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<()> {
        self.ensure_available()
    }

    fn get_item(&self, key: &str) -> Result<Option<Item>> {
        self.ensure_available()?;
        Ok(self.items.read().get(key).cloned())
    }

    fn put_item(&self, item: Item) -> Result<()> {
        self.ensure_available()?;
        let key = item.key()?;
        self.items.write().insert(key, item);
        Ok(())
    }

    fn scan(&self) -> Result<Vec<Item>> {
        self.ensure_available()?;
        Ok(self.items.read().values().cloned().collect())
    }
}
