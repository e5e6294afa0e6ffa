//! Storage Connection Cache
//!
//! Connects to the data and audit tables exactly once and hands the same
//! handles to every caller for the rest of the process.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::config::{Config, StorageBackend};
use crate::error::{CorpError, Result};
use super::{FileTable, MemoryTable, Table};

/// Handles to the two backing tables
#[derive(Clone)]
pub struct TableHandles {
    /// Client items
    pub data: Arc<dyn Table>,

    /// Append-only audit entries
    pub log: Arc<dyn Table>,
}

/// Knows how to reach a pair of tables
pub trait StorageConnector: Send + Sync {
    /// Open both tables. Existence is verified by the cache afterwards.
    fn connect(&self) -> Result<TableHandles>;
}

/// Connector for in-process tables
pub struct MemoryConnector {
    data: Arc<MemoryTable>,
    log: Arc<MemoryTable>,
}

impl MemoryConnector {
    /// Fresh, empty tables with the given names
    pub fn new(data_table: &str, log_table: &str) -> Self {
        Self::with_tables(
            Arc::new(MemoryTable::new(data_table)),
            Arc::new(MemoryTable::new(log_table)),
        )
    }

    /// Hand out tables owned by the caller
    pub fn with_tables(data: Arc<MemoryTable>, log: Arc<MemoryTable>) -> Self {
        Self { data, log }
    }
}

impl StorageConnector for MemoryConnector {
    fn connect(&self) -> Result<TableHandles> {
        let data: Arc<dyn Table> = self.data.clone();
        let log: Arc<dyn Table> = self.log.clone();
        Ok(TableHandles { data, log })
    }
}

/// Connector for file-backed tables in one directory
pub struct FileConnector {
    dir: PathBuf,
    data_table: String,
    log_table: String,
    create_missing: bool,
    sync_writes: bool,
}

impl FileConnector {
    pub fn new(
        dir: impl Into<PathBuf>,
        data_table: impl Into<String>,
        log_table: impl Into<String>,
        create_missing: bool,
        sync_writes: bool,
    ) -> Self {
        Self {
            dir: dir.into(),
            data_table: data_table.into(),
            log_table: log_table.into(),
            create_missing,
            sync_writes,
        }
    }
}

impl StorageConnector for FileConnector {
    fn connect(&self) -> Result<TableHandles> {
        if !self.create_missing && !self.dir.is_dir() {
            return Err(CorpError::Config(format!(
                "data directory {} does not exist",
                self.dir.display()
            )));
        }

        let data = FileTable::open(&self.dir, &self.data_table, self.create_missing, self.sync_writes)?;
        let log = FileTable::open(&self.dir, &self.log_table, self.create_missing, self.sync_writes)?;

        Ok(TableHandles {
            data: Arc::new(data),
            log: Arc::new(log),
        })
    }
}

/// Process-wide handle to the backing tables
///
/// ## Concurrency:
/// - `tables`: set once, read lock-free afterwards
/// - `init_lock`: taken only while the first connection is being set up;
///   remembers a failed setup so it is never re-run
pub struct StorageConnectionCache {
    connector: Box<dyn StorageConnector>,
    tables: OnceLock<TableHandles>,
    init_lock: Mutex<Option<String>>,
}

impl StorageConnectionCache {
    /// Create an unconnected cache; nothing happens until `tables()`
    pub fn new(connector: impl StorageConnector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            tables: OnceLock::new(),
            init_lock: Mutex::new(None),
        }
    }

    /// Pick the connector described by `config`
    pub fn from_config(config: &Config) -> Self {
        match &config.storage {
            StorageBackend::Memory => {
                Self::new(MemoryConnector::new(&config.data_table, &config.log_table))
            }
            StorageBackend::File {
                dir,
                create_missing,
                sync_writes,
            } => Self::new(FileConnector::new(
                dir.clone(),
                config.data_table.clone(),
                config.log_table.clone(),
                *create_missing,
                *sync_writes,
            )),
        }
    }

    /// Get the table handles, connecting on first use.
    ///
    /// Safe to call from many threads at once: exactly one caller runs the
    /// setup, the rest wait for it and observe its outcome.
    pub fn tables(&self) -> Result<&TableHandles> {
        if let Some(tables) = self.tables.get() {
            return Ok(tables);
        }

        let mut failure = self.init_lock.lock();

        // Another caller may have finished while we waited for the lock
        if let Some(tables) = self.tables.get() {
            return Ok(tables);
        }
        if let Some(message) = failure.as_ref() {
            return Err(CorpError::StorageInit(message.clone()));
        }

        match self.initialize() {
            Ok(handles) => Ok(self.tables.get_or_init(|| handles)),
            Err(e) => {
                tracing::error!("Storage initialization failed: {}", e);
                *failure = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// True once the tables have been connected
    pub fn is_initialized(&self) -> bool {
        self.tables.get().is_some()
    }

    fn initialize(&self) -> Result<TableHandles> {
        tracing::info!("Connecting to storage...");
        let handles = self.connector.connect()?;

        tracing::info!("Verifying table '{}'...", handles.data.name());
        handles.data.load()?;

        tracing::info!("Verifying table '{}'...", handles.log.name());
        handles.log.load()?;

        tracing::info!("Storage connected and tables verified");
        Ok(handles)
    }
}
