//! Configuration for corpkv
//!
//! Centralized configuration with sensible defaults. Configuration is static
//! for the life of the process.

use std::path::PathBuf;

/// Main configuration for a corpkv server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address (host:port)
    pub listen_addr: String,

    /// Upper bound on the bytes read for a single request
    pub max_request_bytes: usize,

    /// How long the accept loop sleeps between polls for new connections
    /// (milliseconds). Also bounds how quickly a shutdown is noticed.
    pub accept_poll_interval_ms: u64,

    /// Write timeout applied to subscriber sockets (milliseconds, 0 = none)
    pub subscriber_write_timeout_ms: u64,

    /// Notifications buffered per subscriber; a subscriber whose queue is
    /// full is dropped
    pub subscriber_queue_capacity: usize,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Name of the table holding client items
    pub data_table: String,

    /// Name of the append-only audit table
    pub log_table: String,

    /// Where the two tables live
    pub storage: StorageBackend,
}

/// Backing store for the data and audit tables
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// Tables held in process memory (lost on exit)
    Memory,

    /// One append-only file per table inside `dir`:
    ///   {dir}/
    ///     ├── {data_table}.tbl
    ///     └── {log_table}.tbl
    File {
        dir: PathBuf,
        /// Create missing table files instead of failing with "table not found"
        create_missing: bool,
        /// fsync after every appended record
        sync_writes: bool,
    },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            max_request_bytes: 4096,
            accept_poll_interval_ms: 50,
            subscriber_write_timeout_ms: 0,
            subscriber_queue_capacity: 1024,
            data_table: "CorporateData".to_string(),
            log_table: "CorporateLog".to_string(),
            storage: StorageBackend::Memory,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum request size (in bytes)
    pub fn max_request_bytes(mut self, bytes: usize) -> Self {
        self.config.max_request_bytes = bytes;
        self
    }

    /// Set the accept poll interval (in milliseconds)
    pub fn accept_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.accept_poll_interval_ms = ms;
        self
    }

    /// Set the subscriber write timeout (in milliseconds)
    pub fn subscriber_write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.subscriber_write_timeout_ms = ms;
        self
    }

    /// Set the per-subscriber notification queue capacity
    pub fn subscriber_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.subscriber_queue_capacity = capacity;
        self
    }

    /// Set the data table name
    pub fn data_table(mut self, name: impl Into<String>) -> Self {
        self.config.data_table = name.into();
        self
    }

    /// Set the audit table name
    pub fn log_table(mut self, name: impl Into<String>) -> Self {
        self.config.log_table = name.into();
        self
    }

    /// Set the storage backend
    pub fn storage(mut self, storage: StorageBackend) -> Self {
        self.config.storage = storage;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
