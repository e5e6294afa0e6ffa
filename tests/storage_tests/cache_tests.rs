//! Tests for StorageConnectionCache
//!
//! These tests verify:
//! - Setup runs exactly once, even under concurrent first use
//! - Every caller observes the same table handles
//! - A failed setup is remembered and never retried

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use corpkv::config::{Config, StorageBackend};
use corpkv::storage::{
    MemoryConnector, MemoryTable, StorageConnectionCache, StorageConnector, Table, TableHandles,
};
use corpkv::{CorpError, Result};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// Connector that counts how often it is asked to connect
struct CountingConnector {
    inner: MemoryConnector,
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl StorageConnector for CountingConnector {
    fn connect(&self) -> Result<TableHandles> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.inner.connect()
    }
}

fn counting_cache(delay: Duration) -> (StorageConnectionCache, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let connector = CountingConnector {
        inner: MemoryConnector::new("CorporateData", "CorporateLog"),
        calls: Arc::clone(&calls),
        delay,
    };
    (StorageConnectionCache::new(connector), calls)
}

// =============================================================================
// Single Initialization Tests
// =============================================================================

#[test]
fn test_lazy_until_first_use() {
    let (cache, calls) = counting_cache(Duration::ZERO);
    assert!(!cache.is_initialized());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    cache.tables().unwrap();
    assert!(cache.is_initialized());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_repeated_calls_share_handles() {
    let (cache, calls) = counting_cache(Duration::ZERO);
    let first = cache.tables().unwrap().clone();
    let second = cache.tables().unwrap();

    assert!(Arc::ptr_eq(&first.data, &second.data));
    assert!(Arc::ptr_eq(&first.log, &second.log));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_first_use_initializes_once() {
    let (cache, calls) = counting_cache(Duration::from_millis(50));
    let cache = Arc::new(cache);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let tables = cache.tables().unwrap();
                Arc::as_ptr(&tables.data) as *const () as usize
            })
        })
        .collect();

    let pointers: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(pointers.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_failure_remembered() {
    let data = Arc::new(MemoryTable::new("CorporateData"));
    let log = Arc::new(MemoryTable::new("CorporateLog"));
    log.set_available(false);

    let cache = StorageConnectionCache::new(MemoryConnector::with_tables(
        Arc::clone(&data),
        Arc::clone(&log),
    ));

    assert!(matches!(cache.tables(), Err(CorpError::Unavailable(_))));

    // Fixing the backend afterwards does not trigger a new attempt
    log.set_available(true);
    assert!(matches!(cache.tables(), Err(CorpError::StorageInit(_))));
    assert!(!cache.is_initialized());
}

#[test]
fn test_missing_table_files_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .storage(StorageBackend::File {
            dir: temp_dir.path().to_path_buf(),
            create_missing: false,
            sync_writes: false,
        })
        .build();

    let cache = StorageConnectionCache::from_config(&config);
    assert!(matches!(cache.tables(), Err(CorpError::TableNotFound(name)) if name == "CorporateData"));
}

#[test]
fn test_file_tables_created_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .storage(StorageBackend::File {
            dir: temp_dir.path().join("tables"),
            create_missing: true,
            sync_writes: false,
        })
        .build();

    let cache = StorageConnectionCache::from_config(&config);
    let tables = cache.tables().unwrap();
    assert_eq!(tables.data.name(), "CorporateData");
    assert_eq!(tables.log.name(), "CorporateLog");
}
