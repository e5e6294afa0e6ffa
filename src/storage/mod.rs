//! Storage Module
//!
//! The two backing tables and the process-wide handle to them.
//!
//! ## Responsibilities
//! - `Table`: get-by-key, put (overwrite by `id`) and full scan
//! - `MemoryTable`: in-process table used for tests and ephemeral servers
//! - `FileTable`: append-only, checksummed record file replayed on open
//! - `StorageConnectionCache`: connects once, hands the same tables to everyone
//!
//! ## Record File Format
//! ```text
//! ┌─────────┬─────────┬─────────┬──────────────────┐
//! │ LSN (8) │ CRC (4) │ Len (4) │ JSON item (Len)  │  ... repeated
//! └─────────┴─────────┴─────────┴──────────────────┘
//! ```

mod table;
mod memory;
mod record;
mod file;
mod cache;

pub use table::Table;
pub use memory::MemoryTable;
pub use record::{RecordWriter, ReplayResult, replay, RECORD_HEADER_SIZE, MAX_RECORD_SIZE};
pub use file::FileTable;
pub use cache::{FileConnector, MemoryConnector, StorageConnectionCache, StorageConnector, TableHandles};
