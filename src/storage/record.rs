//! Record framing
//!
//! Appends checksummed records to a table file and replays them on open.
//!
//! ## Frame
//! ```text
//! ┌─────────┬─────────┬─────────┬──────────────────┐
//! │ LSN (8) │ CRC (4) │ Len (4) │ Payload (Len)    │
//! └─────────┴─────────┴─────────┴──────────────────┘
//! ```
//! All integers little endian. The CRC covers the payload only.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CorpError, Result};

/// Header size: 8 bytes LSN + 4 bytes CRC + 4 bytes length
pub const RECORD_HEADER_SIZE: usize = 16;

/// Maximum payload size (16 MB)
pub const MAX_RECORD_SIZE: u32 = 16 * 1024 * 1024;

/// Outcome of replaying a table file
#[derive(Debug, Default)]
pub struct ReplayResult {
    /// Payloads of every intact record, in file order
    pub payloads: Vec<Vec<u8>>,

    /// Highest LSN seen (0 for an empty file)
    pub last_lsn: u64,

    /// Bytes cut from the end of the file (torn or corrupt tail)
    pub truncated_bytes: u64,
}

/// Read every intact record from `path`.
///
/// Stops at the first torn or checksum-failing record and truncates the file
/// there, so the next append starts from a clean boundary.
pub fn replay(path: &Path) -> Result<ReplayResult> {
    let data = fs::read(path)?;
    let mut result = ReplayResult::default();
    let mut offset = 0usize;

    while offset < data.len() {
        let remaining = &data[offset..];
        if remaining.len() < RECORD_HEADER_SIZE {
            break;
        }

        let mut header = &remaining[..RECORD_HEADER_SIZE];
        let lsn = header.get_u64_le();
        let crc = header.get_u32_le();
        let len = header.get_u32_le();

        if len > MAX_RECORD_SIZE {
            break;
        }

        let end = RECORD_HEADER_SIZE + len as usize;
        if remaining.len() < end {
            break;
        }

        let payload = &remaining[RECORD_HEADER_SIZE..end];
        if crc32fast::hash(payload) != crc {
            tracing::warn!(
                "Checksum mismatch in {} at offset {} (lsn {})",
                path.display(),
                offset,
                lsn
            );
            break;
        }

        result.payloads.push(payload.to_vec());
        result.last_lsn = result.last_lsn.max(lsn);
        offset += end;
    }

    if offset < data.len() {
        result.truncated_bytes = (data.len() - offset) as u64;
        tracing::warn!(
            "Truncating {} bytes of incomplete records from {}",
            result.truncated_bytes,
            path.display()
        );
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(offset as u64)?;
        file.sync_all()?;
    }

    Ok(result)
}

/// Appends framed records to a table file
///
/// A failed append is cut back off the file. If that is not possible either,
/// the writer refuses every later append rather than write after a torn frame.
pub struct RecordWriter {
    file: File,
    path: PathBuf,
    next_lsn: u64,
    sync_writes: bool,

    /// File length at the end of the last complete frame
    len: u64,
    failed: bool,
}

impl RecordWriter {
    /// Open `path` for appending; the first record gets `last_lsn + 1`
    pub fn open(path: &Path, last_lsn: u64, sync_writes: bool) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            next_lsn: last_lsn + 1,
            sync_writes,
            len,
            failed: false,
        })
    }

    /// Append one record, returning its LSN
    pub fn append(&mut self, payload: &[u8]) -> Result<u64> {
        if self.failed {
            return Err(CorpError::Unavailable(format!(
                "table file {} is unusable after a failed append",
                self.path.display()
            )));
        }

        if payload.len() > MAX_RECORD_SIZE as usize {
            return Err(CorpError::InvalidItem(format!(
                "Record too large: {} bytes (max {})",
                payload.len(),
                MAX_RECORD_SIZE
            )));
        }

        let lsn = self.next_lsn;
        let mut frame = BytesMut::with_capacity(RECORD_HEADER_SIZE + payload.len());
        frame.put_u64_le(lsn);
        frame.put_u32_le(crc32fast::hash(payload));
        frame.put_u32_le(payload.len() as u32);
        frame.put_slice(payload);

        if let Err(e) = self.write_frame(&frame) {
            self.rollback();
            return Err(e.into());
        }

        self.len += frame.len() as u64;
        self.next_lsn += 1;
        Ok(lsn)
    }

    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        // Whole frame in a single write
        self.file.write_all(frame)?;
        if self.sync_writes {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Drop whatever part of a failed frame reached the file
    fn rollback(&mut self) {
        if let Err(e) = self.file.set_len(self.len) {
            tracing::error!(
                "Cannot cut failed append from {}: {}",
                self.path.display(),
                e
            );
            self.failed = true;
        }
    }

    /// LSN the next append will use
    pub fn next_lsn(&self) -> u64 {
        self.next_lsn
    }
}
