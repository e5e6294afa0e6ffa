//! Gateway Module
//!
//! The only way client requests reach the tables.
//!
//! ## Audit Before Act
//! Every operation first appends one entry to the audit table. If that write
//! fails the operation is abandoned with `AuditFailure` and the data table is
//! never touched. Reads are gated exactly like writes.
//!
//! ```text
//!   request ──► audit write ──ok──► data table ──► result
//!                    │
//!                    └──fail──► AuditFailure (500)
//! ```

mod error;
mod audited;

pub use error::{GatewayError, GatewayResult};
pub use audited::AuditedStorageGateway;
