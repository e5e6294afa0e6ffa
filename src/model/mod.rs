//! Model Module
//!
//! Values exchanged between clients, the gateway and the tables.
//!
//! ## Numbers
//! The backing tables require exact decimals for non-integer numbers, so
//! every JSON number that is not an `i64` is converted into a
//! [`rust_decimal::Decimal`] on the way in, and written back out as a string.
//! The conversion is a plain tree walk ([`AttributeValue::from_json`] /
//! [`AttributeValue::to_json`]).

mod item;
mod audit;

pub use item::{AttributeValue, Item, ID_FIELD, PLACEHOLDER_ID, key_from_json};
pub use audit::{AuditAction, AuditLogEntry, Session, TIMESTAMP_FORMAT, UNKNOWN_CLIENT};
