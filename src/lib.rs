//! # corpkv
//!
//! A multi-client TCP key-value server for corporate records with:
//! - A mandatory audit trail: every operation is logged before it runs
//! - Push notifications of stored items to subscribed connections
//! - One lazily-initialized storage connection shared by all sessions
//! - JSON request/response protocol, one request per connection
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (One Thread per Connection)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Connection Handler                          │
//! │          (get / set / list / list_logs / subscribe)          │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │ Audited Gateway │                │   Broadcaster   │
//!   │ (Audit, then Op)│                │  (Subscribers)  │
//!   └────────┬────────┘                └─────────────────┘
//!            │
//!            ▼
//!   ┌─────────────────┐
//!   │  Storage Cache  │
//!   │  (Init Once)    │
//!   └───┬─────────┬───┘
//!       ▼         ▼
//!    Data Table  Log Table
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod model;
pub mod storage;
pub mod gateway;
pub mod broadcast;
pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CorpError, Result};
pub use config::{Config, StorageBackend};
pub use model::{AttributeValue, AuditAction, AuditLogEntry, Item, Session};
pub use storage::StorageConnectionCache;
pub use gateway::{AuditedStorageGateway, GatewayError};
pub use broadcast::SubscriptionBroadcaster;
pub use network::{Server, ShutdownHandle};
pub use client::{Client, Subscription};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of corpkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
