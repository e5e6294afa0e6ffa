//! Audit definitions
//!
//! Sessions and the immutable audit records written for every client action.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use uuid::Uuid;

use crate::error::{CorpError, Result};
use super::{AttributeValue, Item};

/// Client id recorded when a request carries no `UUID`
pub const UNKNOWN_CLIENT: &str = "UUID_DESCONOCIDO";

/// Layout of the `timestamp` field in the audit table
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Field names in the audit table
const FIELD_ENTRY_ID: &str = "id";
const FIELD_CLIENT_ID: &str = "CPUid";
const FIELD_SESSION_ID: &str = "sessionid";
const FIELD_TIMESTAMP: &str = "timestamp";
const FIELD_ACTION: &str = "action";
const FIELD_DETAILS: &str = "details";

/// Per-connection identity attached to every audit entry it produces
#[derive(Debug, Clone)]
pub struct Session {
    /// Server-side id of the accepted connection
    pub connection_id: u64,

    /// Client-supplied id (untrusted)
    pub client_id: String,

    /// Server-generated, one per connection
    pub session_id: Uuid,
}

impl Session {
    /// Start a session with a fresh session id
    pub fn new(connection_id: u64, client_id: impl Into<String>) -> Self {
        Self {
            connection_id,
            client_id: client_id.into(),
            session_id: Uuid::new_v4(),
        }
    }
}

/// Externally visible actions that are audited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Get,
    Set,
    List,
    ListLogs,
    Subscribe,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Get => "get",
            AuditAction::Set => "set",
            AuditAction::List => "list",
            AuditAction::ListLogs => "list_logs",
            AuditAction::Subscribe => "subscribe",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = CorpError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "get" => Ok(AuditAction::Get),
            "set" => Ok(AuditAction::Set),
            "list" => Ok(AuditAction::List),
            "list_logs" => Ok(AuditAction::ListLogs),
            "subscribe" => Ok(AuditAction::Subscribe),
            other => Err(CorpError::InvalidItem(format!(
                "unknown audit action '{}'",
                other
            ))),
        }
    }
}

/// One immutable record in the audit table
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogEntry {
    pub entry_id: Uuid,
    pub client_id: String,
    pub session_id: Uuid,
    pub timestamp: NaiveDateTime,
    pub action: AuditAction,
    pub details: String,
}

impl AuditLogEntry {
    /// Describe an action attempted by `session`, stamped with local time
    pub fn new(session: &Session, action: AuditAction, details: impl Into<String>) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            client_id: session.client_id.clone(),
            session_id: session.session_id,
            timestamp: Local::now().naive_local(),
            action,
            details: details.into(),
        }
    }

    /// Table representation of this entry
    pub fn into_item(self) -> Item {
        let mut item = Item::new();
        item.insert(FIELD_ENTRY_ID, self.entry_id.to_string());
        item.insert(FIELD_CLIENT_ID, self.client_id);
        item.insert(FIELD_SESSION_ID, self.session_id.to_string());
        item.insert(
            FIELD_TIMESTAMP,
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        );
        item.insert(FIELD_ACTION, self.action.as_str());
        item.insert(FIELD_DETAILS, self.details);
        item
    }

    /// Read an entry back from the audit table
    pub fn from_item(item: &Item) -> Result<Self> {
        let timestamp = NaiveDateTime::parse_from_str(text_field(item, FIELD_TIMESTAMP)?, TIMESTAMP_FORMAT)
            .map_err(|e| CorpError::InvalidItem(format!("bad audit timestamp: {}", e)))?;

        Ok(Self {
            entry_id: uuid_field(item, FIELD_ENTRY_ID)?,
            client_id: text_field(item, FIELD_CLIENT_ID)?.to_string(),
            session_id: uuid_field(item, FIELD_SESSION_ID)?,
            timestamp,
            action: text_field(item, FIELD_ACTION)?.parse()?,
            details: text_field(item, FIELD_DETAILS)?.to_string(),
        })
    }
}

fn text_field<'a>(item: &'a Item, field: &str) -> Result<&'a str> {
    item.get(field)
        .and_then(AttributeValue::as_str)
        .ok_or_else(|| CorpError::InvalidItem(format!("audit entry without text field '{}'", field)))
}

fn uuid_field(item: &Item, field: &str) -> Result<Uuid> {
    Uuid::parse_str(text_field(item, field)?).map_err(|e| {
        CorpError::InvalidItem(format!("audit field '{}' is not a UUID: {}", field, e))
    })
}
