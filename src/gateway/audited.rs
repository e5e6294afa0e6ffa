//! Audited Storage Gateway
//!
//! Wraps every table operation with a mandatory audit write.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::model::{
    key_from_json, AuditAction, AuditLogEntry, Item, Session, ID_FIELD, PLACEHOLDER_ID,
};
use crate::storage::{StorageConnectionCache, TableHandles};
use super::{GatewayError, GatewayResult};

/// Details recorded when the audit log itself is read
const LIST_LOGS_DETAILS: &str = "Revisando CorporateLog";

/// Audit-then-act front for the data and audit tables
pub struct AuditedStorageGateway {
    storage: Arc<StorageConnectionCache>,
}

impl AuditedStorageGateway {
    /// Create a gateway over `storage`, connecting it if needed.
    ///
    /// Fails when the tables cannot be reached; callers treat that as fatal.
    pub fn new(storage: Arc<StorageConnectionCache>) -> Result<Self> {
        storage.tables()?;
        tracing::info!("Gateway connected to data and audit tables");
        Ok(Self { storage })
    }

    /// Get an item by identifier
    pub fn get_item(&self, id: &str, session: &Session) -> GatewayResult<Item> {
        let tables = self.tables()?;
        self.record(tables, session, AuditAction::Get, format!("ID: {}", id))?;

        match tables.data.get_item(id) {
            Ok(Some(item)) => Ok(item),
            Ok(None) => Err(GatewayError::NotFound(id.to_string())),
            Err(e) => {
                tracing::error!("Backend error in get_item (ID: {}): {}", id, e);
                Err(GatewayError::BackendFailure(e.to_string()))
            }
        }
    }

    /// Store an item, overwriting any item with the same identifier.
    ///
    /// A payload without an `id` is stored under [`PLACEHOLDER_ID`]. Returns
    /// the item as stored (non-integer numbers as exact decimals).
    pub fn set_item(&self, payload: &Map<String, Value>, session: &Session) -> GatewayResult<Item> {
        let id = match payload.get(ID_FIELD) {
            Some(value) => key_from_json(value).unwrap_or_else(|| value.to_string()),
            None => PLACEHOLDER_ID.to_string(),
        };

        let tables = self.tables()?;
        self.record(tables, session, AuditAction::Set, format!("ID: {}", id))?;

        let mut item = Item::from_json_object(payload).map_err(|e| {
            tracing::warn!("Rejected payload in set_item (ID: {}): {}", id, e);
            GatewayError::BadRequest(format!("Datos JSON o formato inválido. {}", e))
        })?;
        if !item.contains(ID_FIELD) {
            item.insert(ID_FIELD, PLACEHOLDER_ID);
        }
        if let Err(e) = item.key() {
            tracing::warn!("Rejected identifier in set_item (ID: {}): {}", id, e);
            return Err(GatewayError::BadRequest(format!(
                "Datos JSON o formato inválido. {}",
                e
            )));
        }

        tables.data.put_item(item.clone()).map_err(|e| {
            tracing::error!("Backend error in set_item (ID: {}): {}", id, e);
            GatewayError::BackendFailure(e.to_string())
        })?;

        Ok(item)
    }

    /// Full scan of the data table
    pub fn list_items(&self, session: &Session) -> GatewayResult<Vec<Item>> {
        let tables = self.tables()?;
        self.record(tables, session, AuditAction::List, "")?;

        tables.data.scan().map_err(|e| {
            tracing::error!("Backend error in list_items: {}", e);
            GatewayError::BackendFailure(e.to_string())
        })
    }

    /// Full scan of the audit table (the read itself is audited first)
    pub fn list_logs(&self, session: &Session) -> GatewayResult<Vec<Item>> {
        let tables = self.tables()?;
        self.record(tables, session, AuditAction::ListLogs, LIST_LOGS_DETAILS)?;

        tables.log.scan().map_err(|e| {
            tracing::error!("Backend error in list_logs: {}", e);
            GatewayError::BackendFailure(e.to_string())
        })
    }

    /// Audit a subscription request; the caller registers only on success
    pub fn audit_subscribe(&self, session: &Session) -> GatewayResult<()> {
        let tables = self.tables()?;
        self.record(tables, session, AuditAction::Subscribe, "")
    }

    fn tables(&self) -> GatewayResult<&TableHandles> {
        self.storage.tables().map_err(|e| {
            tracing::error!("Storage unavailable: {}", e);
            GatewayError::BackendFailure(e.to_string())
        })
    }

    /// Append one audit entry; failure aborts the calling operation
    fn record(
        &self,
        tables: &TableHandles,
        session: &Session,
        action: AuditAction,
        details: impl Into<String>,
    ) -> GatewayResult<()> {
        let entry = AuditLogEntry::new(session, action, details);

        match tables.log.put_item(entry.into_item()) {
            Ok(()) => {
                tracing::info!(
                    "AUDIT: action '{}' recorded for client {}",
                    action,
                    session.client_id
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    "AUDIT FAILURE: could not record action '{}' for client {}: {}",
                    action,
                    session.client_id,
                    e
                );
                Err(GatewayError::AuditFailure { action })
            }
        }
    }
}
