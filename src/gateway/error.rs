//! Gateway outcomes
//!
//! The Display text of each variant is exactly what the client receives in
//! the `error` field of the response.

use thiserror::Error;

use crate::model::AuditAction;
use crate::protocol::Status;

/// Result of a gateway operation
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Why a gateway operation did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The audit entry could not be written; nothing else was attempted
    #[error("{}", audit_failure_message(.action))]
    AuditFailure { action: AuditAction },

    /// The data table call failed; carries the backend's message
    #[error("{0}")]
    BackendFailure(String),

    /// No item with this identifier
    #[error("Item con ID '{0}' no encontrado.")]
    NotFound(String),

    /// The payload could not be stored
    #[error("{0}")]
    BadRequest(String),
}

impl GatewayError {
    /// Response status for this outcome
    pub fn status(&self) -> Status {
        match self {
            GatewayError::AuditFailure { .. } | GatewayError::BackendFailure(_) => {
                Status::ServerFault
            }
            GatewayError::NotFound(_) => Status::NotFound,
            GatewayError::BadRequest(_) => Status::BadRequest,
        }
    }
}

fn audit_failure_message(action: &AuditAction) -> &'static str {
    match action {
        AuditAction::Subscribe => "Fallo interno al registrar suscripción (auditoría)",
        _ => "Fallo interno de auditoría",
    }
}
