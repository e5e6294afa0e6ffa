//! Response definitions
//!
//! Represents responses to clients.

use std::fmt;

use serde_json::{json, Value};

use crate::gateway::GatewayError;
use crate::model::Item;

/// Response status (logged, never written on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    ServerFault,
}

impl Status {
    /// HTTP-style code
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::ServerFault => 500,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,

    /// JSON written to the client
    pub body: Value,
}

impl Response {
    /// Create an OK response
    pub fn ok(body: Value) -> Self {
        Self {
            status: Status::Ok,
            body,
        }
    }

    /// OK response carrying one item
    pub fn item(item: &Item) -> Self {
        Self::ok(item.to_json())
    }

    /// OK response carrying a list of items
    pub fn items(items: &[Item]) -> Self {
        Self::ok(Value::Array(items.iter().map(Item::to_json).collect()))
    }

    /// Acknowledgement of a successful subscription
    pub fn subscribed() -> Self {
        Self::ok(json!({
            "status": "OK",
            "message": "Suscrito exitosamente",
        }))
    }

    /// Create an error response: `{"error": message}`
    pub fn error(status: Status, message: impl fmt::Display) -> Self {
        Self {
            status,
            body: json!({ "error": message.to_string() }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status != Status::Ok
    }
}

impl From<GatewayError> for Response {
    fn from(error: GatewayError) -> Self {
        Response::error(error.status(), error)
    }
}
