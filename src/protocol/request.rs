//! Request definitions
//!
//! Represents requests from clients.

use serde_json::{Map, Value};

use crate::error::{CorpError, Result};
use crate::model::UNKNOWN_CLIENT;

/// Field naming the requested action
pub const ACTION_FIELD: &str = "ACTION";

/// Field carrying the client-chosen identifier
pub const CLIENT_ID_FIELD: &str = "UUID";

/// Field carrying the item identifier of a `get`
pub const GET_ID_FIELD: &str = "ID";

/// Requested action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Get,
    Set,
    List,
    ListLogs,
    Subscribe,
    /// Anything else, rendered as the client sent it
    Unknown(String),
}

impl Action {
    /// Read the action from the `ACTION` field (absent renders as `null`)
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(name)) => match name.as_str() {
                "get" => Action::Get,
                "set" => Action::Set,
                "list" => Action::List,
                "list_logs" => Action::ListLogs,
                "subscribe" => Action::Subscribe,
                _ => Action::Unknown(name.clone()),
            },
            Some(other) => Action::Unknown(other.to_string()),
            None => Action::Unknown(Value::Null.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Action::Get => "get",
            Action::Set => "set",
            Action::List => "list",
            Action::ListLogs => "list_logs",
            Action::Subscribe => "subscribe",
            Action::Unknown(name) => name,
        }
    }
}

/// A parsed request
#[derive(Debug, Clone)]
pub struct Request {
    pub action: Action,

    /// Client-supplied id, untrusted
    pub client_id: String,

    /// Every field except `ACTION` and `UUID`
    pub payload: Map<String, Value>,
}

impl Request {
    /// Build a request from a parsed JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        let mut payload = match value {
            Value::Object(map) => map,
            other => {
                return Err(CorpError::MalformedRequest(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };

        let action = Action::from_json(payload.get(ACTION_FIELD));
        let client_id = match payload.get(CLIENT_ID_FIELD) {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => UNKNOWN_CLIENT.to_string(),
        };

        payload.remove(ACTION_FIELD);
        payload.remove(CLIENT_ID_FIELD);

        Ok(Self {
            action,
            client_id,
            payload,
        })
    }

    /// Get a payload field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}
