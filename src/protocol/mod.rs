//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Request
//! One JSON object per connection, no length prefix or delimiter. The server
//! reads until the bytes received so far parse as a complete object.
//!
//! ```text
//! {"ACTION": "get" | "set" | "list" | "list_logs" | "subscribe",
//!  "UUID":   "<client id>",
//!  ...action fields ("ID" for get, item fields with "id" for set)}
//! ```
//!
//! ## Response
//! One pretty-printed JSON value: the item, the list of items/log entries,
//! the subscription acknowledgement, or `{"error": "<message>"}`. There is no
//! status code on the wire; failure is the presence of `error`.
//!
//! ## Notification
//! Pushed to subscribers after every successful `set`, compact JSON:
//! `{"EVENT": "update", "DATA": <item>}`

mod request;
mod response;
mod codec;

pub use request::{Action, Request, ACTION_FIELD, CLIENT_ID_FIELD, GET_ID_FIELD};
pub use response::{Response, Status};
pub use codec::{
    encode_notification, encode_response, read_request, write_response,
    NOTIFICATION_EVENT, READ_CHUNK_SIZE,
};
