//! Protocol codec
//!
//! Reading requests off a stream and encoding responses and notifications.

use std::io::{ErrorKind, Read, Write};

use bytes::{Bytes, BytesMut};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{json, Value};

use crate::error::{CorpError, Result};
use crate::model::Item;
use super::Response;

/// Bytes requested from the socket per read
pub const READ_CHUNK_SIZE: usize = 1024;

/// `EVENT` value of data-change notifications
pub const NOTIFICATION_EVENT: &str = "update";

/// Indentation of pretty-printed responses
const RESPONSE_INDENT: &[u8] = b"    ";

// =============================================================================
// Requests
// =============================================================================

/// Read one JSON request from a stream.
///
/// Keeps reading until the bytes received so far parse as a complete JSON
/// value, the peer stops sending, or `max_bytes` is reached.
///
/// Returns `Ok(None)` if the peer closed without sending anything, and
/// `MalformedRequest` for invalid, truncated or oversized input.
pub fn read_request<R: Read>(reader: &mut R, max_bytes: usize) -> Result<Option<Value>> {
    let max_bytes = max_bytes.max(1);
    let mut buffer = BytesMut::with_capacity(READ_CHUNK_SIZE.min(max_bytes));
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let want = (max_bytes - buffer.len()).min(READ_CHUNK_SIZE);
        let n = match reader.read(&mut chunk[..want]) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        if n == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            return serde_json::from_slice(&buffer)
                .map(Some)
                .map_err(|e| CorpError::MalformedRequest(e.to_string()));
        }

        buffer.extend_from_slice(&chunk[..n]);

        match serde_json::from_slice::<Value>(&buffer) {
            Ok(value) => return Ok(Some(value)),
            // Incomplete so far, wait for more bytes
            Err(e) if e.is_eof() && buffer.len() < max_bytes => continue,
            Err(e) if e.is_eof() => {
                return Err(CorpError::MalformedRequest(format!(
                    "request exceeds {} bytes",
                    max_bytes
                )))
            }
            Err(e) => return Err(CorpError::MalformedRequest(e.to_string())),
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Encode a response body as pretty-printed JSON
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(128);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(RESPONSE_INDENT));
    response.body.serialize(&mut serializer)?;
    Ok(out)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Notifications
// =============================================================================

/// Encode the data-change notification for a stored item
pub fn encode_notification(item: &Item) -> Result<Bytes> {
    let message = json!({
        "EVENT": NOTIFICATION_EVENT,
        "DATA": item.to_json(),
    });
    Ok(Bytes::from(serde_json::to_vec(&message)?))
}
