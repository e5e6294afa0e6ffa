//! Client helpers
//!
//! Blocking client for the corpkv protocol, used by the client binaries and
//! the end-to-end tests.

use std::io::{BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::de::IoRead;
use serde_json::{json, StreamDeserializer, Value};
use uuid::Uuid;

use crate::error::{CorpError, Result};
use crate::protocol::{ACTION_FIELD, CLIENT_ID_FIELD};

/// Connect/read/write timeout used when none is given
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Stable identifier for this machine, derived from its host name.
///
/// Falls back to a random id when no host name is available.
pub fn default_client_id() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .ok()
        .filter(|name| !name.is_empty())
        .map(|name| Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes()))
        .unwrap_or_else(Uuid::new_v4)
        .to_string()
}

/// Open a connection to the first reachable resolved address
fn connect(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let mut last_error = None;

    for candidate in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }

    Err(match last_error {
        Some(e) => e.into(),
        None => CorpError::Network(format!("{} did not resolve to any address", addr)),
    })
}

/// One-shot request client: each call opens its own connection
#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
    timeout: Duration,
}

impl Client {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send a request and return the raw response text
    pub fn send(&self, request: &Value) -> Result<String> {
        let mut stream = connect(&self.addr, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        stream.write_all(&serde_json::to_vec(request)?)?;
        stream.flush()?;

        // The server closes after its single response
        let mut response = String::new();
        stream.read_to_string(&mut response)?;
        Ok(response)
    }

    /// Send a request and parse the response
    pub fn request(&self, request: &Value) -> Result<Value> {
        let response = self.send(request)?;
        Ok(serde_json::from_str(&response)?)
    }
}

type NotificationStream = StreamDeserializer<'static, IoRead<BufReader<TcpStream>>, Value>;

/// An acknowledged subscription
///
/// Yields pushed notifications in the order the server sent them. A read
/// error or timeout ends the subscription.
pub struct Subscription {
    control: TcpStream,
    notifications: NotificationStream,
}

impl Subscription {
    /// Subscribe and wait for the acknowledgement
    pub fn open(addr: &str, client_id: &str, timeout: Duration) -> Result<Self> {
        let mut stream = connect(addr, timeout)?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_read_timeout(Some(timeout))?;

        let request = json!({ ACTION_FIELD: "subscribe", CLIENT_ID_FIELD: client_id });
        stream.write_all(&serde_json::to_vec(&request)?)?;
        stream.flush()?;

        let control = stream.try_clone()?;
        let mut notifications =
            serde_json::Deserializer::from_reader(BufReader::new(stream)).into_iter::<Value>();

        let ack = match notifications.next() {
            Some(ack) => ack?,
            None => {
                return Err(CorpError::Network(
                    "server closed the connection before acknowledging".to_string(),
                ))
            }
        };

        if ack.get("status").and_then(Value::as_str) != Some("OK") {
            return Err(CorpError::Network(format!("subscription rejected: {}", ack)));
        }

        // Notifications can be arbitrarily far apart
        control.set_read_timeout(None)?;

        Ok(Self {
            control,
            notifications,
        })
    }

    /// Block for the next notification. `Ok(None)` once the server closes.
    pub fn next_notification(&mut self) -> Result<Option<Value>> {
        match self.notifications.next() {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(e)) if e.is_io() => Err(CorpError::Io(e.into())),
            Some(Err(e)) => Err(e.into()),
        }
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.control.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Leave the subscription
    pub fn close(self) -> Result<()> {
        self.control.shutdown(std::net::Shutdown::Both)?;
        Ok(())
    }
}
