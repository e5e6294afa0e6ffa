//! Connection Handler
//!
//! Handles individual client connections.
//!
//! ## Lifecycle
//! ```text
//! CONNECTED → AWAIT_REQUEST → DISPATCHED ─┬─► RESPONDED_AND_CLOSED
//!                                         └─► SUBSCRIBED_LISTEN_LOOP → CLOSED
//! ```
//! Exactly one request is read per connection. Non-subscribers get exactly one
//! response; subscribers get one acknowledgement and afterwards only
//! notification pushes.

use std::io::{ErrorKind, Read};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use crate::broadcast::{ConnectionId, Subscriber, SubscriberStream, SubscriptionBroadcaster};
use crate::config::Config;
use crate::error::{CorpError, Result};
use crate::gateway::AuditedStorageGateway;
use crate::model::{key_from_json, Session, ID_FIELD};
use crate::protocol::{
    read_request, write_response, Action, Request, Response, Status, GET_ID_FIELD,
    READ_CHUNK_SIZE,
};

const MALFORMED_JSON: &str = "JSON malformado o inválido";
const GET_REQUIRES_ID: &str = "Acción 'get' requiere un 'ID'";
const SET_REQUIRES_ID: &str = "Acción 'set' requiere un 'id' en los datos";
const UNEXPECTED_ERROR: &str = "Error interno inesperado del servidor.";

/// Per-connection settings taken from [`Config`]
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub max_request_bytes: usize,
    pub subscriber_write_timeout: Option<Duration>,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config) -> Self {
        let subscriber_write_timeout = match config.subscriber_write_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        Self {
            max_request_bytes: config.max_request_bytes,
            subscriber_write_timeout,
        }
    }
}

/// What happens after a request has been dispatched
enum Outcome {
    /// Write this response and close
    Respond(Response),

    /// Acknowledged subscription; wait for the client to leave
    Listen,
}

/// Handles a single client connection
pub struct Connection {
    stream: TcpStream,

    /// Server-assigned id, also the subscriber key
    id: ConnectionId,

    /// Peer address for logging
    peer_addr: String,

    gateway: Arc<AuditedStorageGateway>,
    broadcaster: Arc<SubscriptionBroadcaster>,
    settings: ConnectionSettings,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        id: ConnectionId,
        gateway: Arc<AuditedStorageGateway>,
        broadcaster: Arc<SubscriptionBroadcaster>,
        settings: ConnectionSettings,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            id,
            peer_addr,
            gateway,
            broadcaster,
            settings,
        })
    }

    /// Handle the connection (blocking until closed)
    pub fn handle(mut self) -> Result<()> {
        tracing::debug!("Connection {} established from {}", self.id, self.peer_addr);

        let request = match self.read_request() {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(CorpError::MalformedRequest(reason)) => {
                tracing::warn!("Client {}: malformed JSON received ({})", self.peer_addr, reason);
                return self.send(&Response::error(Status::BadRequest, MALFORMED_JSON));
            }
            Err(e) if e.is_disconnect() => {
                tracing::debug!("Client {} disconnected: {}", self.peer_addr, e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let session = Session::new(self.id, request.client_id.clone());
        tracing::info!(
            "Client {} (UUID: {}) -> action requested: {}",
            self.peer_addr,
            session.client_id,
            request.action.name()
        );

        match self.dispatch(&request, &session) {
            Ok(Outcome::Respond(response)) => self.send(&response),
            Ok(Outcome::Listen) => {
                self.listen_until_closed();
                Ok(())
            }
            Err(e) => {
                tracing::error!("Client {}: unexpected error: {}", self.peer_addr, e);
                self.broadcaster.unsubscribe(self.id);
                // Best effort; the peer may already be gone
                let _ = self.send(&Response::error(Status::ServerFault, UNEXPECTED_ERROR));
                Err(e)
            }
        }
    }

    /// Read and parse the single request of this connection
    fn read_request(&mut self) -> Result<Option<Request>> {
        match read_request(&mut self.stream, self.settings.max_request_bytes)? {
            Some(value) => Request::from_value(value).map(Some),
            None => {
                tracing::warn!("Client {} disconnected without sending data", self.peer_addr);
                Ok(None)
            }
        }
    }

    /// Route a request to the gateway or broadcaster
    fn dispatch(&self, request: &Request, session: &Session) -> Result<Outcome> {
        let response = match &request.action {
            Action::Get => match request.field(GET_ID_FIELD).and_then(key_from_json) {
                Some(id) => self
                    .gateway
                    .get_item(&id, session)
                    .map_or_else(Response::from, |item| Response::item(&item)),
                None => Response::error(Status::BadRequest, GET_REQUIRES_ID),
            },

            Action::Set => {
                if !request.payload.contains_key(ID_FIELD) {
                    Response::error(Status::BadRequest, SET_REQUIRES_ID)
                } else {
                    match self.gateway.set_item(&request.payload, session) {
                        Ok(item) => {
                            tracing::info!(
                                "Client {}: 'set' succeeded, notifying subscribers",
                                self.peer_addr
                            );
                            self.broadcaster.notify(&item);
                            Response::item(&item)
                        }
                        Err(e) => e.into(),
                    }
                }
            }

            Action::List => self
                .gateway
                .list_items(session)
                .map_or_else(Response::from, |items| Response::items(&items)),

            Action::ListLogs => self
                .gateway
                .list_logs(session)
                .map_or_else(Response::from, |entries| Response::items(&entries)),

            Action::Subscribe => return self.subscribe(session),

            Action::Unknown(name) => Response::error(
                Status::BadRequest,
                format!("Acción '{}' desconocida.", name),
            ),
        };

        Ok(Outcome::Respond(response))
    }

    /// Audit, register and acknowledge a subscription.
    ///
    /// The acknowledgement is written while holding the subscriber's write
    /// lock, so no notification can reach the client before it.
    fn subscribe(&self, session: &Session) -> Result<Outcome> {
        if let Err(e) = self.gateway.audit_subscribe(session) {
            return Ok(Outcome::Respond(e.into()));
        }

        let subscriber = Arc::new(SubscriberStream::new(
            self.stream.try_clone()?,
            self.settings.subscriber_write_timeout,
        )?);

        let mut stream = subscriber.lock();
        let handle: Arc<dyn Subscriber> = subscriber.clone();
        if !self.broadcaster.subscribe(self.id, handle, &session.client_id)? {
            return Err(CorpError::Network(format!(
                "connection {} is already subscribed",
                self.id
            )));
        }

        if let Err(e) = write_response(&mut *stream, &Response::subscribed()) {
            drop(stream);
            self.broadcaster.unsubscribe(self.id);
            return Err(e);
        }

        Ok(Outcome::Listen)
    }

    /// Block until the subscriber sends anything or disconnects, then leave
    fn listen_until_closed(&mut self) {
        tracing::info!("Connection {} listening as subscriber", self.id);

        let mut buf = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.stream.read(&mut buf) {
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Ok(0) => tracing::info!("Subscriber {} disconnected", self.peer_addr),
                Ok(n) => tracing::info!(
                    "Subscriber {} sent {} bytes after subscribing; closing",
                    self.peer_addr,
                    n
                ),
                Err(e) => tracing::info!("Subscriber {} connection lost: {}", self.peer_addr, e),
            }
            break;
        }

        self.broadcaster.unsubscribe(self.id);
        // Also closes the clone held by queued notifications
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    /// Send a response to the client
    fn send(&mut self, response: &Response) -> Result<()> {
        match write_response(&mut self.stream, response) {
            Ok(()) => {
                tracing::debug!(
                    "Sent response to {} (status {})",
                    self.peer_addr,
                    response.status
                );
                Ok(())
            }
            Err(e) if e.is_disconnect() => {
                tracing::debug!(
                    "Client {} disconnected before response could be sent: {}",
                    self.peer_addr,
                    e
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                Err(e)
            }
        }
    }
}
