//! TCP Server
//!
//! Accepts connections and runs one handler thread per connection.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::broadcast::SubscriptionBroadcaster;
use crate::config::Config;
use crate::error::{CorpError, Result};
use crate::gateway::AuditedStorageGateway;
use super::connection::{Connection, ConnectionSettings};

/// Stops a running [`Server`] from another thread (e.g. a Ctrl+C handler)
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the accept loop to stop
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// TCP server for corpkv
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    gateway: Arc<AuditedStorageGateway>,
    broadcaster: Arc<SubscriptionBroadcaster>,
    settings: ConnectionSettings,
    poll_interval: Duration,
    shutdown: ShutdownHandle,
    next_connection_id: AtomicU64,
}

impl Server {
    /// Bind the listen address from `config`.
    ///
    /// A bind failure (e.g. the port is in use) is returned as
    /// [`CorpError::Bind`] and is not retried.
    pub fn bind(
        config: &Config,
        gateway: Arc<AuditedStorageGateway>,
        broadcaster: Arc<SubscriptionBroadcaster>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|source| CorpError::Bind {
            addr: config.listen_addr.clone(),
            source,
        })?;

        // Non-blocking so the accept loop can notice shutdown
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Server v{} listening on {}", crate::VERSION, local_addr);

        Ok(Self {
            listener,
            local_addr,
            gateway,
            broadcaster,
            settings: ConnectionSettings::from_config(config),
            poll_interval: Duration::from_millis(config.accept_poll_interval_ms.max(1)),
            shutdown: ShutdownHandle::new(),
            next_connection_id: AtomicU64::new(1),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to stop accepting connections
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Accept connections until shut down (blocking).
    ///
    /// Consumes the server; the listening socket is closed on return. Sessions
    /// already running are left to finish on their own threads.
    pub fn run(self) -> Result<()> {
        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, peer)) => self.spawn_connection(stream, peer),
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(self.poll_interval),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(self.poll_interval);
                }
            }
        }

        tracing::info!("Shutdown requested, closing listener on {}", self.local_addr);
        Ok(())
    }

    /// Start a handler thread for an accepted connection
    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping connection from {}: {}", peer, e);
            return;
        }

        let gateway = Arc::clone(&self.gateway);
        let broadcaster = Arc::clone(&self.broadcaster);
        let settings = self.settings;

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", id))
            .spawn(move || {
                tracing::info!("Connection {} accepted from {}", id, peer);
                let result = Connection::new(stream, id, gateway, broadcaster, settings)
                    .and_then(Connection::handle);
                if let Err(e) = result {
                    tracing::warn!("Connection {} ended with error: {}", id, e);
                }
                tracing::info!("Connection {} from {} closed", id, peer);
            });

        if let Err(e) = spawned {
            tracing::error!("Cannot start handler for {}: {}", peer, e);
        }
    }
}
