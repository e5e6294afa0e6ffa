//! Subscriber endpoints
//!
//! Where notifications are written.

use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

/// Something a notification can be delivered to
pub trait Subscriber: Send + Sync {
    /// Write one complete message
    fn deliver(&self, message: &[u8]) -> io::Result<()>;

    /// Called once the subscriber has been dropped from the registry.
    /// Must not block, and must unblock a `deliver` in progress if possible.
    fn close(&self) {}
}

/// A subscribed TCP connection
///
/// Writes are serialized by an internal lock so messages never interleave.
pub struct SubscriberStream {
    stream: Mutex<TcpStream>,

    /// Second handle to the same socket, usable while a write holds the lock
    control: TcpStream,
}

impl SubscriberStream {
    /// Wrap the write side of a connection
    pub fn new(stream: TcpStream, write_timeout: Option<Duration>) -> io::Result<Self> {
        stream.set_write_timeout(write_timeout)?;
        let control = stream.try_clone()?;
        Ok(Self {
            stream: Mutex::new(stream),
            control,
        })
    }

    /// Hold the write lock, e.g. to write the subscription acknowledgement
    /// before any notification can go out
    pub fn lock(&self) -> MutexGuard<'_, TcpStream> {
        self.stream.lock()
    }
}

impl Subscriber for SubscriberStream {
    fn deliver(&self, message: &[u8]) -> io::Result<()> {
        let mut stream = self.stream.lock();
        stream.write_all(message)?;
        stream.flush()
    }

    fn close(&self) {
        // Fails a write blocked on a peer that stopped reading
        let _ = self.control.shutdown(Shutdown::Both);
    }
}
