//! Pooled backend connections and the 1-second-bounded dialer.
//!
//! Each backend address gets exactly one long-lived, multiplexed HTTP/2
//! connection rather than a pool of several: multiplexing concurrent
//! streams is already the transport's job, so a pool of connections per
//! address would just be redundant bookkeeping on top of it.

use std::future::poll_fn;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use h2::client::SendRequest;
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;

use crate::address::Address;

/// Bound on how long a dial (TCP connect + HTTP/2 handshake) may take
/// before it's treated as a failure and a non-alive sentinel is recorded.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Hard ceiling on a single framed payload in either direction, matching the
/// largest payload any backend may exchange; enforced by the transparent
/// codec's frame-accumulation guard, not by the transport.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// A handle to a live, pooled HTTP/2 connection to one backend address.
///
/// `h2::client::SendRequest` is itself cheap to clone and internally
/// synchronized for readiness, but opening a stream still wants a
/// `&mut self` call to `send_request`, so we serialize that one call behind
/// an async mutex; once a stream is open, request/response bodies stream
/// independently of this lock.
pub struct BackendHandle {
    send_request: AsyncMutex<SendRequest<Bytes>>,
    /// The task driving the `h2::client::Connection` future. Aborting it is
    /// this proxy's definition of "closing" a pooled connection: in-flight
    /// streams on it observe termination through ordinary network
    /// semantics.
    driver: tokio::task::JoinHandle<()>,
}

impl BackendHandle {
    /// Opens a new HTTP/2 stream on the pooled connection, returning the
    /// response future and the request body sender. Concurrent callers on
    /// the same [`BackendHandle`] each get their own independent stream;
    /// the mutex only serializes the brief `send_request` call itself.
    pub async fn send_request(
        &self,
        request: http::Request<()>,
        end_of_stream: bool,
    ) -> Result<(h2::client::ResponseFuture, h2::SendStream<Bytes>), h2::Error> {
        let mut sr = self.send_request.lock().await;
        poll_fn(|cx| sr.poll_ready(cx)).await?;
        sr.send_request(request, end_of_stream)
    }

    /// Tears down the pooled connection. Idempotent: aborting an
    /// already-finished task is a no-op.
    pub fn close(&self) {
        self.driver.abort();
    }
}

/// The liveness state of a pooled connection. Invariant: a
/// [`ConnState::Dead`] connection is never handed to the forwarder.
pub enum ConnState {
    Alive(Arc<BackendHandle>),
    Dead,
}

/// An entry in the Connection Cache: an address paired with its liveness
/// state. Created only by the Reconfigurator.
pub struct Connection {
    addr: Address,
    state: ConnState,
}

impl Connection {
    pub fn alive(addr: Address, handle: Arc<BackendHandle>) -> Self {
        Self {
            addr,
            state: ConnState::Alive(handle),
        }
    }

    /// Builds a non-alive sentinel for an address whose most recent dial
    /// failed. Kept in the table so repeated dial storms are avoided until
    /// the next reconfiguration.
    pub fn dead(addr: Address) -> Self {
        Self {
            addr,
            state: ConnState::Dead,
        }
    }

    pub fn addr(&self) -> &Address {
        &self.addr
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.state, ConnState::Alive(_))
    }

    /// The live handle, if any. `None` for a dead sentinel.
    pub fn handle(&self) -> Option<Arc<BackendHandle>> {
        match &self.state {
            ConnState::Alive(h) => Some(h.clone()),
            ConnState::Dead => None,
        }
    }

    /// Closes the underlying connection if alive. A no-op for a dead
    /// sentinel, so callers don't need to check `is_alive` first.
    pub fn close(&self) {
        if let ConnState::Alive(handle) = &self.state {
            handle.close();
        }
    }
}

/// Dials `addr`, blocking until the TCP connection and the HTTP/2 handshake
/// both complete or until [`CONNECT_TIMEOUT`] elapses as a whole.
///
/// On success, the connection's background driver (the `h2::client::Connection`
/// future that must be polled for the multiplexed connection to make any
/// progress at all) is spawned onto its own task; its exit is logged at
/// `debug` level since it only ever fires when the backend goes away, which
/// reconfiguration, not this task, is responsible for noticing.
pub async fn dial(addr: &Address) -> io::Result<Arc<BackendHandle>> {
    timeout(CONNECT_TIMEOUT, dial_inner(addr))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))?
}

async fn dial_inner(addr: &Address) -> io::Result<Arc<BackendHandle>> {
    let tcp = TcpStream::connect(addr.canonical()).await?;
    tcp.set_nodelay(true)?;

    let (send_request, connection) = h2::client::Builder::new()
        .initial_window_size(1 << 20)
        .max_frame_size(1 << 20)
        .handshake(tcp)
        .await
        .map_err(io::Error::other)?;

    let addr_for_log = addr.clone();
    let driver = tokio::spawn(async move {
        if let Err(err) = connection.await {
            tracing::debug!(address = %addr_for_log, error = %err, "backend h2 connection closed");
        }
    });

    Ok(Arc::new(BackendHandle {
        send_request: AsyncMutex::new(send_request),
        driver,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_not_alive_and_has_no_handle() {
        let c = Connection::dead(Address::new("h", "1"));
        assert!(!c.is_alive());
        assert!(c.handle().is_none());
    }

    #[tokio::test]
    async fn dial_to_closed_port_fails_within_timeout() {
        // Port 0 never accepts; the OS refuses immediately rather than
        // timing out, but either way dial() must return an error quickly.
        let addr = Address::new("127.0.0.1", "1");
        let started = tokio::time::Instant::now();
        let result = dial(&addr).await;
        assert!(result.is_err());
        assert!(started.elapsed() <= CONNECT_TIMEOUT + Duration::from_millis(500));
    }
}
