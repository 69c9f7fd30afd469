//! Ingress: a raw HTTP/2 server that accepts connections, resolves each
//! inbound stream's endpoint through the forwarder, and pipes bodies
//! through the transparent codec.
//!
//! There is exactly one handler here, forward whatever arrived, so this is
//! a plain `h2::server` loop: accept a TCP connection, run the HTTP/2
//! handshake, then spawn a task per inbound stream, with a `watch` channel
//! driving graceful shutdown across every in-flight connection.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use director_core::Director;
use h2::server::SendResponse;
use http::{Request, Response};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::codec;
use crate::forwarder;
use crate::status::Status;

/// HTTP/2 handshake tuning. Mirrors the window/frame sizes
/// `director_core::connection` dials outbound connections with, so neither
/// side of the proxy is the bottleneck on flow control.
#[derive(Debug, Clone, Copy)]
pub struct Http2Config {
    pub initial_window_size: u32,
    pub max_frame_size: u32,
}

impl Default for Http2Config {
    fn default() -> Self {
        Self {
            initial_window_size: 1 << 20,
            max_frame_size: 1 << 20,
        }
    }
}

/// The ingress server: owns the listening socket and the shared [`Director`]
/// every inbound stream resolves against.
pub struct Server {
    director: Arc<Director>,
    http2: Http2Config,
}

impl Server {
    pub fn new(director: Arc<Director>) -> Self {
        Self {
            director,
            http2: Http2Config::default(),
        }
    }

    pub fn with_http2_config(mut self, http2: Http2Config) -> Self {
        self.http2 = http2;
        self
    }

    /// Binds `addr` and serves until `shutdown` fires. Each accepted
    /// connection is handled on its own task so one slow or misbehaving
    /// caller can never block another.
    pub async fn run_with_shutdown(
        &self,
        addr: &str,
        mut shutdown: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "proxy listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (socket, peer) = accepted?;
                    let director = self.director.clone();
                    let http2 = self.http2;
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(err) = serve_connection(socket, director, http2, shutdown).await {
                            tracing::debug!(%peer, error = %err, "connection ended with error");
                        }
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("shutdown signal received, no longer accepting connections");
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn serve_connection(
    socket: TcpStream,
    director: Arc<Director>,
    http2: Http2Config,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), h2::Error> {
    socket.set_nodelay(true).ok();

    let mut connection = h2::server::Builder::new()
        .initial_window_size(http2.initial_window_size)
        .max_frame_size(http2.max_frame_size)
        .handshake(socket)
        .await?;

    loop {
        tokio::select! {
            next = connection.accept() => {
                let Some(result) = next else { break };
                let (request, respond) = result?;
                let director = director.clone();
                tokio::spawn(async move {
                    handle_stream(request, respond, director).await;
                });
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    connection.graceful_shutdown();
                }
            }
        }
    }

    Ok(())
}

async fn handle_stream(
    request: Request<h2::RecvStream>,
    mut respond: SendResponse<Bytes>,
    director: Arc<Director>,
) {
    let (parts, recv_body) = request.into_parts();

    let handle = match forwarder::connect(&director, &parts.headers) {
        Ok(handle) => handle,
        Err(err) => {
            send_error(&mut respond, err.into());
            return;
        }
    };

    let outbound = Request::from_parts(parts, ());
    let (response_future, send_body) = match handle.send_request(outbound, false).await {
        Ok(pair) => pair,
        Err(err) => {
            send_error(
                &mut respond,
                Status::new(crate::status::Code::Unavailable, err.to_string()),
            );
            return;
        }
    };

    let upstream_to_backend = codec::pipe(recv_body, send_body);
    let backend_response = response_future;

    let (upload_result, response_result) = tokio::join!(upstream_to_backend, backend_response);

    if let Err(err) = upload_result {
        tracing::debug!(error = %err, "error piping request body to backend");
    }

    let response = match response_result {
        Ok(response) => response,
        Err(err) => {
            send_error(
                &mut respond,
                Status::new(crate::status::Code::Unavailable, err.to_string()),
            );
            return;
        }
    };

    let (resp_parts, recv_body) = response.into_parts();
    // A backend that fails before sending any message answers with a
    // Trailers-Only response: a single HEADERS frame, carrying grpc-status
    // and grpc-message directly, with END_STREAM already set and no further
    // frame to follow. Forward that shape as-is rather than opening a body
    // stream `codec::pipe` would find nothing to fill.
    let trailers_only = recv_body.is_end_stream();
    let send_response = Response::from_parts(resp_parts, ());

    match respond.send_response(send_response, trailers_only) {
        Ok(send_body) => {
            if !trailers_only {
                if let Err(err) = codec::pipe(recv_body, send_body).await {
                    tracing::debug!(error = %err, "error piping response body from backend");
                }
            }
        }
        Err(err) => {
            tracing::debug!(error = %err, "failed to send response headers to caller");
        }
    }

    forwarder::release();
}

fn send_error(respond: &mut SendResponse<Bytes>, status: Status) {
    let mut response = Response::builder()
        .status(http::StatusCode::OK)
        .body(())
        .expect("status-only response is always constructible");
    for (name, value) in status.to_header_map().iter() {
        response.headers_mut().insert(name, value.clone());
    }

    match respond.send_response(response, true) {
        Ok(_) => {}
        Err(err) => tracing::debug!(error = %err, "failed to send error trailers to caller"),
    }
}

/// Builds a `watch` channel for graceful shutdown, paired with a future that
/// resolves when the process receives SIGINT/SIGTERM equivalents (Ctrl-C on
/// all supported platforms).
pub fn shutdown_signal() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

pub async fn wait_for_ctrl_c(tx: watch::Sender<bool>) {
    let _ = tokio::signal::ctrl_c().await;
    let _ = tx.send(true);
    // Give in-flight streams a moment to notice graceful_shutdown() before
    // the process tears down tasks.
    tokio::time::sleep(Duration::from_millis(50)).await;
}
