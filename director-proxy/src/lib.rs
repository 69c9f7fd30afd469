//! HTTP/2-facing half of the transparent proxy: the status/codec plumbing,
//! the forwarder that ties inbound calls to [`director_core::Director`], the
//! ingress server, the routing-config watcher, and process configuration.
//!
//! [`director_core`] knows nothing about HTTP/2, gRPC status trailers, or
//! process bootstrap; this crate is where that wiring happens, sitting on
//! top of the transport-agnostic routing core.

pub mod cluster_client;
pub mod codec;
pub mod config;
pub mod forwarder;
pub mod server;
pub mod status;

#[cfg(feature = "http-adapter")]
pub mod http_adapter;

pub use config::ProxyConfig;
pub use server::{Http2Config, Server};
