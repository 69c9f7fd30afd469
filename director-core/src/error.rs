//! Error taxonomy for the Director, mirroring the status codes the
//! forwarder must surface to callers verbatim.

use thiserror::Error;

use crate::address::Address;

/// Errors raised while resolving an inbound call to a live backend
/// connection. Each variant corresponds to exactly one row of the
/// forwarder's error-code table and carries the gRPC-style status code a
/// transport-facing layer should translate it to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectorError {
    /// No request metadata was present on the inbound call.
    #[error("could not read metadata from request context")]
    MissingMetadata,

    /// The `proxy-method-name` header was absent or empty.
    #[error("missing or empty '{0}' header")]
    MissingEndpointHeader(&'static str),

    /// No balancer is registered for the requested endpoint name.
    #[error("unknown endpoint {0}")]
    UnknownEndpoint(String),

    /// The balancer for an endpoint held no addresses: a programmer error
    /// per the table invariant (every balancer has at least one address),
    /// but handled defensively rather than panicking.
    #[error("load balancer for endpoint {0} has no addresses")]
    EmptyBalancer(String),

    /// The balancer selected an address with no entry in `A2C`: an
    /// invariant violation, since every balancer address must be a key in
    /// the connection cache.
    #[error("connection not found for address {0}")]
    ConnectionNotFound(Address),

    /// The address resolved to a connection, but it was recorded as a
    /// non-alive sentinel (its most recent dial failed).
    #[error("connection is not alive for address {0}")]
    ConnectionNotAlive(Address),
}

impl DirectorError {
    /// The gRPC status code this error must be surfaced as. Backend errors
    /// are never represented here: they propagate through the transparent
    /// codec unchanged, not through this enum.
    pub fn code(&self) -> StatusCode {
        match self {
            DirectorError::MissingMetadata | DirectorError::MissingEndpointHeader(_) => {
                StatusCode::DataLoss
            }
            DirectorError::UnknownEndpoint(_) => StatusCode::Unimplemented,
            DirectorError::EmptyBalancer(_)
            | DirectorError::ConnectionNotFound(_)
            | DirectorError::ConnectionNotAlive(_) => StatusCode::Unavailable,
        }
    }
}

/// A minimal, transport-independent mirror of the gRPC status codes this
/// proxy needs to produce on its own behalf. The wire-level encoding of
/// these codes into response trailers is the proxy binary's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    DataLoss,
    Unimplemented,
    Unavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_spec_table() {
        assert_eq!(DirectorError::MissingMetadata.code(), StatusCode::DataLoss);
        assert_eq!(
            DirectorError::MissingEndpointHeader("proxy-method-name").code(),
            StatusCode::DataLoss
        );
        assert_eq!(
            DirectorError::UnknownEndpoint("x".into()).code(),
            StatusCode::Unimplemented
        );
        assert_eq!(
            DirectorError::ConnectionNotFound(Address::new("a", "1")).code(),
            StatusCode::Unavailable
        );
        assert_eq!(
            DirectorError::ConnectionNotAlive(Address::new("a", "1")).code(),
            StatusCode::Unavailable
        );
    }
}
