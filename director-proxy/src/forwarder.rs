//! The Forwarder: the `Connect`/`Release` contract a transparent-proxy
//! runtime's unknown-method handler needs in order to dispatch an inbound
//! call to a backend connection.
//!
//! `connect` reads the proxy-method-name header out of the inbound
//! request's metadata, resolves it through the Director, and hands back a
//! connection handle (or the matching gRPC status on failure). Each `?`
//! below is one step of that resolution failing outright, rather than a
//! state machine walked explicitly.

use std::sync::Arc;

use director_core::connection::BackendHandle;
use director_core::error::DirectorError;
use director_core::Director;
use http::HeaderMap;

/// The well-known header naming the logical endpoint a caller wants to
/// reach. Defined once here rather than repeated as a string literal at
/// every call site.
pub const PROXY_METHOD_NAME_HEADER: &str = "proxy-method-name";

/// Extracts the endpoint name from inbound request metadata. A missing or
/// empty header is a `DataLoss` condition, not `Unimplemented`: the caller
/// sent a malformed request, not an unknown one.
pub fn extract_endpoint(headers: &HeaderMap) -> Result<String, DirectorError> {
    let value = headers
        .get(PROXY_METHOD_NAME_HEADER)
        .ok_or(DirectorError::MissingEndpointHeader(PROXY_METHOD_NAME_HEADER))?;
    let endpoint = value
        .to_str()
        .map_err(|_| DirectorError::MissingEndpointHeader(PROXY_METHOD_NAME_HEADER))?;
    if endpoint.is_empty() {
        return Err(DirectorError::MissingEndpointHeader(PROXY_METHOD_NAME_HEADER));
    }
    Ok(endpoint.to_string())
}

/// `Connect`: resolves an inbound call's headers to a live backend handle.
/// The caller's headers are never mutated, so its deadline and cancellation
/// (carried at the transport level by the HTTP/2 stream itself) pass
/// through untouched.
pub fn connect(
    director: &Director,
    headers: &HeaderMap,
) -> Result<Arc<BackendHandle>, DirectorError> {
    let endpoint = extract_endpoint(headers)?;
    let conn = director.resolve(&endpoint)?;
    // `Director::resolve` already enforces that a non-alive connection is
    // never returned, so `handle()` cannot be `None` here, but we still
    // thread through a fresh error rather than panic if that invariant is
    // ever violated.
    conn.handle()
        .ok_or_else(|| DirectorError::ConnectionNotAlive(conn.addr().clone()))
}

/// `Release`: a no-op. Connections are pooled, not allocated per call, so
/// there is nothing to release; kept as a named function purely so the
/// Connect/Release pairing is visible in the code.
pub fn release() {}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(v) = value {
            map.insert(PROXY_METHOD_NAME_HEADER, v.parse().unwrap());
        }
        map
    }

    #[test]
    fn missing_header_is_data_loss() {
        let err = extract_endpoint(&headers_with(None)).unwrap_err();
        assert!(matches!(err, DirectorError::MissingEndpointHeader(_)));
    }

    #[test]
    fn empty_header_is_data_loss() {
        let err = extract_endpoint(&headers_with(Some(""))).unwrap_err();
        assert!(matches!(err, DirectorError::MissingEndpointHeader(_)));
    }

    #[test]
    fn present_header_is_extracted() {
        let endpoint = extract_endpoint(&headers_with(Some("svc/method"))).unwrap();
        assert_eq!(endpoint, "svc/method");
    }

    #[test]
    fn connect_on_empty_table_is_unknown_endpoint() {
        let director = Director::new();
        let err = connect(&director, &headers_with(Some("svc/method"))).unwrap_err();
        assert!(matches!(err, DirectorError::UnknownEndpoint(_)));
    }
}
