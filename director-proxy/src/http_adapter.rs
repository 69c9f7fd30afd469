//! Optional plain-HTTP reverse-proxy adapter.
//!
//! The Director's core contract is HTTP/2 frame forwarding, but the same
//! routing table can just as well front ordinary HTTP backends: forwarding
//! a request by path, adding `X-Forwarded-For`, and relaying whatever the
//! backend returns. This is peripheral to the transparent-proxy design, so
//! it lives behind the `http-adapter` feature rather than in the always-on
//! path.
//!
//! Unlike the HTTP/2 forwarder, this adapter dials a short-lived connection
//! per request through `hyper-util`'s legacy client rather than reusing
//! `director_core`'s pooled [`BackendHandle`] (that pool is h2-specific);
//! it only reuses the Director's endpoint-to-address resolution.

use std::net::SocketAddr;

use bytes::Bytes;
use director_core::Director;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::forwarder::PROXY_METHOD_NAME_HEADER;

pub type AdapterBody = Full<Bytes>;

/// Forwards a plain HTTP request to whatever backend the Director resolves
/// for the endpoint named in `PROXY_METHOD_NAME_HEADER`, returning the
/// backend's response unchanged.
pub struct HttpAdapter {
    client: Client<HttpConnector, AdapterBody>,
}

impl HttpAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    pub async fn forward(
        &self,
        director: &Director,
        peer: SocketAddr,
        mut request: Request<AdapterBody>,
    ) -> Result<hyper::Response<Incoming>, AdapterError> {
        let endpoint = request
            .headers()
            .get(PROXY_METHOD_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AdapterError::MissingEndpoint)?
            .to_string();

        let conn = director.resolve(&endpoint)?;
        let addr = conn.addr();

        request
            .headers_mut()
            .insert("x-forwarded-for", peer.ip().to_string().parse().unwrap());

        let uri = format!("http://{}{}", addr.canonical(), request.uri().path_and_query().map(|p| p.as_str()).unwrap_or("/"));
        let parsed_uri = uri.parse().map_err(|_| AdapterError::BadUpstreamUri(uri))?;
        *request.uri_mut() = parsed_uri;

        self.client
            .request(request)
            .await
            .map_err(AdapterError::Upstream)
    }
}

impl Default for HttpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("missing or unparseable '{PROXY_METHOD_NAME_HEADER}' header")]
    MissingEndpoint,
    #[error(transparent)]
    Director(#[from] director_core::DirectorError),
    #[error("could not build upstream URI '{0}'")]
    BadUpstreamUri(String),
    #[error("upstream request failed: {0}")]
    Upstream(hyper_util::client::legacy::Error),
}
