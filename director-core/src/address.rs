//! The [`Address`] type: a `(host, port)` pair identifying a backend.
//!
//! Unlike a resolved [`SocketAddr`](std::net::SocketAddr), an [`Address`]
//! keeps its host as an unresolved string. Resolution happens lazily, at
//! dial time, so that a backend declaration naming a host that doesn't
//! currently resolve is a legal (if doomed) input rather than a parse
//! error: it becomes a non-alive sentinel instead.

use std::fmt;
use std::hash::Hash;

/// A backend address: `host:port`, rendered canonically with a colon
/// separator and compared by exact string equality of both parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    host: String,
    port: String,
}

impl Address {
    /// Builds an address from a host and a port. Neither is validated here;
    /// callers that need the "ignore if empty" rule should check
    /// [`Address::is_empty`] themselves (see [`BackendDeclaration::is_valid`](crate::discovery::BackendDeclaration::is_valid)).
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// True if either component is empty; such a declaration must be
    /// dropped by the Reconfigurator before it ever reaches a [`Balancer`](crate::balancer::Balancer).
    pub fn is_empty(&self) -> bool {
        self.host.is_empty() || self.port.is_empty()
    }

    /// The canonical `host:port` string used both for dialing (via Tokio's
    /// `ToSocketAddrs` string form, which performs DNS resolution) and as
    /// the `A2C` map key.
    pub fn canonical(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_joins_host_and_port() {
        let addr = Address::new("10.0.0.1", "9000");
        assert_eq!(addr.canonical(), "10.0.0.1:9000");
        assert_eq!(addr.to_string(), "10.0.0.1:9000");
    }

    #[test]
    fn equality_is_by_both_components() {
        assert_eq!(Address::new("a", "1"), Address::new("a", "1"));
        assert_ne!(Address::new("a", "1"), Address::new("a", "2"));
        assert_ne!(Address::new("a", "1"), Address::new("b", "1"));
    }

    #[test]
    fn empty_host_or_port_is_detected() {
        assert!(Address::new("", "1").is_empty());
        assert!(Address::new("a", "").is_empty());
        assert!(!Address::new("a", "1").is_empty());
    }
}
