//! The routing table pair `(A2C, E2B)` and the [`Director`] that guards it.
//!
//! The table is a single immutable snapshot, replaced wholesale on each
//! reconfiguration rather than mutated in place, so that a reader holding a
//! clone of the `Arc` never observes a half-updated table. The lock guarding
//! it is a `parking_lot::RwLock`, the same choice made anywhere else in this
//! codebase that a mutable, concurrently-read structure needs guarding.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::address::Address;
use crate::balancer::Balancer;
use crate::connection::Connection;
use crate::error::DirectorError;

/// An immutable snapshot of the routing table: address→connection and
/// endpoint→balancer. Built only by the Reconfigurator (see
/// [`crate::reconfigure`]) and installed into a [`Director`] wholesale.
pub struct RoutingTable {
    a2c: HashMap<Address, Arc<Connection>>,
    e2b: HashMap<String, Arc<Balancer>>,
}

impl RoutingTable {
    /// Constructs a table from its two maps. Public so integration tests
    /// and alternate reconfiguration strategies can build one directly;
    /// ordinary callers go through [`crate::reconfigure::upgrade`].
    pub fn new(a2c: HashMap<Address, Arc<Connection>>, e2b: HashMap<String, Arc<Balancer>>) -> Self {
        Self { a2c, e2b }
    }

    pub fn empty() -> Self {
        Self {
            a2c: HashMap::new(),
            e2b: HashMap::new(),
        }
    }

    pub fn connection(&self, addr: &Address) -> Option<&Arc<Connection>> {
        self.a2c.get(addr)
    }

    pub fn balancer(&self, endpoint: &str) -> Option<&Arc<Balancer>> {
        self.e2b.get(endpoint)
    }

    pub fn connections(&self) -> &HashMap<Address, Arc<Connection>> {
        &self.a2c
    }

    pub fn endpoints(&self) -> &HashMap<String, Arc<Balancer>> {
        &self.e2b
    }

    pub fn total_backends(&self) -> usize {
        self.a2c.len()
    }

    pub fn alive_backends(&self) -> usize {
        self.a2c.values().filter(|c| c.is_alive()).count()
    }

    pub fn total_endpoints(&self) -> usize {
        self.e2b.len()
    }
}

/// The Director: the routing table behind a single reader-writer lock, plus
/// the one operation every inbound call needs, `resolve`, which performs the
/// lookup chain a call must walk to reach a live backend: endpoint to
/// balancer, `next()` to address, address to connection.
///
/// Request metadata extraction and RPC-runtime integration live in the
/// proxy binary, since they're protocol-specific; everything downstream of
/// "I have an endpoint name" lives here so it can be unit tested without
/// any transport at all.
pub struct Director {
    table: RwLock<Arc<RoutingTable>>,
}

impl Director {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Arc::new(RoutingTable::empty())),
        }
    }

    /// A cheap snapshot of the current table. The read lock is held only
    /// long enough to clone the `Arc` pointer.
    pub fn current(&self) -> Arc<RoutingTable> {
        self.table.read().clone()
    }

    /// Installs `new` as the current table, returning the table it
    /// replaced. The write lock is held only for the pointer swap itself;
    /// the Reconfigurator is responsible for dialing new backends *before*
    /// calling this and closing evicted ones *after*.
    pub fn swap(&self, new: Arc<RoutingTable>) -> Arc<RoutingTable> {
        let mut guard = self.table.write();
        std::mem::replace(&mut *guard, new)
    }

    /// Resolves an endpoint name to a live connection: an unknown endpoint
    /// yields an `Unimplemented`-coded error, and a resolved-but-unreachable
    /// address yields an `Unavailable`-coded error.
    pub fn resolve(&self, endpoint: &str) -> Result<Arc<Connection>, DirectorError> {
        // Cloning the table Arc releases the lock immediately; everything
        // below reads from the snapshot without holding it.
        let table = self.current();

        let balancer = table
            .balancer(endpoint)
            .ok_or_else(|| DirectorError::UnknownEndpoint(endpoint.to_string()))?;

        let addr = balancer.next();

        let conn = table
            .connection(&addr)
            .ok_or_else(|| DirectorError::ConnectionNotFound(addr.clone()))?;

        if !conn.is_alive() {
            return Err(DirectorError::ConnectionNotAlive(addr));
        }

        Ok(conn.clone())
    }
}

impl Default for Director {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{BackendDeclaration, RoutingConfig};
    use crate::reconfigure::upgrade;

    fn config(entries: &[(&str, &str, &str, &[&str])]) -> RoutingConfig {
        RoutingConfig::new(
            entries
                .iter()
                .map(|(module, host, port, endpoints)| {
                    BackendDeclaration::new(
                        *module,
                        Address::new(*host, *port),
                        endpoints.iter().map(|s| s.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn unknown_endpoint_on_empty_table_is_unimplemented() {
        let director = Director::new();
        let err = director.resolve("x").unwrap_err();
        assert_eq!(err, DirectorError::UnknownEndpoint("x".into()));
        assert_eq!(err.code(), crate::error::StatusCode::Unimplemented);
    }

    #[tokio::test]
    async fn dead_backend_resolves_to_unavailable() {
        let director = Director::new();
        let cfg = config(&[(
            "dead_backend",
            "unknownhost.invalid",
            "5000",
            &["dead_backend/endpoint"],
        )]);
        upgrade(&director, &cfg).await;

        let err = director.resolve("dead_backend/endpoint").unwrap_err();
        assert_eq!(err.code(), crate::error::StatusCode::Unavailable);
    }

    #[tokio::test]
    async fn empty_config_makes_every_endpoint_unimplemented() {
        let director = Director::new();
        upgrade(&director, &RoutingConfig::default()).await;
        assert!(director.resolve("anything").is_err());
        assert_eq!(director.current().total_endpoints(), 0);
    }
}
