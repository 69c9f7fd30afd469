//! The Reconfigurator: turns a [`RoutingConfig`] snapshot into a new
//! [`RoutingTable`] and installs it into a [`Director`].
//!
//! The new maps are built outside any lock, dialing only addresses the
//! current table doesn't already know about; the write lock is taken only
//! for the final swap and the close-of-evicted step, and the swap always
//! happens before any eviction close.

use std::collections::HashMap;
use std::sync::Arc;

use crate::address::Address;
use crate::balancer::Balancer;
use crate::connection::{self, Connection};
use crate::discovery::RoutingConfig;
use crate::routing_table::{Director, RoutingTable};

/// Counts reported after an `Upgrade` completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeSummary {
    pub total_backends: usize,
    pub alive_backends: usize,
    pub total_endpoints: usize,
}

/// Consumes `config` and installs the resulting table into `director`.
///
/// A connection already present in the director's current table is never
/// redialed, even if `config` lists its address again: this is what lets an
/// in-flight stream survive a reconfiguration untouched. Dialing happens
/// with no locks held; only the final swap and the close-of-evicted step
/// take the write lock, and the swap always happens before any eviction
/// close, so no in-flight call can acquire a connection that's about to be
/// torn down.
pub async fn upgrade(director: &Director, config: &RoutingConfig) -> UpgradeSummary {
    let old_table = director.current();

    let mut new_a2c: HashMap<Address, Arc<Connection>> = HashMap::new();
    let mut endpoint_addrs: HashMap<String, Vec<Address>> = HashMap::new();
    let mut alive_backends = 0usize;

    for decl in config.declarations() {
        if !decl.is_valid() {
            continue;
        }
        let addr = decl.address.clone();

        if !new_a2c.contains_key(&addr) {
            let conn = if let Some(existing) = old_table.connection(&addr) {
                // Reuse: never redial an address the old table already
                // has an entry for, live or not.
                existing.clone()
            } else {
                match connection::dial(&addr).await {
                    Ok(handle) => Arc::new(Connection::alive(addr.clone(), handle)),
                    Err(err) => {
                        tracing::error!(
                            module = %decl.module_name,
                            address = %addr,
                            error = %err,
                            "couldn't connect to backend"
                        );
                        Arc::new(Connection::dead(addr.clone()))
                    }
                }
            };
            if conn.is_alive() {
                alive_backends += 1;
            }
            new_a2c.insert(addr.clone(), conn);
        }

        for endpoint in &decl.endpoints {
            endpoint_addrs
                .entry(endpoint.clone())
                .or_default()
                .push(addr.clone());
        }
    }

    let new_e2b: HashMap<String, Arc<Balancer>> = endpoint_addrs
        .into_iter()
        .filter_map(|(endpoint, addrs)| Balancer::new(addrs).map(|b| (endpoint, Arc::new(b))))
        .collect();

    let total_backends = new_a2c.len();
    let total_endpoints = new_e2b.len();
    let new_table = Arc::new(RoutingTable::new(new_a2c, new_e2b));

    // The swap itself: the write lock is held only for this pointer
    // replacement, never during dialing above.
    let previous = director.swap(new_table);

    // Close whatever the old table referenced that the new one no longer
    // does - strictly after the swap, so no in-flight call can acquire a
    // connection we're about to tear down.
    let current = director.current();
    for (addr, conn) in previous.connections() {
        if current.connection(addr).is_none() && conn.is_alive() {
            conn.close();
        }
    }

    tracing::info!(
        total_backends,
        alive_backends,
        total_endpoints,
        "change routing table"
    );

    UpgradeSummary {
        total_backends,
        alive_backends,
        total_endpoints,
    }
}
