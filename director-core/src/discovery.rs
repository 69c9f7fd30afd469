//! Input data model pushed into the Director by the cluster collaborator.
//!
//! A `RoutingConfig` is a full snapshot describing every backend and the
//! endpoints it advertises, rather than a per-endpoint lookup or an
//! incremental delta: each reconfiguration replaces the whole picture at
//! once.

use crate::address::Address;

/// One backend's contribution to a routing configuration.
///
/// A declaration is **ignored** by the Reconfigurator if its host or port
/// is empty, or if it advertises no endpoints at all; see
/// [`BackendDeclaration::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDeclaration {
    /// Diagnostic-only; never used for routing decisions.
    pub module_name: String,
    pub address: Address,
    /// Ordered sequence of endpoint names this backend serves.
    pub endpoints: Vec<String>,
}

impl BackendDeclaration {
    pub fn new(
        module_name: impl Into<String>,
        address: Address,
        endpoints: Vec<String>,
    ) -> Self {
        Self {
            module_name: module_name.into(),
            address,
            endpoints,
        }
    }

    /// A declaration is valid iff its address is fully specified and it
    /// advertises at least one endpoint.
    pub fn is_valid(&self) -> bool {
        !self.address.is_empty() && !self.endpoints.is_empty()
    }
}

/// A complete routing-configuration snapshot: an ordered sequence of
/// backend declarations. Duplicates (the same endpoint advertised by
/// multiple addresses) are explicitly allowed and become load-balanced
/// targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingConfig(pub Vec<BackendDeclaration>);

impl RoutingConfig {
    pub fn new(declarations: Vec<BackendDeclaration>) -> Self {
        Self(declarations)
    }

    pub fn declarations(&self) -> &[BackendDeclaration] {
        &self.0
    }
}

impl FromIterator<BackendDeclaration> for RoutingConfig {
    fn from_iter<T: IntoIterator<Item = BackendDeclaration>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
