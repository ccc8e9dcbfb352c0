//! # Inbound Ports
//!
//! What the resolver offers to its drivers (HTTP surface, relay callback).

use async_trait::async_trait;

use crate::domain::{Hash, Order, ResolverError, SecretRevealed, SecureSecret};

/// Resolver API - inbound port.
#[async_trait]
pub trait ResolverApi: Send + Sync {
    /// Deploy both escrows of a `created` order.
    ///
    /// A no-op on orders already past `created`.
    async fn create_escrows(&self, hash: &Hash) -> Result<Order, ResolverError>;

    /// Withdraw both legs with the revealed secret.
    async fn withdraw(&self, hash: &Hash, secret: &SecureSecret) -> Result<Order, ResolverError>;

    /// Cross-check a relay payload against the stored order, then withdraw.
    async fn withdraw_from_relay(&self, payload: &SecretRevealed) -> Result<Order, ResolverError>;

    /// Read one order.
    async fn get_order(&self, hash: &Hash) -> Result<Order, ResolverError>;

    /// Read every order.
    async fn list_orders(&self) -> Result<Vec<Order>, ResolverError>;
}
