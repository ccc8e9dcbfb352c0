//! Order store adapters.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{Hash, Order, ResolverError};
use crate::ports::outbound::OrderStore;

/// Process-local store.
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<Hash, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with orders.
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        store
            .orders
            .write()
            .extend(orders.into_iter().map(|o| (o.hash, o)));
        store
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get(&self, hash: &Hash) -> Result<Order, ResolverError> {
        self.orders
            .read()
            .get(hash)
            .cloned()
            .ok_or(ResolverError::OrderNotFound(*hash))
    }

    async fn put(&self, order: &Order) -> Result<(), ResolverError> {
        self.orders.write().insert(order.hash, order.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Order>, ResolverError> {
        let mut orders: Vec<Order> = self.orders.read().values().cloned().collect();
        orders.sort_by_key(|o| (o.created_at, o.hash));
        Ok(orders)
    }
}

/// One camelCase JSON document per order under a directory.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash never leaves a half-written order.
pub struct JsonFileOrderStore {
    dir: PathBuf,
}

impl JsonFileOrderStore {
    /// Open (and create if missing) the store directory.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, ResolverError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| unavailable(&dir, e))?;
        Ok(Self { dir })
    }

    fn path_for(&self, hash: &Hash) -> PathBuf {
        self.dir.join(format!("{:x}.json", hash))
    }
}

fn unavailable(path: &Path, e: impl std::fmt::Display) -> ResolverError {
    ResolverError::StoreUnavailable(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl OrderStore for JsonFileOrderStore {
    async fn get(&self, hash: &Hash) -> Result<Order, ResolverError> {
        let path = self.path_for(hash);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ResolverError::OrderNotFound(*hash))
            }
            Err(e) => return Err(unavailable(&path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| unavailable(&path, e))
    }

    async fn put(&self, order: &Order) -> Result<(), ResolverError> {
        let path = self.path_for(&order.hash);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(order).map_err(|e| unavailable(&path, e))?;
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| unavailable(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| unavailable(&path, e))?;
        debug!("[resolver] stored order {:?} ({:?})", order.hash, order.status);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Order>, ResolverError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| unavailable(&self.dir, e))?;
        let mut orders = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| unavailable(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| unavailable(&path, e))?;
            orders.push(serde_json::from_slice::<Order>(&bytes).map_err(|e| unavailable(&path, e))?);
        }
        orders.sort_by_key(|o| (o.created_at, o.hash));
        Ok(orders)
    }
}
