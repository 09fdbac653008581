//! Tracked-item registry.
//!
//! One JSON record per tracked item under `item:{id}`. Re-registering an
//! id overwrites the existing record.

use futures::future::join_all;
use std::sync::Arc;
use tracing::warn;

use crate::error::{Result, TrackerError};
use crate::store::Store;
use crate::types::TrackedItem;

fn item_key(id: &str) -> String {
    format!("item:{}", id)
}

#[derive(Clone)]
pub struct ItemRegistry {
    store: Arc<dyn Store>,
}

impl ItemRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Persist a tracked item, overwriting any previous record for its id.
    pub async fn put(&self, item: &TrackedItem) -> Result<()> {
        let json = serde_json::to_string(item)
            .map_err(|e| TrackerError::Parse(format!("failed to serialize item: {}", e)))?;
        self.store.set(&item_key(&item.id), &json).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<TrackedItem>> {
        match self.store.get(&item_key(id)).await? {
            Some(json) => {
                let item = serde_json::from_str(&json).map_err(|e| {
                    TrackerError::Parse(format!("corrupt item record for {}: {}", id, e))
                })?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    /// All tracked items. Records are fetched concurrently; keys that
    /// vanish mid-scan are skipped.
    pub async fn list(&self) -> Result<Vec<TrackedItem>> {
        let keys = self.store.keys("item:*").await?;
        let fetches = join_all(keys.iter().map(|key| self.store.get(key))).await;

        let mut items = Vec::with_capacity(keys.len());
        for fetched in fetches {
            let Some(json) = fetched? else { continue };
            match serde_json::from_str::<TrackedItem>(&json) {
                Ok(item) => items.push(item),
                Err(e) => warn!("Skipping corrupt item record: {}", e),
            }
        }
        Ok(items)
    }

    /// Delete the registry record. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.store.del(&item_key(id)).await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::ItemKind;
    use rust_decimal::Decimal;

    fn item(id: &str, name: &str) -> TrackedItem {
        TrackedItem {
            id: id.to_string(),
            kind: ItemKind::App,
            name: name.to_string(),
            target_price: Decimal::from(500),
        }
    }

    fn registry() -> ItemRegistry {
        ItemRegistry::new(Arc::new(MemoryStore::default()))
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let registry = registry();
        registry.put(&item("570", "Dota 2")).await.unwrap();

        let stored = registry.get("570").await.unwrap().unwrap();
        assert_eq!(stored.name, "Dota 2");
        assert_eq!(stored.target_price, Decimal::from(500));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let registry = registry();
        registry.put(&item("570", "Dota 2")).await.unwrap();

        let mut updated = item("570", "Dota 2");
        updated.target_price = Decimal::from(300);
        registry.put(&updated).await.unwrap();

        let stored = registry.get("570").await.unwrap().unwrap();
        assert_eq!(stored.target_price, Decimal::from(300));
    }

    #[tokio::test]
    async fn test_list_returns_all_items() {
        let registry = registry();
        registry.put(&item("570", "Dota 2")).await.unwrap();
        registry.put(&item("730", "Counter-Strike 2")).await.unwrap();

        let items = registry.list().await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = registry();
        registry.put(&item("570", "Dota 2")).await.unwrap();

        assert!(registry.remove("570").await.unwrap());
        assert!(registry.get("570").await.unwrap().is_none());
        assert!(!registry.remove("570").await.unwrap());
    }
}
