use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Mutex;

use crate::error::OpError;
use crate::models::Product;
use crate::store::{token_start_id, ProductStore, ScanPage};

/// In-memory product store
///
/// Backs the dispatcher tests and local runs without a Spanner emulator.
/// The ordered map gives the same key-ordered scan semantics as the
/// production table.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, Product>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, for test assertions
    pub fn len(&self) -> usize {
        self.items.lock().expect("store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn scan(&self, limit: i64, start_key: Option<JsonValue>) -> Result<ScanPage, OpError> {
        let after = match &start_key {
            Some(token) => Some(token_start_id(token)?),
            None => None,
        };

        let items = self.items.lock().expect("store mutex poisoned");
        let range = match &after {
            Some(id) => items.range((Bound::Excluded(id.clone()), Bound::Unbounded)),
            None => items.range::<String, _>(..),
        };

        // Probe one row past the page to decide whether a token is needed
        let mut page: Vec<Product> = range.take(limit as usize + 1).map(|(_, p)| p.clone()).collect();
        let last_evaluated_key = if page.len() as i64 > limit {
            page.truncate(limit as usize);
            page.last().map(|p| json!({"id": p.id}))
        } else {
            None
        };

        Ok(ScanPage {
            items: page,
            last_evaluated_key,
        })
    }

    async fn get(&self, id: &str) -> Result<Option<Product>, OpError> {
        let items = self.items.lock().expect("store mutex poisoned");
        Ok(items.get(id).cloned())
    }

    async fn put(&self, product: &Product) -> Result<(), OpError> {
        let mut items = self.items.lock().expect("store mutex poisoned");
        items.insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn update_existing(
        &self,
        id: &str,
        category: &str,
        title: &str,
    ) -> Result<(), OpError> {
        let mut items = self.items.lock().expect("store mutex poisoned");
        match items.get_mut(id) {
            Some(product) => {
                product.category = category.to_string();
                product.title = title.to_string();
                Ok(())
            }
            None => Err(OpError::ConditionFailed(id.to_string())),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), OpError> {
        let mut items = self.items.lock().expect("store mutex poisoned");
        items.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RatingSum;

    fn product(id: &str) -> Product {
        Product::new(id.to_string(), "computer".to_string(), "Ergo Mouse".to_string())
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStore::new();
        store.put(&product("p-1")).await.unwrap();

        let found = store.get("p-1").await.unwrap().unwrap();
        assert_eq!(found.id, "p-1");
        assert_eq!(found.rating_sum, RatingSum(0.0));
        assert_eq!(found.rating_count, 0);

        assert!(store.get("p-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_existing_requires_presence() {
        let store = MemoryStore::new();
        store.put(&product("p-1")).await.unwrap();

        store
            .update_existing("p-1", "office", "Split Keyboard")
            .await
            .unwrap();
        let updated = store.get("p-1").await.unwrap().unwrap();
        assert_eq!(updated.category, "office");
        assert_eq!(updated.title, "Split Keyboard");

        let err = store
            .update_existing("p-9", "office", "Split Keyboard")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ConditionFailed");
    }

    #[tokio::test]
    async fn test_update_leaves_counters_alone() {
        let store = MemoryStore::new();
        let mut rated = product("p-1");
        rated.rating_sum = RatingSum(4.5);
        rated.rating_count = 2;
        store.put(&rated).await.unwrap();

        store.update_existing("p-1", "office", "Desk").await.unwrap();
        let after = store.get("p-1").await.unwrap().unwrap();
        assert_eq!(after.rating_sum, RatingSum(4.5));
        assert_eq!(after.rating_count, 2);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.put(&product("p-1")).await.unwrap();

        store.delete("p-1").await.unwrap();
        store.delete("p-1").await.unwrap();
        assert!(store.get("p-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_pages_are_disjoint() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.put(&product(&format!("p-{}", i))).await.unwrap();
        }

        let first = store.scan(2, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        let token = first.last_evaluated_key.clone().unwrap();

        let second = store.scan(2, Some(token)).await.unwrap();
        assert_eq!(second.items.len(), 2);
        let token = second.last_evaluated_key.clone().unwrap();

        let third = store.scan(2, Some(token)).await.unwrap();
        assert_eq!(third.items.len(), 1);
        assert!(third.last_evaluated_key.is_none());

        let mut seen: Vec<String> = first
            .items
            .iter()
            .chain(second.items.iter())
            .chain(third.items.iter())
            .map(|p| p.id.clone())
            .collect();
        seen.dedup();
        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn test_scan_exact_limit_has_no_token() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store.put(&product(&format!("p-{}", i))).await.unwrap();
        }

        let page = store.scan(3, None).await.unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.last_evaluated_key.is_none());
    }

    #[tokio::test]
    async fn test_scan_rejects_malformed_token() {
        let store = MemoryStore::new();
        let err = store
            .scan(2, Some(json!({"wrong": "shape"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
    }
}
