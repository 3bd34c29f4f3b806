//! In-process `DashMap`-backed storage. Nothing persists across restarts.

use crate::{under_prefix, Storage, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

/// The default backend for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    raw: DashMap<String, Bytes>,
    meta: DashMap<String, serde_json::Value>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_raw(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        Ok(self.raw.get(key).map(|v| v.clone()))
    }

    async fn put_raw(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        self.raw.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn remove(&self, prefix: &str) -> Result<(), StorageError> {
        self.raw.retain(|k, _| !under_prefix(k, prefix));
        self.meta.retain(|k, _| !under_prefix(k, prefix));
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(self.meta.get(key).map(|v| v.clone()))
    }

    async fn set_meta(&self, key: &str, meta: serde_json::Value) -> Result<(), StorageError> {
        self.meta
            .entry(key.to_string())
            .and_modify(|existing| merge_json(existing, &meta))
            .or_insert(meta);
        Ok(())
    }
}

fn merge_json(existing: &mut serde_json::Value, incoming: &serde_json::Value) {
    match (existing, incoming) {
        (serde_json::Value::Object(existing_map), serde_json::Value::Object(incoming_map)) => {
            for (k, v) in incoming_map {
                existing_map.insert(k.clone(), v.clone());
            }
        }
        (existing_slot, _) => *existing_slot = incoming.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let storage = MemoryStorage::new();
        storage
            .put_raw("cdn/npm/uikit/1.0.0/a.js", Bytes::from_static(b"hi"))
            .await
            .unwrap();
        let got = storage.get_raw("cdn/npm/uikit/1.0.0/a.js").await.unwrap();
        assert_eq!(got, Some(Bytes::from_static(b"hi")));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_raw("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_drops_prefix_and_nested_keys() {
        let storage = MemoryStorage::new();
        storage
            .put_raw("cdn/npm/uikit/1.0.0/a.js", Bytes::from_static(b"a"))
            .await
            .unwrap();
        storage
            .put_raw("cdn/npm/uikit/1.0.0/b.js", Bytes::from_static(b"b"))
            .await
            .unwrap();
        storage
            .put_raw("cdn/npm/other/1.0.0/c.js", Bytes::from_static(b"c"))
            .await
            .unwrap();
        storage.remove("cdn/npm/uikit/1.0.0").await.unwrap();

        assert_eq!(storage.get_raw("cdn/npm/uikit/1.0.0/a.js").await.unwrap(), None);
        assert_eq!(storage.get_raw("cdn/npm/uikit/1.0.0/b.js").await.unwrap(), None);
        assert!(storage
            .get_raw("cdn/npm/other/1.0.0/c.js")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn set_meta_merges_fields() {
        let storage = MemoryStorage::new();
        storage
            .set_meta("cdn/npm/uikit/1.0.0", json!({"a": 1}))
            .await
            .unwrap();
        storage
            .set_meta("cdn/npm/uikit/1.0.0", json!({"b": 2}))
            .await
            .unwrap();
        let meta = storage.get_meta("cdn/npm/uikit/1.0.0").await.unwrap().unwrap();
        assert_eq!(meta, json!({"a": 1, "b": 2}));
    }
}
