use crate::cache::{CacheStore, StoredValue};
use crate::error::CacheResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// 프로세스 메모리 저장소
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 키 수
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<StoredValue>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: StoredValue) -> CacheResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<usize> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(payload: &str, stored_at: i64) -> StoredValue {
        StoredValue {
            payload: payload.to_string(),
            stored_at,
        }
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryCacheStore::new();
        store.put("k", value("a", 1)).await.unwrap();
        store.put("k", value("b", 2)).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("k").await.unwrap(), Some(value("b", 2)));
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let store = MemoryCacheStore::new();
        store.put("wave:A:1d", value("a", 1)).await.unwrap();
        store.put("wave:B:1d", value("b", 1)).await.unwrap();
        store.put("series:A:1d", value("c", 1)).await.unwrap();

        assert_eq!(store.delete_prefix("wave:").await.unwrap(), 2);
        assert_eq!(store.len(), 1);
        store.delete("series:A:1d").await.unwrap();
        assert!(store.is_empty());
    }
}
