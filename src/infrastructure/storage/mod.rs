//! Brain backends

mod sqlite;

pub use sqlite::SqliteBrain;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::traits::{Brain, StoredValue};
use crate::infrastructure::config::{BrainConfig, BrainKind};

/// In-process brain; contents are lost when the process exits
#[derive(Default)]
pub struct MemoryBrain {
    kv: Arc<RwLock<HashMap<String, StoredValue>>>,
}

impl MemoryBrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.kv.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.kv.read().await.is_empty()
    }
}

#[async_trait]
impl Brain for MemoryBrain {
    async fn get_raw(&self, key: &str) -> Result<Option<StoredValue>, StorageError> {
        let kv = self.kv.read().await;
        Ok(kv.get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: StoredValue) -> Result<(), StorageError> {
        let mut kv = self.kv.write().await;
        kv.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut kv = self.kv.write().await;
        kv.remove(key);
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Build the brain named by the configuration
pub fn open_brain(config: &BrainConfig) -> Arc<dyn Brain> {
    match config.kind {
        BrainKind::Memory => Arc::new(MemoryBrain::new()),
        BrainKind::Sqlite => Arc::new(SqliteBrain::new(&config.path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::{BrainExt, Json};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        hits: u32,
        last: String,
    }

    #[tokio::test]
    async fn test_absent_key_is_none() {
        let brain = MemoryBrain::new();
        let value: Option<String> = brain.get("missing").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_typed_values() {
        let brain = MemoryBrain::new();
        brain.set("greeting", &"hello".to_string()).await.unwrap();
        brain.set("blob", &vec![0u8, 1, 255]).await.unwrap();
        brain
            .set("counter", &Json(Counter { hits: 3, last: "bob".into() }))
            .await
            .unwrap();

        assert_eq!(brain.get::<String>("greeting").await.unwrap().as_deref(), Some("hello"));
        assert_eq!(brain.get::<Vec<u8>>("blob").await.unwrap(), Some(vec![0u8, 1, 255]));
        let counter = brain.get::<Json<Counter>>("counter").await.unwrap().map(Json::into_inner);
        assert_eq!(counter, Some(Counter { hits: 3, last: "bob".into() }));
        assert_eq!(brain.len().await, 3);
    }

    #[tokio::test]
    async fn test_remove() {
        let brain = MemoryBrain::new();
        brain.set("k", &"v".to_string()).await.unwrap();
        brain.remove("k").await.unwrap();
        brain.remove("k").await.unwrap();
        assert!(brain.get::<String>("k").await.unwrap().is_none());
        assert!(brain.is_empty().await);
    }
}
