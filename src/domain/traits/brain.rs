use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::application::errors::{BotError, StorageError};
use crate::application::robot::Robot;

/// Raw payload as a brain backend stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    Text(String),
    Bytes(Vec<u8>),
}

/// Brain trait - pluggable async key-value store for script state.
///
/// Reads and writes on the same key are not serialized across callers;
/// read-modify-write sequences are the caller's problem.
#[async_trait]
pub trait Brain: Send + Sync {
    /// Connect the backend. A failure here is fatal for the robot.
    async fn initialize(&self, _robot: &Robot) -> Result<(), BotError> {
        Ok(())
    }

    /// `Ok(None)` when the key is absent
    async fn get_raw(&self, key: &str) -> Result<Option<StoredValue>, StorageError>;

    async fn set_raw(&self, key: &str, value: StoredValue) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    async fn close(&self) -> Result<(), StorageError>;
}

/// Types that can live in a brain
pub trait BrainValue: Sized + Send + 'static {
    fn to_stored(&self) -> Result<StoredValue, StorageError>;
    fn from_stored(value: StoredValue) -> Result<Self, StorageError>;
}

impl BrainValue for String {
    fn to_stored(&self) -> Result<StoredValue, StorageError> {
        Ok(StoredValue::Text(self.clone()))
    }

    fn from_stored(value: StoredValue) -> Result<Self, StorageError> {
        match value {
            StoredValue::Text(s) => Ok(s),
            StoredValue::Bytes(b) => {
                String::from_utf8(b).map_err(|e| StorageError::Serialization(e.to_string()))
            }
        }
    }
}

impl BrainValue for Vec<u8> {
    fn to_stored(&self) -> Result<StoredValue, StorageError> {
        Ok(StoredValue::Bytes(self.clone()))
    }

    fn from_stored(value: StoredValue) -> Result<Self, StorageError> {
        match value {
            StoredValue::Bytes(b) => Ok(b),
            StoredValue::Text(s) => Ok(s.into_bytes()),
        }
    }
}

/// Structured value, stored as JSON text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> BrainValue for Json<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    fn to_stored(&self) -> Result<StoredValue, StorageError> {
        Ok(StoredValue::Text(serde_json::to_string(&self.0)?))
    }

    fn from_stored(value: StoredValue) -> Result<Self, StorageError> {
        let parsed = match value {
            StoredValue::Text(s) => serde_json::from_str(&s)?,
            StoredValue::Bytes(b) => serde_json::from_slice(&b)?,
        };
        Ok(Json(parsed))
    }
}

/// Typed access on top of any [`Brain`]
#[async_trait]
pub trait BrainExt: Brain {
    async fn get<T: BrainValue>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get_raw(key).await? {
            Some(value) => T::from_stored(value).map(Some),
            None => Ok(None),
        }
    }

    async fn set<T: BrainValue + Sync>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let stored = value.to_stored()?;
        self.set_raw(key, stored).await
    }
}

impl<B: Brain + ?Sized> BrainExt for B {}
