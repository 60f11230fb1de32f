use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::application::errors::{BotError, StorageError};
use crate::application::robot::Robot;
use crate::domain::traits::{Brain, StoredValue};

/// SQLite-backed brain. Text values and byte values live in separate
/// columns of a single `kv` table.
///
/// The connection is opened on `initialize` (or on first use) and reopened
/// after `close` if the brain is used again.
pub struct SqliteBrain {
    path: PathBuf,
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteBrain {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            conn: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path) -> Result<Connection, StorageError> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                text TEXT,
                bytes BLOB
            )",
            [],
        )?;
        Ok(conn)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            if guard.is_none() {
                *guard = Some(Self::open(&path)?);
            }
            match guard.as_ref() {
                Some(conn) => f(conn),
                None => Err(StorageError::Closed),
            }
        })
        .await
        .map_err(|e| StorageError::Database(format!("Brain task failed: {}", e)))?
    }
}

#[async_trait]
impl Brain for SqliteBrain {
    async fn initialize(&self, _robot: &Robot) -> Result<(), BotError> {
        tracing::info!(path = %self.path.display(), "Opening SQLite brain");
        self.with_conn(|_| Ok(())).await?;
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<StoredValue>, StorageError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT text, bytes FROM kv WHERE key = ?1",
                    [&key],
                    |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<Vec<u8>>>(1)?)),
                )
                .optional()?;

            Ok(match row {
                Some((Some(text), _)) => Some(StoredValue::Text(text)),
                Some((None, Some(bytes))) => Some(StoredValue::Bytes(bytes)),
                _ => None,
            })
        })
        .await
    }

    async fn set_raw(&self, key: &str, value: StoredValue) -> Result<(), StorageError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let (text, bytes) = match value {
                StoredValue::Text(text) => (Some(text), None),
                StoredValue::Bytes(bytes) => (None, Some(bytes)),
            };
            conn.execute(
                "INSERT OR REPLACE INTO kv (key, text, bytes) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, text, bytes],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", [&key])?;
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<(), StorageError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let taken = conn.lock().unwrap_or_else(PoisonError::into_inner).take();
            match taken {
                Some(conn) => conn.close().map_err(|(_, e)| StorageError::from(e)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| StorageError::Database(format!("Brain task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::{BrainExt, Json};

    fn temp_brain() -> (SqliteBrain, PathBuf) {
        let path = std::env::temp_dir().join(format!("mmbot-brain-{}.db", uuid::Uuid::new_v4()));
        (SqliteBrain::new(&path), path)
    }

    #[tokio::test]
    async fn test_text_and_bytes_columns() {
        let (brain, path) = temp_brain();

        brain.set("name", &"mmbot".to_string()).await.unwrap();
        brain.set("raw", &vec![1u8, 2, 3]).await.unwrap();
        brain.set("list", &Json(vec!["a".to_string(), "b".to_string()])).await.unwrap();

        assert_eq!(brain.get::<String>("name").await.unwrap().as_deref(), Some("mmbot"));
        assert_eq!(brain.get_raw("raw").await.unwrap(), Some(StoredValue::Bytes(vec![1, 2, 3])));
        assert_eq!(
            brain.get::<Json<Vec<String>>>("list").await.unwrap().map(Json::into_inner),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert!(brain.get::<String>("nope").await.unwrap().is_none());

        brain.close().await.unwrap();
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_values_survive_close_and_reopen() {
        let (brain, path) = temp_brain();
        brain.set("k", &"v".to_string()).await.unwrap();
        brain.close().await.unwrap();
        brain.close().await.unwrap();

        let reopened = SqliteBrain::new(&path);
        assert_eq!(reopened.get::<String>("k").await.unwrap().as_deref(), Some("v"));
        reopened.remove("k").await.unwrap();
        assert!(reopened.get::<String>("k").await.unwrap().is_none());

        reopened.close().await.unwrap();
        let _ = std::fs::remove_file(path);
    }
}
