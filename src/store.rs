// src/store.rs

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::error::AppError;

/// Keys of the persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Every quiz set, in catalog order.
    AllQuizzes,
    /// Name of the active quiz set.
    ActiveQuiz,
    /// Materialized copy of the active quiz set.
    CurrentQuiz,
    /// The results ledger.
    AllQuizResults,
    AdminLoggedIn,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::AllQuizzes => "allQuizzes",
            StoreKey::ActiveQuiz => "activeQuiz",
            StoreKey::CurrentQuiz => "currentQuiz",
            StoreKey::AllQuizResults => "allQuizResults",
            StoreKey::AdminLoggedIn => "adminLoggedIn",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw string-valued key-value backend.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, AppError>;

    async fn put(&self, key: StoreKey, value: String) -> Result<(), AppError>;

    async fn remove(&self, key: StoreKey) -> Result<(), AppError>;
}

/// SQLite-backed store. Expects the `kv_store` table from the migrations.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, AppError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to read key {}: {:?}", key, e);
                AppError::from(e)
            })?;

        Ok(row.map(|(value,)| value))
    }

    async fn put(&self, key: StoreKey, value: String) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to write key {}: {:?}", key, e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn remove(&self, key: StoreKey) -> Result<(), AppError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Volatile store, used by tests and throwaway runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<StoreKey, String>>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, AppError> {
        Ok(self.entries.read().await.get(&key).cloned())
    }

    async fn put(&self, key: StoreKey, value: String) -> Result<(), AppError> {
        self.entries.write().await.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: StoreKey) -> Result<(), AppError> {
        self.entries.write().await.remove(&key);
        Ok(())
    }
}

/// Typed handle over a backend, shared by every component.
///
/// Read-modify-write cycles must hold the guard from [`Store::write_gate`]
/// for their whole duration. Writers in other processes are not covered;
/// between processes the last writer wins.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn KeyValueStore>,
    gate: Arc<Mutex<()>>,
}

impl Store {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn sqlite(pool: SqlitePool) -> Self {
        Self::new(Arc::new(SqliteStore::new(pool)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    /// Serializes mutations issued through this handle and its clones.
    pub async fn write_gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    pub async fn load<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Option<T>, AppError> {
        match self.backend.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn save<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> Result<(), AppError> {
        let raw = serde_json::to_string(value)?;
        self.backend.put(key, raw).await
    }

    pub async fn remove(&self, key: StoreKey) -> Result<(), AppError> {
        self.backend.remove(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_returns_none_for_missing_key() {
        let store = Store::in_memory();
        let value: Option<Vec<String>> = store.load(StoreKey::AllQuizzes).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn save_then_load_overwrites_whole_value() {
        let store = Store::in_memory();
        store.save(StoreKey::ActiveQuiz, "Safety").await.unwrap();
        store.save(StoreKey::ActiveQuiz, "Onboarding").await.unwrap();

        let active: Option<String> = store.load(StoreKey::ActiveQuiz).await.unwrap();
        assert_eq!(active.as_deref(), Some("Onboarding"));
    }

    #[tokio::test]
    async fn remove_deletes_key() {
        let store = Store::in_memory();
        store.save(StoreKey::AdminLoggedIn, &true).await.unwrap();
        store.remove(StoreKey::AdminLoggedIn).await.unwrap();

        let flag: Option<bool> = store.load(StoreKey::AdminLoggedIn).await.unwrap();
        assert!(flag.is_none());
    }

    #[tokio::test]
    async fn undecodable_value_is_an_internal_error() {
        let store = Store::in_memory();
        store.save(StoreKey::AllQuizResults, "not a list").await.unwrap();

        let loaded: Result<Option<Vec<u32>>, AppError> = store.load(StoreKey::AllQuizResults).await;
        assert!(matches!(loaded, Err(AppError::InternalServerError(_))));
    }
}
