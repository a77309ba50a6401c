// src/quiz/intent.rs

//! Two-step confirmation for destructive actions.
//!
//! A request step validates the target and returns a [`DeleteIntent`]
//! describing exactly what would be removed. Nothing changes until the
//! intent is handed back to the owning component's confirm method.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeleteIntent {
    /// Remove one quiz set from the catalog.
    Category { name: String },
    /// Remove one ledger entry. Taker and timestamp pin the entry so a
    /// shifted index is detected at confirm time.
    Result {
        index: usize,
        taker_id: String,
        timestamp: DateTime<Utc>,
    },
    /// Remove every ledger entry; `count` is the size seen at request time.
    AllResults { count: usize },
}

impl DeleteIntent {
    /// Prompt shown to the admin before confirming.
    pub fn prompt(&self) -> String {
        match self {
            DeleteIntent::Category { name } => {
                format!("Are you sure you want to delete the quiz '{}'?", name)
            }
            DeleteIntent::Result { taker_id, .. } => {
                format!("Are you sure you want to delete the result of employee {}?", taker_id)
            }
            DeleteIntent::AllResults { count } => format!(
                "Are you sure you want to delete ALL {} results? This action cannot be undone.",
                count
            ),
        }
    }
}

/// An intent parked until the admin confirms or cancels it.
#[derive(Debug, Clone, Serialize)]
pub struct PendingIntent {
    pub intent_id: Uuid,
    pub intent: DeleteIntent,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Registry of outstanding intents, shared across requests.
#[derive(Clone)]
pub struct IntentBook {
    pending: Arc<Mutex<HashMap<Uuid, PendingIntent>>>,
    ttl: Duration,
}

impl IntentBook {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn issue(&self, intent: DeleteIntent) -> PendingIntent {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::minutes(5));
        let pending = PendingIntent {
            intent_id: Uuid::new_v4(),
            message: intent.prompt(),
            intent,
            expires_at: now + ttl,
        };

        let mut book = self.pending.lock().await;
        book.retain(|_, p| p.expires_at > now);
        book.insert(pending.intent_id, pending.clone());

        pending
    }

    /// Removes and returns the intent. Each intent can be confirmed once.
    pub async fn take(&self, id: Uuid) -> Result<DeleteIntent, AppError> {
        let pending = self
            .pending
            .lock()
            .await
            .remove(&id)
            .ok_or_else(|| AppError::NotFound("Delete request not found".to_string()))?;

        if pending.expires_at <= Utc::now() {
            return Err(AppError::NotFound("Delete request has expired".to_string()));
        }

        Ok(pending.intent)
    }

    pub async fn cancel(&self, id: Uuid) -> bool {
        self.pending.lock().await.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn intent_can_only_be_taken_once() {
        let book = IntentBook::new(Duration::from_secs(60));
        let pending = book
            .issue(DeleteIntent::Category {
                name: "Safety".to_string(),
            })
            .await;

        let intent = book.take(pending.intent_id).await.unwrap();
        assert_eq!(
            intent,
            DeleteIntent::Category {
                name: "Safety".to_string()
            }
        );
        assert!(matches!(book.take(pending.intent_id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn expired_intent_is_rejected() {
        let book = IntentBook::new(Duration::ZERO);
        let pending = book.issue(DeleteIntent::AllResults { count: 3 }).await;

        assert!(matches!(book.take(pending.intent_id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn cancelled_intent_cannot_be_confirmed() {
        let book = IntentBook::new(Duration::from_secs(60));
        let pending = book.issue(DeleteIntent::AllResults { count: 1 }).await;

        assert!(book.cancel(pending.intent_id).await);
        assert!(!book.cancel(pending.intent_id).await);
        assert!(book.take(pending.intent_id).await.is_err());
    }
}
