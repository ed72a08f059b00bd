use std::sync::Arc;

use thiserror::Error;
use tracing::error;

use referral_db::{MessageFilter, MessageStore, SortOrder, StoreError};
use referral_types::{Message, MessageFormData};

/// The one failure the message layer models: the store request did not
/// succeed. `operation` names which of the four calls it was.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("message {operation} failed: {source}")]
    Store {
        operation: &'static str,
        source: StoreError,
    },
}

impl AccessError {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Store { operation, .. } => *operation,
        }
    }
}

fn failed(operation: &'static str, source: StoreError) -> AccessError {
    error!("Message {} failed: {}", operation, source);
    AccessError::Store { operation, source }
}

/// Message retrieval and read tracking over an injected store.
///
/// Each method is exactly one store round trip. Nothing is retried,
/// batched, cached, or ordered against other calls.
#[derive(Clone)]
pub struct MessageAccess {
    store: Arc<dyn MessageStore>,
}

impl MessageAccess {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Insert a message and return the row as the store persisted it.
    pub async fn send(&self, form: &MessageFormData) -> Result<Message, AccessError> {
        self.store.insert(form).await.map_err(|e| failed("send", e))
    }

    /// All messages on a referral, oldest first.
    pub async fn list_by_referral(&self, referral_id: i64) -> Result<Vec<Message>, AccessError> {
        self.store
            .select(&MessageFilter::by_referral(referral_id), SortOrder::Ascending)
            .await
            .map_err(|e| failed("list_by_referral", e))
    }

    /// Flag a message as read. Returns how many rows matched, so `Ok(0)`
    /// means the id does not exist.
    pub async fn mark_read(&self, message_id: &str) -> Result<u64, AccessError> {
        self.store
            .set_read(&MessageFilter::by_id(message_id), true)
            .await
            .map_err(|e| failed("mark_read", e))
    }

    /// Messages addressed to `user_id` that are still unread. Broadcast
    /// messages (no recipient) never count.
    pub async fn count_unread(&self, user_id: &str) -> Result<u64, AccessError> {
        self.store
            .count(&MessageFilter::unread_for(user_id))
            .await
            .map_err(|e| failed("count_unread", e))
    }

    pub fn lenient(&self) -> LenientMessages {
        LenientMessages::new(self.clone())
    }
}

/// Collapses every failure into an empty value: `None`, `[]`, `false`, `0`.
/// Errors are still logged by [`MessageAccess`].
///
/// Callers using this cannot tell "no data" from "request failed", and
/// `mark_read` reports `true` for an unknown id as long as the store
/// accepted the update.
#[derive(Clone)]
pub struct LenientMessages {
    inner: MessageAccess,
}

impl LenientMessages {
    pub fn new(inner: MessageAccess) -> Self {
        Self { inner }
    }

    pub async fn send(&self, form: &MessageFormData) -> Option<Message> {
        self.inner.send(form).await.ok()
    }

    pub async fn list_by_referral(&self, referral_id: i64) -> Vec<Message> {
        self.inner.list_by_referral(referral_id).await.unwrap_or_default()
    }

    pub async fn mark_read(&self, message_id: &str) -> bool {
        self.inner.mark_read(message_id).await.is_ok()
    }

    pub async fn count_unread(&self, user_id: &str) -> u64 {
        self.inner.count_unread(user_id).await.unwrap_or(0)
    }
}
