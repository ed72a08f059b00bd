use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use referral_types::{Message, MessageFormData};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::store::{MessageFilter, MessageStore, SortOrder};

/// In-process stand-in for a real store. Rows are kept in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<Message>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with `StoreError::Unavailable`.
    pub fn fail_requests(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Append a fully-formed row, bypassing id and timestamp assignment.
    pub async fn seed(&self, msg: Message) {
        self.rows.write().await.push(msg);
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert(&self, form: &MessageFormData) -> StoreResult<Message> {
        self.check()?;
        let msg = Message {
            id: Uuid::new_v4().to_string(),
            referral_id: form.referral_id,
            sender_id: form.sender_id.clone(),
            recipient_id: form.recipient_id.clone(),
            content: form.content.clone(),
            created_at: Utc::now(),
            read: false,
        };
        self.rows.write().await.push(msg.clone());
        Ok(msg)
    }

    async fn select(&self, filter: &MessageFilter, order: SortOrder) -> StoreResult<Vec<Message>> {
        self.check()?;
        let mut rows: Vec<Message> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();

        // Stable sort, so equal timestamps stay in insertion order
        rows.sort_by_key(|m| m.created_at);
        if order == SortOrder::Descending {
            rows.reverse();
        }
        Ok(rows)
    }

    async fn set_read(&self, filter: &MessageFilter, read: bool) -> StoreResult<u64> {
        self.check()?;
        if filter.is_empty() {
            return Err(StoreError::Unfiltered);
        }

        let mut matched = 0;
        for msg in self.rows.write().await.iter_mut().filter(|m| filter.matches(m)) {
            msg.read = read;
            matched += 1;
        }
        Ok(matched)
    }

    async fn count(&self, filter: &MessageFilter) -> StoreResult<u64> {
        self.check()?;
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|m| filter.matches(m)).count() as u64)
    }
}
