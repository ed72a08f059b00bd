use async_trait::async_trait;
use referral_types::{Message, MessageFormData};

use crate::error::StoreResult;

/// Conjunction of equality predicates over the `messages` table.
/// An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageFilter {
    pub id: Option<String>,
    pub referral_id: Option<i64>,
    pub recipient_id: Option<String>,
    pub read: Option<bool>,
}

impl MessageFilter {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn by_referral(referral_id: i64) -> Self {
        Self {
            referral_id: Some(referral_id),
            ..Self::default()
        }
    }

    pub fn unread_for(recipient_id: impl Into<String>) -> Self {
        Self {
            recipient_id: Some(recipient_id.into()),
            read: Some(false),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn matches(&self, msg: &Message) -> bool {
        self.id.as_ref().is_none_or(|id| *id == msg.id)
            && self.referral_id.is_none_or(|r| r == msg.referral_id)
            && self
                .recipient_id
                .as_ref()
                .is_none_or(|r| msg.recipient_id.as_ref() == Some(r))
            && self.read.is_none_or(|r| r == msg.read)
    }
}

/// Ordering on `created_at`. Equal timestamps keep insertion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// The table operations the message layer needs from a backing store.
/// Every call is a single round trip.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert one row and return it as persisted, including the
    /// store-assigned `id` and `created_at`.
    async fn insert(&self, form: &MessageFormData) -> StoreResult<Message>;

    async fn select(&self, filter: &MessageFilter, order: SortOrder) -> StoreResult<Vec<Message>>;

    /// Set `read` on every matching row. Returns the number of rows matched.
    /// Implementations refuse an empty filter with `StoreError::Unfiltered`.
    async fn set_read(&self, filter: &MessageFilter, read: bool) -> StoreResult<u64>;

    async fn count(&self, filter: &MessageFilter) -> StoreResult<u64>;
}
