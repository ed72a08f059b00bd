//! Database row types. These map directly to SQLite rows and are kept
//! distinct from referral-types.
use referral_types::{Message, parse_timestamp};

use crate::error::{StoreError, StoreResult};

pub struct MessageRow {
    pub id: String,
    pub referral_id: i64,
    pub sender_id: String,
    pub recipient_id: Option<String>,
    pub content: String,
    pub created_at: String,
    pub read: bool,
}

impl MessageRow {
    pub fn into_message(self) -> StoreResult<Message> {
        let created_at = parse_timestamp(&self.created_at).ok_or_else(|| {
            StoreError::Malformed(format!(
                "created_at '{}' on message '{}'",
                self.created_at, self.id
            ))
        })?;

        Ok(Message {
            id: self.id,
            referral_id: self.referral_id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            content: self.content,
            created_at,
            read: self.read,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn row(created_at: &str) -> MessageRow {
        MessageRow {
            id: "m1".into(),
            referral_id: 1,
            sender_id: "u1".into(),
            recipient_id: None,
            content: "hi".into(),
            created_at: created_at.into(),
            read: false,
        }
    }

    #[test]
    fn parses_rfc3339_millis() {
        let msg = row("2024-03-01T10:00:00.250Z").into_message().unwrap();
        assert_eq!(msg.created_at.nanosecond(), 250_000_000);
    }

    #[test]
    fn parses_sqlite_datetime() {
        let msg = row("2024-03-01 10:00:00").into_message().unwrap();
        assert_eq!(msg.created_at.hour(), 10);
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(matches!(
            row("yesterday").into_message(),
            Err(StoreError::Malformed(_))
        ));
    }
}
