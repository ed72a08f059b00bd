use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// A row of the `messages` table as persisted by the store.
///
/// `id` and `created_at` are always assigned by the store, never by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub referral_id: i64,
    pub sender_id: String,
    #[serde(default)]
    pub recipient_id: Option<String>,
    pub content: String,
    #[serde(deserialize_with = "zoned_or_naive")]
    pub created_at: DateTime<Utc>,
    /// Hosted stores may hand back `null` for rows inserted before the
    /// column had a default; those read as unread.
    #[serde(default, deserialize_with = "null_as_false")]
    pub read: bool,
}

/// Write-side input for a new message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFormData {
    pub content: String,
    pub referral_id: i64,
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
}

impl MessageFormData {
    pub fn new(referral_id: i64, sender_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            referral_id,
            sender_id: sender_id.into(),
            recipient_id: None,
        }
    }

    pub fn to(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = Some(recipient_id.into());
        self
    }
}

/// Parses a store timestamp. Accepts RFC 3339 with any offset, and
/// zoneless `timestamp` values (`T` or space separated, optional
/// fraction), which are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
        return Some(ts);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ndt| ndt.and_utc())
}

fn zoned_or_naive<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
