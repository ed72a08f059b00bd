use serde::{Deserialize, Serialize};

use crate::models::MessageFormData;

// -- Messages --

/// Body of `POST /referrals/{referral_id}/messages`. The referral comes
/// from the path.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
    pub sender_id: String,
    #[serde(default)]
    pub recipient_id: Option<String>,
}

impl SendMessageRequest {
    pub fn into_form(self, referral_id: i64) -> MessageFormData {
        MessageFormData {
            content: self.content,
            referral_id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    /// Rows the update touched. Zero means the id did not exist.
    pub matched: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
