use thiserror::Error;

/// Anything that went wrong talking to a message store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed row: {0}")]
    Malformed(String),

    #[error("refusing to update messages without a filter")]
    Unfiltered,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
