pub mod api;
pub mod models;

pub use models::{Message, MessageFormData, parse_timestamp};
