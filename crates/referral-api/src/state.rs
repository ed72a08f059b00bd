use std::sync::Arc;

use crate::access::MessageAccess;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub messages: MessageAccess,
}

impl AppStateInner {
    pub fn new(messages: MessageAccess) -> AppState {
        Arc::new(Self { messages })
    }
}
