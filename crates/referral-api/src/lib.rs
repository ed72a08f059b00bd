pub mod access;
pub mod error;
pub mod messages;
pub mod routes;
pub mod state;

pub use access::{AccessError, LenientMessages, MessageAccess};
pub use state::{AppState, AppStateInner};
