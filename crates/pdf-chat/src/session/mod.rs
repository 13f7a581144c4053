//! Session-scoped state and the adapters that mutate it

mod adapters;
mod manager;
mod store;

pub use adapters::{clear_history, ingest_document, submit_query};
pub use manager::SessionManager;
pub use store::{Notice, Session};
