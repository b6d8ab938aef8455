//! Network bindings for the trigger endpoint.

pub mod http;

pub use http::{create_router, run_server, AppState};
