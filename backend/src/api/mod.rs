//! HTTP API module.
//!
//! This module provides the HTTP server, the session store and the API types
//! for the csvedit backend.

pub mod logs;
pub mod server;
pub mod store;
pub mod types;

pub use logs::*;
pub use server::{router, start_server};
pub use store::{SessionHandle, SessionStore, StoreOptions};
pub use types::*;
