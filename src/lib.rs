//! Fishing trip journal library
//!
//! This library provides a trip store with calendar, search and monthly
//! statistics queries, persisted to a flat key-value namespace, plus the
//! command-line front end built on top of it.

mod cli;
mod config;
mod errors;
mod helper;
mod kv_store;
mod storage;
mod trip;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use kv_store::*;
pub use storage::*;
pub use trip::*;
pub use types::*;
