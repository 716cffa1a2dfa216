//! Command-line front end for the journal.
mod app;
mod main;

pub use app::*;
pub use main::*;
