//! Command-line interface.

mod commands;
pub mod helpers;

pub use commands::{is_verbose, run};
