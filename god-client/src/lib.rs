//! iso2god CLI library
//!
//! Command handlers for the `iso2god` binary.

pub mod commands;

// Re-export command handlers
pub use crate::commands::{
    convert::handle as handle_convert, info::handle as handle_info,
    verify::handle as handle_verify,
};
