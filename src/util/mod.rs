//! Utility functions.

pub mod env;
pub mod format;

pub use format::{format_cell, format_percent, format_usd, human_format};
