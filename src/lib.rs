//! axlens - Axelar interchain analytics
//!
//! A CLI for exploring Axelar network activity: interchain transfers, GMP
//! routes, front-end platforms, token flows, and user retention.

// Note: deny (not forbid) to allow #[allow(unsafe_code)] in test helpers for env var manipulation
#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod providers;
pub mod render;
pub mod storage;
pub mod util;

pub use error::{AxlensError, ExitCode, Result};
