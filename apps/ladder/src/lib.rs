//! # Ladder
//!
//! HTTP API, CLI and directory loading around `ladder-core`.

pub mod api;
pub mod cli;
pub mod config;
pub mod snapshot;
